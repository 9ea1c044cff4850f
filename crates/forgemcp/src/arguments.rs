use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Argument object passed to a tool handler or a prompt.
///
/// The getters mirror how operation wrappers validate their input: required
/// parameters must be present, non-null and of the right type; optional
/// parameters may be absent but must have the right type when given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Create an empty argument object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under the same key.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Borrow the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Deserialize the whole argument object into a typed parameter struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|err| Error::InvalidParams(err.to_string()))
    }

    /// A required, non-empty string parameter.
    pub fn required_str(&self, key: &str) -> Result<String> {
        match self.get(key) {
            None => Err(missing(key)),
            Some(Value::String(s)) if s.is_empty() => Err(missing(key)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(wrong_type(key, "string")),
        }
    }

    /// A required non-negative integer parameter.
    ///
    /// Clients frequently send whole numbers as floats, so `12.0` is accepted.
    pub fn required_u64(&self, key: &str) -> Result<u64> {
        self.optional_u64(key)?.ok_or_else(|| missing(key))
    }

    /// An optional string parameter.
    pub fn optional_str(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key, "string")),
        }
    }

    /// An optional non-negative integer parameter.
    pub fn optional_u64(&self, key: &str) -> Result<Option<u64>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        if let Some(n) = value.as_u64() {
            return Ok(Some(n));
        }
        // `u64::MAX as f64` rounds up to 2^64, which is itself out of range.
        match value.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(Some(f as u64)),
            _ => Err(wrong_type(key, "non-negative integer")),
        }
    }

    /// An optional boolean parameter.
    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(wrong_type(key, "boolean")),
        }
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Arguments> for Value {
    fn from(arguments: Arguments) -> Self {
        Self::Object(arguments.0)
    }
}

fn missing(key: &str) -> Error {
    Error::InvalidParams(format!("missing required parameter: {key}"))
}

fn wrong_type(key: &str, expected: &str) -> Error {
    Error::InvalidParams(format!("parameter {key} is not of type {expected}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_string() {
        let args = Arguments::new().set("owner", "octo").set("repo", "");
        assert_eq!(args.required_str("owner").unwrap(), "octo");
        assert!(matches!(args.required_str("repo"), Err(Error::InvalidParams(m)) if m.contains("missing")));
        assert!(args.required_str("nope").is_err());
    }

    #[test]
    fn test_numbers_accept_whole_floats() {
        let args = Arguments::new()
            .set("job_id", 12.0)
            .set("tail_lines", 5)
            .set("bad", 1.5);
        assert_eq!(args.required_u64("job_id").unwrap(), 12);
        assert_eq!(args.optional_u64("tail_lines").unwrap(), Some(5));
        assert!(args.optional_u64("bad").is_err());
        assert_eq!(args.optional_u64("absent").unwrap(), None);
    }

    #[test]
    fn test_out_of_range_floats_rejected() {
        let args = Arguments::new()
            .set("run_id", 1e30)
            .set("job_id", 18446744073709551616.0)
            .set("tail_lines", 9007199254740992.0);
        assert!(matches!(args.optional_u64("run_id"), Err(Error::InvalidParams(_))));
        assert!(args.required_u64("job_id").is_err());
        assert_eq!(args.optional_u64("tail_lines").unwrap(), Some(9_007_199_254_740_992));
    }

    #[test]
    fn test_null_is_absent() {
        let args = Arguments::new().set("flag", Value::Null);
        assert_eq!(args.optional_bool("flag").unwrap(), None);
        assert!(args.required_str("flag").is_err());
    }
}
