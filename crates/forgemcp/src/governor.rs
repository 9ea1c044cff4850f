//! Output size governor for tools whose natural output is unbounded.
//!
//! A [`Governor`] measures output in lines, bytes or estimated tokens. Output
//! within budget passes through untouched; anything larger is cut down to the
//! most relevant window of whole lines and annotated with a truncation marker.
//! Records are never split: JSON records are governed as one compact record
//! per line.

use std::fmt;

use serde::Serialize;

use crate::Result;

/// Prefix of the marker line appended to truncated output.
pub const TRUNCATION_MARKER: &str = "[output truncated:";

/// Approximate bytes per token for budget estimation.
const BYTES_PER_TOKEN: usize = 4;

/// Estimate the token cost of a text, rounding up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(BYTES_PER_TOKEN)
}

/// Maximum size of governed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Whole lines.
    Lines(usize),
    /// UTF-8 bytes.
    Bytes(usize),
    /// Estimated tokens, see [`estimate_tokens`].
    Tokens(usize),
}

impl Budget {
    /// The numeric limit.
    pub fn limit(&self) -> usize {
        match self {
            Self::Lines(n) | Self::Bytes(n) | Self::Tokens(n) => *n,
        }
    }

    /// Cost of `lines` lines totalling `bytes` bytes in this budget's unit.
    fn cost(&self, lines: usize, bytes: usize) -> usize {
        match self {
            Self::Lines(_) => lines,
            Self::Bytes(_) => bytes,
            Self::Tokens(_) => bytes.div_ceil(BYTES_PER_TOKEN),
        }
    }

    /// Measure a text in this budget's unit.
    pub fn measure(&self, text: &str) -> usize {
        self.cost(text.split_inclusive('\n').count(), text.len())
    }

    fn unit(&self) -> &'static str {
        match self {
            Self::Lines(_) => "lines",
            Self::Bytes(_) => "bytes",
            Self::Tokens(_) => "tokens",
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.limit(), self.unit())
    }
}

/// Which end of the output is kept when truncating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Keep the first lines.
    Head,
    /// Keep the last lines; failures in logs usually sit at the end.
    #[default]
    Tail,
}

/// Details about a truncation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Truncation {
    /// Lines in the original output.
    pub total_lines: usize,
    /// Lines kept.
    pub kept_lines: usize,
    /// Lines dropped.
    pub omitted_lines: usize,
    /// Original size in the budget's unit.
    pub original_size: usize,
    /// The budget that was exceeded, rendered with its unit.
    pub budget: String,
    /// How to request the rest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Governed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Governed {
    /// Output content, whole lines only.
    pub content: String,
    /// Present when the content was cut down.
    pub truncation: Option<Truncation>,
}

impl Governed {
    /// Whether the output was cut down.
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }

    /// Content followed by the truncation marker, if any.
    pub fn render(&self) -> String {
        let Some(truncation) = &self.truncation else {
            return self.content.clone();
        };
        let mut out = self.content.clone();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!(
            "{TRUNCATION_MARKER} kept {} of {} lines, {} omitted, budget {}]",
            truncation.kept_lines, truncation.total_lines, truncation.omitted_lines, truncation.budget
        ));
        if let Some(hint) = &truncation.hint {
            out.push(' ');
            out.push_str(hint);
        }
        out
    }
}

/// Degradation policy for one operation.
#[derive(Debug, Clone)]
pub struct Governor {
    budget: Budget,
    window: Window,
    hint: Option<String>,
}

impl Governor {
    /// Create a governor keeping the tail window.
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            window: Window::default(),
            hint: None,
        }
    }

    /// Choose which window is kept.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Guidance attached to the marker, e.g. which parameters fetch more.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// The configured budget.
    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Govern a text.
    pub fn apply(&self, text: &str) -> Governed {
        let original_size = self.budget.measure(text);
        if original_size <= self.budget.limit() {
            return Governed {
                content: text.to_string(),
                truncation: None,
            };
        }

        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let kept = self.fit(&lines);
        let content = match self.window {
            Window::Head => lines[..kept].concat(),
            Window::Tail => lines[lines.len() - kept..].concat(),
        };
        Governed {
            content,
            truncation: Some(Truncation {
                total_lines: lines.len(),
                kept_lines: kept,
                omitted_lines: lines.len() - kept,
                original_size,
                budget: self.budget.to_string(),
                hint: self.hint.clone(),
            }),
        }
    }

    /// Govern a sequence of records, one compact JSON record per line.
    pub fn apply_records<T: Serialize>(&self, records: &[T]) -> Result<Governed> {
        let mut text = String::new();
        for record in records {
            text.push_str(&serde_json::to_string(record)?);
            text.push('\n');
        }
        Ok(self.apply(&text))
    }

    /// Number of lines from the window's end that fit the budget.
    fn fit(&self, lines: &[&str]) -> usize {
        let limit = self.budget.limit();
        let ordered: Box<dyn Iterator<Item = &&str>> = match self.window {
            Window::Head => Box::new(lines.iter()),
            Window::Tail => Box::new(lines.iter().rev()),
        };
        let mut kept = 0;
        let mut bytes = 0;
        for line in ordered {
            if self.budget.cost(kept + 1, bytes + line.len()) > limit {
                break;
            }
            kept += 1;
            bytes += line.len();
        }
        kept
    }
}
