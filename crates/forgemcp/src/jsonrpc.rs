use serde::Serialize;

use crate::{error::Result, schema::*};

/// Create a JSONRPC error response
pub fn create_jsonrpc_error(
    id: Option<RequestId>,
    code: i32,
    message: String,
    data: Option<serde_json::Value>,
) -> JSONRPCMessage {
    JSONRPCMessage::Error(JSONRPCError {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        error: ErrorObject {
            code,
            message,
            data,
        },
    })
}

/// Convert a Result<T> to a JSONRPC response
pub fn result_to_jsonrpc_response<T>(id: RequestId, result: Result<T>) -> JSONRPCMessage
where
    T: Serialize,
{
    let result = result.and_then(|value| serde_json::to_value(value).map_err(Into::into));
    match result {
        Ok(result) => JSONRPCMessage::Response(JSONRPCResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }),
        Err(e) => {
            if let Some(jsonrpc_error) = e.to_jsonrpc_response(id.clone()) {
                JSONRPCMessage::Error(jsonrpc_error)
            } else {
                create_jsonrpc_error(Some(id), INTERNAL_ERROR, e.to_string(), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_error_mapping() {
        let message = result_to_jsonrpc_response::<()>(
            RequestId::Number(3),
            Err(Error::MethodNotFound("logging/setLevel".into())),
        );
        let JSONRPCMessage::Error(error) = message else {
            panic!("expected error");
        };
        assert_eq!(error.error.code, METHOD_NOT_FOUND);
        assert_eq!(error.id, Some(RequestId::Number(3)));

        let message = result_to_jsonrpc_response::<()>(
            RequestId::Number(4),
            Err(Error::InternalError("boom".into())),
        );
        assert!(matches!(message, JSONRPCMessage::Error(e) if e.error.code == INTERNAL_ERROR));
    }

    #[test]
    fn test_success_wraps_value() {
        let message = result_to_jsonrpc_response(RequestId::String("a".into()), Ok(ListToolsResult::default()));
        let JSONRPCMessage::Response(response) = message else {
            panic!("expected response");
        };
        assert_eq!(response.result["tools"], serde_json::json!([]));
    }
}
