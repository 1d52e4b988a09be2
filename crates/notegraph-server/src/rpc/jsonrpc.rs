use notegraph_core::NoteError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// Application error: the addressed note or tag does not exist.
pub const NOT_FOUND: i32 = -32004;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }
}

impl From<NoteError> for JsonRpcError {
    fn from(err: NoteError) -> Self {
        let code = match &err {
            NoteError::NotFound { .. } => NOT_FOUND,
            NoteError::InvalidInput(_) => INVALID_PARAMS,
            _ => INTERNAL_ERROR,
        };
        Self::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for JsonRpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(INTERNAL_ERROR, format!("Failed to encode result: {}", err))
    }
}

pub fn success_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: Some(result),
        error: None,
    }
}

pub fn error_response(id: Value, code: i32, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: None,
        error: Some(JsonRpcError::new(code, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_without_params_or_id_deserializes() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert_eq!(req.id, Value::Null);
        assert!(req.params.is_none());
    }

    #[test]
    fn success_omits_error_and_error_omits_result() {
        let ok = serde_json::to_value(success_response(json!(1), json!({}))).unwrap();
        assert!(ok.get("error").is_none());
        let err = serde_json::to_value(error_response(json!(1), INTERNAL_ERROR, "boom")).unwrap();
        assert!(err.get("result").is_none());
        assert_eq!(err["error"]["code"], INTERNAL_ERROR);
    }

    #[test]
    fn note_errors_map_to_codes() {
        assert_eq!(JsonRpcError::from(NoteError::note_not_found(3)).code, NOT_FOUND);
        assert_eq!(
            JsonRpcError::from(NoteError::InvalidInput("x".into())).code,
            INVALID_PARAMS
        );
        assert_eq!(
            JsonRpcError::from(NoteError::Storage("disk".into())).code,
            INTERNAL_ERROR
        );
    }
}
