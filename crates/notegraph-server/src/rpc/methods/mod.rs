//! JSON-RPC method implementations, one module per concern.
//!
//! Every method takes the service and the raw `params` value and returns the
//! JSON result. Parameter errors carry `Missing required parameter: <name>`
//! or `Invalid parameter <name>: ...` messages.

pub mod links;
pub mod notes;
pub mod tags;

use notegraph_core::{NoteId, Pagination, SearchFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::jsonrpc::JsonRpcError;

pub type MethodResult = Result<Value, JsonRpcError>;

pub(crate) fn to_result<T: Serialize>(value: T) -> MethodResult {
    Ok(serde_json::to_value(value)?)
}

/// Read an optional parameter. `null` counts as absent.
pub(crate) fn optional<T: DeserializeOwned>(params: &Value, name: &str) -> Result<Option<T>, JsonRpcError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid parameter {}: {}", name, e))),
    }
}

pub(crate) fn required<T: DeserializeOwned>(params: &Value, name: &str) -> Result<T, JsonRpcError> {
    optional(params, name)?
        .ok_or_else(|| JsonRpcError::invalid_params(format!("Missing required parameter: {}", name)))
}

/// Ids arrive as numbers or numeric strings.
pub(crate) fn required_id(params: &Value, name: &str) -> Result<NoteId, JsonRpcError> {
    let value = params
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| JsonRpcError::invalid_params(format!("Missing required parameter: {}", name)))?;
    notegraph_core::document::coerce_id(value).ok_or_else(|| {
        JsonRpcError::invalid_params(format!("Invalid parameter {}: expected a note id", name))
    })
}

/// `searchFilter` and `pagination`, both optional.
pub(crate) fn listing(params: &Value) -> Result<(SearchFilter, Pagination), JsonRpcError> {
    let filter = optional(params, "searchFilter")?.unwrap_or_default();
    let pagination = optional(params, "pagination")?.unwrap_or_default();
    Ok((filter, pagination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::jsonrpc::INVALID_PARAMS;
    use serde_json::json;

    #[test]
    fn required_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(required_id(&json!({"id": 4}), "id").unwrap(), 4);
        assert_eq!(required_id(&json!({"id": "4"}), "id").unwrap(), 4);
    }

    #[test]
    fn required_id_reports_missing_and_malformed() {
        let missing = required_id(&json!({}), "id").unwrap_err();
        assert_eq!(missing.code, INVALID_PARAMS);
        assert_eq!(missing.message, "Missing required parameter: id");

        let bad = required_id(&json!({"id": "four"}), "id").unwrap_err();
        assert!(bad.message.starts_with("Invalid parameter id"));
    }

    #[test]
    fn listing_defaults_when_absent() {
        let (filter, pagination) = listing(&Value::Null).unwrap();
        assert_eq!(filter, SearchFilter::default());
        assert_eq!(pagination, Pagination::default());
    }
}
