//! HTTP surface: `POST /rpc` for JSON-RPC and `GET /health`.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::rpc::jsonrpc::{error_response, INTERNAL_ERROR, INVALID_REQUEST, PARSE_ERROR};
use crate::rpc::{dispatch_request, AppService, JsonRpcRequest, JsonRpcResponse};

pub fn app(service: Arc<AppService>) -> Router {
    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/health", get(handle_health))
        .with_state(service)
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

fn parse_request(body: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| error_response(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| error_response(id.clone(), INVALID_REQUEST, format!("Invalid request: {}", e)))?;
    if request.jsonrpc != "2.0" {
        return Err(error_response(
            id,
            INVALID_REQUEST,
            "Invalid request: jsonrpc must be \"2.0\"",
        ));
    }
    Ok(request)
}

/// Store calls are synchronous, so dispatch runs on the blocking pool.
async fn handle_rpc(State(service): State<Arc<AppService>>, body: String) -> Json<JsonRpcResponse> {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(response) => return Json(response),
    };
    let id = request.id.clone();
    let method = request.method.clone();

    match tokio::task::spawn_blocking(move || dispatch_request(&service, &request)).await {
        Ok(response) => Json(response),
        Err(e) => {
            error!("Method {} panicked or was cancelled: {}", method, e);
            Json(error_response(id, INTERNAL_ERROR, "Internal error"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use http::{Request, StatusCode};
    use notegraph_core::sqlite::SqliteNoteStore;
    use notegraph_core::{GraphBuilder, MarkdownConverter, NoteService};
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(Arc::new(NoteService::new(
            SqliteNoteStore::memory().unwrap(),
            MarkdownConverter::new(),
            GraphBuilder::default(),
        )))
    }

    async fn post_rpc(app: Router, body: &str) -> Value {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/rpc")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn rpc_round_trip_over_http() {
        let body = post_rpc(
            test_app(),
            r#"{"jsonrpc":"2.0","id":7,"method":"createNote","params":{"input":{"title":"Hello"}}}"#,
        )
        .await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["result"]["title"], "Hello");
        assert_eq!(body["result"]["layout"], "default");
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let body = post_rpc(test_app(), "{not json").await;
        assert_eq!(body["error"]["code"], PARSE_ERROR);
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn wrong_version_is_an_invalid_request() {
        let body = post_rpc(test_app(), r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#).await;
        assert_eq!(body["error"]["code"], INVALID_REQUEST);
        assert_eq!(body["id"], 1);

        let body = post_rpc(test_app(), r#"{"jsonrpc":"2.0","id":2}"#).await;
        assert_eq!(body["error"]["code"], INVALID_REQUEST);
    }
}
