use serde_json::{json, Value};
use tracing::{debug, error};

use super::jsonrpc::{
    error_response, success_response, JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR,
    METHOD_NOT_FOUND,
};
use super::methods::{links, notes, tags, MethodResult};
use super::AppService;

type Method = fn(&AppService, &Value) -> MethodResult;

fn lookup(method: &str) -> Option<Method> {
    let handler: Method = match method {
        "ping" => handle_ping,
        "note" => notes::note,
        "createNote" => notes::create_note,
        "updateNote" => notes::update_note,
        "deleteNote" => notes::delete_note,
        "pinNote" => notes::pin_note,
        "reorderNotes" => notes::reorder_notes,
        "allNotes" => notes::all_notes,
        "noteMarkdown" => notes::note_markdown,
        "backReferences" => links::back_references,
        "noteGraph" => links::note_graph,
        "createTag" => tags::create_tag,
        "tags" => tags::tags,
        "noteTags" => tags::note_tags,
        "tagNotes" => tags::tag_notes,
        _ => return None,
    };
    Some(handler)
}

/// Dispatch a JSON-RPC request to its method and wrap the outcome.
pub fn dispatch_request(service: &AppService, request: &JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();
    let Some(handler) = lookup(&request.method) else {
        return error_response(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        );
    };

    debug!("Dispatching {} (id {})", request.method, id);
    let params = request.params.as_ref().unwrap_or(&Value::Null);
    match handler(service, params) {
        Ok(result) => success_response(id, result),
        Err(err) => {
            if err.code == INTERNAL_ERROR {
                error!("Method {} failed: {}", request.method, err.message);
            } else {
                debug!("Method {} rejected: {}", request.method, err.message);
            }
            error_response(id, err.code, err.message)
        }
    }
}

fn handle_ping(_service: &AppService, _params: &Value) -> MethodResult {
    Ok(json!({}))
}
