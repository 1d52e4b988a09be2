use notegraph_core::{NoteId, NoteInput};
use serde_json::{json, Value};

use super::{listing, optional, required, required_id, to_result, MethodResult};
use crate::rpc::AppService;

/// `note { id }`: the note with stale reference titles repaired.
pub fn note(service: &AppService, params: &Value) -> MethodResult {
    let id = required_id(params, "id")?;
    to_result(service.note(id)?)
}

/// `createNote { input: { title?, content?, layout? } }`
pub fn create_note(service: &AppService, params: &Value) -> MethodResult {
    let input: NoteInput = optional(params, "input")?.unwrap_or_default();
    to_result(service.create_note(input)?)
}

/// `updateNote { id, input }`
pub fn update_note(service: &AppService, params: &Value) -> MethodResult {
    let id = required_id(params, "id")?;
    let input: NoteInput = required(params, "input")?;
    to_result(service.update_note(id, input)?)
}

pub fn delete_note(service: &AppService, params: &Value) -> MethodResult {
    let id = required_id(params, "id")?;
    to_result(service.delete_note(id)?)
}

/// `pinNote { id, pinned }`
pub fn pin_note(service: &AppService, params: &Value) -> MethodResult {
    let id = required_id(params, "id")?;
    let pinned: bool = required(params, "pinned")?;
    to_result(service.pin_note(id, pinned)?)
}

/// `reorderNotes { ids: [..] }`
pub fn reorder_notes(service: &AppService, params: &Value) -> MethodResult {
    let ids: Vec<Value> = required(params, "ids")?;
    let ids = ids
        .iter()
        .map(|v| {
            notegraph_core::document::coerce_id(v).ok_or_else(|| {
                crate::rpc::jsonrpc::JsonRpcError::invalid_params(format!(
                    "Invalid parameter ids: {} is not a note id",
                    v
                ))
            })
        })
        .collect::<Result<Vec<NoteId>, _>>()?;
    service.reorder_notes(&ids)?;
    Ok(json!({ "reordered": ids.len() }))
}

/// `allNotes { searchFilter?, pagination? }`
pub fn all_notes(service: &AppService, params: &Value) -> MethodResult {
    let (filter, pagination) = listing(params)?;
    to_result(service.all_notes(&filter, pagination)?)
}

/// `noteMarkdown { id }`
pub fn note_markdown(service: &AppService, params: &Value) -> MethodResult {
    let id = required_id(params, "id")?;
    let markdown = service.note_markdown(id)?;
    Ok(json!({ "id": id, "markdown": markdown }))
}
