use serde_json::Value;

use super::{required_id, to_result, MethodResult};
use crate::rpc::AppService;

/// `backReferences { id }`: notes whose content references `id`, pinned
/// first, then most recently updated.
pub fn back_references(service: &AppService, params: &Value) -> MethodResult {
    let id = required_id(params, "id")?;
    to_result(service.back_references(id)?)
}

/// `noteGraph`: `{ nodes, links }` over the whole corpus.
pub fn note_graph(service: &AppService, _params: &Value) -> MethodResult {
    to_result(service.note_graph()?)
}
