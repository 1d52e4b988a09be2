use serde_json::Value;

use super::{listing, required, required_id, to_result, MethodResult};
use crate::rpc::AppService;

/// `createTag { name }`. Returns the existing tag when the name is taken.
pub fn create_tag(service: &AppService, params: &Value) -> MethodResult {
    let name: String = required(params, "name")?;
    to_result(service.create_tag(&name)?)
}

/// `tags`: every tag with its note count.
pub fn tags(service: &AppService, _params: &Value) -> MethodResult {
    to_result(service.tags()?)
}

pub fn note_tags(service: &AppService, params: &Value) -> MethodResult {
    let id = required_id(params, "id")?;
    to_result(service.note_tags(id)?)
}

/// `tagNotes { tagId, searchFilter?, pagination? }`
pub fn tag_notes(service: &AppService, params: &Value) -> MethodResult {
    let tag_id = required_id(params, "tagId")?;
    let (filter, pagination) = listing(params)?;
    to_result(service.tag_notes(tag_id, &filter, pagination)?)
}
