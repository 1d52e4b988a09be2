//! The block-tree format note bodies are serialized as.
//!
//! A document is a JSON array of blocks. Each block carries a `type` tag, a
//! loosely typed `props` map, an optional `content` array of inline nodes and
//! an optional `children` array of nested blocks. Inline nodes never nest
//! further as far as extraction is concerned.
//!
//! Parsing is lenient below the top level: a `content` or `children` field
//! that is not an array, or an element that does not look like a node, is
//! dropped instead of failing the whole document. Only a body that is not a
//! JSON array at all is reported as a parse failure.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Inline node type of a note-to-note link.
pub const REFERENCE: &str = "reference";
/// Inline node type of a tag mention.
pub const TAG: &str = "tag";

pub type Props = Map<String, Value>;

/// A structural unit of a note: paragraph, heading, list item, ...
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub block_type: String,
    #[serde(default, deserialize_with = "lenient_object")]
    pub props: Props,
    #[serde(
        default,
        deserialize_with = "lenient_seq",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub content: Vec<Inline>,
    #[serde(
        default,
        deserialize_with = "lenient_seq",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<Block>,
}

/// A leaf inside a block's `content`: text run, link, reference or tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inline {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub inline_type: String,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_object",
        skip_serializing_if = "Map::is_empty"
    )]
    pub props: Props,
    #[serde(
        default,
        deserialize_with = "lenient_object",
        skip_serializing_if = "Map::is_empty"
    )]
    pub styles: Props,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub href: Option<String>,
    /// Label runs of a `link` node. Only the markdown converter looks here.
    #[serde(
        default,
        deserialize_with = "lenient_seq",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub content: Vec<Inline>,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            inline_type: "text".to_string(),
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// A parsed note body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Parse a serialized note body.
    ///
    /// Fails only when `content` is not JSON or not a JSON array. Individual
    /// blocks that cannot be read as blocks are skipped.
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(content)? {
            Value::Array(items) => Ok(Self {
                blocks: items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            }),
            other => Err(serde_json::Error::custom(format!(
                "document must be an array of blocks, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Like [`Document::parse`], but logs and returns `None` on failure.
    /// Empty bodies are treated as "no document" without logging.
    pub fn try_parse(content: &str) -> Option<Self> {
        if content.trim().is_empty() {
            return None;
        }
        match Self::parse(content) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::debug!("Unreadable note content ({} bytes): {}", content.len(), e);
                None
            }
        }
    }

    pub fn to_json(&self) -> String {
        // A Document is built from serde_json values only, so this cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Coerce a document-side id (`5` or `"5"`) to a store key.
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_object<'de, D>(deserializer: D) -> Result<Props, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Props::new(),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_blocks_and_inline_content() {
        let raw = json!([{
            "id": "b1",
            "type": "bulletListItem",
            "props": {"textColor": "default"},
            "content": [
                {"type": "text", "text": "see ", "styles": {}},
                {"type": "reference", "props": {"id": 7, "title": "Seven"}}
            ],
            "children": [{"id": "b2", "type": "paragraph", "content": []}]
        }])
        .to_string();

        let doc = Document::parse(&raw).unwrap();
        assert_eq!(doc.blocks.len(), 1);
        let block = &doc.blocks[0];
        assert_eq!(block.block_type, "bulletListItem");
        assert_eq!(block.content.len(), 2);
        assert_eq!(block.content[1].inline_type, REFERENCE);
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.children[0].id, "b2");
    }

    #[test]
    fn rejects_non_array_body() {
        assert!(Document::parse(r#"{"type":"paragraph"}"#).is_err());
        assert!(Document::parse("not json").is_err());
        assert!(Document::parse("").is_err());
    }

    #[test]
    fn try_parse_treats_empty_body_as_no_document() {
        assert!(Document::try_parse("").is_none());
        assert!(Document::try_parse("   ").is_none());
        assert!(Document::try_parse("{").is_none());
        assert_eq!(Document::try_parse("[]"), Some(Document::default()));
    }

    #[test]
    fn malformed_content_and_children_become_empty() {
        let raw = json!([
            {"id": "a", "type": "paragraph", "content": "oops", "children": {"x": 1}},
            {"id": "b", "type": "paragraph", "content": [42, {"type": "text", "text": "ok"}]}
        ])
        .to_string();

        let doc = Document::parse(&raw).unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert!(doc.blocks[0].content.is_empty());
        assert!(doc.blocks[0].children.is_empty());
        assert_eq!(doc.blocks[1].content.len(), 1);
        assert_eq!(doc.blocks[1].content[0].text.as_deref(), Some("ok"));
    }

    #[test]
    fn mistyped_text_and_href_do_not_drop_the_node() {
        let raw = json!([{"id": "a", "type": "paragraph", "content": [
            {"type": "reference", "text": 5, "href": {}, "props": {"id": 3, "title": "Three"}},
            {"type": "link", "href": null, "content": [{"type": "text", "text": ["x"]}]}
        ]}])
        .to_string();

        let doc = Document::parse(&raw).unwrap();
        let content = &doc.blocks[0].content;
        assert_eq!(content.len(), 2);
        assert_eq!(content[0].inline_type, REFERENCE);
        assert_eq!(content[0].text, None);
        assert_eq!(content[0].href, None);
        assert_eq!(content[0].props["id"], json!(3));
        assert_eq!(content[1].content.len(), 1);
        assert_eq!(content[1].content[0].text, None);
    }

    #[test]
    fn numeric_block_ids_are_kept_as_strings() {
        let doc = Document::parse(r#"[{"id": 12, "type": "paragraph"}]"#).unwrap();
        assert_eq!(doc.blocks[0].id, "12");
    }

    #[test]
    fn non_object_elements_at_top_level_are_skipped() {
        let doc = Document::parse(r#"[1, "two", {"id": "x", "type": "heading"}]"#).unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].block_type, "heading");
    }

    #[test]
    fn coerces_numeric_and_string_ids() {
        assert_eq!(coerce_id(&json!(5)), Some(5));
        assert_eq!(coerce_id(&json!("42")), Some(42));
        assert_eq!(coerce_id(&json!(" 9 ")), Some(9));
        assert_eq!(coerce_id(&json!("abc")), None);
        assert_eq!(coerce_id(&json!(1.5)), None);
        assert_eq!(coerce_id(&Value::Null), None);
    }

    #[test]
    fn serializes_back_to_a_json_array() {
        let doc = Document::new(vec![Block {
            id: "p".into(),
            block_type: "paragraph".into(),
            content: vec![Inline::text("hi")],
            ..Block::default()
        }]);
        let reparsed = Document::parse(&doc.to_json()).unwrap();
        assert_eq!(reparsed, doc);
    }
}
