//! Typed node extraction over a document tree.

use crate::document::{coerce_id, Block, Document, Inline, Props, REFERENCE, TAG};
use crate::store::{NoteId, TagId};

/// A matching node found by [`extract_by_type`], either block-level or inline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Block(&'a Block),
    Inline(&'a Inline),
}

impl<'a> NodeRef<'a> {
    pub fn props(&self) -> &'a Props {
        match self {
            NodeRef::Block(block) => &block.props,
            NodeRef::Inline(inline) => &inline.props,
        }
    }
}

/// Collect every node whose `type` equals `node_type`, at any depth.
///
/// Blocks are checked themselves, then their inline `content`, then their
/// `children`, so results come back in document order.
pub fn extract_by_type<'a>(node_type: &str, blocks: &'a [Block]) -> Vec<NodeRef<'a>> {
    let mut found = Vec::new();
    collect(node_type, blocks, &mut found);
    found
}

fn collect<'a>(node_type: &str, blocks: &'a [Block], found: &mut Vec<NodeRef<'a>>) {
    for block in blocks {
        if block.block_type == node_type {
            found.push(NodeRef::Block(block));
        }
        found.extend(
            block
                .content
                .iter()
                .filter(|inline| inline.inline_type == node_type)
                .map(NodeRef::Inline),
        );
        collect(node_type, &block.children, found);
    }
}

/// A link from one note to another, with the target title cached at insertion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: NoteId,
    /// `None` when the node carries no string title.
    pub title: Option<String>,
}

impl Reference {
    pub fn from_props(props: &Props) -> Option<Self> {
        let target = coerce_id(props.get("id")?)?;
        let title = props
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Some(Self { target, title })
    }
}

/// A tag mention: the tag's id and its denormalized `@name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMention {
    pub id: TagId,
    pub name: Option<String>,
}

impl TagMention {
    pub fn from_props(props: &Props) -> Option<Self> {
        let id = coerce_id(props.get("id")?)?;
        let name = props.get("tag").and_then(|v| v.as_str()).map(str::to_string);
        Some(Self { id, name })
    }
}

/// All `reference` nodes whose id can be read as a note id.
pub fn references(doc: &Document) -> Vec<Reference> {
    extract_by_type(REFERENCE, &doc.blocks)
        .into_iter()
        .filter_map(|node| Reference::from_props(node.props()))
        .collect()
}

/// All `tag` nodes whose id can be read as a tag id.
pub fn tag_mentions(doc: &Document) -> Vec<TagMention> {
    extract_by_type(TAG, &doc.blocks)
        .into_iter()
        .filter_map(|node| TagMention::from_props(node.props()))
        .collect()
}
