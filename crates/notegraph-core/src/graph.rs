//! Whole-corpus note linkage graph for visualization.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::document::Document;
use crate::error::NoteResult;
use crate::extract::references;
use crate::store::{NoteId, NoteStore, NoteSummary};

pub const DEFAULT_UNTITLED_TITLE: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: NoteId,
    pub title: String,
    /// Distinct undirected links touching this note.
    pub connections: usize,
}

/// Undirected; `source`/`target` keep the first direction seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: NoteId,
    pub target: NoteId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl NoteGraph {
    pub fn node(&self, id: NoteId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

fn pair_key(a: NoteId, b: NoteId) -> (NoteId, NoteId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone)]
pub struct GraphBuilder {
    untitled_title: String,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_UNTITLED_TITLE)
    }
}

impl GraphBuilder {
    pub fn new(untitled_title: impl Into<String>) -> Self {
        Self {
            untitled_title: untitled_title.into(),
        }
    }

    /// Build the graph from every note's id, title and content.
    ///
    /// Self-references and references to notes outside `notes` produce no
    /// link. A note whose content does not parse still gets a node.
    pub fn build(&self, notes: &[NoteSummary]) -> NoteGraph {
        let known: HashSet<NoteId> = notes.iter().map(|n| n.id).collect();
        let mut seen: HashSet<(NoteId, NoteId)> = HashSet::new();
        let mut connections: HashMap<NoteId, usize> = HashMap::new();
        let mut links = Vec::new();

        for note in notes {
            let Some(doc) = Document::try_parse(&note.content) else {
                continue;
            };
            for reference in references(&doc) {
                let target = reference.target;
                if target == note.id || !known.contains(&target) {
                    continue;
                }
                if !seen.insert(pair_key(note.id, target)) {
                    continue;
                }
                links.push(GraphLink {
                    source: note.id,
                    target,
                });
                *connections.entry(note.id).or_default() += 1;
                *connections.entry(target).or_default() += 1;
            }
        }

        let nodes = notes
            .iter()
            .map(|note| GraphNode {
                id: note.id,
                title: if note.title.trim().is_empty() {
                    self.untitled_title.clone()
                } else {
                    note.title.clone()
                },
                connections: connections.get(&note.id).copied().unwrap_or(0),
            })
            .collect();

        tracing::debug!("Built note graph: {} nodes, {} links", notes.len(), links.len());
        NoteGraph { nodes, links }
    }

    /// Load every note in one bulk fetch and build the graph.
    pub fn build_from_store<S>(&self, store: &S) -> NoteResult<NoteGraph>
    where
        S: NoteStore + ?Sized,
    {
        Ok(self.build(&store.note_summaries()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(id: NoteId, title: &str, targets: &[NoteId]) -> NoteSummary {
        let content: Vec<serde_json::Value> = targets
            .iter()
            .map(|t| json!({"type": "reference", "props": {"id": t, "title": "x"}}))
            .collect();
        NoteSummary {
            id,
            title: title.to_string(),
            content: json!([{"id": "p", "type": "paragraph", "content": content}]).to_string(),
        }
    }

    fn link_keys(graph: &NoteGraph) -> HashSet<(NoteId, NoteId)> {
        graph.links.iter().map(|l| pair_key(l.source, l.target)).collect()
    }

    #[test]
    fn mutual_references_make_one_link() {
        let graph = GraphBuilder::default().build(&[summary(1, "A", &[2]), summary(2, "B", &[1])]);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.node(1).unwrap().connections, 1);
        assert_eq!(graph.node(2).unwrap().connections, 1);
    }

    #[test]
    fn repeated_references_count_once() {
        let graph = GraphBuilder::default().build(&[summary(1, "A", &[2, 2, 2]), summary(2, "B", &[])]);
        assert_eq!(graph.links, vec![GraphLink { source: 1, target: 2 }]);
        assert_eq!(graph.node(1).unwrap().connections, 1);
    }

    #[test]
    fn self_references_are_excluded() {
        let graph = GraphBuilder::default().build(&[summary(1, "A", &[1])]);
        assert!(graph.links.is_empty());
        assert_eq!(graph.node(1).unwrap().connections, 0);
    }

    #[test]
    fn dangling_references_make_no_link() {
        let graph = GraphBuilder::default().build(&[summary(1, "A", &[404])]);
        assert!(graph.links.is_empty());
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.node(1).unwrap().connections, 0);
    }

    #[test]
    fn isolated_and_untitled_notes_still_appear() {
        let graph = GraphBuilder::new("(no title)").build(&[
            summary(1, "", &[]),
            summary(2, "  ", &[]),
            summary(3, "Named", &[]),
        ]);
        let titles: Vec<&str> = graph.nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["(no title)", "(no title)", "Named"]);
        assert!(graph.nodes.iter().all(|n| n.connections == 0));
    }

    #[test]
    fn malformed_note_keeps_its_node_and_does_not_stop_the_rest() {
        let mut broken = summary(2, "Broken", &[]);
        broken.content = "{{{".to_string();
        let graph = GraphBuilder::default().build(&[
            summary(1, "A", &[3]),
            broken,
            summary(3, "C", &[2]),
        ]);
        assert_eq!(link_keys(&graph), [(1, 3), (2, 3)].into_iter().collect());
        assert_eq!(graph.node(2).unwrap().connections, 1);
        assert_eq!(graph.node(3).unwrap().connections, 2);
    }

    #[test]
    fn counts_are_independent_of_corpus_order() {
        let corpus = vec![
            summary(1, "A", &[2, 3]),
            summary(2, "B", &[1, 3]),
            summary(3, "C", &[4]),
            summary(4, "D", &[]),
        ];
        let forward = GraphBuilder::default().build(&corpus);
        let mut reversed_corpus = corpus.clone();
        reversed_corpus.reverse();
        let reversed = GraphBuilder::default().build(&reversed_corpus);

        assert_eq!(link_keys(&forward), link_keys(&reversed));
        for node in &forward.nodes {
            assert_eq!(
                node.connections,
                reversed.node(node.id).unwrap().connections,
                "node {}",
                node.id
            );
        }
        assert_eq!(forward.node(3).unwrap().connections, 3);
    }
}
