//! Tree queries: by tag, by predicate, text content.
//!
//! Queries walk the tree in document order from a starting node, so
//! detached definition bodies are never matched by accident.

use super::node::{Node, NodeId, NodeKind};
use super::tree::Ast;

impl Ast {
    /// All nodes under `start` (inclusive) matching a predicate, in
    /// document order.
    pub fn query_all(&self, start: NodeId, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.walk_depth_first(start)
            .into_iter()
            .filter(|&id| self.get(id).is_some_and(&predicate))
            .collect()
    }

    /// All elements with the given tag under the document root.
    pub fn query_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.query_all(self.root(), |n| n.is_element() && n.name == tag)
    }

    /// Number of element nodes under `start`, inclusive.
    pub fn count_elements(&self, start: NodeId) -> usize {
        self.query_all(start, Node::is_element).len()
    }

    /// Concatenated text of all text nodes under `start`.
    pub fn text_content(&self, start: NodeId) -> String {
        self.walk_depth_first(start)
            .into_iter()
            .filter_map(|id| self.get(id))
            .filter(|n| n.kind == NodeKind::Text)
            .map(|n| n.content.as_str())
            .collect()
    }
}
