//! Tree operations: insert, splice, remove, deep clone, walk.

use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{Node, NodeId};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// The syntax tree of one CHTL document, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
/// Nodes may also live detached from the root: definition bodies, insert
/// payloads and usage clones are kept that way until they are spliced in.
pub struct Ast {
    nodes: SlotMap<NodeId, Node>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    root: NodeId,
}

impl Ast {
    /// Create a tree holding only a document root.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::document());
        let mut children = SecondaryMap::new();
        children.insert(root, Vec::new());
        Self {
            nodes,
            children,
            parent: SecondaryMap::new(),
            root,
        }
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Insert a node with no parent.
    pub fn insert_detached(&mut self, node: Node) -> NodeId {
        let id = self.nodes.insert(node);
        self.children.insert(id, Vec::new());
        id
    }

    /// Insert a node as the last child of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.insert_detached(node);
        self.append(parent, id);
        id
    }

    /// Attach an existing node as the last child of `parent`, detaching it
    /// from any previous parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_at(parent, len, child);
    }

    /// Attach an existing node at position `index` among `parent`'s
    /// children. The index is clamped to the child count.
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(self.nodes.contains_key(parent), "parent does not exist");
        debug_assert!(self.nodes.contains_key(child), "child does not exist");
        self.detach(child);
        self.parent.insert(child, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            let index = index.min(siblings.len());
            siblings.insert(index, child);
        }
    }

    /// Replace `old` with `replacements` in its parent's child list.
    ///
    /// `old` and its subtree are removed from the arena. Does nothing when
    /// `old` has no parent.
    pub fn splice(&mut self, old: NodeId, replacements: &[NodeId]) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        let Some(position) = self.children(parent).iter().position(|&c| c == old) else {
            return;
        };
        self.remove(old);
        for (offset, &node) in replacements.iter().enumerate() {
            self.insert_at(parent, position + offset, node);
        }
    }

    /// Unlink a node from its parent, keeping its subtree in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }
    }

    /// Remove a node and all its descendants.
    ///
    /// Returns the removed node, or `None` if it didn't exist. The document
    /// root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        if !self.nodes.contains_key(id) || id == self.root {
            return None;
        }

        self.detach(id);

        // Collect all descendants (BFS) to remove them.
        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed = None;

        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            let node = self.nodes.remove(current);
            if current == id {
                removed = node;
            }
        }

        removed
    }

    /// Copy a subtree into fresh, detached nodes. Returns the new subtree
    /// root, or `None` if `id` doesn't exist.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id)?.clone();
        let copy = self.insert_detached(node);
        let kids = self.children(id).to_vec();
        for kid in kids {
            if let Some(kid_copy) = self.clone_subtree(kid) {
                self.append(copy, kid_copy);
            }
        }
        Some(copy)
    }

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no children
    /// or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Walk from `id` up to its outermost ancestor, collecting ancestor ids.
    ///
    /// The returned vec does **not** include `id` itself; it starts with the
    /// immediate parent.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Immutable access to a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable access to a node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes in the arena, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds only the document root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Whether the arena contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small test tree:
    /// ```text
    ///      root
    ///     /    \
    ///   div     p
    ///  /   \
    /// span  img
    /// ```
    fn build_tree() -> (Ast, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut ast = Ast::new();
        let root = ast.root();
        let div = ast.insert_child(root, Node::element("div").with_attribute("id", "a"));
        let p = ast.insert_child(root, Node::element("p"));
        let span = ast.insert_child(div, Node::element("span"));
        let img = ast.insert_child(div, Node::element("img"));
        (ast, root, div, p, span, img)
    }

    #[test]
    fn new_tree_has_document_root() {
        let ast = Ast::new();
        assert_eq!(ast.len(), 1);
        assert!(ast.is_empty());
        assert!(ast.children(ast.root()).is_empty());
    }

    #[test]
    fn insert_child_parent_relationship() {
        let (ast, root, div, _p, span, _img) = build_tree();
        assert_eq!(ast.parent(div), Some(root));
        assert_eq!(ast.parent(span), Some(div));
        assert_eq!(ast.parent(root), None);
    }

    #[test]
    fn children_list() {
        let (ast, root, div, p, span, img) = build_tree();
        assert_eq!(ast.children(root), &[div, p]);
        assert_eq!(ast.children(div), &[span, img]);
        assert!(ast.children(span).is_empty());
    }

    #[test]
    fn ancestors() {
        let (ast, root, div, _p, span, _img) = build_tree();
        assert_eq!(ast.ancestors(span), vec![div, root]);
        assert!(ast.ancestors(root).is_empty());
    }

    #[test]
    fn get_and_get_mut() {
        let (mut ast, _root, div, ..) = build_tree();
        assert_eq!(ast.get(div).unwrap().name, "div");
        ast.get_mut(div).unwrap().name = "section".to_string();
        assert_eq!(ast.get(div).unwrap().name, "section");
    }

    #[test]
    fn remove_subtree() {
        let (mut ast, root, div, p, span, img) = build_tree();
        let removed = ast.remove(div).unwrap();
        assert_eq!(removed.name, "div");
        assert!(!ast.contains(span));
        assert!(!ast.contains(img));
        assert_eq!(ast.children(root), &[p]);
        assert_eq!(ast.len(), 2);
    }

    #[test]
    fn root_cannot_be_removed() {
        let (mut ast, root, ..) = build_tree();
        assert!(ast.remove(root).is_none());
        assert!(ast.contains(root));
    }

    #[test]
    fn insert_at_position() {
        let (mut ast, root, div, p, ..) = build_tree();
        let h1 = ast.insert_detached(Node::element("h1"));
        ast.insert_at(root, 0, h1);
        assert_eq!(ast.children(root), &[h1, div, p]);
        let footer = ast.insert_detached(Node::element("footer"));
        ast.insert_at(root, 99, footer);
        assert_eq!(ast.children(root), &[h1, div, p, footer]);
    }

    #[test]
    fn append_moves_between_parents() {
        let (mut ast, _root, div, p, span, img) = build_tree();
        ast.append(p, span);
        assert_eq!(ast.parent(span), Some(p));
        assert_eq!(ast.children(div), &[img]);
    }

    #[test]
    fn splice_replaces_in_place() {
        let (mut ast, root, div, p, ..) = build_tree();
        let a = ast.insert_detached(Node::element("a"));
        let b = ast.insert_detached(Node::element("b"));
        ast.splice(div, &[a, b]);
        assert_eq!(ast.children(root), &[a, b, p]);
        assert!(!ast.contains(div));
    }

    #[test]
    fn clone_subtree_is_deep_and_detached() {
        let (mut ast, _root, div, _p, span, _img) = build_tree();
        let copy = ast.clone_subtree(div).unwrap();
        assert_ne!(copy, div);
        assert_eq!(ast.parent(copy), None);
        let kids = ast.children(copy).to_vec();
        assert_eq!(kids.len(), 2);
        assert_ne!(kids[0], span);
        assert_eq!(ast.get(kids[0]).unwrap().name, "span");

        // Mutating the copy leaves the original alone.
        ast.get_mut(copy).unwrap().attributes.clear();
        assert_eq!(ast.get(div).unwrap().attribute("id"), Some("a"));
    }

    #[test]
    fn walk_depth_first() {
        let (ast, root, div, p, span, img) = build_tree();
        assert_eq!(ast.walk_depth_first(root), vec![root, div, span, img, p]);
        assert_eq!(ast.walk_depth_first(div), vec![div, span, img]);
    }
}
