#![forbid(unsafe_code)]

//! NodeSet type for document-subset canonicalization.
//!
//! A `NodeSet` holds the nodes of one parsed document, identified by their
//! `NodeId`. The signing engine needs three shapes: the whole document
//! without comments (same-document `URI=""`), a single subtree (bare-name
//! `#id` references), and the whole document minus the signature subtree
//! (the enveloped-signature transform).

use roxmltree::{Document, Node, NodeId, NodeType};
use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node set containing all nodes in the document.
    pub fn all(doc: &Document<'_>) -> Self {
        Self::tree_with_comments(doc.root())
    }

    /// Create a node set containing all nodes except comments.
    /// `URI=""` selects the document without comments.
    pub fn all_without_comments(doc: &Document<'_>) -> Self {
        Self::tree_without_comments(doc.root())
    }

    /// Create a node set for a subtree rooted at the given node (without comments).
    pub fn tree_without_comments(root: Node<'_, '_>) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(root, &mut nodes, false);
        Self { nodes }
    }

    /// Create a node set for a subtree rooted at the given node (with comments).
    pub fn tree_with_comments(root: Node<'_, '_>) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(root, &mut nodes, true);
        Self { nodes }
    }

    /// The enveloped-signature view: the document without comments, minus
    /// the subtree of `signature`.
    pub fn enveloped(doc: &Document<'_>, signature: Node<'_, '_>) -> Self {
        let mut set = Self::all_without_comments(doc);
        set.remove_subtree(signature);
        set
    }

    /// Check if a node is in this set.
    pub fn contains(&self, node: &Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    /// Remove a node and all its descendants from this set.
    pub fn remove_subtree(&mut self, node: Node<'_, '_>) {
        for n in node.descendants() {
            self.nodes.remove(&n.id());
        }
    }

    /// Check if this set is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the set.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn collect_subtree(node: Node<'_, '_>, set: &mut HashSet<NodeId>, include_comments: bool) {
    if !include_comments && node.node_type() == NodeType::Comment {
        return;
    }
    set.insert(node.id());
    for child in node.children() {
        collect_subtree(child, set, include_comments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = "<r><!--c--><a><b/></a><s><t/></s></r>";

    #[test]
    fn all_without_comments_skips_comments() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let all = NodeSet::all(&doc);
        let no_comments = NodeSet::all_without_comments(&doc);
        assert_eq!(all.len(), no_comments.len() + 1);
        let comment = doc.descendants().find(|n| n.is_comment()).unwrap();
        assert!(all.contains(&comment));
        assert!(!no_comments.contains(&comment));
    }

    #[test]
    fn enveloped_removes_signature_subtree() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let sig = doc.descendants().find(|n| n.has_tag_name("s")).unwrap();
        let set = NodeSet::enveloped(&doc, sig);
        assert!(!set.contains(&sig));
        assert!(!set.contains(&sig.first_child().unwrap()));
        assert!(set.contains(&doc.root_element()));
        let a = doc.descendants().find(|n| n.has_tag_name("a")).unwrap();
        assert!(set.contains(&a));
    }

    #[test]
    fn subtree_sets() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let a = doc.descendants().find(|n| n.has_tag_name("a")).unwrap();
        let tree = NodeSet::tree_without_comments(a);
        assert_eq!(tree.len(), 2);
        assert!(!tree.contains(&doc.root_element()));
        let mut rest = NodeSet::all(&doc);
        rest.remove_subtree(a);
        assert!(!rest.contains(&a));
        assert!(rest.contains(&doc.root_element()));
        assert!(!rest.is_empty());
    }
}
