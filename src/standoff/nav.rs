//! Small fixed-skeleton navigation helpers over [`Tree`], standing in for
//! the namespace-aware XPath lookups (`find`/`findall`) the original tooling
//! used — this codec only ever walks the one known CATMA TEI shape, so a
//! handful of by-local-name child/descendant lookups cover every query it
//! needs.

use crate::xmldoc::{NodeId, Tree};

/// The first direct child of `parent` named `name`.
pub(super) fn child(tree: &Tree, parent: NodeId, name: &str) -> Option<NodeId> {
    tree.node(parent)
        .children
        .iter()
        .copied()
        .find(|&id| tree.node(id).name == name)
}

/// Every direct child of `parent` named `name`, in document order.
pub(super) fn children(tree: &Tree, parent: NodeId, name: &str) -> Vec<NodeId> {
    tree.node(parent)
        .children
        .iter()
        .copied()
        .filter(|&id| tree.node(id).name == name)
        .collect()
}

/// Every descendant of `root` (root included) named `name`, in document
/// order.
pub(super) fn descendants(tree: &Tree, root: NodeId, name: &str) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_descendants(tree, root, name, &mut out);
    out
}

fn collect_descendants(tree: &Tree, node: NodeId, name: &str, out: &mut Vec<NodeId>) {
    if tree.node(node).name == name {
        out.push(node);
    }
    for &child_id in &tree.node(node).children {
        collect_descendants(tree, child_id, name, out);
    }
}

/// Finds `root/a/b/c` by walking direct-child names in sequence.
pub(super) fn path(tree: &Tree, root: NodeId, segments: &[&str]) -> Option<NodeId> {
    let mut current = root;
    for segment in segments {
        current = child(tree, current, segment)?;
    }
    Some(current)
}

/// The `xml:id` attribute, stripped down to whatever the rest of the codec
/// needs to turn back into a CATMA uuid.
pub(super) fn xml_id(tree: &Tree, node: NodeId) -> Option<&str> {
    tree.node(node).attribute("xml:id")
}
