//! Arena-backed, mutable XML tree.
//!
//! `serde`-derived structs (the style `support.rs`'s callers use for the
//! stand-off format itself) give every element a fixed shape but no stable
//! identity once parsed — there is nothing to hold onto while splicing a new
//! element into the middle of a sibling list. This arena trades that
//! convenience for node identity: every element is a [`Node`] addressed by a
//! [`NodeId`], parent links are stored on the node itself and kept current as
//! nodes are inserted or moved, mirroring the source's separately maintained
//! parent map but without a second structure to keep in sync.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::CatmaError;

/// Index into a [`Tree`]'s arena. Stable for the lifetime of the tree; never
/// reused after a node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One XML element. Character data is kept ElementTree-style: `text` is the
/// content immediately inside the element before its first child, `tail` is
/// the content immediately after the element's closing tag, inside the
/// parent.
#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<NodeId>,
    pub text: Option<String>,
    pub tail: Option<String>,
}

impl Node {
    fn new(name: impl Into<String>) -> Self {
        Self {
            parent: None,
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
            tail: None,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value.into(),
            None => self.attributes.push((key, value.into())),
        }
    }
}

/// An arena of [`Node`]s rooted at a single element.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Parses an XML document from `xml` into a tree. Only element, text and
    /// CDATA content is retained; processing instructions, comments and the
    /// XML declaration are dropped, matching what the projector needs to
    /// round-trip the flat-text projection.
    pub fn parse(xml: &str) -> Result<Self, CatmaError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    let id = push_element(&mut nodes, &start)?;
                    attach(&mut nodes, &mut stack, root, id);
                    if root.is_none() {
                        root = Some(id);
                    }
                    stack.push(id);
                }
                Event::Empty(start) => {
                    let id = push_element(&mut nodes, &start)?;
                    attach(&mut nodes, &mut stack, root, id);
                    if root.is_none() {
                        root = Some(id);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(text) => {
                    let decoded = text.unescape().unwrap_or_default().into_owned();
                    if decoded.is_empty() {
                        continue;
                    }
                    append_char_data(&mut nodes, &stack, decoded);
                }
                Event::CData(cdata) => {
                    let decoded = String::from_utf8(cdata.into_inner().into_owned()).unwrap_or_default();
                    if decoded.is_empty() {
                        continue;
                    }
                    append_char_data(&mut nodes, &stack, decoded);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let root = root.ok_or(CatmaError::NoData)?;
        Ok(Self { nodes, root })
    }

    /// Serialises the tree back to an XML string.
    pub fn to_xml(&self) -> Result<String, CatmaError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_node(&mut writer, self.root)?;
        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes).map_err(|e| e.utf8_error())?)
    }

    fn write_node(&self, writer: &mut Writer<Cursor<Vec<u8>>>, id: NodeId) -> Result<(), CatmaError> {
        let node = self.node(id);
        let mut start = BytesStart::new(node.name.clone());
        for (key, value) in &node.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if node.children.is_empty() && node.text.is_none() {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            if let Some(text) = &node.text {
                writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            for child in &node.children {
                self.write_node(writer, *child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(node.name.clone())))?;
        }

        if let Some(tail) = &node.tail {
            writer.write_event(Event::Text(BytesText::new(tail)))?;
        }

        Ok(())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Creates a detached node (no parent, no children yet); the caller
    /// attaches it with [`Tree::insert_child`].
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        self.nodes.push(Node::new(name));
        NodeId(self.nodes.len() - 1)
    }

    /// Inserts `child` into `parent`'s children at `index`, updating both
    /// nodes' links. `child` must currently be detached (no parent) — callers
    /// moving a node must call [`Tree::remove_child`] first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Detaches `child` from its current parent, returning the index it held.
    /// Returns a [`CatmaError::StructuralInvariantViolated`] if `child`'s
    /// recorded parent no longer lists it, which signals the tree has
    /// drifted from the chunk/pointer bookkeeping that assumed it.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<usize, CatmaError> {
        let children = &mut self.nodes[parent.0].children;
        let position = children
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| {
                CatmaError::StructuralInvariantViolated(format!(
                    "node {:?} is not a child of its recorded parent {:?}",
                    child, parent
                ))
            })?;
        children.remove(position);
        self.nodes[child.0].parent = None;
        Ok(position)
    }

    /// Index of `child` within `parent`'s children, if still attached there.
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent).children.iter().position(|c| *c == child)
    }

    /// Declares an XML namespace on the root element as `xmlns:prefix="uri"`.
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        let root = self.root;
        self.node_mut(root)
            .set_attribute(format!("xmlns:{prefix}"), uri);
    }
}

fn push_element(nodes: &mut Vec<Node>, start: &BytesStart) -> Result<NodeId, CatmaError> {
    let name = String::from_utf8(start.name().as_ref().to_vec()).map_err(|e| e.utf8_error())?;
    let mut node = Node::new(name);
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8(attr.key.as_ref().to_vec()).map_err(|e| e.utf8_error())?;
        let value = attr.unescape_value().unwrap_or_default().into_owned();
        node.attributes.push((key, value));
    }
    nodes.push(node);
    Ok(NodeId(nodes.len() - 1))
}

fn attach(nodes: &mut [Node], stack: &mut [NodeId], root: Option<NodeId>, id: NodeId) {
    if let Some(&parent) = stack.last() {
        nodes[id.0].parent = Some(parent);
        nodes[parent.0].children.push(id);
    } else {
        let _ = root;
    }
}

fn append_char_data(nodes: &mut [Node], stack: &[NodeId], text: String) {
    match stack.last() {
        // Character data before any child of the current element is `text`;
        // appended in case a CDATA section follows plain text.
        Some(&current) if nodes[current.0].children.is_empty() => {
            let existing = nodes[current.0].text.get_or_insert_with(String::new);
            existing.push_str(&text);
        }
        // Otherwise it is the tail of the most recently closed child.
        Some(&current) => {
            let last_child = *nodes[current.0].children.last().expect("checked non-empty above");
            let existing = nodes[last_child.0].tail.get_or_insert_with(String::new);
            existing.push_str(&text);
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip_preserves_text_and_tail() {
        let xml = "<r>he<b>ll</b>o</r>";
        let tree = Tree::parse(xml).unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.text.as_deref(), Some("he"));
        assert_eq!(root.children.len(), 1);

        let b = tree.node(root.children[0]);
        assert_eq!(b.name, "b");
        assert_eq!(b.text.as_deref(), Some("ll"));
        assert_eq!(b.tail.as_deref(), Some("o"));
    }

    #[test]
    fn insert_and_remove_child_updates_parent_link() {
        let mut tree = Tree::parse("<r>hello</r>").unwrap();
        let root = tree.root();
        let new_node = tree.create_node("x");
        tree.insert_child(root, 0, new_node);
        assert_eq!(tree.node(new_node).parent, Some(root));
        assert_eq!(tree.node(root).children, vec![new_node]);

        let index = tree.remove_child(root, new_node).unwrap();
        assert_eq!(index, 0);
        assert_eq!(tree.node(new_node).parent, None);
        assert!(tree.node(root).children.is_empty());
    }

    #[test]
    fn remove_child_not_attached_is_structural_violation() {
        let mut tree = Tree::parse("<r>hello</r>").unwrap();
        let root = tree.root();
        let stray = tree.create_node("x");
        assert!(matches!(
            tree.remove_child(root, stray),
            Err(CatmaError::StructuralInvariantViolated(_))
        ));
    }

    #[test]
    fn to_xml_roundtrips_simple_document() {
        let xml = "<r>he<b>ll</b>o</r>";
        let tree = Tree::parse(xml).unwrap();
        assert_eq!(tree.to_xml().unwrap(), xml);
    }
}
