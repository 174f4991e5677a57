//! Text-chunk index (C3): a linear view of an XML tree as an ordered
//! sequence of text/tail/synthetic-newline chunks with `[start, end)`
//! offsets into the flat-text projection.
//!
//! The walking rule itself lives on [`super::pointer::PositionPointer`],
//! since the position pointer is the only consumer that needs to stop
//! partway through an element's children — a full, unlocked index is just a
//! pointer targeting an offset past the end of the document (see
//! [`full_chunk_index`]).

use super::tree::{NodeId, Tree};
use crate::range::Range;

/// What kind of flat-text position a [`Chunk`] occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// An element's own `text` content.
    Text,
    /// An element's `tail` content (text trailing its closing tag).
    Tail,
    /// The synthetic single-character `"\n"` emitted between an element's
    /// body and whatever follows it.
    Newline,
}

/// A contiguous slice of the flat text corresponding to exactly one XML
/// `text`, `tail`, or synthetic-newline position.
///
/// Equality (and therefore lookup in a pointer's trail) is by `(range,
/// kind)` only, not by owning node — matching the source's
/// `XMLSourceDocumentChunk.__eq__`, which lets a chunk be found again after
/// its node has been moved elsewhere in the tree.
#[derive(Debug, Clone, Copy)]
pub struct Chunk {
    pub range: Range,
    pub node: Option<NodeId>,
    pub kind: ChunkKind,
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.range == other.range && self.kind == other.kind
    }
}
impl Eq for Chunk {}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

impl Chunk {
    fn node_text<'t>(&self, tree: &'t Tree) -> &'t str {
        match self.kind {
            ChunkKind::Newline => "\n",
            ChunkKind::Text => tree
                .node(self.node.expect("text chunk always has a node"))
                .text
                .as_deref()
                .unwrap_or(""),
            ChunkKind::Tail => tree
                .node(self.node.expect("tail chunk always has a node"))
                .tail
                .as_deref()
                .unwrap_or(""),
        }
    }

    /// The chunk's full text.
    pub fn text(&self, tree: &Tree) -> String {
        if matches!(self.kind, ChunkKind::Newline) {
            return "\n".to_owned();
        }
        self.node_text(tree).to_owned()
    }

    /// The chunk's text within `range` (offsets are absolute flat-text
    /// offsets, not chunk-relative).
    pub fn text_in_range(&self, tree: &Tree, range: Range) -> String {
        if matches!(self.kind, ChunkKind::Newline) {
            return "\n".to_owned();
        }
        let start = range.start - self.range.start;
        let end = range.end - self.range.start;
        char_slice(self.node_text(tree), start, end)
    }

    /// The chunk's text from absolute offset `pos` to the chunk's end.
    pub fn text_from(&self, tree: &Tree, pos: usize) -> String {
        if matches!(self.kind, ChunkKind::Newline) {
            return if pos > self.range.start { "\n".to_owned() } else { String::new() };
        }
        let text = self.node_text(tree);
        let start = pos.saturating_sub(self.range.start);
        char_slice(text, start, text.chars().count())
    }

    /// The chunk's text from its start up to absolute offset `pos`.
    pub fn text_up_to(&self, tree: &Tree, pos: usize) -> String {
        if matches!(self.kind, ChunkKind::Newline) {
            return if pos > self.range.start { "\n".to_owned() } else { String::new() };
        }
        let end = pos.saturating_sub(self.range.start);
        char_slice(self.node_text(tree), 0, end)
    }

    /// The chunk's layer: its owning element for a `text` chunk, or that
    /// element's parent for a `tail` chunk.
    pub fn layer(&self, tree: &Tree) -> NodeId {
        match self.kind {
            ChunkKind::Tail => tree
                .node(self.node.expect("tail chunk always has a node"))
                .parent
                .expect("a tail chunk's node is never the document root"),
            _ => self.node.expect("non-newline chunk always has a node"),
        }
    }
}

/// True if `text` has at least one non-whitespace character.
pub(super) fn has_content(text: &Option<String>) -> bool {
    text.as_deref()
        .map(|t| t.chars().any(|c| !c.is_whitespace()))
        .unwrap_or(false)
}

/// Builds the full, never-locking chunk index of `tree` by walking it with
/// a pointer targeting an offset past any possible document length. Used by
/// tests exercising the chunking round-trip property and by callers that
/// want the whole index rather than an anchor search.
pub fn full_chunk_index(tree: &Tree) -> Vec<Chunk> {
    let mut pointer = super::pointer::PositionPointer::new(usize::MAX);
    pointer.seek(tree, tree.root());
    pointer.trail().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmldoc::tree::Tree;

    #[test]
    fn chunk_index_partitions_flat_text() {
        // <r>he<b>ll</b>o</r>: r.text, then b's own subtree (b.text, b's
        // newline, b.tail), then r's newline once all children are done.
        let tree = Tree::parse("<r>he<b>ll</b>o</r>").unwrap();
        let chunks = full_chunk_index(&tree);

        let mut cursor = 0;
        let mut flat = String::new();
        for chunk in &chunks {
            assert_eq!(chunk.range.start, cursor);
            flat.push_str(&chunk.text(&tree));
            cursor = chunk.range.end;
        }
        assert_eq!(flat, "hell\no\n");
    }

    #[test]
    fn leaf_element_with_text_still_gets_trailing_synthetic_newline() {
        // Emitted whenever the element had text or children, with no
        // exception for the document root — so even a single leaf element's
        // chunk index ends with a newline chunk.
        let tree = Tree::parse("<r>hello</r>").unwrap();
        let chunks = full_chunk_index(&tree);
        assert_eq!(chunks.len(), 2);
        assert!(matches!(chunks[0].kind, ChunkKind::Text));
        assert!(matches!(chunks[1].kind, ChunkKind::Newline));
    }
}
