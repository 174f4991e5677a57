//! Position pointer (C4): a forward-only walk over the text-chunk index
//! that locks once it first passes a target character offset, retaining its
//! trail of visited chunks so a caller can later ask for the best chunk to
//! anchor an annotation edge at that offset.

use super::chunk::{has_content, Chunk, ChunkKind};
use super::tree::{NodeId, Tree};
use crate::range::Range;

/// What changed in a pointer's trail after one tree mutation, broadcast to
/// every live pointer so each can bring its own trail up to date without
/// re-walking the tree from scratch.
#[derive(Debug, Clone)]
pub struct RecalcInfo {
    pub start_chunk: Chunk,
    pub old_start_range: Range,
    pub end_chunk: Option<Chunk>,
    pub old_end_range: Option<Range>,
    pub anno_text_chunk: Chunk,
    pub anno_tail_chunk: Option<Chunk>,
}

#[derive(Debug, Clone)]
pub struct PositionPointer {
    target: usize,
    pos: usize,
    trail: Vec<Chunk>,
    locked: bool,
}

impl PositionPointer {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            pos: 0,
            trail: Vec::new(),
            locked: false,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn trail(&self) -> &[Chunk] {
        &self.trail
    }

    fn push(&mut self, range: Range, node: Option<NodeId>, kind: ChunkKind) {
        if self.locked {
            return;
        }
        self.pos = range.end;
        self.trail.push(Chunk { range, node, kind });
        if self.pos > self.target {
            self.locked = true;
        }
    }

    fn advance_text(&mut self, tree: &Tree, node: NodeId, kind: ChunkKind) {
        if self.locked {
            return;
        }
        let content = match kind {
            ChunkKind::Text => tree.node(node).text.as_deref(),
            ChunkKind::Tail => tree.node(node).tail.as_deref(),
            ChunkKind::Newline => unreachable!("newline chunks go through advance_newline"),
        };
        let len = content.map(|t| t.chars().count()).unwrap_or(0);
        let range = Range::new(self.pos, self.pos + len);
        self.push(range, Some(node), kind);
    }

    fn advance_newline(&mut self) {
        if self.locked {
            return;
        }
        let range = Range::new(self.pos, self.pos + 1);
        self.push(range, None, ChunkKind::Newline);
    }

    /// Walks `node` and its subtree per the chunking rule, appending to the
    /// trail and stopping as soon as the pointer locks.
    pub fn seek(&mut self, tree: &Tree, node: NodeId) {
        if self.locked {
            return;
        }

        let has_text = has_content(&tree.node(node).text);
        if has_text {
            self.advance_text(tree, node, ChunkKind::Text);
            if self.locked {
                return;
            }
        }

        let child_count = tree.node(node).children.len();
        for i in 0..child_count {
            let child = tree.node(node).children[i];
            self.seek(tree, child);
            if self.locked {
                return;
            }
        }

        if has_text || child_count > 0 {
            self.advance_newline();
            if self.locked {
                return;
            }
        }

        if has_content(&tree.node(node).tail) {
            self.advance_text(tree, node, ChunkKind::Tail);
        }
    }

    /// The chunk that is as close as possible to the target, approached from
    /// the left. Used to anchor the *start* of an annotation range.
    pub fn max_matching_chunk(&self) -> Option<Chunk> {
        let mut passed_target = false;
        for chunk in self.trail.iter().rev() {
            let in_range = chunk.range.contains_inclusive_edge(self.target);
            if !matches!(chunk.kind, ChunkKind::Newline) && (in_range || passed_target) {
                return Some(*chunk);
            }
            if in_range {
                passed_target = true;
            }
        }
        None
    }

    /// The chunk that is as close as possible to the target, approached from
    /// the right. Used to anchor the *end* of an annotation range.
    ///
    /// Newline chunks are skipped both as the containment-failure trigger
    /// and as the returned candidate: they carry no node to anchor surgery
    /// on, so the nearest non-newline chunk on either side stands in.
    pub fn min_matching_chunk(&self) -> Option<Chunk> {
        let mut last: Option<Chunk> = None;
        let mut last_non_newline: Option<Chunk> = None;
        for chunk in self.trail.iter().rev() {
            if !matches!(chunk.kind, ChunkKind::Newline) && !chunk.range.contains_inclusive_edge(self.target) {
                if let Some(candidate) = last_non_newline {
                    return Some(candidate);
                }
            }
            if !matches!(chunk.kind, ChunkKind::Newline) {
                last_non_newline = Some(*chunk);
            }
            last = Some(*chunk);
        }
        last
    }

    /// Brings the trail up to date after a tree mutation elsewhere in the
    /// document (possibly caused by this very pointer's own overlay).
    pub fn recalculate(&mut self, info: &RecalcInfo) {
        let start_idx = self
            .trail
            .iter()
            .position(|c| c.range == info.old_start_range);

        let mut idx: Option<usize> = None;
        if let Some(i) = start_idx {
            self.trail[i].range = info.start_chunk.range;
            idx = Some(i);
        } else if let Some(i) = self.trail.iter().position(|c| *c == info.start_chunk) {
            idx = Some(i);
        }

        if let Some(mut i) = idx {
            if info.anno_text_chunk.range.start <= self.target {
                self.trail.insert(i + 1, info.anno_text_chunk);
                i += 1;
            }
            if info.old_end_range.is_none() {
                if let Some(tail_chunk) = info.anno_tail_chunk {
                    if tail_chunk.range.start <= self.target {
                        self.trail.insert(i + 1, tail_chunk);
                    }
                }
            }
        }

        // Located only now, after the start-side splice above: any earlier
        // index would be stale once that insert has shifted the trail.
        let end_idx = info
            .old_end_range
            .and_then(|old| self.trail.iter().position(|c| c.range == old));

        if let Some(i) = end_idx {
            self.trail[i].range = info
                .end_chunk
                .expect("old_end_range implies end_chunk is set")
                .range;
            if let Some(tail_chunk) = info.anno_tail_chunk {
                if tail_chunk.range.start <= self.target {
                    self.trail.insert(i + 1, tail_chunk);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmldoc::tree::Tree;

    #[test]
    fn seek_locks_once_target_is_passed() {
        let tree = Tree::parse("<r>he<b>ll</b>o</r>").unwrap();
        let mut pointer = PositionPointer::new(3);
        pointer.seek(&tree, tree.root());
        assert!(pointer.is_locked());
        // flat text is "hell\no\n"; offset 3 falls inside b's text chunk [2,4)
        let trail = pointer.trail();
        assert_eq!(trail.last().unwrap().range, Range::new(2, 4));
    }

    #[test]
    fn max_matching_chunk_prefers_chunk_at_or_before_target() {
        let tree = Tree::parse("<r>he<b>ll</b>o</r>").unwrap();
        let mut pointer = PositionPointer::new(2);
        pointer.seek(&tree, tree.root());
        let chunk = pointer.max_matching_chunk().unwrap();
        // target 2 sits on the r.text/b.text boundary; inclusive-edge
        // containment makes both candidates match, newest wins.
        assert_eq!(chunk.range, Range::new(2, 4));
    }

    #[test]
    fn min_matching_chunk_falls_back_to_oldest_chunk() {
        let tree = Tree::parse("<r>hello</r>").unwrap();
        let mut pointer = PositionPointer::new(0);
        pointer.seek(&tree, tree.root());
        let chunk = pointer.min_matching_chunk().unwrap();
        assert_eq!(chunk.range, Range::new(0, 5));
    }

    #[test]
    fn recalculate_updates_start_range_and_splices_annotation_text_chunk() {
        let tree = Tree::parse("<r>hello</r>").unwrap();
        let mut pointer = PositionPointer::new(4);
        pointer.seek(&tree, tree.root());

        let old_start_range = Range::new(0, 5);
        let start_chunk = pointer.trail()[0];
        let new_start_chunk = Chunk {
            range: Range::new(0, 1),
            ..start_chunk
        };
        let anno_text_chunk = Chunk {
            range: Range::new(1, 4),
            node: start_chunk.node,
            kind: ChunkKind::Text,
        };

        let info = RecalcInfo {
            start_chunk: new_start_chunk,
            old_start_range,
            end_chunk: None,
            old_end_range: None,
            anno_text_chunk,
            anno_tail_chunk: None,
        };
        pointer.recalculate(&info);

        assert_eq!(pointer.trail()[0].range, Range::new(0, 1));
        assert_eq!(pointer.trail()[1].range, Range::new(1, 4));
    }
}
