//! Inline projector (C5): for each annotation, drives a pair of position
//! pointers to locate start/end anchor chunks, then performs tree surgery to
//! wrap the covered fragment in a new element — splitting across element
//! boundaries into one wrapper per containing "layer" when necessary — and
//! notifies every other live overlay to recalculate its own anchors.

use std::collections::HashMap;

use rayon::prelude::*;
use uuid::Uuid;

use super::chunk::{full_chunk_index, Chunk, ChunkKind};
use super::pointer::{PositionPointer, RecalcInfo};
use super::tree::{NodeId, Tree};
use crate::annotation::Annotation;
use crate::errors::CatmaError;
use crate::log;
use crate::range::Range;
use crate::support::catma_uuid_string;
use crate::tagset::Tag;

/// Turns a tag or property name into a valid XML local name: ASCII
/// alphanumerics pass through unchanged, everything else goes through
/// `mapper`. A name starting with a digit is prefixed with `lead`, since XML
/// local names cannot start with a digit.
fn sanitize_name(raw: &str, lead: char, mapper: &dyn Fn(char) -> char) -> String {
    let mut out = String::new();
    if raw.starts_with(|c: char| c.is_ascii_digit()) {
        out.push(lead);
    }
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push(mapper(c));
        }
    }
    out
}

/// Configures how the projector names new elements/attributes and whether it
/// qualifies them with an XML namespace.
pub struct ProjectorConfig {
    pub namespace: Option<(String, String)>,
    mapper: Box<dyn Fn(char) -> char>,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            mapper: Box::new(|_| '_'),
        }
    }
}

impl ProjectorConfig {
    pub fn with_namespace(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            namespace: Some((prefix.into(), uri.into())),
            ..Self::default()
        }
    }

    pub fn with_mapper(mut self, mapper: impl Fn(char) -> char + 'static) -> Self {
        self.mapper = Box::new(mapper);
        self
    }

    fn qualify(&self, local: String) -> String {
        match &self.namespace {
            Some((prefix, _)) => format!("{prefix}:{local}"),
            None => local,
        }
    }

    pub fn element_name(&self, tag: &Tag) -> String {
        self.qualify(sanitize_name(&tag.name, 'T', self.mapper.as_ref()))
    }

    pub fn attribute_name(&self, name: &str) -> String {
        self.qualify(sanitize_name(name, 'P', self.mapper.as_ref()))
    }
}

/// An owned snapshot of the attributes one annotation contributes to every
/// element it wraps, computed once per annotation rather than re-derived for
/// every chunk/layer the annotation touches.
#[derive(Clone)]
struct AnnotationAttrs {
    annotation_id: String,
    tag_id: String,
    tag_path: String,
    properties: Vec<(String, String)>,
}

impl AnnotationAttrs {
    fn build(
        annotation: &Annotation,
        config: &ProjectorConfig,
        resolve_parent: &dyn Fn(Uuid) -> Option<Tag>,
    ) -> Self {
        let mut properties: Vec<(String, String)> = annotation
            .properties
            .iter()
            .map(|(name, values)| (config.attribute_name(name), values.join(",")))
            .collect();
        properties.sort();

        Self {
            annotation_id: catma_uuid_string(&annotation.uuid),
            tag_id: catma_uuid_string(&annotation.tag.uuid),
            tag_path: annotation.tag.path(resolve_parent),
            properties,
        }
    }

    fn apply_to(&self, tree: &mut Tree, node: NodeId, config: &ProjectorConfig) {
        let n = tree.node_mut(node);
        n.set_attribute(config.attribute_name("annotationId"), self.annotation_id.clone());
        n.set_attribute(config.attribute_name("tagId"), self.tag_id.clone());
        n.set_attribute(config.attribute_name("tagPath"), self.tag_path.clone());
        for (key, value) in &self.properties {
            n.set_attribute(key.clone(), value.clone());
        }
    }
}

/// One maximal merged range of one annotation, with the pair of position
/// pointers tracking where its start/end currently anchor in the tree.
struct Overlay {
    range: Range,
    element_name: String,
    attrs: AnnotationAttrs,
    start_ptr: PositionPointer,
    end_ptr: PositionPointer,
}

/// An XML tree with a live set of annotation overlays applied to it.
pub struct Document {
    pub tree: Tree,
    config: ProjectorConfig,
    overlays: Vec<Overlay>,
}

/// Checks every annotation's merged ranges against the document's flat-text
/// length in parallel, logging a warning for each one that extends past it.
/// Read-only and order-independent, so it runs ahead of (and never blocks)
/// the single-threaded tree surgery that follows; out-of-bounds ranges are
/// still applied best-effort by [`Document::apply_overlay`], this only adds
/// visibility into it.
fn warn_out_of_bounds_ranges(tree: &Tree, annotations: &[Annotation]) {
    let document_length = full_chunk_index(tree).last().map(|c| c.range.end).unwrap_or(0);

    let out_of_bounds: Vec<(Uuid, Range)> = annotations
        .par_iter()
        .flat_map_iter(|annotation| {
            annotation
                .merged_ranges()
                .into_iter()
                .filter(|range| range.end > document_length)
                .map(|range| (annotation.uuid, range))
                .collect::<Vec<_>>()
        })
        .collect();

    for (uuid, range) in out_of_bounds {
        log::warn(format!(
            "annotation {uuid} range {range} extends outside document length {document_length}, applying best-effort"
        ));
    }
}

impl Document {
    pub fn new(tree: Tree, config: ProjectorConfig) -> Self {
        Self {
            tree,
            config,
            overlays: Vec::new(),
        }
    }

    /// Builds an overlay for every maximal merged range of every annotation,
    /// then applies them in order. `resolve_parent` looks up a tag's parent
    /// by UUID, needed to render each annotation's full tag path.
    pub fn apply(
        &mut self,
        annotations: &[Annotation],
        resolve_parent: &dyn Fn(Uuid) -> Option<Tag>,
    ) -> Result<(), CatmaError> {
        if let Some((prefix, uri)) = self.config.namespace.clone() {
            self.tree.declare_namespace(&prefix, &uri);
        }

        warn_out_of_bounds_ranges(&self.tree, annotations);

        for annotation in annotations {
            let attrs = AnnotationAttrs::build(annotation, &self.config, resolve_parent);
            let element_name = self.config.element_name(&annotation.tag);

            for range in annotation.merged_ranges() {
                let mut start_ptr = PositionPointer::new(range.start);
                start_ptr.seek(&self.tree, self.tree.root());
                let mut end_ptr = PositionPointer::new(range.end);
                end_ptr.seek(&self.tree, self.tree.root());

                self.overlays.push(Overlay {
                    range,
                    element_name: element_name.clone(),
                    attrs: attrs.clone(),
                    start_ptr,
                    end_ptr,
                });
            }
        }

        for idx in 0..self.overlays.len() {
            self.apply_overlay(idx)?;
        }
        Ok(())
    }

    fn chunk_layer(&self, chunk: Chunk) -> NodeId {
        chunk.layer(&self.tree)
    }

    fn apply_overlay(&mut self, idx: usize) -> Result<(), CatmaError> {
        let range = self.overlays[idx].range;
        let (s, e) = match (
            self.overlays[idx].start_ptr.max_matching_chunk(),
            self.overlays[idx].end_ptr.min_matching_chunk(),
        ) {
            (Some(s), Some(e)) => (s, e),
            // the annotation's range falls outside the document; best
            // effort is to leave it unprojected rather than fail the batch.
            _ => return Ok(()),
        };

        if s == e {
            let info = self.apply_single_chunk(idx, s, range)?;
            self.broadcast_recalc(&info);
            return Ok(());
        }

        let layers = self.compute_layers(idx, s, e);

        for layer in layers {
            let (s, e) = match (
                self.overlays[idx].start_ptr.max_matching_chunk(),
                self.overlays[idx].end_ptr.min_matching_chunk(),
            ) {
                (Some(s), Some(e)) => (s, e),
                _ => continue,
            };

            let chunks = self.chunks_for_layer(idx, s, e, layer);
            let (layer_start_chunk, layer_end_chunk) = match (chunks.first(), chunks.last()) {
                (Some(first), Some(last)) => (*first, *last),
                _ => continue,
            };

            if layer_start_chunk == layer_end_chunk {
                let applied = if layer_start_chunk == s {
                    let r = Range::new(range.start, layer_start_chunk.range.end);
                    Some(self.apply_single_chunk(idx, layer_start_chunk, r)?)
                } else if layer_start_chunk == e {
                    let r = Range::new(layer_start_chunk.range.start, range.end);
                    Some(self.apply_single_chunk(idx, layer_start_chunk, r)?)
                } else if !layer_start_chunk.range.is_point() {
                    let r = layer_start_chunk.range;
                    Some(self.apply_single_chunk(idx, layer_start_chunk, r)?)
                } else {
                    None
                };
                if let Some(info) = applied {
                    self.broadcast_recalc(&info);
                }
            } else {
                let info = self.apply_layer_span(
                    idx,
                    layer,
                    &chunks,
                    layer_start_chunk,
                    layer_end_chunk,
                    s,
                    e,
                    range,
                )?;
                self.broadcast_recalc(&info);
            }
        }

        Ok(())
    }

    /// Case 1: the annotation lands entirely within one chunk. Splits the
    /// chunk into an unannotated prefix, the new wrapper element (holding
    /// the annotated slice as its text), and an unannotated tail.
    fn apply_single_chunk(
        &mut self,
        idx: usize,
        chunk: Chunk,
        merged_range: Range,
    ) -> Result<RecalcInfo, CatmaError> {
        let anno_text = chunk.text_in_range(&self.tree, merged_range);
        let prefix_text = chunk.text_up_to(&self.tree, merged_range.start);
        let anno_tail = chunk.text_from(&self.tree, merged_range.end);

        let owner = chunk.node.expect("non-newline chunk always has a node");
        let element_name = self.overlays[idx].element_name.clone();
        let attrs = self.overlays[idx].attrs.clone();

        let anno_el = self.tree.create_node(element_name);
        attrs.apply_to(&mut self.tree, anno_el, &self.config);

        match chunk.kind {
            ChunkKind::Tail => {
                let parent = self
                    .tree
                    .node(owner)
                    .parent
                    .expect("a tail chunk's node is never the document root");
                let index = self
                    .tree
                    .child_index(parent, owner)
                    .expect("chunk owner is attached under its recorded parent");
                self.tree.insert_child(parent, index + 1, anno_el);
                self.tree.node_mut(owner).tail = Some(prefix_text);
            }
            ChunkKind::Text => {
                self.tree.insert_child(owner, 0, anno_el);
                self.tree.node_mut(owner).text = Some(prefix_text);
            }
            ChunkKind::Newline => unreachable!("newline chunks are never annotation anchors"),
        }

        self.tree.node_mut(anno_el).text = Some(anno_text);

        let anno_text_chunk = Chunk {
            range: merged_range,
            node: Some(anno_el),
            kind: ChunkKind::Text,
        };
        let mut anno_tail_chunk = None;
        if !anno_tail.is_empty() {
            self.tree.node_mut(anno_el).tail = Some(anno_tail);
            anno_tail_chunk = Some(Chunk {
                range: Range::new(merged_range.end, chunk.range.end),
                node: Some(anno_el),
                kind: ChunkKind::Tail,
            });
        }

        let old_range = chunk.range;
        let new_range = Range::new(chunk.range.start, merged_range.start);

        Ok(RecalcInfo {
            start_chunk: Chunk {
                range: new_range,
                node: chunk.node,
                kind: chunk.kind,
            },
            old_start_range: old_range,
            end_chunk: None,
            old_end_range: None,
            anno_text_chunk,
            anno_tail_chunk,
        })
    }

    /// The layer sequence an annotation's range crosses, from `s`'s own
    /// layer through ancestors promoted by whichever layer is already known,
    /// ending at `e`'s layer.
    fn compute_layers(&self, idx: usize, s: Chunk, e: Chunk) -> Vec<NodeId> {
        let start_layer = self.chunk_layer(s);
        let end_layer = self.chunk_layer(e);

        let mut layers = vec![start_layer];
        let mut include = false;

        for chunk in self.overlays[idx].end_ptr.trail() {
            let chunk = *chunk;
            if chunk == s {
                include = true;
            } else if chunk == e {
                include = false;
            } else if include && !matches!(chunk.kind, ChunkKind::Newline) {
                let mut layer = self.chunk_layer(chunk);
                let mut parent_layer = layer;
                while self.tree.node(parent_layer).parent.is_some() {
                    if layers.contains(&parent_layer) {
                        layer = parent_layer;
                    }
                    if layer == end_layer || parent_layer == end_layer {
                        break;
                    }
                    parent_layer = self.tree.node(parent_layer).parent.unwrap();
                }
                if !layers.contains(&layer) {
                    layers.push(layer);
                }
            }
        }

        if !layers.contains(&end_layer) {
            layers.push(end_layer);
        }
        layers
    }

    /// The chunks assigned to `layer`, grouped the same way [`Self::compute_layers`]
    /// groups ancestors — but keyed into a map rather than an ordering list,
    /// since a layer can hold more than one chunk.
    fn chunks_for_layer(&self, idx: usize, s: Chunk, e: Chunk, layer: NodeId) -> Vec<Chunk> {
        let start_layer = self.chunk_layer(s);
        let end_layer = self.chunk_layer(e);

        let mut by_layer: HashMap<NodeId, Vec<Chunk>> = HashMap::new();
        by_layer.insert(start_layer, vec![s]);

        let mut include = false;
        for chunk in self.overlays[idx].end_ptr.trail() {
            let chunk = *chunk;
            if chunk == s {
                include = true;
            } else if chunk == e {
                include = false;
            } else if include && !matches!(chunk.kind, ChunkKind::Newline) {
                let mut current_layer = self.chunk_layer(chunk);
                let mut parent_layer = current_layer;
                while self.tree.node(parent_layer).parent.is_some() {
                    if by_layer.contains_key(&parent_layer) {
                        current_layer = parent_layer;
                    }
                    if current_layer == end_layer || current_layer == start_layer || parent_layer == end_layer {
                        break;
                    }
                    parent_layer = self.tree.node(parent_layer).parent.unwrap();
                }
                by_layer.entry(current_layer).or_default().push(chunk);
            }
        }

        by_layer.entry(end_layer).or_default().push(e);
        by_layer.remove(&layer).unwrap_or_default()
    }

    /// Case 2, one layer: the layer spans more than one chunk, so a new
    /// wrapper element is spliced in and the chunks strictly between the
    /// layer's first and last are re-parented under it.
    #[allow(clippy::too_many_arguments)]
    fn apply_layer_span(
        &mut self,
        idx: usize,
        layer: NodeId,
        chunks: &[Chunk],
        layer_start_chunk: Chunk,
        layer_end_chunk: Chunk,
        start_chunk: Chunk,
        end_chunk: Chunk,
        range: Range,
    ) -> Result<RecalcInfo, CatmaError> {
        let layer_start_range = if layer_start_chunk == start_chunk {
            Range::new(
                range.start.max(layer_start_chunk.range.start),
                layer_start_chunk.range.end,
            )
        } else {
            layer_start_chunk.range
        };

        let layer_end_cap = if layer_end_chunk == end_chunk {
            layer_end_chunk.range.end.min(range.end)
        } else {
            layer_end_chunk.range.end
        };

        let anno_text = layer_start_chunk.text_in_range(&self.tree, layer_start_range);
        let new_start_text_or_tail = layer_start_chunk.text_up_to(&self.tree, layer_start_range.start);
        let new_end_tail = layer_end_chunk.text_up_to(&self.tree, layer_end_cap);
        let anno_tail = layer_end_chunk.text_from(&self.tree, range.end);

        let element_name = self.overlays[idx].element_name.clone();
        let attrs = self.overlays[idx].attrs.clone();
        let anno_el = self.tree.create_node(element_name);
        attrs.apply_to(&mut self.tree, anno_el, &self.config);
        self.tree.node_mut(anno_el).text = Some(anno_text);
        self.tree.node_mut(anno_el).tail = Some(anno_tail.clone());

        let start_owner = layer_start_chunk
            .node
            .expect("layer start chunk always has a node");
        match layer_start_chunk.kind {
            ChunkKind::Tail => self.tree.node_mut(start_owner).tail = Some(new_start_text_or_tail),
            ChunkKind::Text => self.tree.node_mut(start_owner).text = Some(new_start_text_or_tail),
            ChunkKind::Newline => unreachable!("newline chunks are never annotation anchors"),
        }

        let end_owner = layer_end_chunk
            .node
            .expect("layer end chunk always has a node");
        self.tree.node_mut(end_owner).tail = Some(new_end_tail);

        if start_owner == layer {
            self.tree.insert_child(layer, 0, anno_el);
        } else {
            let index = self
                .tree
                .child_index(layer, start_owner)
                .expect("layer start chunk's node is attached under its layer");
            self.tree.insert_child(layer, index + 1, anno_el);
        }

        for chunk in chunks {
            if *chunk == layer_start_chunk || *chunk == layer_end_chunk {
                continue;
            }
            let Some(node) = chunk.node else { continue };
            if self.tree.node(node).parent == Some(layer) {
                self.tree.remove_child(layer, node)?;
                let at = self.tree.node(anno_el).children.len();
                self.tree.insert_child(anno_el, at, node);
            }
        }

        if self.tree.node(end_owner).parent == Some(layer) {
            self.tree.remove_child(layer, end_owner)?;
            let at = self.tree.node(anno_el).children.len();
            self.tree.insert_child(anno_el, at, end_owner);
        }

        let anno_text_chunk = Chunk {
            range: layer_start_range,
            node: Some(anno_el),
            kind: ChunkKind::Text,
        };
        let anno_tail_chunk = if !anno_tail.is_empty() {
            Some(Chunk {
                range: Range::new(range.end, layer_end_chunk.range.end),
                node: Some(anno_el),
                kind: ChunkKind::Tail,
            })
        } else {
            None
        };

        let old_start_range = layer_start_chunk.range;
        let new_start_range = Range::new(layer_start_chunk.range.start, layer_start_range.start);
        let old_end_range = layer_end_chunk.range;
        let new_end_range = Range::new(layer_end_chunk.range.start, layer_end_cap);

        Ok(RecalcInfo {
            start_chunk: Chunk {
                range: new_start_range,
                node: layer_start_chunk.node,
                kind: layer_start_chunk.kind,
            },
            old_start_range,
            end_chunk: Some(Chunk {
                range: new_end_range,
                node: layer_end_chunk.node,
                kind: layer_end_chunk.kind,
            }),
            old_end_range: Some(old_end_range),
            anno_text_chunk,
            anno_tail_chunk,
        })
    }

    fn broadcast_recalc(&mut self, info: &RecalcInfo) {
        for overlay in self.overlays.iter_mut() {
            overlay.start_ptr.recalculate(info);
            overlay.end_ptr.recalculate(info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagset::Tag;

    fn annotation(tag_name: &str, ranges: Vec<Range>) -> Annotation {
        let mut a = Annotation::new(Tag::new(tag_name, "jane"));
        a.ranges = ranges;
        a
    }

    #[test]
    fn single_chunk_annotation_wraps_text_slice() {
        let tree = Tree::parse("<r>hello</r>").unwrap();
        let mut doc = Document::new(tree, ProjectorConfig::default());
        let anno = annotation("X", vec![Range::new(1, 4)]);

        doc.apply(&[anno], &|_| None).unwrap();

        let xml = doc.tree.to_xml().unwrap();
        assert!(xml.contains("<r>h<X"), "xml was: {xml}");
        assert!(xml.contains(">ell</X>o</r>"), "xml was: {xml}");
    }

    #[test]
    fn boundary_crossing_annotation_wraps_per_layer() {
        // flat text: "hell\no\n" (see chunk.rs); an annotation over "ll\no"
        // (offsets 2..6) crosses from inside <b> out into r's own tail.
        let tree = Tree::parse("<r>he<b>ll</b>o</r>").unwrap();
        let mut doc = Document::new(tree, ProjectorConfig::default());
        let anno = annotation("X", vec![Range::new(2, 6)]);

        doc.apply(&[anno], &|_| None).unwrap();

        let xml = doc.tree.to_xml().unwrap();
        // the annotation must not straddle <b>'s closing tag: it should
        // produce a wrapper inside <b> and a sibling wrapper in <r>.
        assert!(xml.contains("<b>"), "xml was: {xml}");
        assert!(xml.matches("<X").count() >= 2, "xml was: {xml}");
    }

    #[test]
    fn two_overlapping_annotations_both_get_applied() {
        let tree = Tree::parse("<r>hello world</r>").unwrap();
        let mut doc = Document::new(tree, ProjectorConfig::default());
        let a = annotation("X", vec![Range::new(0, 5)]);
        let b = annotation("Y", vec![Range::new(3, 8)]);

        doc.apply(&[a, b], &|_| None).unwrap();

        let xml = doc.tree.to_xml().unwrap();
        assert!(xml.contains("<X"), "xml was: {xml}");
        assert!(xml.contains("<Y"), "xml was: {xml}");
    }

    #[test]
    fn out_of_bounds_annotation_is_left_unprojected_without_error() {
        let tree = Tree::parse("<r>hello</r>").unwrap();
        let mut doc = Document::new(tree, ProjectorConfig::default());
        let anno = annotation("X", vec![Range::new(100, 200)]);

        doc.apply(&[anno], &|_| None).unwrap();

        let xml = doc.tree.to_xml().unwrap();
        assert_eq!(xml, "<r>hello</r>");
    }
}
