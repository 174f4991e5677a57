//! Free-standing operations over stand-off collections: merging two
//! collections into one, and inlining `<ptr>` anchors as literal text for a
//! human-readable rendering of a collection.

use std::collections::HashSet;
use std::path::Path;

use super::nav;
use super::{Collection, StandoffReader, StandoffWriter};
use crate::errors::CatmaError;
use crate::support::extract_range;
use crate::xmldoc::{NodeId, Tree};

/// Merges two stand-off collections into one, written to `output`.
///
/// Tagsets are unioned by uuid (a tagset present in both keeps the copy from
/// `path1`); annotations are concatenated. `text_length` and `document_id`
/// are always taken from `path1` — both collections must annotate the same
/// source document for the merge to be meaningful. `title`/`author` default
/// to `path1`'s when not given.
pub fn merge_collections(
    path1: &Path,
    path2: &Path,
    output: &Path,
    title: Option<&str>,
    author: Option<&str>,
) -> Result<(), CatmaError> {
    let collection1 = StandoffReader::read(path1)?;
    let collection2 = StandoffReader::read(path2)?;

    let mut tagsets = collection1.tagsets.clone();
    let known: HashSet<_> = tagsets.iter().map(|tagset| tagset.uuid).collect();
    for tagset in collection2.tagsets {
        if !known.contains(&tagset.uuid) {
            tagsets.push(tagset);
        }
    }

    let mut annotations = collection1.annotations.clone();
    annotations.extend(collection2.annotations);

    let title = title.map(str::to_owned).unwrap_or_else(|| collection1.title.clone());
    let author = author.map(str::to_owned).unwrap_or_else(|| collection1.author.clone());
    let text_length = collection1.text_length.ok_or(CatmaError::AnchorsMissing)?;
    let document_id = collection1
        .document_id
        .clone()
        .ok_or(CatmaError::AnchorsMissing)?;

    let mut merged = Collection::new(title, author, text_length, document_id);
    merged.publisher = collection1.publisher.clone();
    merged.description = collection1.description.clone();
    merged.tagsets = tagsets;
    merged.annotations = annotations;

    StandoffWriter::write(&merged, output)
}

/// Replaces every `<ptr>` anchor under a collection's `<ab>` body with the
/// literal text it points to in `text_path`, then removes the now-redundant
/// `<ptr>` elements. The collection must belong to the given source text.
pub fn inline_ptr_refs_as_text(
    collection_path: &Path,
    text_path: &Path,
    output_path: &Path,
) -> Result<(), CatmaError> {
    let text = std::fs::read_to_string(text_path)?;
    let xml = std::fs::read_to_string(collection_path)?;
    let mut tree = Tree::parse(&xml)?;
    let root = tree.root();

    let ab = nav::path(&tree, root, &["text", "body", "ab"]).ok_or(CatmaError::AnchorsMissing)?;

    let top_level: Vec<NodeId> = tree.node(ab).children.clone();
    let mut predecessor: Option<NodeId> = None;

    for child_id in top_level {
        let name = tree.node(child_id).name.clone();
        match name.as_str() {
            "ptr" => {
                let slice = text_slice_for_ptr(&tree, &text, child_id)?;
                match predecessor {
                    None => tree.node_mut(ab).text = Some(slice),
                    Some(pred) => tree.node_mut(pred).tail = Some(slice),
                }
            }
            "seg" => {
                if let Some(&ptr_id) = tree.node(child_id).children.first() {
                    let slice = text_slice_for_ptr(&tree, &text, ptr_id)?;
                    tree.node_mut(child_id).text = Some(slice);
                }
                predecessor = Some(child_id);
            }
            _ => {}
        }
    }

    let mut ptr_parents = Vec::new();
    collect_ptr_parents(&tree, ab, &mut ptr_parents);
    for (parent, ptr) in ptr_parents {
        tree.remove_child(parent, ptr)?;
    }

    let body = tree.to_xml()?;
    std::fs::write(output_path, format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))?;
    Ok(())
}

fn text_slice_for_ptr(tree: &Tree, text: &str, ptr_id: NodeId) -> Result<String, CatmaError> {
    let target = tree
        .node(ptr_id)
        .attribute("target")
        .ok_or_else(|| CatmaError::PointerTargetInvalid("ptr missing 'target' attribute".to_owned()))?;
    let range = extract_range(target)?;
    Ok(text.chars().skip(range.start).take(range.end - range.start).collect())
}

fn collect_ptr_parents(tree: &Tree, node: NodeId, out: &mut Vec<(NodeId, NodeId)>) {
    for &child in &tree.node(node).children {
        if tree.node(child).name == "ptr" {
            out.push((node, child));
        } else {
            collect_ptr_parents(tree, child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagset::Tag;
    use crate::Annotation;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn sample_collection_xml() -> String {
        let tag = Tag::new("person", "jane");
        let mut tagset = crate::tagset::Tagset::new("people");
        tagset.add_tag(tag.clone());

        let mut anno = Annotation::new(tag);
        anno.ranges = vec![crate::range::Range::new(6, 11)];

        let mut collection = Collection::new("t", "jane", 11, "DOC");
        collection.tagsets = vec![tagset];
        collection.annotations = vec![anno];
        StandoffWriter::write_to_string(&collection).unwrap()
    }

    #[test]
    fn inlining_replaces_ptr_targets_with_literal_text() {
        let collection_path = write_temp("catma-rs-inline-collection.xml", &sample_collection_xml());
        let text_path = write_temp("catma-rs-inline-text.txt", "hello world");
        let output_path = std::env::temp_dir().join("catma-rs-inline-output.xml");

        inline_ptr_refs_as_text(&collection_path, &text_path, &output_path).unwrap();

        let output = std::fs::read_to_string(&output_path).unwrap();
        assert!(!output.contains("<ptr"));
        assert!(output.contains("world"));

        let _ = std::fs::remove_file(&collection_path);
        let _ = std::fs::remove_file(&text_path);
        let _ = std::fs::remove_file(&output_path);
    }

    #[test]
    fn merging_unions_tagsets_and_concatenates_annotations() {
        let xml = sample_collection_xml();
        let path1 = write_temp("catma-rs-merge-a.xml", &xml);
        let path2 = write_temp("catma-rs-merge-b.xml", &xml);
        let output_path = std::env::temp_dir().join("catma-rs-merge-output.xml");

        merge_collections(&path1, &path2, &output_path, None, None).unwrap();

        let merged = StandoffReader::read(&output_path).unwrap();
        assert_eq!(merged.tagsets.len(), 1);
        assert_eq!(merged.annotations.len(), 2);

        let _ = std::fs::remove_file(&path1);
        let _ = std::fs::remove_file(&path2);
        let _ = std::fs::remove_file(&output_path);
    }
}
