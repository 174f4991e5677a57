//! Reads a CATMA TEI stand-off annotation collection into a [`Collection`].

use std::collections::HashMap;
use std::path::Path;

use uuid::Uuid;

use super::collection::{Collection, CATMA_TEI_VERSION};
use super::nav;
use crate::errors::CatmaError;
use crate::log;
use crate::range::Range;
use crate::support::{extract_range, timestamp, uuid_from_catma_uuid_string};
use crate::tagset::{Property, Tag, Tagset, PROP_DISPLAY_COLOR, PROP_MARKUP_AUTHOR};
use crate::xmldoc::{NodeId, Tree};
use crate::Annotation;

/// Reads CATMA TEI stand-off annotation collections. The format is described
/// at <http://catma.de/documentation/technical-specs/tei-export-format/>.
pub struct StandoffReader;

impl StandoffReader {
    /// Reads `path`, requiring at least one `<ptr>` anchor in the body.
    pub fn read(path: &Path) -> Result<Collection, CatmaError> {
        Self::read_impl(path, false)
    }

    /// Reads `path` without requiring pointer anchors: `text_length` and
    /// `document_id` are left `None` when none are found, rather than
    /// failing with [`CatmaError::AnchorsMissing`].
    pub fn read_lenient(path: &Path) -> Result<Collection, CatmaError> {
        Self::read_impl(path, true)
    }

    fn read_impl(path: &Path, lenient: bool) -> Result<Collection, CatmaError> {
        let xml = std::fs::read_to_string(path)?;
        let tree = Tree::parse(&xml)?;
        let root = tree.root();

        let (version, title, author, publisher, description) = read_metadata(&tree, root)?;

        let body_ab = nav::path(&tree, root, &["text", "body", "ab"]);
        let ptr_refs = body_ab
            .map(|ab| nav::descendants(&tree, ab, "ptr"))
            .unwrap_or_default();

        if ptr_refs.is_empty() && !lenient {
            return Err(CatmaError::AnchorsMissing);
        }

        let (text_length, document_id) = if let Some(last_ptr) = ptr_refs.last() {
            let target = tree
                .node(*last_ptr)
                .attribute("target")
                .ok_or_else(|| CatmaError::PointerTargetInvalid(String::new()))?;
            let last_range = extract_range(target)?;
            (Some(last_range.end), extract_documentid(target))
        } else {
            (None, None)
        };

        let tagsets = read_tagsets(&tree, root)?;
        let annotations = read_annotations(&tree, root, &tagsets)?;

        Ok(Collection {
            version,
            title,
            author,
            publisher,
            description,
            text_length,
            document_id,
            tagsets,
            annotations,
        })
    }
}

fn read_metadata(tree: &Tree, root: NodeId) -> Result<(i32, String, String, String, String), CatmaError> {
    let header = nav::path(tree, root, &["teiHeader", "fileDesc"]);

    let version = header
        .and_then(|fd| nav::path(tree, fd, &["sourceDesc", "ab", "fs", "f", "string"]))
        .and_then(|n| tree.node(n).text.clone())
        .map(|s| s.parse::<i32>())
        .transpose()?
        .unwrap_or(0);

    if version != CATMA_TEI_VERSION {
        return Err(CatmaError::FormatVersionUnsupported(version));
    }

    let text_of = |segments: &[&str]| -> String {
        header
            .and_then(|fd| nav::path(tree, fd, segments))
            .and_then(|n| tree.node(n).text.clone())
            .unwrap_or_else(|| "empty".to_owned())
    };

    let title = text_of(&["titleStmt", "title"]);
    let author = text_of(&["titleStmt", "author"]);
    let publisher = text_of(&["publicationStmt", "publisher"]);
    let description = text_of(&["sourceDesc", "p"]);

    Ok((version, title, author, publisher, description))
}

fn extract_documentid(target: &str) -> Option<String> {
    crate::support::document_id_from_target(target).map(|s| s.to_owned())
}

fn read_tagsets(tree: &Tree, root: NodeId) -> Result<Vec<Tagset>, CatmaError> {
    let Some(encoding_desc) = nav::path(tree, root, &["teiHeader", "encodingDesc"]) else {
        return Ok(Vec::new());
    };

    let mut tagsets = Vec::new();
    for tagset_node in nav::children(tree, encoding_desc, "fsdDecl") {
        let n_value = tree
            .node(tagset_node)
            .attribute("n")
            .ok_or_else(|| CatmaError::PointerTargetInvalid("fsdDecl missing 'n' attribute".to_owned()))?;
        let divider = n_value
            .rfind(' ')
            .ok_or_else(|| CatmaError::PointerTargetInvalid(n_value.to_owned()))?;
        let tagset_name = n_value[..divider].to_owned();
        let version_string = n_value[divider + 1..].to_owned();

        let tagset_uuid = uuid_from_catma_uuid_string(
            nav::xml_id(tree, tagset_node)
                .ok_or_else(|| CatmaError::PointerTargetInvalid("fsdDecl missing xml:id".to_owned()))?,
        )?;

        let mut tagset = Tagset::with_uuid(tagset_uuid, tagset_name, version_string);
        read_tags(tree, tagset_node, &mut tagset)?;
        tagsets.push(tagset);
    }

    Ok(tagsets)
}

fn read_tags(tree: &Tree, tagset_node: NodeId, tagset: &mut Tagset) -> Result<(), CatmaError> {
    let mut parents: HashMap<Uuid, Uuid> = HashMap::new();

    for tag_node in nav::children(tree, tagset_node, "fsDecl") {
        let description = nav::child(tree, tag_node, "fsDescr")
            .and_then(|n| tree.node(n).text.clone())
            .unwrap_or_default();

        let tag_uuid = uuid_from_catma_uuid_string(
            nav::xml_id(tree, tag_node)
                .ok_or_else(|| CatmaError::PointerTargetInvalid("fsDecl missing xml:id".to_owned()))?,
        )?;
        let version = tree.node(tag_node).attribute("n").unwrap_or("").to_owned();

        let author_node = find_fdecl(tree, tag_node, PROP_MARKUP_AUTHOR)
            .ok_or_else(|| CatmaError::PointerTargetInvalid(format!("tag {tag_uuid} missing catma_markupauthor")))?;
        let author = fdecl_string(tree, author_node).unwrap_or_default();
        let author_prop_uuid = uuid_from_catma_uuid_string(
            nav::xml_id(tree, author_node)
                .ok_or_else(|| CatmaError::PointerTargetInvalid("fDecl missing xml:id".to_owned()))?,
        )?;

        let color_node = find_fdecl(tree, tag_node, PROP_DISPLAY_COLOR)
            .ok_or_else(|| CatmaError::PointerTargetInvalid(format!("tag {tag_uuid} missing catma_displaycolor")))?;
        let color: i64 = fdecl_string(tree, color_node).unwrap_or_default().parse()?;
        let color_prop_uuid = uuid_from_catma_uuid_string(
            nav::xml_id(tree, color_node)
                .ok_or_else(|| CatmaError::PointerTargetInvalid("fDecl missing xml:id".to_owned()))?,
        )?;

        let mut tag = Tag::with_uuid(tag_uuid, description, None, author, Some(color));
        tag.version = version;
        if let Some(prop) = tag.properties.get_mut(PROP_MARKUP_AUTHOR) {
            prop.uuid = author_prop_uuid;
        }
        if let Some(prop) = tag.properties.get_mut(PROP_DISPLAY_COLOR) {
            prop.uuid = color_prop_uuid;
        }

        if let Some(parent_id) = tree.node(tag_node).attribute("baseTypes") {
            parents.insert(tag_uuid, uuid_from_catma_uuid_string(parent_id)?);
        }

        read_user_properties(tree, tag_node, &mut tag)?;
        tagset.add_tag(tag);
    }

    for (tag_uuid, parent_uuid) in parents {
        if let Some(tag) = tagset.tags.get_mut(&tag_uuid) {
            tag.parent = Some(parent_uuid);
        }
    }

    Ok(())
}

fn find_fdecl(tree: &Tree, tag_node: NodeId, property_name: &str) -> Option<NodeId> {
    nav::children(tree, tag_node, "fDecl")
        .into_iter()
        .find(|&n| tree.node(n).attribute("name") == Some(property_name))
}

fn fdecl_string(tree: &Tree, fdecl_node: NodeId) -> Option<String> {
    nav::path(tree, fdecl_node, &["vRange", "vColl", "string"]).and_then(|n| tree.node(n).text.clone())
}

fn read_user_properties(tree: &Tree, tag_node: NodeId, tag: &mut Tag) -> Result<(), CatmaError> {
    for property_node in nav::children(tree, tag_node, "fDecl") {
        let Some(name) = tree.node(property_node).attribute("name") else {
            continue;
        };
        if name.starts_with("catma_") {
            continue;
        }

        let property_uuid = uuid_from_catma_uuid_string(
            nav::xml_id(tree, property_node)
                .ok_or_else(|| CatmaError::PointerTargetInvalid("fDecl missing xml:id".to_owned()))?,
        )?;
        let values: Vec<String> = nav::path(tree, property_node, &["vRange", "vColl"])
            .map(|vcoll| {
                nav::children(tree, vcoll, "string")
                    .into_iter()
                    .filter_map(|n| tree.node(n).text.clone())
                    .collect()
            })
            .unwrap_or_default();

        tag.add_property(Property::with_uuid(property_uuid, name.to_owned(), values));
    }
    Ok(())
}

fn read_annotations(tree: &Tree, root: NodeId, tagsets: &[Tagset]) -> Result<Vec<Annotation>, CatmaError> {
    let mut ranges_by_anno_uuid = read_segments(tree, root)?;

    let Some(text_node) = nav::child(tree, root, "text") else {
        return Ok(Vec::new());
    };
    let annotation_nodes = nav::children(tree, text_node, "fs");

    let mut annotations = Vec::with_capacity(annotation_nodes.len());
    for annotation_node in annotation_nodes {
        let type_attr = tree
            .node(annotation_node)
            .attribute("type")
            .ok_or_else(|| CatmaError::PointerTargetInvalid("fs missing 'type' attribute".to_owned()))?;
        let tag_uuid = uuid_from_catma_uuid_string(type_attr)?;
        let tag = find_tag(tagsets, tag_uuid).ok_or(CatmaError::AnnotationTagMissing(tag_uuid))?;

        let anno_uuid = uuid_from_catma_uuid_string(
            nav::xml_id(tree, annotation_node)
                .ok_or_else(|| CatmaError::PointerTargetInvalid("fs missing xml:id".to_owned()))?,
        )?;

        let mut annotation = Annotation::with_uuid(anno_uuid, tag.clone());
        annotation.ranges = ranges_by_anno_uuid.remove(&anno_uuid).unwrap_or_default();

        for property_node in nav::children(tree, annotation_node, "f") {
            let Some(name) = tree.node(property_node).attribute("name") else {
                continue;
            };
            for value_node in nav::descendants(tree, property_node, "string") {
                if let Some(value) = &tree.node(value_node).text {
                    annotation.add_property(name, value, true);
                }
            }
        }

        annotations.push(annotation);
    }

    for orphan in ranges_by_anno_uuid.keys() {
        log::warn(format!(
            "segment references annotation {orphan} which has no corresponding <fs>, skipping"
        ));
    }

    Ok(annotations)
}

fn find_tag(tagsets: &[Tagset], tag_uuid: Uuid) -> Option<&Tag> {
    tagsets.iter().find_map(|tagset| tagset.tags.get(&tag_uuid))
}

fn read_segments(tree: &Tree, root: NodeId) -> Result<HashMap<Uuid, Vec<Range>>, CatmaError> {
    let mut ranges_by_anno_uuid: HashMap<Uuid, Vec<Range>> = HashMap::new();

    let Some(ab) = nav::path(tree, root, &["text", "body", "ab"]) else {
        return Ok(ranges_by_anno_uuid);
    };

    for segment_node in nav::children(tree, ab, "seg") {
        let anno_range = extract_segment_range(tree, segment_node)?;
        let Some(ana) = tree.node(segment_node).attribute("ana") else {
            continue;
        };
        for annotation_uuid_ref in ana.split_whitespace() {
            let annotation_uuid = uuid_from_catma_uuid_string(annotation_uuid_ref.trim_start_matches('#'))?;
            ranges_by_anno_uuid
                .entry(annotation_uuid)
                .or_default()
                .push(anno_range);
        }
    }

    Ok(ranges_by_anno_uuid)
}

fn extract_segment_range(tree: &Tree, segment_node: NodeId) -> Result<Range, CatmaError> {
    let ptr = nav::child(tree, segment_node, "ptr")
        .ok_or_else(|| CatmaError::PointerTargetInvalid("seg missing <ptr> child".to_owned()))?;
    let target = tree
        .node(ptr)
        .attribute("target")
        .ok_or_else(|| CatmaError::PointerTargetInvalid("ptr missing 'target' attribute".to_owned()))?;
    extract_range(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standoff::writer::StandoffWriter;

    fn sample_collection() -> Collection {
        let mut tagset = Tagset::new("people");
        let tag = Tag::new("person", "jane");
        tagset.add_tag(tag.clone());

        let mut anno = Annotation::new(tag);
        anno.ranges = vec![Range::new(0, 5)];
        anno.add_property("nationality", "french", false);

        let mut collection = Collection::new("doc title", "jane", 20, "0854DF2F-9527-428E-B753-84C0710AFDA5");
        collection.tagsets = vec![tagset];
        collection.annotations = vec![anno];
        collection
    }

    #[test]
    fn written_collection_reads_back_with_matching_uuids() {
        let collection = sample_collection();
        let xml = StandoffWriter::write_to_string(&collection).unwrap();

        let tree = Tree::parse(&xml).unwrap();
        let root = tree.root();
        let (version, title, ..) = read_metadata(&tree, root).unwrap();
        assert_eq!(version, CATMA_TEI_VERSION);
        assert_eq!(title, "doc title");

        let tagsets = read_tagsets(&tree, root).unwrap();
        assert_eq!(tagsets.len(), 1);
        assert_eq!(tagsets[0].uuid, collection.tagsets[0].uuid);

        let annotations = read_annotations(&tree, root, &tagsets).unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].uuid, collection.annotations[0].uuid);
        assert_eq!(annotations[0].ranges, vec![Range::new(0, 5)]);
        assert_eq!(
            annotations[0].properties["nationality"],
            vec!["french".to_owned()]
        );
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let xml = r#"<TEI xml:lang="en" xmlns="http://www.tei-c.org/ns/1.0">
<teiHeader><fileDesc><titleStmt><title>t</title></titleStmt>
<sourceDesc><ab><fs xml:id="CATMA_TECH_DESC"><f name="version"><string>4</string></f></fs></ab></sourceDesc>
</fileDesc></teiHeader><text><body><ab type="catma"></ab></body></text></TEI>"#;
        let tree = Tree::parse(xml).unwrap();
        let err = read_metadata(&tree, tree.root()).unwrap_err();
        assert!(matches!(err, CatmaError::FormatVersionUnsupported(4)));
    }

    #[test]
    fn missing_anchors_is_fatal_unless_lenient() {
        let xml = r#"<TEI xml:lang="en" xmlns="http://www.tei-c.org/ns/1.0">
<teiHeader><fileDesc><titleStmt><title>t</title><author>a</author></titleStmt>
<publicationStmt><publisher>a</publisher></publicationStmt>
<sourceDesc><p>d</p><ab><fs xml:id="CATMA_TECH_DESC"><f name="version"><string>5</string></f></fs></ab></sourceDesc>
</fileDesc><encodingDesc></encodingDesc></teiHeader>
<text><body><ab type="catma"></ab></body></text></TEI>"#;

        let path = std::env::temp_dir().join(format!(
            "catma-rs-test-{}.xml",
            timestamp().replace([':', '.'], "-")
        ));
        std::fs::write(&path, xml).unwrap();

        assert!(matches!(
            StandoffReader::read(&path),
            Err(CatmaError::AnchorsMissing)
        ));
        assert!(StandoffReader::read_lenient(&path).is_ok());

        let _ = std::fs::remove_file(&path);
    }
}
