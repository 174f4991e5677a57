//! Writes a [`Collection`] as a CATMA TEI stand-off annotation document.

use std::path::Path;

use crate::errors::CatmaError;
use crate::merge::merge_ranges;
use crate::range::Range;
use crate::support::{catma_uuid_string, timestamp};
use crate::tagset::{Tag, Tagset, PROP_DISPLAY_COLOR, PROP_MARKUP_AUTHOR};
use crate::xmldoc::{NodeId, Tree};
use crate::Annotation;

use super::collection::{Collection, CATMA_TEI_VERSION, TEI_NAMESPACE};

/// Writes CATMA TEI stand-off annotation documents, mirroring the shape
/// [`super::reader::StandoffReader`] reads back.
pub struct StandoffWriter;

impl StandoffWriter {
    /// Writes `collection` to `path` as a CATMA TEI document, with an XML
    /// declaration.
    pub fn write(collection: &Collection, path: &Path) -> Result<(), CatmaError> {
        let xml = Self::write_to_string(collection)?;
        std::fs::write(path, xml)?;
        Ok(())
    }

    /// Builds the document and serialises it without touching the
    /// filesystem — used by [`super::merge_collections`] and tests.
    pub fn write_to_string(collection: &Collection) -> Result<String, CatmaError> {
        let mut tree = new_document();
        let root = tree.root();
        let header = child(&mut tree, root, "teiHeader");
        let text_el = child(&mut tree, root, "text");
        let body_el = child(&mut tree, text_el, "body");
        let ab_el = named_child(&mut tree, body_el, "ab", &[("type", "catma")]);

        write_filedesc(&mut tree, header, collection);
        write_tagsets(&mut tree, header, &collection.tagsets);
        write_annotations(&mut tree, text_el, ab_el, collection);

        let body = tree.to_xml()?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
    }
}

fn new_document() -> Tree {
    let mut tree = Tree::parse("<TEI/>").expect("literal document is well-formed");
    let root = tree.root();
    tree.node_mut(root).set_attribute("xml:lang", "en");
    tree.node_mut(root).set_attribute("xmlns", TEI_NAMESPACE);
    tree
}

fn child(tree: &mut Tree, parent: NodeId, name: &str) -> NodeId {
    let node = tree.create_node(name);
    let at = tree.node(parent).children.len();
    tree.insert_child(parent, at, node);
    node
}

fn named_child(tree: &mut Tree, parent: NodeId, name: &str, attrs: &[(&str, &str)]) -> NodeId {
    let node = child(tree, parent, name);
    for (key, value) in attrs {
        tree.node_mut(node).set_attribute(*key, *value);
    }
    node
}

fn text_child(tree: &mut Tree, parent: NodeId, name: &str, text: impl Into<String>) -> NodeId {
    let node = child(tree, parent, name);
    tree.node_mut(node).text = Some(text.into());
    node
}

fn write_filedesc(tree: &mut Tree, header: NodeId, collection: &Collection) {
    let filedesc = child(tree, header, "fileDesc");
    let title_stmt = child(tree, filedesc, "titleStmt");
    text_child(tree, title_stmt, "title", collection.title.clone());
    text_child(tree, title_stmt, "author", collection.author.clone());

    let publication_stmt = child(tree, filedesc, "publicationStmt");
    text_child(tree, publication_stmt, "publisher", collection.publisher.clone());

    let source_desc = child(tree, filedesc, "sourceDesc");
    text_child(tree, source_desc, "p", collection.description.clone());

    let ab = child(tree, source_desc, "ab");
    let fs = named_child(tree, ab, "fs", &[("xml:id", "CATMA_TECH_DESC")]);
    let f = named_child(tree, fs, "f", &[("name", "version")]);
    text_child(tree, f, "string", CATMA_TEI_VERSION.to_string());
}

fn write_tagsets(tree: &mut Tree, header: NodeId, tagsets: &[Tagset]) {
    let encoding_desc = child(tree, header, "encodingDesc");

    for tagset in tagsets {
        let fsd_decl = named_child(
            tree,
            encoding_desc,
            "fsdDecl",
            &[
                ("xml:id", &catma_uuid_string(&tagset.uuid)),
                ("n", &format!("{} {}", tagset.name, tagset.version)),
            ],
        );

        let mut tags: Vec<&Tag> = tagset.tags.values().collect();
        tags.sort_by_key(|tag| tag.uuid);

        for tag in tags {
            write_tag(tree, fsd_decl, tag);
        }
    }
}

fn write_tag(tree: &mut Tree, fsd_decl: NodeId, tag: &Tag) {
    let tag_id = catma_uuid_string(&tag.uuid);
    let mut attrs = vec![
        ("xml:id".to_owned(), tag_id.clone()),
        ("n".to_owned(), timestamp()),
        ("type".to_owned(), tag_id),
    ];
    if let Some(parent) = tag.parent {
        attrs.push(("baseTypes".to_owned(), catma_uuid_string(&parent)));
    }

    let fs_decl = child(tree, fsd_decl, "fsDecl");
    for (key, value) in attrs {
        tree.node_mut(fs_decl).set_attribute(key, value);
    }

    text_child(tree, fs_decl, "fsDescr", tag.name.clone());

    let mut properties: Vec<_> = tag.properties.values().collect();
    properties.sort_by_key(|prop| prop.name.clone());

    for property in properties {
        let f_decl = named_child(
            tree,
            fs_decl,
            "fDecl",
            &[
                ("xml:id", &catma_uuid_string(&property.uuid)),
                ("name", &property.name),
            ],
        );
        let v_range = child(tree, f_decl, "vRange");
        let v_coll = child(tree, v_range, "vColl");
        for value in &property.values {
            text_child(tree, v_coll, "string", value.clone());
        }
    }
}

fn write_annotations(tree: &mut Tree, text_el: NodeId, ab_el: NodeId, collection: &Collection) {
    let text_length = collection.text_length.unwrap_or(0);
    let document_id = collection.document_id.clone().unwrap_or_default();

    let merged = merge_ranges(text_length, &collection.annotations);
    for (anno_range, annotations) in &merged {
        if annotations.is_empty() {
            add_ptr(tree, ab_el, &document_id, *anno_range);
        } else {
            let ana = annotations
                .iter()
                .map(|a| format!("#{}", catma_uuid_string(&a.uuid)))
                .collect::<Vec<_>>()
                .join(" ");
            let seg = named_child(tree, ab_el, "seg", &[("ana", &ana)]);
            add_ptr(tree, seg, &document_id, *anno_range);
        }
    }

    for annotation in &collection.annotations {
        write_annotation(tree, text_el, annotation, &collection.author);
    }
}

fn add_ptr(tree: &mut Tree, parent: NodeId, document_id: &str, range: Range) {
    named_child(
        tree,
        parent,
        "ptr",
        &[
            (
                "target",
                &format!(
                    "catma://CATMA_{}#char={},{}",
                    document_id.to_uppercase(),
                    range.start,
                    range.end
                ),
            ),
            ("type", "inclusion"),
        ],
    );
}

fn write_annotation(tree: &mut Tree, text_el: NodeId, annotation: &Annotation, default_author: &str) {
    let fs = named_child(
        tree,
        text_el,
        "fs",
        &[
            ("xml:id", &catma_uuid_string(&annotation.uuid)),
            ("type", &catma_uuid_string(&annotation.tag.uuid)),
        ],
    );

    if !annotation.properties.contains_key(PROP_MARKUP_AUTHOR) {
        write_property(tree, fs, PROP_MARKUP_AUTHOR, &[default_author.to_owned()]);
    }
    if !annotation.properties.contains_key(PROP_DISPLAY_COLOR) {
        write_property(tree, fs, PROP_DISPLAY_COLOR, &[annotation.tag.color.to_string()]);
    }

    let mut names: Vec<&String> = annotation.properties.keys().collect();
    names.sort();
    for name in names {
        write_property(tree, fs, name, &annotation.properties[name]);
    }
}

fn write_property(tree: &mut Tree, fs: NodeId, name: &str, values: &[String]) {
    let f = named_child(tree, fs, "f", &[("name", name)]);
    for value in values {
        text_child(tree, f, "string", value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_document_carries_version_and_title() {
        let collection = Collection::new("my title", "jane", 10, "0854DF2F-9527-428E-B753-84C0710AFDA5");
        let xml = StandoffWriter::write_to_string(&collection).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<string>5</string>"));
        assert!(xml.contains("my title"));
    }

    #[test]
    fn annotation_without_explicit_markup_author_gets_default() {
        let tag = Tag::new("person", "jane");
        let mut anno = Annotation::new(tag);
        anno.ranges = vec![Range::new(0, 3)];

        let mut collection = Collection::new("t", "jane", 10, "doc");
        collection.annotations = vec![anno];

        let xml = StandoffWriter::write_to_string(&collection).unwrap();
        assert!(xml.contains("catma_markupauthor"));
        assert!(xml.contains(">jane<"));
    }

    #[test]
    fn uncovered_range_is_written_as_bare_ptr() {
        let collection = Collection::new("t", "jane", 10, "doc");
        let xml = StandoffWriter::write_to_string(&collection).unwrap();
        assert!(xml.contains("char=0,10"));
        assert!(!xml.contains("<seg"));
    }
}
