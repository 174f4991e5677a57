//! The in-memory result of reading (or input to writing) one CATMA TEI
//! stand-off annotation collection.

use crate::annotation::Annotation;
use crate::tagset::Tagset;

/// Format version this codec reads and writes. Older (version 4) collections
/// are rejected outright rather than upgraded.
pub const CATMA_TEI_VERSION: i32 = 5;

/// The TEI namespace declared on a written collection's root element.
pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

/// A loaded (or about-to-be-written) annotation collection: its metadata, the
/// tagsets its annotations' tags belong to, and the annotations themselves.
#[derive(Debug, Clone)]
pub struct Collection {
    pub version: i32,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub description: String,
    /// Length of the annotated text and the annotated document's id, both
    /// derived from the collection's last `<ptr>` anchor. `None` when the
    /// collection carries no pointer anchors (only possible via
    /// [`super::reader::StandoffReader::read_lenient`]).
    pub text_length: Option<usize>,
    pub document_id: Option<String>,
    pub tagsets: Vec<Tagset>,
    pub annotations: Vec<Annotation>,
}

impl Collection {
    /// Creates a new collection ready to be written: `text_length` and
    /// `document_id` are required since a freshly authored collection always
    /// anchors to a concrete source document.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        text_length: usize,
        document_id: impl Into<String>,
    ) -> Self {
        let author = author.into();
        Self {
            version: CATMA_TEI_VERSION,
            title: title.into(),
            publisher: author.clone(),
            author,
            description: "empty".to_owned(),
            text_length: Some(text_length),
            document_id: Some(document_id.into()),
            tagsets: Vec::new(),
            annotations: Vec::new(),
        }
    }
}
