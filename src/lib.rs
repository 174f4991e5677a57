//! Merges stand-off CATMA annotations and projects them inline into TEI
//! source documents.
//!
//! Two problems, solved separately and composed by the callers in
//! [`standoff`]:
//! - [`merge_ranges`] partitions a flat text into the non-overlapping
//!   sub-ranges a CATMA TEI annotation collection needs to serialise its
//!   stand-off `<seg>`/`<ptr>` body.
//! - [`xmldoc::Document`] walks an XML-tree projection of that same flat
//!   text and wraps each annotation's covered fragment in a new element,
//!   splitting across existing element boundaries where required.
//!
//! ```
//! use catma_rs::{Annotation, Tag};
//! use catma_rs::xmldoc::{Document, ProjectorConfig, Tree};
//!
//! let tree = Tree::parse("<p>hello world</p>").unwrap();
//! let mut doc = Document::new(tree, ProjectorConfig::default());
//!
//! let mut anno = Annotation::new(Tag::new("greeting", "jane"));
//! anno.ranges.push(catma_rs::Range::new(0, 5));
//!
//! doc.apply(&[anno], &|_| None).unwrap();
//! assert!(doc.tree.to_xml().unwrap().contains("<greeting"));
//! ```

pub mod annotation;
pub mod errors;
pub mod log;
pub mod merge;
pub mod range;
pub mod standoff;
pub mod support;
pub mod tagset;
pub mod xmldoc;

pub use annotation::Annotation;
pub use errors::CatmaError;
pub use merge::merge_ranges;
pub use range::Range;
pub use tagset::{Property, Tag, Tagset, PROP_DISPLAY_COLOR, PROP_MARKUP_AUTHOR};
