//! Various errors that may arise when parsing, merging and projecting CATMA
//! annotation collections.

use std::fmt;

#[derive(Debug)]
/// Various errors for parsing, merging and projecting annotation collections.
pub enum CatmaError {
    // General

    /// No data to work with, e.g. an empty collection or empty document.
    NoData,
    /// General type mismatch.
    TypeMismatch,

    // Stand-off format errors

    /// Collection format version is missing or unsupported.
    /// Only version 5 is accepted for reading.
    FormatVersionUnsupported(i32),
    /// Collection has no `<ptr>` anchors and the caller did not opt into
    /// lenient mode.
    AnchorsMissing,
    /// A `<ptr>` target attribute could not be parsed as `catma://.../char=start,end`.
    PointerTargetInvalid(String),

    // Reference errors

    /// `type`/`baseTypes` on a tag references a tag UUID that was never loaded.
    TagRefMissing(uuid::Uuid),
    /// `type` on an `<fs>` annotation references a tag UUID not present in any
    /// loaded tagset.
    AnnotationTagMissing(uuid::Uuid),
    /// `ana` on a `<seg>` references an annotation UUID with no corresponding
    /// `<fs>`.
    AnnotationRefMissing(uuid::Uuid),

    // Range errors

    /// Range is invalid, i.e. `start > end`.
    RangeInvalid((usize, usize)),
    /// Range extends outside of `[0, document length)`.
    RangeOutOfBounds((usize, usize), usize),

    // Projector errors

    /// A chunk's recorded owner node is no longer present under its recorded
    /// parent. This means the document's tree-editing invariants were
    /// violated and the projection cannot continue safely.
    StructuralInvariantViolated(String),

    // IO / parsing

    /// IO errors.
    IOError(std::io::Error),
    /// Quick-xml error.
    QuickXMLError(quick_xml::Error),
    /// Quick-xml attribute parsing error.
    QuickXMLAttrError(quick_xml::events::attributes::AttrError),
    /// Error parsing integer from string.
    ParseIntError(std::num::ParseIntError),
    /// Error parsing a UUID from string.
    UuidError(uuid::Error),
    /// Error decoding bytes as UTF-8.
    Utf8Error(std::str::Utf8Error),
    /// Invalid path.
    PathInvalid(String),
}

impl std::error::Error for CatmaError {}
impl fmt::Display for CatmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatmaError::NoData => write!(f, "Input is empty or contains no relevant data"),
            CatmaError::TypeMismatch => write!(f, "Objects have different types"),
            CatmaError::FormatVersionUnsupported(v) => write!(
                f,
                "This parser can only handle CATMA collections with version 5, found {v}"
            ),
            CatmaError::AnchorsMissing => write!(
                f,
                "This collection does not use <ptr> references and is not supported by this parser"
            ),
            CatmaError::PointerTargetInvalid(target) => {
                write!(f, "Could not parse pointer target '{target}'")
            }
            CatmaError::TagRefMissing(id) => write!(f, "No such tag '{id}'"),
            CatmaError::AnnotationTagMissing(id) => {
                write!(f, "Annotation references tag '{id}' which was not loaded")
            }
            CatmaError::AnnotationRefMissing(id) => {
                write!(f, "Segment references annotation '{id}' which was not loaded")
            }
            CatmaError::RangeInvalid((start, end)) => {
                write!(f, "Invalid range [{start}, {end})")
            }
            CatmaError::RangeOutOfBounds((start, end), len) => write!(
                f,
                "Range [{start}, {end}) extends outside of document length {len}"
            ),
            CatmaError::StructuralInvariantViolated(msg) => {
                write!(f, "Document structural invariant violated: {msg}")
            }
            CatmaError::IOError(err) => write!(f, "IO error: {err}"),
            CatmaError::QuickXMLError(err) => write!(f, "QuickXML error: {err}"),
            CatmaError::QuickXMLAttrError(err) => write!(f, "QuickXML attribute error: {err}"),
            CatmaError::ParseIntError(err) => write!(f, "Error parsing string to integer: {err}"),
            CatmaError::UuidError(err) => write!(f, "Error parsing UUID: {err}"),
            CatmaError::Utf8Error(err) => write!(f, "Error parsing bytes to string: {err}"),
            CatmaError::PathInvalid(path) => write!(f, "No such file '{path}'"),
        }
    }
}

/// Converts std::io::Error to CatmaError
impl From<std::io::Error> for CatmaError {
    fn from(err: std::io::Error) -> CatmaError {
        CatmaError::IOError(err)
    }
}

/// Converts quick_xml::Error to CatmaError
impl From<quick_xml::Error> for CatmaError {
    fn from(err: quick_xml::Error) -> CatmaError {
        CatmaError::QuickXMLError(err)
    }
}

/// Converts quick_xml attribute errors to CatmaError
impl From<quick_xml::events::attributes::AttrError> for CatmaError {
    fn from(err: quick_xml::events::attributes::AttrError) -> CatmaError {
        CatmaError::QuickXMLAttrError(err)
    }
}

/// Converts std::num::ParseIntError to CatmaError
impl From<std::num::ParseIntError> for CatmaError {
    fn from(err: std::num::ParseIntError) -> CatmaError {
        CatmaError::ParseIntError(err)
    }
}

/// Converts uuid::Error to CatmaError
impl From<uuid::Error> for CatmaError {
    fn from(err: uuid::Error) -> CatmaError {
        CatmaError::UuidError(err)
    }
}

/// Converts std::str::Utf8Error to CatmaError
impl From<std::str::Utf8Error> for CatmaError {
    fn from(err: std::str::Utf8Error) -> CatmaError {
        CatmaError::Utf8Error(err)
    }
}

/// Converts CatmaError to std::io::Error
impl From<CatmaError> for std::io::Error {
    fn from(err: CatmaError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::Other, err)
    }
}
