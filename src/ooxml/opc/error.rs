/// Error types for OPC package operations
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Duplicate partname: {0}")]
    DuplicatePartname(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Ambiguous relationship: {0}")]
    AmbiguousRelationship(String),

    #[error("Relationship index {index} out of range for collection of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A serialized relationship names a source or target partname that was
    /// never unmarshalled as a part.
    #[error("Dangling relationship '{r_id}' from '{source_uri}': no part at '{target}'")]
    GraphIntegrity {
        source_uri: String,
        r_id: String,
        target: String,
    },

    #[error("Content type not found for partname: {0}")]
    ContentTypeNotFound(String),

    #[error("Package exceeds size limit: {0}")]
    PackageTooLarge(String),

    #[error("XML parsing error: {0}")]
    XmlError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Quick-XML error: {0}")]
    QuickXmlError(#[from] quick_xml::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    #[error("Attribute error: {0}")]
    AttrError(String),
}

impl From<quick_xml::events::attributes::AttrError> for OpcError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OpcError::AttrError(err.to_string())
    }
}

impl From<quick_xml::encoding::EncodingError> for OpcError {
    fn from(err: quick_xml::encoding::EncodingError) -> Self {
        OpcError::XmlError(err.to_string())
    }
}

impl OpcError {
    /// Build a [`OpcError::GraphIntegrity`] for a relationship whose source or
    /// target does not exist among the unmarshalled parts.
    pub fn dangling(source_uri: &str, r_id: &str, target: &str) -> Self {
        OpcError::GraphIntegrity {
            source_uri: source_uri.to_string(),
            r_id: r_id.to_string(),
            target: target.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpcError>;
