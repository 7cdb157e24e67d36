/// Open Packaging Conventions (OPC) implementation.
///
/// This module reconstructs the part/relationship graph of an OPC package and
/// serializes it back. It includes:
///
/// - Package structure (an arena of parts, package and part relationships)
/// - Content-type driven part construction
/// - Two-pass unmarshalling with referential integrity checks
/// - ZIP-based physical packaging
///
/// # Performance Features
///
/// - Uses `memchr` for fast string searching in XML
/// - Uses `atoi_simd` for fast integer parsing
/// - Uses `quick-xml` for efficient zero-copy XML parsing

pub mod constants;
pub mod error;
pub mod factory;
pub mod options;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;
pub mod unmarshal;

// Re-export commonly used types
pub use error::{OpcError, Result};
pub use factory::{PartFactory, PartLoader, register_part_type};
pub use options::{Compression, ReadOptions, WriteOptions};
pub use package::{OpcPackage, PackageHook, RelSource};
pub use packuri::PackURI;
pub use part::{BlobPart, LoadPart, Part, PartId, XmlPart};
pub use pkgreader::{PackageReader, PackageSource, SerializedPart, SerializedRelationship};
pub use pkgwriter::PackageWriter;
pub use rel::{RelTarget, Relationship, Relationships};
pub use unmarshal::Unmarshaller;
