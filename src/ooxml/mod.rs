//! Office Open XML (OOXML) format implementation.
//!
//! The implementation is based on the Open Packaging Conventions (OPC) and
//! follows the structure of the python-pptx library, adapted for Rust.
//!
//! # Architecture
//!
//! 1. **OPC Layer** (`opc`): package graph, part construction, relationships, ZIP
//! 2. **Format-Specific Modules**:
//!    - `pptx`: PowerPoint part types and text elements
//!
//! # Example: Round-tripping a package
//!
//! ```rust,no_run
//! use opcgraph::ooxml::OpcPackage;
//!
//! let mut pkg = OpcPackage::open("deck.pptx")?;
//! let title = pkg.core_properties()?.properties().title.clone();
//! println!("title: {:?}", title);
//! pkg.save("copy.pptx")?;
//! # Ok::<(), opcgraph::ooxml::opc::OpcError>(())
//! ```
pub mod opc;
pub mod pptx;

// Re-export commonly used types from OPC layer
pub use opc::{OpcError, OpcPackage, PackURI, Result};
