//! opcgraph - Open Packaging Conventions package graphs for Office Open XML files
//!
//! This library reconstructs the part/relationship graph of an OOXML package
//! (.pptx and friends) from its ZIP container, keeps it consistent while it is
//! edited in memory, and writes it back out.
//!
//! # Features
//!
//! - **Content-type dispatch**: parts are built by the loader registered for their
//!   content type, with XML and binary fallbacks
//! - **Two-pass unmarshalling**: all parts first, then relationships, so no edge
//!   ever points forward to a missing part
//! - **Referential integrity**: relationships refer to parts by arena handle; a
//!   dangling reference fails the whole load
//! - **Round-trip serialization**: content types, `.rels` files and parts are
//!   written back with their original relationship IDs
//!
//! # Example - Reading a PPTX file
//!
//! ```no_run
//! use opcgraph::ooxml::opc::{OpcPackage, RelSource};
//! use opcgraph::ooxml::opc::constants::relationship_type as rt;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pkg = OpcPackage::open("presentation.pptx")?;
//! let main = pkg.main_document_part()?;
//! println!("main part: {}", main.partname());
//!
//! let main_id = pkg.part_id(main.partname()).ok_or("main part not indexed")?;
//! for rel in pkg.rels_of(RelSource::Part(main_id))?.iter() {
//!     if rel.reltype() == rt::SLIDE {
//!         println!("{} -> {}", rel.r_id(), rel.target_ref());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Custom part types
//!
//! ```no_run
//! use opcgraph::ooxml::opc::{XmlPart, register_part_type, factory::load_boxed};
//!
//! register_part_type("application/vnd.example.widget+xml", load_boxed::<XmlPart>);
//! ```

/// Helpers shared across the crate
pub mod common;

/// OOXML (Office Open XML) package handling
///
/// This module provides the OPC package graph and the presentation part types
/// built on top of it.
pub mod ooxml;

// Re-export commonly used types for convenience
pub use ooxml::opc::{OpcError, OpcPackage, PackURI, Part, PartId, Result};
