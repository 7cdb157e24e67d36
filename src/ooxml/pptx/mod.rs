//! PowerPoint (.pptx) presentation support.
//!
//! This module holds the presentation-specific pieces that sit on top of the OPC
//! package graph:
//!
//! - `parts`: part types the process-wide factory constructs for slides, slide
//!   layouts and core properties
//! - `text`: DrawingML text bodies and paragraph alignment
//!
//! # Example
//!
//! ```rust,no_run
//! use opcgraph::ooxml::opc::OpcPackage;
//! use opcgraph::ooxml::pptx::SlidePart;
//!
//! let package = OpcPackage::open("presentation.pptx")?;
//! for (id, part) in package.iter_parts() {
//!     if let Some(slide) = part.as_any().downcast_ref::<SlidePart>() {
//!         let layout = package.part(slide.slide_layout_id()?)?;
//!         println!("{} {} uses {}", id, slide.name()?, layout.partname());
//!     }
//! }
//! # Ok::<(), opcgraph::ooxml::opc::OpcError>(())
//! ```

pub mod parts;
pub mod text;

pub use parts::{CoreProperties, CorePropertiesPart, SlideLayoutPart, SlidePart};
pub use text::{ParagraphAlignment, TextBody, TextParagraph};
