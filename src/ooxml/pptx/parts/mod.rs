/// Parts for PowerPoint presentation documents.
///
/// This module contains the part types the process-wide part factory knows out of
/// the box, following the structure of the python-pptx library.
pub mod coreprops;
pub mod slide;

pub use coreprops::{CORE_PROPERTIES_PARTNAME, CoreProperties, CorePropertiesPart};
pub use slide::{SlideLayoutPart, SlidePart};

use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::factory::PartFactory;

/// Register the built-in part types on `factory`.
pub fn register_builtin(factory: &mut PartFactory) {
    factory.register_type::<SlidePart, _>(ct::PML_SLIDE);
    factory.register_type::<SlideLayoutPart, _>(ct::PML_SLIDE_LAYOUT);
    factory.register_type::<CorePropertiesPart, _>(ct::OPC_CORE_PROPERTIES);
}
