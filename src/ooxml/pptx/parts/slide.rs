/// Slide parts.
///
/// This module contains parts for slides and slide layouts. Both locate the part
/// they inherit formatting from once the package graph is wired.
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{LoadPart, Part, PartId, XmlPart};
use crate::ooxml::opc::rel::Relationships;
use std::any::Any;

/// Handle of the single `reltype` target in `rels`, or None if there is none.
///
/// Several relationships of `reltype` are an error.
fn single_target(rels: &Relationships, reltype: &str) -> Result<Option<PartId>> {
    match rels.single_by_reltype(reltype) {
        Ok(rel) => Ok(Some(rel.target_part()?)),
        Err(OpcError::RelationshipNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Get the `name` attribute of the `<p:cSld>` element, or an empty string.
fn common_slide_name(xml: &XmlPart) -> Result<String> {
    let found = xml.find_elements_with_attrs("cSld")?;
    Ok(found
        .into_iter()
        .next()
        .and_then(|mut attrs| attrs.remove("name"))
        .unwrap_or_default())
}

/// A slide part.
///
/// Corresponds to `/ppt/slides/slideN.xml` in the package.
#[derive(Debug)]
pub struct SlidePart {
    xml: XmlPart,

    /// Slide layout this slide is based on, found after unmarshalling
    slide_layout: Option<PartId>,
}

impl SlidePart {
    /// Get the slide name.
    ///
    /// Returns the name attribute from the `<p:cSld>` element.
    pub fn name(&self) -> Result<String> {
        common_slide_name(&self.xml)
    }

    /// Handle of the slide layout part.
    pub fn slide_layout_id(&self) -> Result<PartId> {
        self.slide_layout.ok_or_else(|| {
            OpcError::RelationshipNotFound(format!(
                "slide '{}' has no slide layout",
                self.xml.partname()
            ))
        })
    }

    #[inline]
    pub fn xml_part(&self) -> &XmlPart {
        &self.xml
    }
}

impl LoadPart for SlidePart {
    fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Self> {
        Ok(Self {
            xml: XmlPart::load(partname, content_type, blob)?,
            slide_layout: None,
        })
    }
}

impl Part for SlidePart {
    fn partname(&self) -> &PackURI {
        self.xml.partname()
    }

    fn content_type(&self) -> &str {
        self.xml.content_type()
    }

    fn blob(&self) -> &[u8] {
        self.xml.blob()
    }

    fn rels(&self) -> &Relationships {
        self.xml.rels()
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        self.xml.rels_mut()
    }

    fn after_unmarshal(&mut self) -> Result<()> {
        self.slide_layout = single_target(self.xml.rels(), rt::SLIDE_LAYOUT)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A slide layout part.
///
/// Corresponds to `/ppt/slideLayouts/slideLayoutN.xml` in the package.
#[derive(Debug)]
pub struct SlideLayoutPart {
    xml: XmlPart,
    slide_master: Option<PartId>,
}

impl SlideLayoutPart {
    /// Get the layout name, e.g. "Title Slide".
    pub fn name(&self) -> Result<String> {
        common_slide_name(&self.xml)
    }

    /// Handle of the slide master part.
    pub fn slide_master_id(&self) -> Result<PartId> {
        self.slide_master.ok_or_else(|| {
            OpcError::RelationshipNotFound(format!(
                "slide layout '{}' has no slide master",
                self.xml.partname()
            ))
        })
    }

    #[inline]
    pub fn xml_part(&self) -> &XmlPart {
        &self.xml
    }
}

impl LoadPart for SlideLayoutPart {
    fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Self> {
        Ok(Self {
            xml: XmlPart::load(partname, content_type, blob)?,
            slide_master: None,
        })
    }
}

impl Part for SlideLayoutPart {
    fn partname(&self) -> &PackURI {
        self.xml.partname()
    }

    fn content_type(&self) -> &str {
        self.xml.content_type()
    }

    fn blob(&self) -> &[u8] {
        self.xml.blob()
    }

    fn rels(&self) -> &Relationships {
        self.xml.rels()
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        self.xml.rels_mut()
    }

    fn after_unmarshal(&mut self) -> Result<()> {
        self.slide_master = single_target(self.xml.rels(), rt::SLIDE_MASTER)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
