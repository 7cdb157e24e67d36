use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::rel::Relationships;
use memchr::memmem;
use quick_xml::Reader;
use quick_xml::events::Event;
/// Open Packaging Convention (OPC) objects related to package parts.
///
/// This module provides the Part trait and the generic BlobPart and XmlPart
/// implementations. Parts are the fundamental units of content in an OPC package,
/// each with a unique partname, content type, and relationships of its own.
use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;

/// Handle of a part inside its package.
///
/// Parts live in an arena owned by the package; relationships refer to their
/// targets through this handle rather than owning them. Handles are never reused
/// since parts are never removed from a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(pub(crate) usize);

impl PartId {
    /// Position of the part in package insertion order.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for PartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trait representing a part in an OPC package.
///
/// Parts are the fundamental units of content in an OPC package. Each part
/// has a unique partname (PackURI), a content type, and relationships to other
/// parts or external resources.
pub trait Part: Any + std::fmt::Debug {
    /// Get the partname of this part.
    fn partname(&self) -> &PackURI;

    /// Get the content type of this part.
    fn content_type(&self) -> &str;

    /// Get the serialized content of this part.
    fn blob(&self) -> &[u8];

    /// Get the relationships for this part.
    fn rels(&self) -> &Relationships;

    /// Get mutable access to the relationships for this part.
    fn rels_mut(&mut self) -> &mut Relationships;

    /// Called once the whole package graph has been unmarshalled.
    ///
    /// Every relationship of this part is wired when this runs. Sibling parts may
    /// or may not have had their own hook called yet.
    fn after_unmarshal(&mut self) -> Result<()> {
        Ok(())
    }

    /// Upcast for downcasting to a concrete part type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to a concrete part type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Get the target reference for a relationship ID.
    fn target_ref(&self, r_id: &str) -> Result<Cow<'_, str>> {
        Ok(self.rels().get_by_id(r_id)?.target_ref())
    }

    /// Count references to a relationship ID in the part content.
    ///
    /// Looks for `r:id="rIdN"` attributes. For non-XML parts this is 0.
    fn rel_ref_count(&self, r_id: &str) -> usize {
        let pattern = format!(r#"r:id="{}""#, r_id);
        let finder = memmem::Finder::new(pattern.as_bytes());
        finder.find_iter(self.blob()).count()
    }
}

/// Construction entry point used by the part factory.
///
/// Implement this for a part type to make it registrable against a content type.
pub trait LoadPart: Part + Sized {
    /// Build the part from its serialized form.
    fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Self>;
}

/// A basic implementation of a Part that stores binary content.
///
/// This is the default part type for non-XML content such as images.
#[derive(Debug)]
pub struct BlobPart {
    partname: PackURI,
    content_type: String,
    blob: Vec<u8>,
    rels: Relationships,
}

impl BlobPart {
    /// Create a new BlobPart.
    pub fn new(partname: PackURI, content_type: String, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob,
            rels,
        }
    }
}

impl LoadPart for BlobPart {
    fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Self> {
        Ok(Self::new(partname, content_type, blob))
    }
}

impl Part for BlobPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> &[u8] {
        &self.blob
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn rel_ref_count(&self, _r_id: &str) -> usize {
        0
    }
}

/// An XML part that provides parsed access to its XML content.
///
/// The XML is kept as raw UTF-8 bytes and parsed on demand with quick-xml.
#[derive(Debug)]
pub struct XmlPart {
    partname: PackURI,
    content_type: String,
    xml_bytes: Vec<u8>,
    rels: Relationships,
}

impl XmlPart {
    /// Create a new XmlPart without validating its content.
    pub fn new(partname: PackURI, content_type: String, xml_bytes: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            xml_bytes,
            rels,
        }
    }

    /// Get a reader for parsing the XML content.
    pub fn reader(&self) -> Reader<&[u8]> {
        let mut reader = Reader::from_reader(self.xml_bytes.as_slice());
        reader.config_mut().trim_text(true);
        reader
    }

    /// Find all elements matching a local name and collect their attributes.
    ///
    /// Returns one map per matching element, keyed by the qualified attribute name.
    pub fn find_elements_with_attrs(
        &self,
        element_name: &str,
    ) -> Result<Vec<HashMap<String, String>>> {
        let mut reader = self.reader();
        let mut buf = Vec::new();
        let mut results = Vec::new();
        let element_name_bytes = element_name.as_bytes();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == element_name_bytes {
                        let mut attrs = HashMap::new();
                        for attr in e.attributes() {
                            let attr = attr?;
                            let key = std::str::from_utf8(attr.key.as_ref())?;
                            let value = attr.decode_and_unescape_value(reader.decoder())?;
                            attrs.insert(key.to_string(), value.into_owned());
                        }
                        results.push(attrs);
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("XML parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }

        Ok(results)
    }

    /// Get the XML content as a UTF-8 string.
    pub fn xml_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.xml_bytes).map_err(Into::into)
    }
}

impl LoadPart for XmlPart {
    /// Fails with [`OpcError::XmlError`] if the content is not UTF-8.
    fn load(partname: PackURI, content_type: String, xml_bytes: Vec<u8>) -> Result<Self> {
        std::str::from_utf8(&xml_bytes).map_err(|e| {
            OpcError::XmlError(format!("Invalid UTF-8 in XML part '{}': {}", partname, e))
        })?;

        Ok(Self::new(partname, content_type, xml_bytes))
    }
}

impl Part for XmlPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> &[u8] {
        &self.xml_bytes
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
