/// Core document properties part (`/docProps/core.xml`).
///
/// Core properties follow the Dublin Core metadata standard plus the OPC
/// `cp:` extensions.
use crate::common::xml::{escape_xml, push_text_event};
use crate::ooxml::opc::constants::{content_type as ct, namespace};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{LoadPart, Part};
use crate::ooxml::opc::rel::Relationships;
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::any::Any;

/// Partname used when a package gets a fresh core properties part.
pub const CORE_PROPERTIES_PARTNAME: &str = "/docProps/core.xml";

const W3CDTF_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Document metadata carried by the core properties part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub revision: Option<u32>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub last_printed: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub content_status: Option<String>,
    pub identifier: Option<String>,
    pub language: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Subject,
    Creator,
    Keywords,
    Description,
    LastModifiedBy,
    Revision,
    Created,
    Modified,
    LastPrinted,
    Category,
    ContentStatus,
    Identifier,
    Language,
    Version,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        let field = match name {
            b"title" => Field::Title,
            b"subject" => Field::Subject,
            b"creator" => Field::Creator,
            b"keywords" => Field::Keywords,
            b"description" => Field::Description,
            b"lastModifiedBy" => Field::LastModifiedBy,
            b"revision" => Field::Revision,
            b"created" => Field::Created,
            b"modified" => Field::Modified,
            b"lastPrinted" => Field::LastPrinted,
            b"category" => Field::Category,
            b"contentStatus" => Field::ContentStatus,
            b"identifier" => Field::Identifier,
            b"language" => Field::Language,
            b"version" => Field::Version,
            _ => return None,
        };
        Some(field)
    }
}

impl CoreProperties {
    /// Properties of a newly created presentation.
    pub fn new_default() -> Self {
        Self {
            title: Some("PowerPoint Presentation".to_string()),
            last_modified_by: Some("opcgraph".to_string()),
            revision: Some(1),
            modified: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Parse core properties XML.
    ///
    /// Elements are matched by local name. Empty elements, unknown elements, and
    /// revisions or dates that do not parse are ignored.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        // entities arrive as separate events, so trim only the joined text
        let mut reader = Reader::from_reader(xml);

        let mut props = Self::default();

        loop {
            let field = match reader.read_event()? {
                Event::Start(e) => Field::from_local_name(e.local_name().as_ref()),
                Event::Eof => break,
                _ => None,
            };

            if let Some(field) = field {
                let text = read_element_text(&mut reader)?;
                let text = text.trim();
                if !text.is_empty() {
                    props.set(field, text.to_string());
                }
            }
        }

        Ok(props)
    }

    fn set(&mut self, field: Field, text: String) {
        match field {
            Field::Title => self.title = Some(text),
            Field::Subject => self.subject = Some(text),
            Field::Creator => self.creator = Some(text),
            Field::Keywords => self.keywords = Some(text),
            Field::Description => self.description = Some(text),
            Field::LastModifiedBy => self.last_modified_by = Some(text),
            Field::Revision => self.revision = text.trim().parse().ok(),
            Field::Created => self.created = parse_datetime(&text),
            Field::Modified => self.modified = parse_datetime(&text),
            Field::LastPrinted => self.last_printed = parse_datetime(&text),
            Field::Category => self.category = Some(text),
            Field::ContentStatus => self.content_status = Some(text),
            Field::Identifier => self.identifier = Some(text),
            Field::Language => self.language = Some(text),
            Field::Version => self.version = Some(text),
        }
    }

    /// Serialize to core properties XML. Unset properties are omitted.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<cp:coreProperties xmlns:cp="{}" xmlns:dc="{}" xmlns:dcterms="{}" xmlns:xsi="{}">"#,
            namespace::OPC_CORE_PROPERTIES,
            namespace::DC,
            namespace::DCTERMS,
            namespace::XSI
        ));

        push_text_element(&mut xml, "dc:title", self.title.as_deref());
        push_text_element(&mut xml, "dc:subject", self.subject.as_deref());
        push_text_element(&mut xml, "dc:creator", self.creator.as_deref());
        push_text_element(&mut xml, "cp:keywords", self.keywords.as_deref());
        push_text_element(&mut xml, "dc:description", self.description.as_deref());
        push_text_element(&mut xml, "cp:lastModifiedBy", self.last_modified_by.as_deref());
        if let Some(revision) = self.revision {
            push_text_element(&mut xml, "cp:revision", Some(revision.to_string().as_str()));
        }
        push_date_element(&mut xml, "dcterms:created", self.created);
        push_date_element(&mut xml, "dcterms:modified", self.modified);
        if let Some(dt) = self.last_printed {
            let printed = dt.format(W3CDTF_FORMAT).to_string();
            push_text_element(&mut xml, "cp:lastPrinted", Some(printed.as_str()));
        }
        push_text_element(&mut xml, "cp:category", self.category.as_deref());
        push_text_element(&mut xml, "cp:contentStatus", self.content_status.as_deref());
        push_text_element(&mut xml, "dc:identifier", self.identifier.as_deref());
        push_text_element(&mut xml, "dc:language", self.language.as_deref());
        push_text_element(&mut xml, "cp:version", self.version.as_deref());

        xml.push_str("</cp:coreProperties>");
        xml
    }
}

fn push_text_element(xml: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        xml.push_str(&format!("<{name}>{}</{name}>", escape_xml(value)));
    }
}

fn push_date_element(xml: &mut String, name: &str, value: Option<DateTime<Utc>>) {
    if let Some(dt) = value {
        xml.push_str(&format!(
            r#"<{name} xsi:type="dcterms:W3CDTF">{}</{name}>"#,
            dt.format(W3CDTF_FORMAT)
        ));
    }
}

/// Read the character data of the element just opened, consuming its end tag.
fn read_element_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(OpcError::XmlError(
                    "unexpected end of core properties".to_string(),
                ));
            },
            _ => {
                push_text_event(&mut text, &event)?;
            },
        }
    }

    Ok(text)
}

/// Parse a W3CDTF timestamp, assuming UTC when no offset is given.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

/// The core properties part, with its properties parsed on load.
///
/// The blob is regenerated whenever the properties are replaced.
#[derive(Debug)]
pub struct CorePropertiesPart {
    partname: PackURI,
    content_type: String,
    blob: Vec<u8>,
    rels: Relationships,
    properties: CoreProperties,
}

impl CorePropertiesPart {
    /// Create a part holding `properties`.
    pub fn new(partname: PackURI, properties: CoreProperties) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            blob: properties.to_xml().into_bytes(),
            partname,
            content_type: ct::OPC_CORE_PROPERTIES.to_string(),
            rels,
            properties,
        }
    }

    /// A core properties part for a new presentation, at `/docProps/core.xml`.
    pub fn default_part() -> Result<Self> {
        let partname = PackURI::new(CORE_PROPERTIES_PARTNAME)?;
        Ok(Self::new(partname, CoreProperties::new_default()))
    }

    #[inline]
    pub fn properties(&self) -> &CoreProperties {
        &self.properties
    }

    /// Replace the properties and reserialize the part.
    pub fn set_properties(&mut self, properties: CoreProperties) {
        self.blob = properties.to_xml().into_bytes();
        self.properties = properties;
    }
}

impl LoadPart for CorePropertiesPart {
    fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Self> {
        let properties = CoreProperties::parse(&blob)?;
        let rels = Relationships::new(partname.base_uri().to_string());
        Ok(Self {
            partname,
            content_type,
            blob,
            rels,
            properties,
        })
    }
}

impl Part for CorePropertiesPart {
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
}
