//! Low-level, read-only API to a serialized Open Packaging Convention (OPC) package.
//!
//! This module provides the PackageReader, which turns the members of a physical
//! package into serialized parts and serialized relationships: plain records with
//! string references that the unmarshaller later resolves into the part graph.

use crate::ooxml::opc::constants::target_mode;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Read, Seek};

/// Serialized part as loaded from the physical package, before being turned into
/// a Part object.
#[derive(Debug, Clone)]
pub struct SerializedPart {
    /// The partname (URI) of this part
    pub partname: PackURI,

    /// The content type of this part
    pub content_type: String,

    /// The relationship type of the first relationship found pointing at this part
    pub reltype: String,

    /// The binary content of this part
    pub blob: Vec<u8>,
}

/// Serialized relationship as read from a .rels file.
///
/// Contains all relationship information in string form, before being converted
/// into a Relationship with a resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRelationship {
    /// Base URI of the source, for resolving relative references
    pub base_uri: String,

    /// Relationship ID (e.g., "rId1")
    pub r_id: String,

    /// Relationship type URI
    pub reltype: String,

    /// Target reference (relative URI or external URL)
    pub target_ref: String,

    /// Target mode (Internal or External)
    pub target_mode: String,
}

impl SerializedRelationship {
    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == target_mode::EXTERNAL
    }

    /// Get the target partname for internal relationships.
    ///
    /// Resolves the relative target reference against the base URI to produce an
    /// absolute PackURI.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external() {
            return Err(OpcError::InvalidOperation(format!(
                "relationship '{}' is external and has no target partname",
                self.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref)
    }
}

/// A serialized package the unmarshaller can consume.
///
/// Parts are taken before relationships; each is taken exactly once.
pub trait PackageSource {
    /// Hand over every serialized part.
    fn take_sparts(&mut self) -> Vec<SerializedPart>;

    /// Hand over every serialized relationship together with the partname of its
    /// source (`/` for package-level relationships).
    fn take_srels(&mut self) -> Vec<(PackURI, SerializedRelationship)>;
}

/// Content type map for looking up content types by part name or extension.
///
/// Implements the OPC content type discovery algorithm using Default and Override
/// elements from [Content_Types].xml.
#[derive(Debug, Default)]
pub struct ContentTypeMap {
    /// Maps lower-cased file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps lower-cased partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    /// Parse content types from [Content_Types].xml.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let is_default = match e.local_name().as_ref() {
                        b"Default" => Some(true),
                        b"Override" => Some(false),
                        _ => None,
                    };

                    if let Some(is_default) = is_default {
                        let mut key = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            let value = attr.decode_and_unescape_value(reader.decoder())?;
                            match attr.key.as_ref() {
                                b"Extension" | b"PartName" => key = Some(value.into_owned()),
                                b"ContentType" => content_type = Some(value.into_owned()),
                                _ => {},
                            }
                        }

                        if let (Some(key), Some(ct)) = (key, content_type) {
                            if is_default {
                                map.add_default(&key, ct);
                            } else {
                                map.add_override(&key, ct);
                            }
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "Content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Add a default content type mapping for a file extension.
    pub fn add_default(&mut self, extension: &str, content_type: String) {
        self.defaults.insert(extension.to_lowercase(), content_type);
    }

    /// Add an override content type mapping for a specific partname.
    pub fn add_override(&mut self, partname: &str, content_type: String) {
        self.overrides.insert(partname.to_lowercase(), content_type);
    }

    /// Get the content type for a partname.
    ///
    /// Overrides win over extension defaults; both comparisons ignore ASCII case.
    pub fn get(&self, pack_uri: &PackURI) -> Result<&str> {
        if let Some(ct) = self.overrides.get(&pack_uri.as_str().to_lowercase()) {
            return Ok(ct);
        }

        if let Some(ct) = self.defaults.get(&pack_uri.ext().to_lowercase()) {
            return Ok(ct);
        }

        Err(OpcError::ContentTypeNotFound(pack_uri.to_string()))
    }
}

/// Parse relationships XML into SerializedRelationship records, in document order.
///
/// `base_uri` is the base URI of the source the .rels file belongs to. Entries
/// missing one of `Id`, `Type` or `Target` are skipped.
pub fn parse_rels_xml(rels_xml: &[u8], base_uri: &str) -> Result<Vec<SerializedRelationship>> {
    let mut srels = Vec::new();
    let mut reader = Reader::from_reader(rels_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut r_id = None;
                    let mut reltype = None;
                    let mut target_ref = None;
                    let mut mode = target_mode::INTERNAL.to_string();

                    for attr in e.attributes() {
                        let attr = attr?;
                        let value = attr.decode_and_unescape_value(reader.decoder())?;
                        match attr.key.as_ref() {
                            b"Id" => r_id = Some(value.into_owned()),
                            b"Type" => reltype = Some(value.into_owned()),
                            b"Target" => target_ref = Some(value.into_owned()),
                            b"TargetMode" => mode = value.into_owned(),
                            _ => {},
                        }
                    }

                    if let (Some(r_id), Some(reltype), Some(target_ref)) = (r_id, reltype, target_ref)
                    {
                        srels.push(SerializedRelationship {
                            base_uri: base_uri.to_string(),
                            r_id,
                            reltype,
                            target_ref,
                            target_mode: mode,
                        });
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
            _ => {},
        }
        buf.clear();
    }

    Ok(srels)
}

/// Package reader that provides access to serialized parts and relationships.
///
/// Built either from a physical ZIP package, by walking the relationship graph from
/// the package relationships, or directly from in-memory records.
#[derive(Debug, Default)]
pub struct PackageReader {
    sparts: Vec<SerializedPart>,

    /// Relationships keyed by the partname of their source
    srels: Vec<(PackURI, SerializedRelationship)>,
}

impl PackageReader {
    /// Create a reader over already serialized parts and relationships.
    pub fn new(sparts: Vec<SerializedPart>, srels: Vec<(PackURI, SerializedRelationship)>) -> Self {
        Self { sparts, srels }
    }

    /// Read the package behind `phys_reader`.
    ///
    /// Parses [Content_Types].xml, then walks the relationship graph breadth-first
    /// starting at `_rels/.rels`. Only parts reachable through internal relationships
    /// are loaded. A relationship whose target has no archive member is still
    /// reported, so unmarshalling fails on it instead of silently losing the edge.
    pub fn from_phys_reader<R: Read + Seek>(phys_reader: &mut PhysPkgReader<R>) -> Result<Self> {
        let content_types_xml = phys_reader.content_types_xml()?;
        let content_types = ContentTypeMap::from_xml(&content_types_xml)?;

        let package_uri = PackURI::package();
        let pkg_srels = Self::load_rels(phys_reader, &package_uri)?;

        let mut sparts = Vec::new();
        let mut srels = Vec::new();
        let mut visited: HashSet<PackURI> = HashSet::new();
        let mut work_queue: VecDeque<(PackURI, String)> = VecDeque::new();

        Self::enqueue_targets(&pkg_srels, &mut visited, &mut work_queue);
        srels.extend(pkg_srels.into_iter().map(|srel| (package_uri.clone(), srel)));

        while let Some((partname, reltype)) = work_queue.pop_front() {
            if !phys_reader.contains(&partname) {
                tracing::warn!(partname = %partname, "relationship target has no package member");
                continue;
            }

            let part_srels = Self::load_rels(phys_reader, &partname)?;
            Self::enqueue_targets(&part_srels, &mut visited, &mut work_queue);

            let blob = phys_reader.blob_for(&partname)?;
            let content_type = content_types.get(&partname)?.to_string();

            srels.extend(part_srels.into_iter().map(|srel| (partname.clone(), srel)));
            sparts.push(SerializedPart {
                partname,
                content_type,
                reltype,
                blob,
            });
        }

        tracing::debug!(
            parts = sparts.len(),
            relationships = srels.len(),
            "read serialized package"
        );

        Ok(Self { sparts, srels })
    }

    /// Load the relationships of `source_uri`; a missing .rels file means none.
    fn load_rels<R: Read + Seek>(
        phys_reader: &mut PhysPkgReader<R>,
        source_uri: &PackURI,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        match phys_reader.rels_xml_for(source_uri)? {
            Some(xml) => Ok(parse_rels_xml(&xml, source_uri.base_uri())?.into()),
            None => Ok(SmallVec::new()),
        }
    }

    fn enqueue_targets(
        srels: &[SerializedRelationship],
        visited: &mut HashSet<PackURI>,
        work_queue: &mut VecDeque<(PackURI, String)>,
    ) {
        for srel in srels.iter().filter(|srel| !srel.is_external()) {
            // unresolvable references are left for the unmarshaller to report
            if let Ok(partname) = srel.target_partname() {
                if visited.insert(partname.clone()) {
                    work_queue.push_back((partname, srel.reltype.clone()));
                }
            }
        }
    }

    /// Get an iterator over all serialized parts.
    pub fn iter_sparts(&self) -> impl Iterator<Item = &SerializedPart> {
        self.sparts.iter()
    }

    /// Get an iterator over all serialized relationships and their source partnames.
    pub fn iter_srels(&self) -> impl Iterator<Item = (&PackURI, &SerializedRelationship)> {
        self.srels.iter().map(|(source, srel)| (source, srel))
    }
}

impl PackageSource for PackageReader {
    fn take_sparts(&mut self) -> Vec<SerializedPart> {
        std::mem::take(&mut self.sparts)
    }

    fn take_srels(&mut self) -> Vec<(PackURI, SerializedRelationship)> {
        std::mem::take(&mut self.srels)
    }
}
