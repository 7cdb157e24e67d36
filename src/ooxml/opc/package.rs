/// Objects that implement reading and writing OPC packages.
///
/// This module provides the main OpcPackage type, which represents an Open Packaging
/// Convention package in memory. It owns every part in an arena and the package-level
/// relationships, and provides the graph operations the rest of the crate builds on.
use crate::ooxml::opc::constants::relationship_type;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::factory::PartFactory;
use crate::ooxml::opc::options::{ReadOptions, WriteOptions};
use crate::ooxml::opc::packuri::{PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::{Part, PartId};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::pkgreader::{PackageReader, PackageSource};
use crate::ooxml::opc::pkgwriter::PackageWriter;
use crate::ooxml::opc::rel::Relationships;
use crate::ooxml::opc::unmarshal::Unmarshaller;
use crate::ooxml::pptx::parts::CorePropertiesPart;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Callback run on the package once unmarshalling has wired the whole graph.
///
/// An error aborts the unmarshal and leaves the package as it was before.
pub type PackageHook = fn(&OpcPackage) -> Result<()>;

/// Source of a relationship: the package itself or one of its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelSource {
    Package,
    Part(PartId),
}

impl From<PartId> for RelSource {
    fn from(id: PartId) -> Self {
        RelSource::Part(id)
    }
}

/// Main API class for working with OPC packages.
///
/// Parts are stored in insertion order and addressed by [`PartId`]. Relationships
/// refer to their target through that handle; since parts are never removed, a
/// handle handed out by a package stays valid for the package's lifetime.
pub struct OpcPackage {
    /// Package-level relationships
    rels: Relationships,

    /// Part arena, indexed by PartId
    parts: Vec<Box<dyn Part>>,

    /// Partname lookup into the arena
    index: HashMap<PackURI, PartId>,

    /// Main document part, located when the package is unmarshalled
    main_part: Option<PartId>,

    hook: Option<PackageHook>,
}

impl OpcPackage {
    /// Create a new empty OPC package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI.to_string()),
            parts: Vec::new(),
            index: HashMap::new(),
            main_part: None,
            hook: None,
        }
    }

    /// Open an OPC package from a file.
    ///
    /// # Example
    /// ```no_run
    /// use opcgraph::ooxml::opc::OpcPackage;
    ///
    /// let pkg = OpcPackage::open("deck.pptx")?;
    /// println!("{} parts", pkg.part_count());
    /// # Ok::<(), opcgraph::ooxml::opc::OpcError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ReadOptions::default())
    }

    /// Open an OPC package from a file with explicit read limits.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let mut phys_reader = PhysPkgReader::open(path, *options)?;
        Self::from_phys_reader(&mut phys_reader)
    }

    /// Load an OPC package from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, &ReadOptions::default())
    }

    /// Load an OPC package from a reader with explicit read limits.
    pub fn from_reader_with<R: Read + Seek>(reader: R, options: &ReadOptions) -> Result<Self> {
        let mut phys_reader = PhysPkgReader::with_options(reader, *options)?;
        Self::from_phys_reader(&mut phys_reader)
    }

    /// Load an OPC package from in-memory bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    fn from_phys_reader<R: Read + Seek>(phys_reader: &mut PhysPkgReader<R>) -> Result<Self> {
        let mut pkg_reader = PackageReader::from_phys_reader(phys_reader)?;
        let factory = PartFactory::global();
        Self::load(&mut pkg_reader, &factory)
    }

    /// Build a package from any serialized source using `factory`.
    pub fn load<S: PackageSource>(source: &mut S, factory: &PartFactory) -> Result<Self> {
        let mut package = Self::new();
        Unmarshaller::unmarshal(source, &mut package, factory)?;
        Ok(package)
    }

    /// Install a callback that runs after every part's `after_unmarshal` hook.
    pub fn set_after_unmarshal(&mut self, hook: PackageHook) {
        self.hook = Some(hook);
    }

    /// Package-level hook, run once the graph is complete.
    ///
    /// Locates the main document part, then runs the installed callback if any.
    pub(crate) fn after_unmarshal(&mut self) -> Result<()> {
        self.main_part = match self.rels.single_by_reltype(relationship_type::OFFICE_DOCUMENT) {
            Ok(rel) => Some(rel.target_part()?),
            Err(OpcError::RelationshipNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        match self.hook {
            Some(hook) => hook(self),
            None => Ok(()),
        }
    }

    /// Take ownership of an unmarshalled graph and run the package hook.
    ///
    /// `parts` must carry the ids following the current arena and `pkg_rels` replaces
    /// the package-level relationships. If the hook fails, everything is rolled back.
    pub(crate) fn commit_unmarshalled(
        &mut self,
        parts: Vec<Box<dyn Part>>,
        index: HashMap<PackURI, PartId>,
        pkg_rels: Relationships,
    ) -> Result<()> {
        let first_id = self.parts.len();
        let previous_rels = std::mem::replace(&mut self.rels, pkg_rels);
        let previous_main = self.main_part;

        self.parts.extend(parts);
        self.index
            .extend(index.iter().map(|(partname, id)| (partname.clone(), *id)));

        if let Err(e) = self.after_unmarshal() {
            self.parts.truncate(first_id);
            for partname in index.keys() {
                self.index.remove(partname);
            }
            self.rels = previous_rels;
            self.main_part = previous_main;
            return Err(e);
        }

        tracing::debug!(
            parts = self.parts.len(),
            relationships = self.rels.len(),
            "package unmarshalled"
        );
        Ok(())
    }

    /// Add a new part to the package.
    ///
    /// Fails with [`OpcError::DuplicatePartname`] if a part with the same partname
    /// is already present.
    pub fn add_part(&mut self, part: Box<dyn Part>) -> Result<PartId> {
        if self.index.contains_key(part.partname()) {
            return Err(OpcError::DuplicatePartname(part.partname().to_string()));
        }

        let id = PartId(self.parts.len());
        self.index.insert(part.partname().clone(), id);
        self.parts.push(part);
        Ok(id)
    }

    /// Get a part by handle.
    pub fn part(&self, id: PartId) -> Result<&dyn Part> {
        self.parts
            .get(id.index())
            .map(|b| &**b as &dyn Part)
            .ok_or_else(|| OpcError::PartNotFound(id.to_string()))
    }

    /// Get a mutable reference to a part by handle.
    pub fn part_mut(&mut self, id: PartId) -> Result<&mut dyn Part> {
        self.parts
            .get_mut(id.index())
            .map(|b| &mut **b as &mut dyn Part)
            .ok_or_else(|| OpcError::PartNotFound(id.to_string()))
    }

    /// Get a part as its concrete type.
    ///
    /// Fails with [`OpcError::InvalidOperation`] if the part is of another type.
    pub fn part_as<T: Part>(&self, id: PartId) -> Result<&T> {
        let part = self.part(id)?;
        part.as_any().downcast_ref::<T>().ok_or_else(|| {
            OpcError::InvalidOperation(format!(
                "part '{}' is not a {}",
                part.partname(),
                std::any::type_name::<T>()
            ))
        })
    }

    /// Get a part mutably as its concrete type.
    pub fn part_as_mut<T: Part>(&mut self, id: PartId) -> Result<&mut T> {
        let part = self.part_mut(id)?;
        let partname = part.partname().to_string();
        part.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
            OpcError::InvalidOperation(format!(
                "part '{}' is not a {}",
                partname,
                std::any::type_name::<T>()
            ))
        })
    }

    /// Get a part by its partname.
    pub fn part_by_name(&self, partname: &PackURI) -> Result<&dyn Part> {
        let id = self
            .part_id(partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))?;
        self.part(id)
    }

    /// Get the handle of the part named `partname`.
    #[inline]
    pub fn part_id(&self, partname: &PackURI) -> Option<PartId> {
        self.index.get(partname).copied()
    }

    /// Check if a part exists in the package.
    #[inline]
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.index.contains_key(partname)
    }

    /// Get an iterator over all parts in the package, in insertion order.
    pub fn iter_parts(&self) -> impl Iterator<Item = (PartId, &dyn Part)> {
        self.parts
            .iter()
            .enumerate()
            .map(|(i, b)| (PartId(i), &**b as &dyn Part))
    }

    /// Get the number of parts in the package.
    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Get a reference to the package-level relationships.
    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get the relationships whose source is `source`.
    pub fn rels_of(&self, source: RelSource) -> Result<&Relationships> {
        match source {
            RelSource::Package => Ok(&self.rels),
            RelSource::Part(id) => Ok(self.part(id)?.rels()),
        }
    }

    fn rels_of_mut(&mut self, source: RelSource) -> Result<&mut Relationships> {
        match source {
            RelSource::Package => {
                // the cached main part is only valid for the unmarshalled rels
                self.main_part = None;
                Ok(&mut self.rels)
            },
            RelSource::Part(id) => Ok(self.part_mut(id)?.rels_mut()),
        }
    }

    /// Relate `source` to the part `target`.
    ///
    /// Reuses an existing relationship of the same type to the same part, otherwise
    /// adds one with the first free rId. Returns the rId.
    pub fn relate_to(&mut self, source: RelSource, target: PartId, reltype: &str) -> Result<String> {
        let partname = self.part(target)?.partname().clone();
        let rels = self.rels_of_mut(source)?;
        Ok(rels.get_or_add(reltype, target, &partname).r_id().to_string())
    }

    /// Relate `source` to an external resource, returning the rId.
    pub fn relate_to_ext(&mut self, source: RelSource, url: &str, reltype: &str) -> Result<String> {
        Ok(self.rels_of_mut(source)?.get_or_add_ext_rel(reltype, url))
    }

    /// Follow the relationship `r_id` of `source` to its target part.
    pub fn related_part(&self, source: RelSource, r_id: &str) -> Result<&dyn Part> {
        let id = self.rels_of(source)?.get_by_id(r_id)?.target_part()?;
        self.part(id)
    }

    /// Get the part targeted by the single package-level relationship of `reltype`.
    pub fn part_by_reltype(&self, reltype: &str) -> Result<&dyn Part> {
        let id = self.rels.single_by_reltype(reltype)?.target_part()?;
        self.part(id)
    }

    /// Get a reference to the main document part.
    ///
    /// For a presentation, this is the presentation.xml part.
    pub fn main_document_part(&self) -> Result<&dyn Part> {
        match self.main_part {
            Some(id) => self.part(id),
            None => self.part_by_reltype(relationship_type::OFFICE_DOCUMENT),
        }
    }

    /// Find the next available partname for a part template.
    ///
    /// Useful for creating new parts with sequential numbering (e.g., slide1.xml,
    /// slide2.xml). The lowest unused number is chosen.
    ///
    /// # Example
    /// ```
    /// # use opcgraph::ooxml::opc::OpcPackage;
    /// let pkg = OpcPackage::new();
    /// let next = pkg.next_partname("/ppt/slides/slide%d.xml")?;
    /// assert_eq!(next.as_str(), "/ppt/slides/slide1.xml");
    /// # Ok::<(), opcgraph::ooxml::opc::OpcError>(())
    /// ```
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        if !template.contains("%d") {
            return Err(OpcError::InvalidPackUri(format!(
                "partname template '{}' has no %d placeholder",
                template
            )));
        }

        let mut n = 1u32;
        loop {
            let candidate = PackURI::new(template.replace("%d", &n.to_string()))?;
            if !self.contains_part(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Get the core properties part, adding a default one if the package has none.
    pub fn core_properties(&mut self) -> Result<&CorePropertiesPart> {
        let existing = match self.rels.single_by_reltype(relationship_type::CORE_PROPERTIES) {
            Ok(rel) => Some(rel.target_part()?),
            Err(OpcError::RelationshipNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let id = match existing {
            Some(id) => id,
            None => {
                let part = CorePropertiesPart::default_part()?;
                let id = self.add_part(Box::new(part))?;
                self.relate_to(RelSource::Package, id, relationship_type::CORE_PROPERTIES)?;
                id
            },
        };
        self.part_as::<CorePropertiesPart>(id)
    }

    /// Save the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PackageWriter::write(path, self)
    }

    /// Save the package to a file with explicit write options.
    pub fn save_with<P: AsRef<Path>>(&self, path: P, options: &WriteOptions) -> Result<()> {
        PackageWriter::write_with(path, self, options)
    }

    /// Serialize the package to ZIP bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self)
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OpcPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcPackage")
            .field("rels", &self.rels)
            .field("parts", &self.parts)
            .field("main_part", &self.main_part)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as ct;
    use crate::ooxml::opc::part::{BlobPart, XmlPart};
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn create_minimal_pptx() -> Vec<u8> {
        let mut zip_data = Vec::new();
        {
            let cursor = Cursor::new(&mut zip_data);
            let mut writer = ZipWriter::new(cursor);
            let options = SimpleFileOptions::default();

            writer.start_file("[Content_Types].xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
</Types>"#).unwrap();

            writer.start_file("_rels/.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("ppt/presentation.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#).unwrap();

            writer.finish().unwrap();
        }
        zip_data
    }

    fn xml_part(partname: &str) -> Box<dyn Part> {
        Box::new(XmlPart::new(
            PackURI::new(partname).unwrap(),
            ct::XML.to_string(),
            b"<x/>".to_vec(),
        ))
    }

    #[test]
    fn test_open_package() {
        let pkg = OpcPackage::from_bytes(&create_minimal_pptx()).unwrap();

        assert_eq!(pkg.part_count(), 1);
        let main_part = pkg.main_document_part().unwrap();
        assert_eq!(main_part.content_type(), ct::PML_PRESENTATION_MAIN);
        assert_eq!(main_part.partname().as_str(), "/ppt/presentation.xml");
    }

    #[test]
    fn test_second_office_document_is_ambiguous() {
        let mut pkg = OpcPackage::from_bytes(&create_minimal_pptx()).unwrap();
        let other = pkg.add_part(xml_part("/ppt/other.xml")).unwrap();
        pkg.relate_to(RelSource::Package, other, relationship_type::OFFICE_DOCUMENT).unwrap();

        assert!(matches!(
            pkg.main_document_part(),
            Err(OpcError::AmbiguousRelationship(_))
        ));
    }

    #[test]
    fn test_main_document_part_after_core_properties() {
        let mut pkg = OpcPackage::from_bytes(&create_minimal_pptx()).unwrap();
        pkg.core_properties().unwrap();

        let main_part = pkg.main_document_part().unwrap();
        assert_eq!(main_part.partname().as_str(), "/ppt/presentation.xml");
    }

    #[test]
    fn test_add_part_rejects_duplicates() {
        let mut pkg = OpcPackage::new();
        let id = pkg.add_part(xml_part("/a.xml")).unwrap();
        assert_eq!(id.index(), 0);
        assert!(matches!(
            pkg.add_part(xml_part("/a.xml")),
            Err(OpcError::DuplicatePartname(_))
        ));
        assert_eq!(pkg.part_count(), 1);
        assert_eq!(pkg.part_id(&PackURI::new("/a.xml").unwrap()), Some(id));
    }

    #[test]
    fn test_relate_to_reuses_relationship() {
        let mut pkg = OpcPackage::new();
        let slide = pkg.add_part(xml_part("/ppt/slides/slide1.xml")).unwrap();
        let layout = pkg.add_part(xml_part("/ppt/slideLayouts/slideLayout1.xml")).unwrap();

        let r_id = pkg
            .relate_to(slide.into(), layout, relationship_type::SLIDE_LAYOUT)
            .unwrap();
        let again = pkg
            .relate_to(slide.into(), layout, relationship_type::SLIDE_LAYOUT)
            .unwrap();
        assert_eq!(r_id, "rId1");
        assert_eq!(again, "rId1");

        let rel = pkg.part(slide).unwrap().rels().get_by_id("rId1").unwrap();
        assert_eq!(rel.target_ref(), "../slideLayouts/slideLayout1.xml");

        let related = pkg.related_part(slide.into(), "rId1").unwrap();
        assert_eq!(related.partname().as_str(), "/ppt/slideLayouts/slideLayout1.xml");
    }

    #[test]
    fn test_relate_to_ext_and_related_part() {
        let mut pkg = OpcPackage::new();
        let slide = pkg.add_part(xml_part("/ppt/slides/slide1.xml")).unwrap();

        let r_id = pkg
            .relate_to_ext(slide.into(), "https://example.com", relationship_type::HYPERLINK)
            .unwrap();
        assert_eq!(r_id, "rId1");
        assert!(matches!(
            pkg.related_part(slide.into(), &r_id),
            Err(OpcError::InvalidOperation(_))
        ));
        assert!(matches!(
            pkg.related_part(slide.into(), "rId9"),
            Err(OpcError::RelationshipNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_part_id() {
        let mut pkg = OpcPackage::new();
        let a = pkg.add_part(xml_part("/a.xml")).unwrap();
        let ghost = PartId(7);
        assert!(matches!(pkg.part(ghost), Err(OpcError::PartNotFound(_))));
        assert!(pkg.relate_to(a.into(), ghost, "http://x/rel").is_err());
        assert!(pkg.part(a).unwrap().rels().is_empty());
    }

    #[test]
    fn test_part_as() {
        let mut pkg = OpcPackage::new();
        let id = pkg
            .add_part(Box::new(BlobPart::new(
                PackURI::new("/ppt/media/image1.png").unwrap(),
                ct::PNG.to_string(),
                vec![1, 2, 3],
            )))
            .unwrap();
        assert_eq!(pkg.part_as::<BlobPart>(id).unwrap().blob(), &[1, 2, 3]);
        assert!(matches!(
            pkg.part_as::<XmlPart>(id),
            Err(OpcError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_next_partname() {
        let mut pkg = OpcPackage::new();
        pkg.add_part(xml_part("/ppt/slides/slide1.xml")).unwrap();
        pkg.add_part(xml_part("/ppt/slides/slide3.xml")).unwrap();

        let next = pkg.next_partname("/ppt/slides/slide%d.xml").unwrap();
        assert_eq!(next.as_str(), "/ppt/slides/slide2.xml");
        assert!(pkg.next_partname("/ppt/slides/slide.xml").is_err());
    }

    #[test]
    fn test_main_document_part_without_cache() {
        let mut pkg = OpcPackage::new();
        assert!(matches!(
            pkg.main_document_part(),
            Err(OpcError::RelationshipNotFound(_))
        ));

        let doc = pkg.add_part(xml_part("/ppt/presentation.xml")).unwrap();
        pkg.relate_to(RelSource::Package, doc, relationship_type::OFFICE_DOCUMENT)
            .unwrap();
        assert_eq!(
            pkg.main_document_part().unwrap().partname().as_str(),
            "/ppt/presentation.xml"
        );
    }

    #[test]
    fn test_core_properties_added_once() {
        let mut pkg = OpcPackage::new();
        let title = pkg.core_properties().unwrap().properties().title.clone();
        assert_eq!(title.as_deref(), Some("PowerPoint Presentation"));
        assert_eq!(pkg.part_count(), 1);
        assert_eq!(pkg.rels().len(), 1);

        pkg.core_properties().unwrap();
        assert_eq!(pkg.part_count(), 1);
        assert_eq!(pkg.rels().len(), 1);
    }
}
