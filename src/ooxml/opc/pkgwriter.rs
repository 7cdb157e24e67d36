//! Package writer for OPC packages.
//!
//! This module serializes an in-memory package graph to a ZIP archive: the
//! [Content_Types].xml item, the package relationships, and every part together with
//! its relationships.

use crate::common::xml::escape_xml;
use crate::ooxml::opc::constants::{content_type as ct, namespace};
use crate::ooxml::opc::error::Result;
use crate::ooxml::opc::options::WriteOptions;
use crate::ooxml::opc::package::OpcPackage;
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use crate::ooxml::opc::phys_pkg::PhysPkgWriter;
use std::collections::BTreeMap;
use std::path::Path;

/// Package writer that serializes an OPC package to a ZIP file.
///
/// Writes, in order:
/// - [Content_Types].xml
/// - _rels/.rels (package relationships)
/// - every part and, when it has any, its relationships
///
/// # Example
///
/// ```no_run
/// use opcgraph::ooxml::opc::{OpcPackage, PackageWriter};
///
/// let pkg = OpcPackage::open("in.pptx")?;
/// PackageWriter::write("out.pptx", &pkg)?;
/// # Ok::<(), opcgraph::ooxml::opc::OpcError>(())
/// ```
pub struct PackageWriter;

impl PackageWriter {
    /// Write an OPC package to a file.
    pub fn write<P: AsRef<Path>>(path: P, package: &OpcPackage) -> Result<()> {
        Self::write_with(path, package, &WriteOptions::default())
    }

    /// Write an OPC package to a file with explicit write options.
    pub fn write_with<P: AsRef<Path>>(
        path: P,
        package: &OpcPackage,
        options: &WriteOptions,
    ) -> Result<()> {
        let bytes = Self::to_bytes_with(package, options)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Write an OPC package to a stream.
    pub fn write_to_stream<W: std::io::Write>(mut writer: W, package: &OpcPackage) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Serialize an OPC package to bytes.
    pub fn to_bytes(package: &OpcPackage) -> Result<Vec<u8>> {
        Self::to_bytes_with(package, &WriteOptions::default())
    }

    /// Serialize an OPC package to bytes with explicit write options.
    pub fn to_bytes_with(package: &OpcPackage, options: &WriteOptions) -> Result<Vec<u8>> {
        let mut phys_writer = PhysPkgWriter::with_options(*options);

        Self::write_content_types(&mut phys_writer, package)?;
        Self::write_pkg_rels(&mut phys_writer, package)?;
        Self::write_parts(&mut phys_writer, package)?;

        let bytes = phys_writer.finish()?;
        tracing::debug!(
            parts = package.part_count(),
            bytes = bytes.len(),
            compression = ?options.compression,
            "wrote package"
        );
        Ok(bytes)
    }

    fn write_content_types(phys_writer: &mut PhysPkgWriter, package: &OpcPackage) -> Result<()> {
        let cti = ContentTypesItem::from_package(package);
        phys_writer.write(&PackURI::new(CONTENT_TYPES_URI)?, cti.to_xml().as_bytes())
    }

    fn write_pkg_rels(phys_writer: &mut PhysPkgWriter, package: &OpcPackage) -> Result<()> {
        let rels_uri = PackURI::package().rels_uri();
        phys_writer.write(&rels_uri, package.rels().to_xml().as_bytes())
    }

    fn write_parts(phys_writer: &mut PhysPkgWriter, package: &OpcPackage) -> Result<()> {
        for (_, part) in package.iter_parts() {
            phys_writer.write(part.partname(), part.blob())?;

            if !part.rels().is_empty() {
                let rels_uri = part.partname().rels_uri();
                phys_writer.write(&rels_uri, part.rels().to_xml().as_bytes())?;
            }
        }

        Ok(())
    }
}

/// Helper for building [Content_Types].xml content.
///
/// Well-known extension/content-type pairs become Default elements, everything else
/// an Override for the specific partname. Both are emitted sorted.
struct ContentTypesItem {
    /// Default content types by extension
    defaults: BTreeMap<String, String>,

    /// Override content types by partname
    overrides: BTreeMap<String, String>,
}

impl ContentTypesItem {
    fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());

        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    fn from_package(package: &OpcPackage) -> Self {
        let mut cti = Self::new();
        for (_, part) in package.iter_parts() {
            cti.add_content_type(part.partname(), part.content_type());
        }
        cti
    }

    fn add_content_type(&mut self, partname: &PackURI, content_type: &str) {
        let ext = partname.ext().to_lowercase();
        if Self::is_default_content_type(&ext, content_type) {
            self.defaults.insert(ext, content_type.to_string());
        } else {
            self.overrides
                .insert(partname.to_string(), content_type.to_string());
        }
    }

    fn is_default_content_type(ext: &str, content_type: &str) -> bool {
        matches!(
            (ext, content_type),
            ("rels", ct::OPC_RELATIONSHIPS)
                | ("xml", ct::XML)
                | ("bmp", ct::BMP)
                | ("gif", ct::GIF)
                | ("jpg", ct::JPEG)
                | ("jpeg", ct::JPEG)
                | ("png", ct::PNG)
                | ("tif", ct::TIFF)
                | ("tiff", ct::TIFF)
                | ("emf", ct::X_EMF)
                | ("wmf", ct::X_WMF)
        )
    }

    fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(
            256 + self.defaults.len() * 96 + self.overrides.len() * 160,
        );

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<Types xmlns=""#);
        xml.push_str(namespace::OPC_CONTENT_TYPES);
        xml.push_str(r#"">"#);
        xml.push('\n');

        for (ext, content_type) in &self.defaults {
            xml.push_str(&format!(
                r#"  <Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            ));
            xml.push('\n');
        }

        for (partname, content_type) in &self.overrides {
            xml.push_str(&format!(
                r#"  <Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(content_type)
            ));
            xml.push('\n');
        }

        xml.push_str("</Types>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::part::{BlobPart, XmlPart};
    use crate::ooxml::opc::pkgreader::ContentTypeMap;

    fn sample_package() -> OpcPackage {
        let mut pkg = OpcPackage::new();
        pkg.add_part(Box::new(XmlPart::new(
            PackURI::new("/ppt/presentation.xml").unwrap(),
            ct::PML_PRESENTATION_MAIN.to_string(),
            b"<p:presentation/>".to_vec(),
        )))
        .unwrap();
        pkg.add_part(Box::new(BlobPart::new(
            PackURI::new("/ppt/media/image1.PNG").unwrap(),
            ct::PNG.to_string(),
            vec![0x89, 0x50],
        )))
        .unwrap();
        pkg
    }

    #[test]
    fn test_content_types_xml() {
        let cti = ContentTypesItem::from_package(&sample_package());
        let xml = cti.to_xml();

        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Default Extension="rels""#));
        assert!(xml.contains(r#"<Override PartName="/ppt/presentation.xml""#));
        assert!(!xml.contains("image1.PNG"));
    }

    #[test]
    fn test_content_types_round_trip_through_reader() {
        let pkg = sample_package();
        let xml = ContentTypesItem::from_package(&pkg).to_xml();
        let map = ContentTypeMap::from_xml(xml.as_bytes()).unwrap();

        for (_, part) in pkg.iter_parts() {
            assert_eq!(map.get(part.partname()).unwrap(), part.content_type());
        }
    }
}
