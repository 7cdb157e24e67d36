//! Provides a general interface to a physical OPC package (ZIP file).
//!
//! This module handles the low-level reading and writing of ZIP members. Everything
//! above it speaks in PackURIs; member names are derived from them here.

use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::options::{Compression, ReadOptions, WriteOptions};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Upper bound on the buffer reserved from a member's declared size.
const MAX_INITIAL_CAPACITY: u64 = 16 * 1024 * 1024;

/// Physical package reader that provides access to the members of a ZIP-based OPC
/// package.
///
/// Every member read is counted against the limits in [`ReadOptions`].
pub struct PhysPkgReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    options: ReadOptions,
    total_read: u64,
}

impl<R: Read + Seek> PhysPkgReader<R> {
    /// Open a ZIP archive with default limits.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, ReadOptions::default())
    }

    /// Open a ZIP archive with explicit limits.
    pub fn with_options(reader: R, options: ReadOptions) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self {
            archive,
            options,
            total_read: 0,
        })
    }

    /// Get the binary content of a member by its PackURI.
    ///
    /// Fails with [`OpcError::PartNotFound`] if there is no such member and with
    /// [`OpcError::PackageTooLarge`] if a size limit would be exceeded.
    pub fn blob_for(&mut self, pack_uri: &PackURI) -> Result<Vec<u8>> {
        let mut file = match self.archive.by_name(pack_uri.membername()) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(OpcError::PartNotFound(pack_uri.to_string()));
            },
            Err(e) => return Err(e.into()),
        };

        let declared = file.size();
        if declared > self.options.max_part_bytes {
            return Err(OpcError::PackageTooLarge(format!(
                "member '{}' inflates to {} bytes (limit {})",
                pack_uri, declared, self.options.max_part_bytes
            )));
        }

        // the declared size is not trusted; read at most one byte past the limit
        let mut blob = Vec::with_capacity(declared.min(MAX_INITIAL_CAPACITY) as usize);
        (&mut file)
            .take(self.options.max_part_bytes.saturating_add(1))
            .read_to_end(&mut blob)?;
        let read = blob.len() as u64;
        if read > self.options.max_part_bytes {
            return Err(OpcError::PackageTooLarge(format!(
                "member '{}' exceeds {} bytes",
                pack_uri, self.options.max_part_bytes
            )));
        }

        self.total_read = self.total_read.saturating_add(read);
        if self.total_read > self.options.max_total_bytes {
            return Err(OpcError::PackageTooLarge(format!(
                "package exceeds {} inflated bytes",
                self.options.max_total_bytes
            )));
        }

        Ok(blob)
    }

    /// Get the [Content_Types].xml content.
    ///
    /// This is a required member of every OPC package.
    pub fn content_types_xml(&mut self) -> Result<Vec<u8>> {
        self.blob_for(&PackURI::new(CONTENT_TYPES_URI)?)
    }

    /// Get the relationships XML for a source (part or package).
    ///
    /// Returns None if the source has no relationships member.
    pub fn rels_xml_for(&mut self, source_uri: &PackURI) -> Result<Option<Vec<u8>>> {
        match self.blob_for(&source_uri.rels_uri()) {
            Ok(blob) => Ok(Some(blob)),
            Err(OpcError::PartNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check if a specific member exists in the package.
    pub fn contains(&self, pack_uri: &PackURI) -> bool {
        self.archive.index_for_name(pack_uri.membername()).is_some()
    }

    /// List all member names in the package, directories excluded.
    pub fn member_names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(String::from)
            .collect()
    }

    /// Get the number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Check if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }
}

impl PhysPkgReader<BufReader<File>> {
    /// Open an OPC package from a file path.
    ///
    /// # Errors
    /// Returns [`OpcError::PackageNotFound`] if the file doesn't exist, and a ZIP
    /// error if it isn't a valid archive.
    pub fn open<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        Self::with_options(BufReader::new(file), options)
    }
}

/// Physical package writer for creating OPC packages in memory.
pub struct PhysPkgWriter {
    archive: ZipWriter<Cursor<Vec<u8>>>,
    file_options: SimpleFileOptions,
}

impl PhysPkgWriter {
    /// Create a new package writer with default options (Deflate).
    pub fn new() -> Self {
        Self::with_options(WriteOptions::default())
    }

    /// Create a new package writer.
    pub fn with_options(options: WriteOptions) -> Self {
        let method = match options.compression {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        };
        Self {
            archive: ZipWriter::new(Cursor::new(Vec::new())),
            file_options: SimpleFileOptions::default().compression_method(method),
        }
    }

    /// Write one member.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        self.archive
            .start_file(pack_uri.membername(), self.file_options)?;
        self.archive.write_all(blob)?;
        Ok(())
    }

    /// Finish writing and return the package bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.archive.finish()?.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_for(bytes: Vec<u8>, options: ReadOptions) -> PhysPkgReader<Cursor<Vec<u8>>> {
        PhysPkgReader::with_options(Cursor::new(bytes), options).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let mut writer = PhysPkgWriter::new();
        let pack_uri = PackURI::new("/ppt/presentation.xml").unwrap();
        writer.write(&pack_uri, b"<p:presentation/>").unwrap();
        let zip_data = writer.finish().unwrap();

        let mut reader = reader_for(zip_data, ReadOptions::default());
        assert!(reader.contains(&pack_uri));
        assert_eq!(reader.blob_for(&pack_uri).unwrap(), b"<p:presentation/>");
        assert_eq!(reader.member_names(), vec!["ppt/presentation.xml".to_string()]);
    }

    #[test]
    fn test_missing_members() {
        let mut writer = PhysPkgWriter::with_options(WriteOptions {
            compression: Compression::Stored,
        });
        let doc = PackURI::new("/ppt/presentation.xml").unwrap();
        writer.write(&doc, b"<p:presentation/>").unwrap();
        let mut reader = reader_for(writer.finish().unwrap(), ReadOptions::default());

        let missing = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert!(!reader.contains(&missing));
        assert!(matches!(
            reader.blob_for(&missing),
            Err(OpcError::PartNotFound(_))
        ));
        assert!(reader.rels_xml_for(&doc).unwrap().is_none());
        assert!(matches!(
            reader.content_types_xml(),
            Err(OpcError::PartNotFound(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PhysPkgReader::open(dir.path().join("missing.pptx"), ReadOptions::default());
        assert!(matches!(result, Err(OpcError::PackageNotFound(_))));
    }

    #[test]
    fn test_part_size_limit() {
        let mut writer = PhysPkgWriter::new();
        let big = PackURI::new("/ppt/media/image1.png").unwrap();
        writer.write(&big, &[0u8; 4096]).unwrap();
        let options = ReadOptions {
            max_part_bytes: 1024,
            max_total_bytes: 1 << 20,
        };
        let mut reader = reader_for(writer.finish().unwrap(), options);

        assert!(matches!(
            reader.blob_for(&big),
            Err(OpcError::PackageTooLarge(_))
        ));
    }

    #[test]
    fn test_total_size_limit() {
        let mut writer = PhysPkgWriter::new();
        let a = PackURI::new("/a.bin").unwrap();
        let b = PackURI::new("/b.bin").unwrap();
        writer.write(&a, &[1u8; 600]).unwrap();
        writer.write(&b, &[2u8; 600]).unwrap();
        let options = ReadOptions {
            max_part_bytes: 1000,
            max_total_bytes: 1000,
        };
        let mut reader = reader_for(writer.finish().unwrap(), options);

        assert!(reader.blob_for(&a).is_ok());
        assert!(matches!(
            reader.blob_for(&b),
            Err(OpcError::PackageTooLarge(_))
        ));
    }

    #[test]
    fn test_unbounded_limits() {
        let mut writer = PhysPkgWriter::new();
        let a = PackURI::new("/a.bin").unwrap();
        let b = PackURI::new("/b.bin").unwrap();
        writer.write(&a, &[1u8; 600]).unwrap();
        writer.write(&b, &[2u8; 600]).unwrap();
        let options = ReadOptions {
            max_part_bytes: u64::MAX,
            max_total_bytes: u64::MAX,
        };
        let mut reader = reader_for(writer.finish().unwrap(), options);

        assert_eq!(reader.blob_for(&a).unwrap(), vec![1u8; 600]);
        assert_eq!(reader.blob_for(&b).unwrap(), vec![2u8; 600]);
    }
}
