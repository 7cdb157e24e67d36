//! Content-type driven construction of parts.
//!
//! The factory maps declared content types to loader functions. Anything without a
//! registered loader goes to the default loader, which picks [`XmlPart`] for XML
//! content types and [`BlobPart`] for everything else.
//!
//! A process-wide factory, pre-populated with the built-in presentation part types,
//! is available through [`PartFactory::global`]. Register custom types with
//! [`register_part_type`] during start-up, before any package is opened.

use crate::ooxml::opc::error::Result;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{BlobPart, LoadPart, Part, XmlPart};
use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::HashMap;

/// Constructor for a part from its serialized form.
pub type PartLoader = fn(PackURI, String, Vec<u8>) -> Result<Box<dyn Part>>;

static GLOBAL_FACTORY: Lazy<RwLock<PartFactory>> = Lazy::new(|| {
    let mut factory = PartFactory::new();
    crate::ooxml::pptx::parts::register_builtin(&mut factory);
    RwLock::new(factory)
});

/// Adapt a [`LoadPart`] implementation to a [`PartLoader`].
pub fn load_boxed<T: LoadPart>(
    partname: PackURI,
    content_type: String,
    blob: Vec<u8>,
) -> Result<Box<dyn Part>> {
    Ok(Box::new(T::load(partname, content_type, blob)?))
}

/// Default loader: [`XmlPart`] for XML content types, [`BlobPart`] otherwise.
pub fn load_default(
    partname: PackURI,
    content_type: String,
    blob: Vec<u8>,
) -> Result<Box<dyn Part>> {
    if is_xml_content_type(&content_type) {
        load_boxed::<XmlPart>(partname, content_type, blob)
    } else {
        load_boxed::<BlobPart>(partname, content_type, blob)
    }
}

/// Check if a content type represents XML content.
#[inline]
pub fn is_xml_content_type(content_type: &str) -> bool {
    content_type.ends_with("+xml") || content_type.ends_with("/xml")
}

/// Register a loader for `content_type` on the process-wide factory.
///
/// Call this during start-up, before any package is unmarshalled.
pub fn register_part_type<S: Into<String>>(content_type: S, loader: PartLoader) {
    GLOBAL_FACTORY.write().register(content_type, loader);
}

/// Registry of part loaders keyed by content type.
pub struct PartFactory {
    part_type_for: HashMap<String, PartLoader>,
    default_loader: PartLoader,
}

impl PartFactory {
    /// Create a factory with no registered types and the XML/blob default loader.
    pub fn new() -> Self {
        Self::with_default(load_default)
    }

    /// Create a factory with no registered types and a custom default loader.
    pub fn with_default(default_loader: PartLoader) -> Self {
        Self {
            part_type_for: HashMap::new(),
            default_loader,
        }
    }

    /// The process-wide factory.
    pub fn global() -> RwLockReadGuard<'static, PartFactory> {
        GLOBAL_FACTORY.read()
    }

    /// Register `loader` for parts declaring `content_type`, replacing any earlier one.
    pub fn register<S: Into<String>>(&mut self, content_type: S, loader: PartLoader) {
        self.part_type_for.insert(content_type.into(), loader);
    }

    /// Register the [`LoadPart`] implementation `T` for `content_type`.
    pub fn register_type<T: LoadPart, S: Into<String>>(&mut self, content_type: S) {
        self.register(content_type, load_boxed::<T>);
    }

    /// Replace the loader used for unregistered content types.
    pub fn set_default(&mut self, loader: PartLoader) {
        self.default_loader = loader;
    }

    /// Whether a dedicated loader exists for `content_type`.
    pub fn is_registered(&self, content_type: &str) -> bool {
        self.part_type_for.contains_key(content_type)
    }

    /// Construct a part.
    ///
    /// Uses the loader registered for `content_type`, or the default loader. Loader
    /// errors are returned as they are.
    pub fn create(
        &self,
        partname: PackURI,
        content_type: String,
        blob: Vec<u8>,
    ) -> Result<Box<dyn Part>> {
        let loader = self
            .part_type_for
            .get(content_type.as_str())
            .copied()
            .unwrap_or(self.default_loader);
        loader(partname, content_type, blob)
    }
}

impl Default for PartFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PartFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut content_types: Vec<&str> = self.part_type_for.keys().map(String::as_str).collect();
        content_types.sort_unstable();
        f.debug_struct("PartFactory")
            .field("content_types", &content_types)
            .finish_non_exhaustive()
    }
}
