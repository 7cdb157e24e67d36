/// Relationship-related objects for OPC packages.
///
/// This module provides types for managing relationships between parts in an OPC package,
/// including internal and external relationships.
use crate::common::xml::escape_xml;
use crate::ooxml::opc::constants::namespace;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::PartId;
use std::borrow::Cow;

/// The far end of a relationship.
///
/// Internal targets carry the arena handle of the target part together with its
/// partname, so the relative reference can be computed without going back to the
/// package. External targets are a raw URI that is never resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelTarget {
    Part { id: PartId, partname: PackURI },
    External(String),
}

impl RelTarget {
    /// Internal target pointing at the part `id` named `partname`.
    pub fn part(id: PartId, partname: PackURI) -> Self {
        RelTarget::Part { id, partname }
    }

    /// External target pointing at `uri`.
    pub fn external<S: Into<String>>(uri: S) -> Self {
        RelTarget::External(uri.into())
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self, RelTarget::External(_))
    }
}

/// A single relationship from a source part to a target.
///
/// Represents a connection between parts in an OPC package, identified by an rId
/// (relationship ID). Can be either internal (pointing to another part) or external
/// (pointing to an external URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target part or external URL
    target: RelTarget,

    /// Base URI of the source, used to express internal targets relatively
    base_uri: String,
}

impl Relationship {
    /// Create a new relationship.
    ///
    /// # Arguments
    /// * `r_id` - Relationship ID (e.g., "rId1")
    /// * `reltype` - Relationship type URI
    /// * `target` - Target part or external URL
    /// * `base_uri` - Base URI of the source part
    pub fn new(r_id: String, reltype: String, target: RelTarget, base_uri: String) -> Self {
        Self {
            r_id,
            reltype,
            target,
            base_uri,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    #[inline]
    pub fn target(&self) -> &RelTarget {
        &self.target
    }

    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target.is_external()
    }

    /// Get the handle of the target part.
    ///
    /// Fails with [`OpcError::InvalidOperation`] for external relationships, which have
    /// no target part.
    pub fn target_part(&self) -> Result<PartId> {
        match &self.target {
            RelTarget::Part { id, .. } => Ok(*id),
            RelTarget::External(_) => Err(self.external_deref_error()),
        }
    }

    /// Get the absolute partname of the target part.
    pub fn target_partname(&self) -> Result<&PackURI> {
        match &self.target {
            RelTarget::Part { partname, .. } => Ok(partname),
            RelTarget::External(_) => Err(self.external_deref_error()),
        }
    }

    /// Get the target reference as written in a .rels file.
    ///
    /// For internal relationships, this is the target partname relative to the base URI.
    /// For external relationships, this is the URL exactly as it was given.
    pub fn target_ref(&self) -> Cow<'_, str> {
        match &self.target {
            RelTarget::Part { partname, .. } => Cow::Owned(partname.relative_ref(&self.base_uri)),
            RelTarget::External(uri) => Cow::Borrowed(uri),
        }
    }

    fn external_deref_error(&self) -> OpcError {
        OpcError::InvalidOperation(format!(
            "relationship '{}' has an external target and no target part",
            self.r_id
        ))
    }
}

/// Collection of relationships from a single source.
///
/// Relationships keep their insertion order, which is also the order they are written
/// back out in. Lookups are linear scans; collections are small in practice.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Base URI for resolving relative references
    base_uri: String,

    rels: Vec<Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    ///
    /// # Arguments
    /// * `base_uri` - Base URI of the source (`/` for the package itself)
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: Vec::new(),
        }
    }

    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add a relationship to the collection.
    ///
    /// rId uniqueness is not checked here: a duplicate is appended like any other
    /// relationship and [`Relationships::get`] will keep returning the first one.
    ///
    /// # Returns
    /// Reference to the newly added relationship
    pub fn add_relationship(
        &mut self,
        reltype: String,
        target: RelTarget,
        r_id: String,
    ) -> &Relationship {
        let rel = Relationship::new(r_id, reltype, target, self.base_uri.clone());
        let idx = self.rels.len();
        self.rels.push(rel);
        &self.rels[idx]
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id() == r_id)
    }

    /// Get a relationship by its ID, failing with [`OpcError::RelationshipNotFound`].
    pub fn get_by_id(&self, r_id: &str) -> Result<&Relationship> {
        self.get(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("no rId '{}' in collection", r_id)))
    }

    /// Get a relationship by its insertion position.
    pub fn get_by_index(&self, index: usize) -> Result<&Relationship> {
        self.rels.get(index).ok_or(OpcError::IndexOutOfRange {
            index,
            len: self.rels.len(),
        })
    }

    /// Check whether a relationship with this ID exists.
    #[inline]
    pub fn contains_r_id(&self, r_id: &str) -> bool {
        self.get(r_id).is_some()
    }

    /// Get the single relationship of a specific type.
    ///
    /// Only meaningful where the schema allows at most one relationship of `reltype`:
    /// returns [`OpcError::RelationshipNotFound`] if there is none and
    /// [`OpcError::AmbiguousRelationship`] if there are several.
    pub fn single_by_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.iter().filter(|rel| rel.reltype() == reltype);

        match (matching.next(), matching.next()) {
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "no relationship of type '{}' in collection",
                reltype
            ))),
            (Some(rel), None) => Ok(rel),
            (Some(_), Some(_)) => Err(OpcError::AmbiguousRelationship(format!(
                "multiple relationships of type '{}' in collection",
                reltype
            ))),
        }
    }

    /// Get or add a relationship to a target part.
    ///
    /// If an internal relationship of the given type to the target already exists,
    /// returns that relationship. Otherwise, creates a new one with the next
    /// available rId.
    pub fn get_or_add(&mut self, reltype: &str, id: PartId, partname: &PackURI) -> &Relationship {
        let existing = self.rels.iter().position(|rel| {
            rel.reltype() == reltype && matches!(rel.target(), RelTarget::Part { id: t, .. } if *t == id)
        });
        if let Some(idx) = existing {
            return &self.rels[idx];
        }

        let r_id = self.next_r_id();
        self.add_relationship(
            reltype.to_string(),
            RelTarget::part(id, partname.clone()),
            r_id,
        )
    }

    /// Get or add an external relationship, returning its rId.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_url: &str) -> String {
        let existing = self.rels.iter().find(|rel| {
            rel.reltype() == reltype
                && matches!(rel.target(), RelTarget::External(url) if url == target_url)
        });
        if let Some(rel) = existing {
            return rel.r_id().to_string();
        }

        let r_id = self.next_r_id();
        self.add_relationship(
            reltype.to_string(),
            RelTarget::external(target_url),
            r_id.clone(),
        );
        r_id
    }

    /// Get the next available relationship ID.
    ///
    /// Generates IDs in the format "rId1", "rId2", etc., filling in the first gap
    /// if any exist.
    pub fn next_r_id(&self) -> String {
        let mut used_numbers: Vec<u32> = self
            .rels
            .iter()
            .filter_map(|rel| {
                rel.r_id()
                    .strip_prefix("rId")
                    .and_then(|n| atoi_simd::parse::<u32, false, false>(n.as_bytes()).ok())
            })
            .collect();

        used_numbers.sort_unstable();

        let mut next_num = 1u32;
        for &num in &used_numbers {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }

        format!("rId{}", next_num)
    }

    /// Get an iterator over all relationships, in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Serialize relationships to XML format.
    ///
    /// Generates the XML for a .rels file with one `Relationship` element per entry,
    /// in insertion order. `TargetMode="External"` is written only for external
    /// relationships.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<Relationships xmlns=""#);
        xml.push_str(namespace::OPC_RELATIONSHIPS);
        xml.push_str(r#"">"#);
        xml.push('\n');

        for rel in &self.rels {
            xml.push_str(r#"  <Relationship Id=""#);
            xml.push_str(&escape_xml(rel.r_id()));
            xml.push_str(r#"" Type=""#);
            xml.push_str(&escape_xml(rel.reltype()));
            xml.push_str(r#"" Target=""#);
            xml.push_str(&escape_xml(&rel.target_ref()));
            xml.push('"');
            if rel.is_external() {
                xml.push_str(r#" TargetMode="External""#);
            }
            xml.push_str("/>\n");
        }

        xml.push_str("</Relationships>");

        xml
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/".to_string())
    }
}

impl<'a> IntoIterator for &'a Relationships {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.rels.iter()
    }
}
