//! Construction of the in-memory part graph from a serialized package.
//!
//! Unmarshalling runs in two passes so that relationships never refer forward to a
//! part that does not exist yet: every part is created first, then every
//! relationship is resolved against the complete set of parts. Once the graph is
//! wired, each part's `after_unmarshal` hook runs, followed by the package hook.
//!
//! The graph is staged away from the target package and only committed when every
//! step has succeeded, so a failed unmarshal leaves the package as it was.

use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::factory::PartFactory;
use crate::ooxml::opc::package::OpcPackage;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::part::{Part, PartId};
use crate::ooxml::opc::pkgreader::{PackageSource, SerializedRelationship};
use crate::ooxml::opc::rel::{RelTarget, Relationships};
use std::collections::HashMap;

/// Parts created by the first pass, not yet owned by a package.
struct StagedParts {
    /// Id of the first staged part once committed
    first_id: usize,
    parts: Vec<Box<dyn Part>>,
    index: HashMap<PackURI, PartId>,
}

impl StagedParts {
    fn get_mut(&mut self, partname: &PackURI) -> Option<&mut Box<dyn Part>> {
        let id = self.index.get(partname)?;
        self.parts.get_mut(id.index() - self.first_id)
    }
}

/// Host for the unmarshalling operation.
pub struct Unmarshaller;

impl Unmarshaller {
    /// Construct the parts and relationships in `source` and add them to `package`.
    ///
    /// Parts are created through `factory`. Package-level relationships (those whose
    /// source is `/`) are appended to the package's own collection. Every rId is kept
    /// as it was serialized.
    ///
    /// # Errors
    /// - [`OpcError::DuplicatePartname`] if a partname occurs twice or is already in
    ///   `package`
    /// - [`OpcError::GraphIntegrity`] if a relationship's source or internal target is
    ///   not one of the unmarshalled parts
    /// - any error returned by a part loader or an `after_unmarshal` hook, unchanged
    ///
    /// On error `package` is left untouched.
    pub fn unmarshal<S: PackageSource>(
        source: &mut S,
        package: &mut OpcPackage,
        factory: &PartFactory,
    ) -> Result<()> {
        let mut staged = Self::unmarshal_parts(source, package, factory)?;

        let mut pkg_rels = package.rels().clone();
        Self::unmarshal_relationships(source, &mut staged, &mut pkg_rels)?;

        for part in staged.parts.iter_mut() {
            part.after_unmarshal()?;
        }

        package.commit_unmarshalled(staged.parts, staged.index, pkg_rels)
    }

    /// First pass: create every part through the factory.
    fn unmarshal_parts<S: PackageSource>(
        source: &mut S,
        package: &OpcPackage,
        factory: &PartFactory,
    ) -> Result<StagedParts> {
        let sparts = source.take_sparts();
        tracing::debug!(parts = sparts.len(), "unmarshalling parts");

        let first_id = package.part_count();
        let mut staged = StagedParts {
            first_id,
            parts: Vec::with_capacity(sparts.len()),
            index: HashMap::with_capacity(sparts.len()),
        };

        for spart in sparts {
            if package.contains_part(&spart.partname) || staged.index.contains_key(&spart.partname)
            {
                return Err(OpcError::DuplicatePartname(spart.partname.to_string()));
            }

            let id = PartId(first_id + staged.parts.len());
            let part = factory.create(spart.partname.clone(), spart.content_type, spart.blob)?;
            tracing::trace!(
                partname = %spart.partname,
                content_type = part.content_type(),
                id = %id,
                "created part"
            );

            staged.index.insert(spart.partname, id);
            staged.parts.push(part);
        }

        Ok(staged)
    }

    /// Second pass: wire every relationship to its source collection.
    fn unmarshal_relationships<S: PackageSource>(
        source: &mut S,
        staged: &mut StagedParts,
        pkg_rels: &mut Relationships,
    ) -> Result<()> {
        let srels = source.take_srels();
        tracing::debug!(relationships = srels.len(), "unmarshalling relationships");

        for (source_uri, srel) in srels {
            let target = Self::resolve_target(&source_uri, &srel, &staged.index)?;

            let rels = if source_uri.is_package() {
                &mut *pkg_rels
            } else {
                match staged.get_mut(&source_uri) {
                    Some(part) => part.rels_mut(),
                    None => {
                        return Err(OpcError::dangling(
                            source_uri.as_str(),
                            &srel.r_id,
                            &srel.target_ref,
                        ));
                    },
                }
            };

            tracing::trace!(
                source = %source_uri,
                r_id = %srel.r_id,
                external = target.is_external(),
                "wired relationship"
            );
            rels.add_relationship(srel.reltype, target, srel.r_id);
        }

        Ok(())
    }

    fn resolve_target(
        source_uri: &PackURI,
        srel: &SerializedRelationship,
        index: &HashMap<PackURI, PartId>,
    ) -> Result<RelTarget> {
        if srel.is_external() {
            return Ok(RelTarget::external(srel.target_ref.as_str()));
        }

        let dangling = || OpcError::dangling(source_uri.as_str(), &srel.r_id, &srel.target_ref);
        let partname = srel.target_partname().map_err(|_| dangling())?;
        let id = index.get(&partname).copied().ok_or_else(dangling)?;
        Ok(RelTarget::part(id, partname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::target_mode;
    use crate::ooxml::opc::part::{LoadPart, XmlPart};
    use crate::ooxml::opc::pkgreader::{PackageReader, SerializedPart};
    use std::any::Any;
    use std::cell::RefCell;

    thread_local! {
        static HOOK_LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    /// Part that records when its hook runs and how many relationships it had then.
    #[derive(Debug)]
    struct HookedPart {
        inner: XmlPart,
    }

    impl LoadPart for HookedPart {
        fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Self> {
            Ok(Self {
                inner: XmlPart::load(partname, content_type, blob)?,
            })
        }
    }

    impl Part for HookedPart {
        fn partname(&self) -> &PackURI {
            self.inner.partname()
        }
        fn content_type(&self) -> &str {
            self.inner.content_type()
        }
        fn blob(&self) -> &[u8] {
            self.inner.blob()
        }
        fn rels(&self) -> &Relationships {
            self.inner.rels()
        }
        fn rels_mut(&mut self) -> &mut Relationships {
            self.inner.rels_mut()
        }
        fn after_unmarshal(&mut self) -> Result<()> {
            let entry = format!("{}:{}", self.partname(), self.rels().len());
            HOOK_LOG.with(|log| log.borrow_mut().push(entry));
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn log_package_hook(package: &OpcPackage) -> Result<()> {
        let entry = format!("package:{}", package.part_count());
        HOOK_LOG.with(|log| log.borrow_mut().push(entry));
        Ok(())
    }

    fn failing_package_hook(_: &OpcPackage) -> Result<()> {
        Err(OpcError::InvalidOperation("rejected".to_string()))
    }

    fn rejecting_loader(partname: PackURI, _: String, _: Vec<u8>) -> Result<Box<dyn Part>> {
        Err(OpcError::XmlError(format!("cannot load {partname}")))
    }

    fn spart(partname: &str) -> SerializedPart {
        SerializedPart {
            partname: PackURI::new(partname).unwrap(),
            content_type: "application/vnd.x".to_string(),
            reltype: String::new(),
            blob: b"<x/>".to_vec(),
        }
    }

    fn srel(source: &str, r_id: &str, target_ref: &str, external: bool) -> (PackURI, SerializedRelationship) {
        let source = PackURI::new(source).unwrap();
        let srel = SerializedRelationship {
            base_uri: source.base_uri().to_string(),
            r_id: r_id.to_string(),
            reltype: "http://x/rel".to_string(),
            target_ref: target_ref.to_string(),
            target_mode: if external {
                target_mode::EXTERNAL.to_string()
            } else {
                target_mode::INTERNAL.to_string()
            },
        };
        (source, srel)
    }

    fn factory() -> PartFactory {
        let mut factory = PartFactory::new();
        factory.register_type::<HookedPart, _>("application/vnd.x");
        factory
    }

    #[test]
    fn test_internal_relationship_targets_constructed_part() {
        let mut reader = PackageReader::new(
            vec![spart("/p/p1.xml"), spart("/p/p2.xml")],
            vec![srel("/p/p1.xml", "rId7", "p2.xml", false)],
        );
        let mut package = OpcPackage::new();
        Unmarshaller::unmarshal(&mut reader, &mut package, &factory()).unwrap();

        let p1 = package.part_id(&PackURI::new("/p/p1.xml").unwrap()).unwrap();
        let p2 = package.part_id(&PackURI::new("/p/p2.xml").unwrap()).unwrap();
        let rels = package.part(p1).unwrap().rels();
        assert_eq!(rels.len(), 1);

        let rel = rels.get_by_id("rId7").unwrap();
        assert_eq!(rel.target_part().unwrap(), p2);
        assert_eq!(rel.target_ref(), "p2.xml");
        assert!(package.part(p2).unwrap().as_any().is::<HookedPart>());
    }

    #[test]
    fn test_package_relationships_and_external_targets() {
        let mut reader = PackageReader::new(
            vec![spart("/p/p1.xml")],
            vec![
                srel("/", "rId1", "p/p1.xml", false),
                srel("/p/p1.xml", "rId2", "http://example.com", true),
            ],
        );
        let mut package = OpcPackage::new();
        Unmarshaller::unmarshal(&mut reader, &mut package, &factory()).unwrap();

        let pkg_rel = package.rels().get_by_id("rId1").unwrap();
        let p1 = pkg_rel.target_part().unwrap();
        assert_eq!(package.part(p1).unwrap().partname().as_str(), "/p/p1.xml");

        let ext = package.part(p1).unwrap().rels().get_by_id("rId2").unwrap();
        assert!(ext.is_external());
        assert_eq!(ext.target_ref(), "http://example.com");
        assert!(matches!(ext.target_part(), Err(OpcError::InvalidOperation(_))));
    }

    #[test]
    fn test_dangling_target_leaves_package_untouched() {
        let mut reader = PackageReader::new(
            vec![spart("/p/p1.xml")],
            vec![
                srel("/", "rId1", "p/p1.xml", false),
                srel("/p/p1.xml", "rId2", "missing.xml", false),
            ],
        );
        let mut package = OpcPackage::new();
        let err = Unmarshaller::unmarshal(&mut reader, &mut package, &factory()).unwrap_err();

        match err {
            OpcError::GraphIntegrity {
                source_uri,
                r_id,
                target,
            } => {
                assert_eq!(source_uri, "/p/p1.xml");
                assert_eq!(r_id, "rId2");
                assert_eq!(target, "missing.xml");
            },
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(package.part_count(), 0);
        assert!(package.rels().is_empty());
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let mut reader = PackageReader::new(
            vec![spart("/p/p1.xml")],
            vec![srel("/p/ghost.xml", "rId1", "p1.xml", false)],
        );
        let mut package = OpcPackage::new();
        let err = Unmarshaller::unmarshal(&mut reader, &mut package, &factory()).unwrap_err();
        assert!(matches!(err, OpcError::GraphIntegrity { source_uri, .. } if source_uri == "/p/ghost.xml"));
        assert_eq!(package.part_count(), 0);
    }

    #[test]
    fn test_duplicate_partname_is_rejected() {
        let mut reader = PackageReader::new(vec![spart("/p/p1.xml"), spart("/p/p1.xml")], vec![]);
        let mut package = OpcPackage::new();
        let err = Unmarshaller::unmarshal(&mut reader, &mut package, &factory()).unwrap_err();
        assert!(matches!(err, OpcError::DuplicatePartname(_)));
    }

    #[test]
    fn test_hooks_run_after_wiring_and_package_hook_last() {
        HOOK_LOG.with(|log| log.borrow_mut().clear());
        let mut reader = PackageReader::new(
            vec![spart("/p/p1.xml"), spart("/p/p2.xml")],
            vec![
                srel("/p/p1.xml", "rId1", "p2.xml", false),
                srel("/p/p1.xml", "rId2", "http://example.com", true),
                srel("/p/p2.xml", "rId1", "p1.xml", false),
            ],
        );
        let mut package = OpcPackage::new();
        package.set_after_unmarshal(log_package_hook);
        Unmarshaller::unmarshal(&mut reader, &mut package, &factory()).unwrap();

        let mut log = HOOK_LOG.with(|log| log.borrow().clone());
        assert_eq!(log.pop().as_deref(), Some("package:2"));
        log.sort();
        assert_eq!(log, vec!["/p/p1.xml:2".to_string(), "/p/p2.xml:1".to_string()]);
    }

    #[test]
    fn test_failing_package_hook_restores_package() {
        let mut reader = PackageReader::new(
            vec![spart("/p/p1.xml")],
            vec![srel("/", "rId1", "p/p1.xml", false)],
        );
        let mut package = OpcPackage::new();
        package.set_after_unmarshal(failing_package_hook);
        let err = Unmarshaller::unmarshal(&mut reader, &mut package, &factory()).unwrap_err();

        assert!(matches!(err, OpcError::InvalidOperation(msg) if msg == "rejected"));
        assert_eq!(package.part_count(), 0);
        assert!(package.rels().is_empty());
        assert!(!package.contains_part(&PackURI::new("/p/p1.xml").unwrap()));
    }

    #[test]
    fn test_loader_error_aborts_unmarshal() {
        let mut reader = PackageReader::new(
            vec![spart("/p/p1.xml"), spart("/p/p2.xml")],
            vec![srel("/", "rId1", "p/p1.xml", false)],
        );
        let mut factory = PartFactory::new();
        factory.register("application/vnd.x", rejecting_loader);
        let mut package = OpcPackage::new();
        let err = Unmarshaller::unmarshal(&mut reader, &mut package, &factory).unwrap_err();

        assert!(matches!(err, OpcError::XmlError(msg) if msg == "cannot load /p/p1.xml"));
        assert_eq!(package.part_count(), 0);
        assert!(package.rels().is_empty());
    }
}
