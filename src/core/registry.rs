//! core::registry
//!
//! Process-wide store of interned modules.
//!
//! # Architecture
//!
//! The registry owns every module for the life of the process and
//! maintains three secondary indexes:
//!
//! - name → module (the interning key)
//! - package → claiming module (built from descriptors eagerly and
//!   from lazy source scans as resolution discovers packages)
//! - service interface → provider modules
//!
//! plus the implementors index (interface name → concrete modules
//! declaring `implements-module`) and the list of registered root
//! modules used as provider search entry points.
//!
//! # Determinism
//!
//! All indexes are `BTreeMap`s keyed by validated names, so iteration
//! is sorted and two runs over the same inputs observe identical
//! orders. This feeds the resolver's tie-breaks and is a hard
//! contract.
//!
//! # Mutation
//!
//! The registry is mutated during descriptor ingestion only — which
//! can happen mid-resolution when scope expansion discovers a new
//! repository module — so all state sits behind `RefCell`. Interning
//! is idempotent by name.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use thiserror::Error;

use crate::core::module::{Module, ModuleId, ModuleOrigin};
use crate::core::types::{ArtifactCoords, ModuleName, PackageName, ServiceName};
use crate::descriptor::Descriptor;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown module '{0}'")]
    UnknownModule(ModuleName),

    #[error("package '{package}' is declared by multiple modules: {modules:?}")]
    AmbiguousPackage {
        package: PackageName,
        modules: Vec<ModuleName>,
    },

    #[error("module '{name}' already interned with different coordinates ({existing} vs {new})")]
    CoordsMismatch {
        name: ModuleName,
        existing: ArtifactCoords,
        new: ArtifactCoords,
    },
}

#[derive(Debug, Clone)]
struct PackageClaim {
    module: ModuleId,
    /// Claimed through `<exported-packages>` rather than mere source
    /// containment.
    exported: bool,
}

/// The process-wide module store.
#[derive(Default)]
pub struct Registry {
    modules: RefCell<Vec<Rc<Module>>>,
    by_name: RefCell<BTreeMap<ModuleName, ModuleId>>,
    packages: RefCell<BTreeMap<PackageName, PackageClaim>>,
    providers: RefCell<BTreeMap<ServiceName, BTreeSet<ModuleName>>>,
    implementors: RefCell<BTreeMap<ModuleName, BTreeSet<ModuleName>>>,
    roots: RefCell<Vec<ModuleId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a module by name; idempotent.
    ///
    /// A second intern under the same name returns the existing module
    /// (coordinates must agree). Descriptor-declared exported packages
    /// are claimed eagerly; a conflicting exported claim is
    /// [`RegistryError::AmbiguousPackage`].
    pub fn intern(
        &self,
        name: ModuleName,
        coords: ArtifactCoords,
        origin: ModuleOrigin,
        descriptor: Descriptor,
    ) -> Result<Rc<Module>, RegistryError> {
        if let Some(existing) = self.find(&name) {
            if existing.coords() != &coords {
                return Err(RegistryError::CoordsMismatch {
                    name,
                    existing: existing.coords().clone(),
                    new: coords,
                });
            }
            return Ok(existing);
        }

        let id = ModuleId::from_index(self.modules.borrow().len());
        let module = Rc::new(Module::new(id, name.clone(), coords, origin, descriptor));
        self.modules.borrow_mut().push(Rc::clone(&module));
        self.by_name.borrow_mut().insert(name.clone(), id);

        for service in &module.descriptor().provided_services {
            self.providers
                .borrow_mut()
                .entry(service.clone())
                .or_default()
                .insert(name.clone());
        }
        if let Some(interface) = module.implements() {
            self.implementors
                .borrow_mut()
                .entry(interface.clone())
                .or_default()
                .insert(name.clone());
        }
        for package in module.descriptor().exported_packages.clone() {
            self.claim_package(package, id, true)?;
        }
        Ok(module)
    }

    /// Look up a module by id. Ids are only minted by this registry,
    /// so the index is always valid.
    pub fn get(&self, id: ModuleId) -> Rc<Module> {
        Rc::clone(&self.modules.borrow()[id.index()])
    }

    pub fn find(&self, name: &ModuleName) -> Option<Rc<Module>> {
        let id = *self.by_name.borrow().get(name)?;
        Some(self.get(id))
    }

    /// Look up a module by name, failing with `UnknownModule`.
    pub fn require(&self, name: &ModuleName) -> Result<Rc<Module>, RegistryError> {
        self.find(name)
            .ok_or_else(|| RegistryError::UnknownModule(name.clone()))
    }

    /// Modules declaring a provider for the given service interface,
    /// sorted by name.
    pub fn find_providing(&self, service: &ServiceName) -> Vec<Rc<Module>> {
        self.providers
            .borrow()
            .get(service)
            .into_iter()
            .flatten()
            .filter_map(|name| self.find(name))
            .collect()
    }

    /// The module currently claiming a package, if any.
    pub fn find_declaring_package(&self, package: &PackageName) -> Option<Rc<Module>> {
        let claim = self.packages.borrow().get(package)?.clone();
        Some(self.get(claim.module))
    }

    /// Record that a module declares a package.
    ///
    /// An exported claim beats a source-containment claim; two claims
    /// of equal strength by different modules are ambiguous.
    pub fn claim_package(
        &self,
        package: PackageName,
        module: ModuleId,
        exported: bool,
    ) -> Result<(), RegistryError> {
        let mut packages = self.packages.borrow_mut();
        let existing = packages.get(&package).cloned();
        match existing {
            None => {
                packages.insert(package, PackageClaim { module, exported });
                Ok(())
            }
            Some(claim) if claim.module == module => {
                if exported && !claim.exported {
                    packages.insert(package, PackageClaim { module, exported });
                }
                Ok(())
            }
            Some(claim) => {
                if exported && !claim.exported {
                    packages.insert(package, PackageClaim { module, exported });
                    return Ok(());
                }
                if !exported && claim.exported {
                    return Ok(());
                }
                drop(packages);
                Err(RegistryError::AmbiguousPackage {
                    package,
                    modules: vec![
                        self.get(claim.module).name().clone(),
                        self.get(module).name().clone(),
                    ],
                })
            }
        }
    }

    /// Attach a module as a provider-search root.
    pub fn register_root(&self, id: ModuleId) {
        let mut roots = self.roots.borrow_mut();
        if !roots.contains(&id) {
            roots.push(id);
        }
    }

    /// Registered roots in registration order.
    pub fn roots(&self) -> Vec<Rc<Module>> {
        self.roots.borrow().iter().map(|&id| self.get(id)).collect()
    }

    /// Concrete modules implementing the named interface module,
    /// sorted by name.
    pub fn implementors_of(&self, interface: &ModuleName) -> Vec<Rc<Module>> {
        self.implementors
            .borrow()
            .get(interface)
            .into_iter()
            .flatten()
            .filter_map(|name| self.find(name))
            .collect()
    }

    /// Whether resolution must treat the module as an interface
    /// module: either explicitly flagged, or some registered module
    /// declares an implementation of it.
    pub fn is_interface_module(&self, module: &Module) -> bool {
        module.descriptor().is_interface()
            || self.implementors.borrow().contains_key(module.name())
    }

    /// Every interned module, sorted by name.
    pub fn modules_by_name(&self) -> Vec<Rc<Module>> {
        self.by_name
            .borrow()
            .values()
            .map(|&id| self.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.borrow().is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn intern(registry: &Registry, xml: &str) -> Rc<Module> {
        let descriptor = Descriptor::parse(xml, Path::new("weft.xml")).unwrap();
        let name = descriptor.name.clone().unwrap();
        let coords = ArtifactCoords::new("com.ex", name.as_str(), "1.0").unwrap();
        registry
            .intern(
                name,
                coords,
                ModuleOrigin::Workspace {
                    dir: PathBuf::from("/tmp"),
                },
                descriptor,
            )
            .unwrap()
    }

    #[test]
    fn intern_is_idempotent_by_name() {
        let registry = Registry::new();
        let a = intern(&registry, "<module><name>ui</name></module>");
        let b = intern(&registry, "<module><name>ui</name></module>");
        assert_eq!(a.id(), b.id());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn require_unknown_fails() {
        let registry = Registry::new();
        let missing = ModuleName::new("nope").unwrap();
        assert!(matches!(
            registry.require(&missing),
            Err(RegistryError::UnknownModule(_))
        ));
    }

    #[test]
    fn provider_index_sorted_by_name() {
        let registry = Registry::new();
        intern(
            &registry,
            "<module><name>store-mem</name>\
             <provides><java-service>com.ex.spi.Store</java-service></provides></module>",
        );
        intern(
            &registry,
            "<module><name>store-idb</name>\
             <provides><java-service>com.ex.spi.Store</java-service></provides></module>",
        );
        let spi = ServiceName::new("com.ex.spi.Store").unwrap();
        let names: Vec<_> = registry
            .find_providing(&spi)
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["store-idb", "store-mem"]);
    }

    #[test]
    fn exported_claim_beats_source_claim() {
        let registry = Registry::new();
        let source = intern(&registry, "<module><name>impl-a</name></module>");
        let exporter = intern(
            &registry,
            "<module><name>impl-b</name>\
             <exported-packages><package>com.ex.ui</package></exported-packages></module>",
        );
        let pkg = PackageName::new("com.ex.ui").unwrap();
        registry.claim_package(pkg.clone(), source.id(), false).unwrap();
        assert_eq!(
            registry.find_declaring_package(&pkg).unwrap().id(),
            exporter.id()
        );
    }

    #[test]
    fn double_exported_claim_is_ambiguous() {
        let registry = Registry::new();
        intern(
            &registry,
            "<module><name>a</name>\
             <exported-packages><package>com.ex.ui</package></exported-packages></module>",
        );
        let descriptor = Descriptor::parse(
            "<module><name>b</name>\
             <exported-packages><package>com.ex.ui</package></exported-packages></module>",
            Path::new("weft.xml"),
        )
        .unwrap();
        let result = registry.intern(
            descriptor.name.clone().unwrap(),
            ArtifactCoords::new("com.ex", "b", "1.0").unwrap(),
            ModuleOrigin::Workspace {
                dir: PathBuf::from("/tmp"),
            },
            descriptor,
        );
        assert!(matches!(
            result,
            Err(RegistryError::AmbiguousPackage { .. })
        ));
    }

    #[test]
    fn implementors_index() {
        let registry = Registry::new();
        let api = intern(&registry, "<module><name>css-api</name></module>");
        intern(
            &registry,
            "<module><name>css-api-web</name>\
             <implements-module>css-api</implements-module></module>",
        );
        assert!(registry.is_interface_module(&api));
        let implementors = registry.implementors_of(api.name());
        assert_eq!(implementors.len(), 1);
        assert_eq!(implementors[0].name().as_str(), "css-api-web");
    }

    #[test]
    fn roots_keep_registration_order() {
        let registry = Registry::new();
        let a = intern(&registry, "<module><name>zeta</name></module>");
        let b = intern(&registry, "<module><name>alpha</name></module>");
        registry.register_root(a.id());
        registry.register_root(b.id());
        registry.register_root(a.id());
        let names: Vec<_> = registry.roots().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
