//! core::module
//!
//! The interned module record.
//!
//! # Identity
//!
//! Modules are interned by the registry, which hands out [`ModuleId`]
//! indexes; identity comparison is id equality within one process. A
//! module is either a *workspace module* (local descriptor, possibly
//! local sources) or a *repository module* (materialized from the
//! artifact cache; source availability uncertain).
//!
//! # Lifecycle
//!
//! Modules are created during descriptor ingestion and live for the
//! process. Their derivation cells are created dormant at
//! construction, materialize on first pull, and are never invalidated
//! — the tool is single-shot.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::dependency::Dependency;
use crate::core::target::Target;
use crate::core::types::{ArtifactCoords, ModuleName, PackageName, ServiceName};
use crate::derive::Derivation;
use crate::descriptor::Descriptor;
use crate::resolve::providers::Providers;
use crate::scan::SourceFile;

/// Dense registry index; the process-wide module identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(u32);

impl ModuleId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a module's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// A module checked out in the workspace tree.
    Workspace { dir: PathBuf },
    /// A module materialized from the local artifact cache.
    Repository { cache_dir: PathBuf },
}

/// The module's role, derived from its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    /// Groups children; contributes no sources.
    Aggregate,
    /// An abstract contract to be replaced by a concrete
    /// implementation at executable-finalization time.
    Interface,
    /// A normal module with sources.
    Concrete,
    /// An entry point built for a specific target.
    Executable { target: Target },
}

impl ModuleKind {
    /// Classify a parsed descriptor.
    pub fn of(descriptor: &Descriptor) -> Self {
        if let Some(target) = &descriptor.executable {
            ModuleKind::Executable {
                target: target.clone(),
            }
        } else if descriptor.is_aggregate() {
            ModuleKind::Aggregate
        } else if descriptor.is_interface() {
            ModuleKind::Interface
        } else {
            ModuleKind::Concrete
        }
    }
}

/// An interned module.
pub struct Module {
    id: ModuleId,
    name: ModuleName,
    coords: ArtifactCoords,
    kind: ModuleKind,
    origin: ModuleOrigin,
    descriptor: Descriptor,
    /// Lazily evaluated source root: unset, or known present/absent.
    source_root: RefCell<Option<Option<PathBuf>>>,
    analysis: Analysis,
}

impl Module {
    pub(crate) fn new(
        id: ModuleId,
        name: ModuleName,
        coords: ArtifactCoords,
        origin: ModuleOrigin,
        descriptor: Descriptor,
    ) -> Self {
        Self {
            id,
            kind: ModuleKind::of(&descriptor),
            name,
            coords,
            origin,
            descriptor,
            source_root: RefCell::new(None),
            analysis: Analysis::new(),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    pub fn coords(&self) -> &ArtifactCoords {
        &self.coords
    }

    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    pub fn origin(&self) -> &ModuleOrigin {
        &self.origin
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, ModuleKind::Aggregate)
    }

    pub fn is_executable(&self) -> bool {
        matches!(self.kind, ModuleKind::Executable { .. })
    }

    pub fn is_repository(&self) -> bool {
        matches!(self.origin, ModuleOrigin::Repository { .. })
    }

    /// The target this module is built for (executables) or designed
    /// to run on (everything else; possibly untagged).
    pub fn target(&self) -> &Target {
        match &self.kind {
            ModuleKind::Executable { target } => target,
            _ => &self.descriptor.target_tags,
        }
    }

    /// The interface module this concrete module implements, if any.
    pub fn implements(&self) -> Option<&ModuleName> {
        self.descriptor.implements.as_ref()
    }

    pub(crate) fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub(crate) fn cached_source_root(&self) -> Option<Option<PathBuf>> {
        self.source_root.borrow().clone()
    }

    pub(crate) fn cache_source_root(&self, root: Option<PathBuf>) {
        *self.source_root.borrow_mut() = Some(root);
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

/// Per-module derivation cells, one per graph-builder layer.
///
/// All cells are created dormant at module construction; the resolver
/// forces them in layer order on first consumption.
pub(crate) struct Analysis {
    pub source_files: Derivation<SourceFile>,
    pub source_packages: Derivation<PackageName>,
    pub used_packages: Derivation<PackageName>,
    pub used_required_services: Derivation<ServiceName>,
    pub used_optional_services: Derivation<ServiceName>,
    pub declared_services: Derivation<ServiceName>,
    pub detected_source_deps: Derivation<Dependency>,
    pub source_direct_deps: Derivation<Dependency>,
    pub direct_pre_emulation: Derivation<Dependency>,
    pub transitive_pre_emulation: Derivation<Dependency>,
    pub emulation_deps: Derivation<Dependency>,
    pub direct_pre_providers: Derivation<Dependency>,
    pub transitive_pre_providers: Derivation<Dependency>,
    pub auto_injected: Derivation<ModuleId>,
    pub required_provider_scope: Derivation<ModuleId>,
    pub optional_provider_scope: Derivation<ModuleId>,
    pub providers: Derivation<Providers>,
    pub implicit_provider_deps: Derivation<Dependency>,
    pub direct_pre_finalize: Derivation<Dependency>,
    pub transitive_pre_finalize: Derivation<Dependency>,
    pub direct_deps: Derivation<Dependency>,
    pub transitive_deps: Derivation<Dependency>,
}

impl Analysis {
    fn new() -> Self {
        Self {
            source_files: Derivation::new("source_files"),
            source_packages: Derivation::new("source_packages"),
            used_packages: Derivation::new("used_packages"),
            used_required_services: Derivation::new("used_required_services"),
            used_optional_services: Derivation::new("used_optional_services"),
            declared_services: Derivation::new("declared_services"),
            detected_source_deps: Derivation::new("detected_source_deps"),
            source_direct_deps: Derivation::new("source_direct_deps"),
            direct_pre_emulation: Derivation::new("direct_deps_pre_emulation"),
            transitive_pre_emulation: Derivation::new("transitive_pre_emulation"),
            emulation_deps: Derivation::new("emulation_deps"),
            direct_pre_providers: Derivation::new("direct_deps_pre_providers"),
            transitive_pre_providers: Derivation::new("transitive_pre_providers"),
            auto_injected: Derivation::new("auto_injected_modules"),
            required_provider_scope: Derivation::new("required_provider_scope"),
            optional_provider_scope: Derivation::new("optional_provider_scope"),
            providers: Derivation::new("executable_providers"),
            implicit_provider_deps: Derivation::new("implicit_provider_deps"),
            direct_pre_finalize: Derivation::new("direct_deps_pre_finalize"),
            transitive_pre_finalize: Derivation::new("transitive_pre_finalize"),
            direct_deps: Derivation::new("direct_deps"),
            transitive_deps: Derivation::new("transitive_deps"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn module_with(descriptor_xml: &str) -> Module {
        let descriptor = Descriptor::parse(descriptor_xml, Path::new("weft.xml")).unwrap();
        Module::new(
            ModuleId::from_index(0),
            descriptor.name.clone().unwrap(),
            ArtifactCoords::new("com.ex", "m", "1.0").unwrap(),
            ModuleOrigin::Workspace {
                dir: PathBuf::from("/tmp/m"),
            },
            descriptor,
        )
    }

    #[test]
    fn kind_classification() {
        assert!(matches!(
            module_with("<module><name>a</name><children><module>b</module></children></module>")
                .kind(),
            ModuleKind::Aggregate
        ));
        assert!(matches!(
            module_with("<module><name>a</name><interface/></module>").kind(),
            ModuleKind::Interface
        ));
        assert!(matches!(
            module_with("<module><name>a</name></module>").kind(),
            ModuleKind::Concrete
        ));
        assert!(matches!(
            module_with(r#"<module><name>a</name><executable target="web"/></module>"#).kind(),
            ModuleKind::Executable { .. }
        ));
    }

    #[test]
    fn executable_target_wins_over_tags() {
        let m = module_with(
            r#"<module><name>a</name><executable target="jre,openfx"/>
               <target-tags>web</target-tags></module>"#,
        );
        assert_eq!(m.target().to_string(), "jre,openfx");
    }

    #[test]
    fn source_root_cache() {
        let m = module_with("<module><name>a</name></module>");
        assert!(m.cached_source_root().is_none());
        m.cache_source_root(None);
        assert_eq!(m.cached_source_root(), Some(None));
    }
}
