//! workspace
//!
//! Workspace ingestion: descriptor discovery, module interning, and
//! the resolver entry point.
//!
//! # Layout
//!
//! A workspace is a directory tree. The root directory holds the root
//! module's `weft.xml`; each `<children><module>` entry names a
//! subdirectory containing its own `weft.xml`. Repository modules are
//! declared by the root descriptor's `<libraries>` and materialize
//! from the artifact cache through the fetcher.
//!
//! # Invariants
//!
//! - Ingestion is the only place workspace modules are interned;
//!   repository modules may additionally be interned later when scope
//!   expansion discovers library children.
//! - The workspace root is always the first registered root; library
//!   modules are registered as roots in declaration order.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::core::config::{Config, ConfigError};
use crate::core::module::{Module, ModuleId, ModuleOrigin};
use crate::core::registry::{Registry, RegistryError};
use crate::core::types::{ArtifactCoords, ModuleName, TypeError};
use crate::descriptor::{Descriptor, DescriptorError};
use crate::fetch::{ArtifactFetcher, FetchError, LocalCacheFetcher};
use crate::resolve::Resolver;

/// Errors from workspace ingestion.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("workspace root '{0}' has no weft.xml")]
    MissingRootDescriptor(PathBuf),
}

/// An opened workspace: the interned module tree plus everything the
/// resolver needs.
pub struct Workspace {
    root_dir: PathBuf,
    config: Config,
    registry: Registry,
    fetcher: Box<dyn ArtifactFetcher>,
    root: ModuleId,
}

impl Workspace {
    /// Open a workspace with configuration loaded from disk and the
    /// local artifact cache as fetcher.
    pub fn open(root_dir: &Path) -> Result<Self, WorkspaceError> {
        let config = Config::load(Some(root_dir))?;
        let fetcher = Box::new(LocalCacheFetcher::new(config.artifact_cache.clone()));
        Self::open_with(root_dir, config, fetcher)
    }

    /// Open a workspace with explicit configuration and fetcher.
    pub fn open_with(
        root_dir: &Path,
        config: Config,
        fetcher: Box<dyn ArtifactFetcher>,
    ) -> Result<Self, WorkspaceError> {
        if !root_dir.join("weft.xml").is_file() {
            return Err(WorkspaceError::MissingRootDescriptor(root_dir.to_path_buf()));
        }
        let registry = Registry::new();
        let root = load_workspace_module(&registry, root_dir, None)?;
        registry.register_root(root.id());

        for library in root.descriptor().libraries.clone() {
            let module = load_repository_module(
                &registry,
                fetcher.as_ref(),
                &config,
                &library.name,
                &library.coords,
            )?;
            registry.register_root(module.id());
        }

        Ok(Self {
            root_dir: root_dir.to_path_buf(),
            config,
            registry,
            fetcher,
            root: root.id(),
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn root(&self) -> Rc<Module> {
        self.registry.get(self.root)
    }

    pub fn find(&self, name: &ModuleName) -> Option<Rc<Module>> {
        self.registry.find(name)
    }

    pub fn require(&self, name: &ModuleName) -> Result<Rc<Module>, RegistryError> {
        self.registry.require(name)
    }

    /// A resolver over this workspace.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.registry, &self.config, self.fetcher.as_ref(), self.root)
    }
}

fn load_workspace_module(
    registry: &Registry,
    dir: &Path,
    inherited: Option<&ArtifactCoords>,
) -> Result<Rc<Module>, WorkspaceError> {
    let descriptor = Descriptor::load(&dir.join("weft.xml"))?;
    let name = match descriptor.name.clone() {
        Some(name) => name,
        None => ModuleName::new(
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )?,
    };
    let group = descriptor
        .group
        .clone()
        .or_else(|| inherited.map(|c| c.group.clone()))
        .unwrap_or_else(|| "workspace".to_string());
    let version = descriptor
        .version
        .clone()
        .or_else(|| inherited.map(|c| c.version.clone()))
        .unwrap_or_else(|| "0.0.0".to_string());
    let artifact = descriptor
        .artifact
        .clone()
        .unwrap_or_else(|| name.as_str().to_string());
    let coords = ArtifactCoords::new(group, artifact, version)?;

    let children = descriptor.children.clone();
    let module = registry.intern(
        name,
        coords.clone(),
        ModuleOrigin::Workspace {
            dir: dir.to_path_buf(),
        },
        descriptor,
    )?;
    for child in children {
        load_workspace_module(registry, &dir.join(child.as_str()), Some(&coords))?;
    }
    Ok(module)
}

fn load_repository_module(
    registry: &Registry,
    fetcher: &dyn ArtifactFetcher,
    config: &Config,
    name: &ModuleName,
    coords: &ArtifactCoords,
) -> Result<Rc<Module>, WorkspaceError> {
    if let Some(existing) = registry.find(name) {
        return Ok(existing);
    }
    let (descriptor, cache_dir) = match fetcher.fetch(coords, "weft-xml") {
        Ok(path) => {
            let cache_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (Descriptor::load(&path)?, cache_dir)
        }
        // Degraded mode: the module exists in name only; every fact
        // derivation sees empty data.
        Err(_) if config.allow_missing_snapshots => (Descriptor::default(), PathBuf::new()),
        Err(e) => return Err(e.into()),
    };
    let children = descriptor.children.clone();
    let module = registry.intern(
        name.clone(),
        coords.clone(),
        ModuleOrigin::Repository { cache_dir },
        descriptor,
    )?;
    for child in children {
        let child_coords =
            ArtifactCoords::new(coords.group.clone(), child.as_str(), coords.version.clone())?;
        load_repository_module(registry, fetcher, config, &child, &child_coords)?;
    }
    Ok(module)
}
