//! resolve
//!
//! The module dependency resolver.
//!
//! # Architecture
//!
//! The resolver computes, per module, the complete target-aware set of
//! direct and transitive dependencies consumed by build-file
//! generators. It is organized leaves-first:
//!
//! - [`graph`] - the layered dependency graph builder
//! - [`providers`] - service-provider resolution for executables
//! - [`interfaces`] - interface-to-implementation replacement
//! - [`emulation`] - per-target emulation module injection
//!
//! # Concurrency
//!
//! Single-threaded and cooperative: every layer is a memoized
//! derivation driven by depth-first pulls. Reentrant pulls are
//! definition bugs and fail fast with
//! [`ResolveError::CyclicDerivation`].
//!
//! # Recovery
//!
//! Only service-resolution failures are recovered locally (as
//! [`Warning`]s); everything else propagates.

pub mod emulation;
pub mod graph;
pub mod interfaces;
pub mod providers;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::core::config::Config;
use crate::core::module::{Module, ModuleId};
use crate::core::registry::{Registry, RegistryError};
use crate::core::target::Target;
use crate::core::types::{ModuleName, ServiceName, TypeError};
use crate::derive::{Derivation, ForceError};
use crate::descriptor::DescriptorError;
use crate::fetch::{ArtifactFetcher, FetchError};
use crate::scan::ScanError;

/// Errors from dependency resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A derivation transitively pulled itself before emitting; the
    /// layer definitions are broken.
    #[error("cyclic derivation '{module}:{layer}'")]
    CyclicDerivation {
        module: ModuleName,
        layer: &'static str,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Recoverable resolution diagnostics.
///
/// Warnings never abort a run; they are collected on the resolver and
/// reported by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// No provider was found for a required service in any scope.
    UnresolvedRequiredService {
        service: ServiceName,
        scope: Vec<ModuleName>,
    },
    /// An interface module has no target-compatible concrete
    /// implementation; the interface dependency is kept.
    MissingInterfaceImplementation {
        interface: ModuleName,
        target: Target,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnresolvedRequiredService { service, scope } => {
                write!(
                    f,
                    "no provider found for required service {service} among [{}]",
                    scope
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Warning::MissingInterfaceImplementation { interface, target } => {
                write!(
                    f,
                    "no concrete implementation of interface module '{interface}' for target '{target}'"
                )
            }
        }
    }
}

/// The resolver handle: borrows the workspace's registry, config and
/// fetcher, and accumulates warnings.
pub struct Resolver<'w> {
    registry: &'w Registry,
    config: &'w Config,
    fetcher: &'w dyn ArtifactFetcher,
    root: ModuleId,
    warnings: RefCell<Vec<Warning>>,
}

impl<'w> Resolver<'w> {
    pub fn new(
        registry: &'w Registry,
        config: &'w Config,
        fetcher: &'w dyn ArtifactFetcher,
        root: ModuleId,
    ) -> Self {
        Self {
            registry,
            config,
            fetcher,
            root,
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub(crate) fn config(&self) -> &Config {
        self.config
    }

    pub(crate) fn fetcher(&self) -> &dyn ArtifactFetcher {
        self.fetcher
    }

    /// The workspace root module.
    pub fn root(&self) -> Rc<Module> {
        self.registry.get(self.root)
    }

    /// Warnings accumulated so far, in emission order.
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.borrow().clone()
    }

    pub(crate) fn warn(&self, warning: Warning) {
        let mut warnings = self.warnings.borrow_mut();
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }

    /// Force a module's derivation cell, translating reentrant pulls
    /// into [`ResolveError::CyclicDerivation`].
    pub(crate) fn cell<T>(
        &self,
        module: &Module,
        cell: &Derivation<T>,
        thunk: impl FnOnce() -> Result<Vec<T>, ResolveError>,
    ) -> Result<Rc<[T]>, ResolveError> {
        cell.force(thunk).map_err(|e| match e {
            ForceError::Cycle(layer) => ResolveError::CyclicDerivation {
                module: module.name().clone(),
                layer,
            },
            ForceError::Thunk(e) => e,
        })
    }
}
