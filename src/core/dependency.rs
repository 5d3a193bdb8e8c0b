//! core::dependency
//!
//! The module dependency record.
//!
//! # Identity
//!
//! Two dependencies are equal when their `(source, destination, kind)`
//! triples are equal; modifiers (`optional`, `scope`, `classifier`,
//! `executable_target`) do not participate. Closure traversal and the
//! generic first-wins `distinct` rely on this. Executable finalization
//! additionally deduplicates on the looser `(destination, kind)` key —
//! see [`Dependency::finalize_key`].

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::module::ModuleId;
use super::target::Target;

/// How a dependency entered the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// Declared in the descriptor's `<source>` list.
    ExplicitSource,
    /// Inferred by the source scanner from used packages.
    DetectedSource,
    /// Declared to cover scanner gaps (`<source undetected="true">`).
    UndetectedSource,
    /// Declared resource dependency.
    Resource,
    /// Declared application dependency.
    Application,
    /// Declared build-plugin dependency.
    Plugin,
    /// Injected by the emulation selector for an executable target.
    Emulation,
    /// Injected by provider or interface resolution.
    ImplicitProvider,
}

impl DependencyKind {
    /// Canonical kebab-case spelling, as used in descriptor files.
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyKind::ExplicitSource => "explicit-source",
            DependencyKind::DetectedSource => "detected-source",
            DependencyKind::UndetectedSource => "undetected-source",
            DependencyKind::Resource => "resource",
            DependencyKind::Application => "application",
            DependencyKind::Plugin => "plugin",
            DependencyKind::Emulation => "emulation",
            DependencyKind::ImplicitProvider => "implicit-provider",
        }
    }
}

/// A directed dependency between two interned modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub source: ModuleId,
    pub destination: ModuleId,
    pub kind: DependencyKind,
    pub optional: bool,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    /// When set, the dependency only applies to executables whose
    /// target is compatible; finalization relocates or drops it.
    pub executable_target: Option<Target>,
}

impl Dependency {
    /// A bare dependency of the given kind with no modifiers.
    pub fn new(source: ModuleId, destination: ModuleId, kind: DependencyKind) -> Self {
        Self {
            source,
            destination,
            kind,
            optional: false,
            scope: None,
            classifier: None,
            executable_target: None,
        }
    }

    /// A scanner-detected source dependency.
    pub fn detected(source: ModuleId, destination: ModuleId) -> Self {
        Self::new(source, destination, DependencyKind::DetectedSource)
    }

    /// An emulation dependency injected for an executable.
    pub fn emulation(source: ModuleId, destination: ModuleId) -> Self {
        Self::new(source, destination, DependencyKind::Emulation)
    }

    /// An implicit-provider dependency injected by resolution.
    pub fn implicit_provider(source: ModuleId, destination: ModuleId) -> Self {
        Self::new(source, destination, DependencyKind::ImplicitProvider)
    }

    /// The full identity triple.
    pub fn key(&self) -> (ModuleId, ModuleId, DependencyKind) {
        (self.source, self.destination, self.kind)
    }

    /// The finalization dedup key: `(destination, kind)`.
    pub fn finalize_key(&self) -> (ModuleId, DependencyKind) {
        (self.destination, self.kind)
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> ModuleId {
        ModuleId::from_index(n as usize)
    }

    #[test]
    fn equality_ignores_modifiers() {
        let mut a = Dependency::new(id(0), id(1), DependencyKind::ExplicitSource);
        let b = Dependency::new(id(0), id(1), DependencyKind::ExplicitSource);
        a.optional = true;
        a.scope = Some("test".into());
        assert_eq!(a, b);
    }

    #[test]
    fn kind_distinguishes() {
        let a = Dependency::new(id(0), id(1), DependencyKind::ExplicitSource);
        let b = Dependency::new(id(0), id(1), DependencyKind::Resource);
        assert_ne!(a, b);
    }

    #[test]
    fn finalize_key_drops_source() {
        let a = Dependency::new(id(0), id(2), DependencyKind::DetectedSource);
        let b = Dependency::new(id(1), id(2), DependencyKind::DetectedSource);
        assert_ne!(a, b);
        assert_eq!(a.finalize_key(), b.finalize_key());
    }

    #[test]
    fn kind_spelling() {
        assert_eq!(DependencyKind::ImplicitProvider.as_str(), "implicit-provider");
        assert_eq!(DependencyKind::UndetectedSource.as_str(), "undetected-source");
    }
}
