//! resolve::graph
//!
//! The layered dependency graph builder.
//!
//! # Architecture
//!
//! For each module the resolver builds a pipeline of memoized
//! derivations, each defined over the previous ones:
//!
//! 1. scanner/snapshot facts (source files, packages, used services)
//! 2. `detected_source_deps` - packages resolved to declaring modules
//! 3. `source_direct_deps` - explicit + detected + undetected
//! 4. `direct_deps_pre_emulation` - + resource/application/plugin
//! 5. `transitive_pre_emulation` - closure of (4)
//! 6. `emulation_deps` - per-target emulation injection (executables)
//! 7. `direct/transitive_pre_providers` - (4) + (6) and its closure;
//!    this is the scope baseline for provider search
//! 8. `auto_injected_modules`, provider scopes, `executable_providers`
//! 9. `implicit_provider_deps` - providers not already reachable
//! 10. `direct/transitive_pre_finalize` - (7) + (9) and its closure
//! 11. `direct_deps` / `transitive_deps` - finalization
//!
//! # Finalization (executables only)
//!
//! Dependencies carrying an `executable-target` are relocated from the
//! transitive set into the direct set when compatible and dropped when
//! not; interface-module destinations are replaced by their best
//! concrete implementation; duplicates collapse on
//! `(destination, kind)`, first occurrence wins.
//!
//! # Ordering
//!
//! Every derivation's order is a function of its definition only;
//! `distinct` is first-wins. Two runs over equal inputs produce
//! byte-identical sequences.

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::module::{Module, ModuleId, ModuleOrigin};
use crate::core::types::{PackageName, ServiceName};
use crate::derive::{distinct, distinct_by};
use crate::descriptor::{DeclaredDependency, ExportSnapshot};
use crate::fetch::FetchError;
use crate::scan::{self, SourceFile};

use super::providers::Providers;
use super::{emulation, interfaces, providers, ResolveError, Resolver};

/// Which direct layer a transitive closure expands through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DirectLayer {
    PreEmulation,
    PreProviders,
    PreFinalize,
}

impl<'w> Resolver<'w> {
    // ----- source facts -------------------------------------------------

    /// The module's source root, if its sources are available.
    ///
    /// Workspace modules use `<dir>/src`; repository modules use the
    /// cached (or fetched) extracted source archive. The answer is
    /// cached on the module.
    fn source_root(&self, module: &Rc<Module>) -> Result<Option<PathBuf>, ResolveError> {
        if let Some(cached) = module.cached_source_root() {
            return Ok(cached);
        }
        let root = match module.origin() {
            ModuleOrigin::Workspace { dir } => {
                let src = dir.join("src");
                src.is_dir().then_some(src)
            }
            ModuleOrigin::Repository { cache_dir } => {
                if module.is_aggregate() {
                    None
                } else {
                    let local = cache_dir.join("sources");
                    if local.is_dir() {
                        Some(local)
                    } else {
                        match self.fetcher().fetch(module.coords(), "sources") {
                            Ok(path) => Some(path),
                            Err(FetchError::NotFound { .. }) => None,
                            Err(_) if self.config().allow_missing_snapshots => None,
                            Err(e) => return Err(e.into()),
                        }
                    }
                }
            }
        };
        module.cache_source_root(root.clone());
        Ok(root)
    }

    /// All scanned source files, sorted by path. Empty for aggregates
    /// and for modules without available sources.
    pub fn source_files(&self, module: &Rc<Module>) -> Result<Rc<[SourceFile]>, ResolveError> {
        self.cell(module, &module.analysis().source_files, || {
            if module.is_aggregate() {
                return Ok(Vec::new());
            }
            match self.source_root(module)? {
                Some(root) => Ok(scan::scan_source_root(&root)?),
                None => Ok(Vec::new()),
            }
        })
    }

    /// Packages declared by the module's own sources, from the export
    /// snapshot when the module is a repository module carrying one.
    pub fn source_packages(&self, module: &Rc<Module>) -> Result<Rc<[PackageName]>, ResolveError> {
        self.cell(module, &module.analysis().source_packages, || {
            if module.is_aggregate() {
                return Ok(Vec::new());
            }
            if module.is_repository() {
                if let Some(snapshot) = &module.descriptor().export_snapshot {
                    return Ok(snapshot.source_packages.clone());
                }
            }
            let files = self.source_files(module)?;
            Ok(distinct(files.iter().map(|f| f.package.clone())))
        })
    }

    /// Packages the module uses, plus the declaring packages of its
    /// provided services (a provider that extends instead of
    /// implementing its interface hides the package from the scanner).
    pub fn used_packages(&self, module: &Rc<Module>) -> Result<Rc<[PackageName]>, ResolveError> {
        self.cell(module, &module.analysis().used_packages, || {
            if module.is_aggregate() {
                return Ok(Vec::new());
            }
            let mut packages = Vec::new();
            let snapshot = module
                .descriptor()
                .export_snapshot
                .as_ref()
                .filter(|_| module.is_repository());
            match snapshot {
                Some(snapshot) => packages.extend(snapshot.used_packages.iter().cloned()),
                None => {
                    for file in self.source_files(module)?.iter() {
                        packages.extend(file.used_packages.iter().cloned());
                    }
                }
            }
            packages.extend(
                module
                    .descriptor()
                    .provided_services
                    .iter()
                    .map(|s| s.package()),
            );
            Ok(distinct(packages))
        })
    }

    /// Whether the module's closure facts include a package use. For
    /// snapshot-backed repository modules this never touches sources.
    pub fn uses_package(
        &self,
        module: &Rc<Module>,
        package: &PackageName,
    ) -> Result<bool, ResolveError> {
        if module.is_aggregate() {
            return Ok(false);
        }
        Ok(self.used_packages(module)?.iter().any(|p| p == package))
    }

    pub fn used_required_services(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[ServiceName]>, ResolveError> {
        self.cell(module, &module.analysis().used_required_services, || {
            self.used_services(module, true)
        })
    }

    pub fn used_optional_services(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[ServiceName]>, ResolveError> {
        self.cell(module, &module.analysis().used_optional_services, || {
            self.used_services(module, false)
        })
    }

    fn used_services(
        &self,
        module: &Rc<Module>,
        required: bool,
    ) -> Result<Vec<ServiceName>, ResolveError> {
        if module.is_aggregate() {
            return Ok(Vec::new());
        }
        let from_snapshot: Vec<ServiceName> = module
            .descriptor()
            .export_snapshot
            .as_ref()
            .map(|s| {
                if required {
                    s.used_required_services.clone()
                } else {
                    s.used_optional_services.clone()
                }
            })
            .unwrap_or_default();
        if module.is_repository() || !from_snapshot.is_empty() {
            return Ok(distinct(from_snapshot));
        }
        let files = self.source_files(module)?;
        Ok(distinct(files.iter().flat_map(|f| {
            if required {
                f.required_services.iter().cloned()
            } else {
                f.optional_services.iter().cloned()
            }
        })))
    }

    /// Services the module both uses and declares a class for.
    pub fn declared_services(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[ServiceName]>, ResolveError> {
        self.cell(module, &module.analysis().declared_services, || {
            let mut used: Vec<ServiceName> = self.used_required_services(module)?.to_vec();
            used.extend(self.used_optional_services(module)?.iter().cloned());
            let files = self.source_files(module)?;
            Ok(used
                .into_iter()
                .filter(|s| files.iter().any(|f| f.class_name == s.as_str()))
                .collect())
        })
    }

    /// Assemble a fresh export snapshot from the computed facts.
    ///
    /// Regenerating from a module that already resolves through a
    /// snapshot reproduces that snapshot: generation is a fixed point.
    pub fn export_snapshot(&self, module: &Rc<Module>) -> Result<ExportSnapshot, ResolveError> {
        let detected = self
            .detected_source_deps(module)?
            .iter()
            .map(|d| self.registry().get(d.destination).name().clone())
            .collect();
        Ok(ExportSnapshot {
            source_packages: self.source_packages(module)?.to_vec(),
            used_packages: self.used_packages(module)?.to_vec(),
            used_required_services: self.used_required_services(module)?.to_vec(),
            used_optional_services: self.used_optional_services(module)?.to_vec(),
            detected_source_deps: Some(detected),
        })
    }

    // ----- package lookup ----------------------------------------------

    /// Find the module declaring a package, lazily building the
    /// source-containment side of the package index.
    ///
    /// Unknown packages (platform or third-party) resolve to `None`.
    fn find_package_module(
        &self,
        package: &PackageName,
    ) -> Result<Option<Rc<Module>>, ResolveError> {
        if let Some(module) = self.registry().find_declaring_package(package) {
            return Ok(Some(module));
        }
        let mut claimants = Vec::new();
        for module in self.registry().modules_by_name() {
            if self.source_packages(&module)?.iter().any(|p| p == package) {
                claimants.push(module);
            }
        }
        match claimants.len() {
            0 => Ok(None),
            1 => {
                let module = claimants.remove(0);
                self.registry()
                    .claim_package(package.clone(), module.id(), false)?;
                Ok(Some(module))
            }
            _ => Err(crate::core::registry::RegistryError::AmbiguousPackage {
                package: package.clone(),
                modules: claimants.iter().map(|m| m.name().clone()).collect(),
            }
            .into()),
        }
    }

    // ----- dependency layers -------------------------------------------

    fn declared_dependencies(
        &self,
        module: &Rc<Module>,
        declared: &[DeclaredDependency],
    ) -> Result<Vec<Dependency>, ResolveError> {
        let mut deps = Vec::with_capacity(declared.len());
        for decl in declared {
            let destination = self.registry().require(&decl.name)?;
            deps.push(Dependency {
                source: module.id(),
                destination: destination.id(),
                kind: decl.kind,
                optional: decl.optional,
                scope: decl.scope.clone(),
                classifier: decl.classifier.clone(),
                executable_target: decl.executable_target.clone(),
            });
        }
        Ok(deps)
    }

    /// Layer 1: source dependencies detected from used packages, or
    /// taken verbatim from the export snapshot when it recorded them.
    pub(crate) fn detected_source_deps(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().detected_source_deps, || {
            let descriptor = module.descriptor();
            if descriptor.auto_detect_disabled {
                return Ok(Vec::new());
            }
            if let Some(names) = descriptor
                .export_snapshot
                .as_ref()
                .and_then(|s| s.detected_source_deps.clone())
            {
                let mut deps = Vec::with_capacity(names.len());
                for name in names {
                    let destination = self.registry().require(&name)?;
                    deps.push(Dependency::detected(module.id(), destination.id()));
                }
                return Ok(distinct(deps));
            }
            if module.is_aggregate() {
                return Ok(Vec::new());
            }
            let mut deps = Vec::new();
            for package in self.used_packages(module)?.iter() {
                if let Some(destination) = self.find_package_module(package)? {
                    if destination.id() != module.id() && destination.name() != module.name() {
                        deps.push(Dependency::detected(module.id(), destination.id()));
                    }
                }
            }
            Ok(distinct(deps))
        })
    }

    /// Layer 2: all source dependencies, detected or declared.
    fn source_direct_deps(&self, module: &Rc<Module>) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().source_direct_deps, || {
            let descriptor = module.descriptor();
            let mut deps = self.declared_dependencies(module, &descriptor.explicit_source_deps)?;
            deps.extend(self.detected_source_deps(module)?.iter().cloned());
            deps.extend(self.declared_dependencies(module, &descriptor.undetected_source_deps)?);
            Ok(deps)
        })
    }

    /// Layer 3: direct dependencies before emulation and implicit
    /// providers.
    pub(crate) fn direct_pre_emulation(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().direct_pre_emulation, || {
            let descriptor = module.descriptor();
            let mut deps = self.source_direct_deps(module)?.to_vec();
            deps.extend(self.declared_dependencies(module, &descriptor.resource_deps)?);
            if let Some(app) = &descriptor.application_dep {
                deps.extend(self.declared_dependencies(module, std::slice::from_ref(app))?);
            }
            deps.extend(self.declared_dependencies(module, &descriptor.plugin_deps)?);
            Ok(distinct(deps))
        })
    }

    /// Layer 4: closure of layer 3.
    pub(crate) fn transitive_pre_emulation(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().transitive_pre_emulation, || {
            let seeds = self.direct_pre_emulation(module)?;
            self.closure(&seeds, DirectLayer::PreEmulation)
        })
    }

    /// Layer 5: emulation dependencies (executables only).
    pub(crate) fn emulation_deps(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().emulation_deps, || {
            emulation::emulation_dependencies(self, module)
        })
    }

    /// Direct dependencies with emulation but without implicit
    /// providers; the baseline the provider search walks, because
    /// emulation modules may themselves use additional services.
    pub(crate) fn direct_pre_providers(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().direct_pre_providers, || {
            let mut deps = self.direct_pre_emulation(module)?.to_vec();
            deps.extend(self.emulation_deps(module)?.iter().cloned());
            Ok(distinct(deps))
        })
    }

    pub(crate) fn transitive_pre_providers(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().transitive_pre_providers, || {
            let seeds = self.direct_pre_providers(module)?;
            self.closure(&seeds, DirectLayer::PreProviders)
        })
    }

    /// Layer 6: auto-injected modules (executables only): modules in
    /// the required scope whose every `uses-package` condition is met
    /// somewhere in the executable's pre-provider closure.
    pub(crate) fn auto_injected(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[ModuleId]>, ResolveError> {
        self.cell(module, &module.analysis().auto_injected, || {
            if !module.is_executable() {
                return Ok(Vec::new());
            }
            let scope = self.required_provider_scope(module)?;
            let mut injected = Vec::new();
            'candidates: for &candidate_id in scope.iter() {
                let candidate = self.registry().get(candidate_id);
                let conditions = &candidate.descriptor().auto_injection_conditions;
                if conditions.is_empty() {
                    continue;
                }
                for package in conditions {
                    if !self.closure_uses_package(module, package)? {
                        continue 'candidates;
                    }
                }
                injected.push(candidate_id);
            }
            Ok(injected)
        })
    }

    fn closure_uses_package(
        &self,
        module: &Rc<Module>,
        package: &PackageName,
    ) -> Result<bool, ResolveError> {
        if self.uses_package(module, package)? {
            return Ok(true);
        }
        for dep in self.transitive_pre_providers(module)?.iter() {
            let destination = self.registry().get(dep.destination);
            if self.uses_package(&destination, package)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Layer 7a: the required-provider search scope: the executable's
    /// pre-provider closure plus the well-known roots (workspace root
    /// and registered roots matching the configured prefixes) expanded
    /// in depth and filtered to target-compatible modules.
    pub(crate) fn required_provider_scope(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[ModuleId]>, ResolveError> {
        self.cell(module, &module.analysis().required_provider_scope, || {
            let target = module.target().clone();
            let mut scope = Vec::new();
            let mut seen = HashSet::new();
            for dep in self.transitive_pre_providers(module)?.iter() {
                if seen.insert(dep.destination) {
                    scope.push(dep.destination);
                }
            }
            let root = self.root();
            let prefixes = self.provider_root_prefixes();
            for candidate_root in self.registry().roots() {
                let is_primary = candidate_root.id() == root.id();
                let matches_prefix = prefixes
                    .iter()
                    .any(|p| candidate_root.name().as_str().starts_with(p.as_str()));
                if !is_primary && !matches_prefix {
                    continue;
                }
                for descendant in self.this_and_children_in_depth(&candidate_root)? {
                    if descendant.target().grade(&target) < 0 {
                        continue;
                    }
                    if seen.insert(descendant.id()) {
                        scope.push(descendant.id());
                    }
                }
            }
            Ok(scope)
        })
    }

    /// Layer 7b: the optional-provider search scope: the pre-provider
    /// closure plus the auto-injected modules.
    pub(crate) fn optional_provider_scope(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[ModuleId]>, ResolveError> {
        self.cell(module, &module.analysis().optional_provider_scope, || {
            let mut scope = Vec::new();
            let mut seen = HashSet::new();
            for dep in self.transitive_pre_providers(module)?.iter() {
                if seen.insert(dep.destination) {
                    scope.push(dep.destination);
                }
            }
            for &id in self.auto_injected(module)?.iter() {
                if seen.insert(id) {
                    scope.push(id);
                }
            }
            Ok(scope)
        })
    }

    fn provider_root_prefixes(&self) -> Vec<String> {
        let root = self.root();
        let declared = &root.descriptor().provider_root_prefixes;
        if declared.is_empty() {
            self.config().provider_root_prefixes.clone()
        } else {
            declared.clone()
        }
    }

    /// A module and its aggregate descendants, pre-order, children in
    /// declaration order.
    pub(crate) fn this_and_children_in_depth(
        &self,
        module: &Rc<Module>,
    ) -> Result<Vec<Rc<Module>>, ResolveError> {
        let mut out = vec![Rc::clone(module)];
        for child_name in &module.descriptor().children {
            let child = self.registry().require(child_name)?;
            out.extend(self.this_and_children_in_depth(&child)?);
        }
        Ok(out)
    }

    /// The resolved service providers for an executable; empty for
    /// everything else. Sorted by service interface name.
    pub fn executable_providers(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Providers]>, ResolveError> {
        self.cell(module, &module.analysis().providers, || {
            providers::collect(self, module, module)
        })
    }

    /// Layer 8: provider modules not already reachable through the
    /// pre-provider closure, folded in as implicit dependencies.
    fn implicit_provider_deps(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().implicit_provider_deps, || {
            let reachable: HashSet<ModuleId> = self
                .transitive_pre_providers(module)?
                .iter()
                .map(|d| d.destination)
                .collect();
            let mut deps = Vec::new();
            for providers in self.executable_providers(module)?.iter() {
                for &provider in &providers.modules {
                    if provider != module.id() && !reachable.contains(&provider) {
                        deps.push(Dependency::implicit_provider(module.id(), provider));
                    }
                }
            }
            Ok(distinct(deps))
        })
    }

    /// Layer 9.
    pub(crate) fn direct_pre_finalize(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().direct_pre_finalize, || {
            let mut deps = self.direct_pre_providers(module)?.to_vec();
            deps.extend(self.implicit_provider_deps(module)?.iter().cloned());
            Ok(distinct(deps))
        })
    }

    /// Layer 10.
    pub(crate) fn transitive_pre_finalize(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().transitive_pre_finalize, || {
            let seeds = self.direct_pre_finalize(module)?;
            self.closure(&seeds, DirectLayer::PreFinalize)
        })
    }

    /// Layer 11: the final direct dependency set.
    pub fn direct_dependencies(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().direct_deps, || {
            if !module.is_executable() {
                return Ok(self
                    .direct_pre_finalize(module)?
                    .iter()
                    .filter(|d| d.executable_target.is_none())
                    .cloned()
                    .collect());
            }
            // Relocate executable-target dependencies out of the
            // transitive set, then resolve interface destinations.
            let mut seeds = self.direct_pre_finalize(module)?.to_vec();
            seeds.extend(
                self.transitive_pre_finalize(module)?
                    .iter()
                    .filter(|d| d.executable_target.is_some())
                    .cloned(),
            );
            let mut resolved = Vec::new();
            for dep in seeds {
                resolved.extend(interfaces::resolve_interface_dependency(self, module, dep)?);
            }
            let deduped = distinct_by(resolved, |d: &Dependency| d.finalize_key());
            Ok(deduped
                .into_iter()
                .filter(|d| match &d.executable_target {
                    None => true,
                    Some(required_for) => required_for.grade(module.target()) >= 0,
                })
                .collect())
        })
    }

    /// Layer 11: the final transitive dependency set.
    pub fn transitive_dependencies(
        &self,
        module: &Rc<Module>,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        self.cell(module, &module.analysis().transitive_deps, || {
            let base = self.transitive_pre_finalize(module)?;
            if !module.is_executable() {
                return Ok(base
                    .iter()
                    .filter(|d| d.executable_target.is_none())
                    .cloned()
                    .collect());
            }
            // Executable-target dependencies were relocated into the
            // direct set; interface destinations resolve here too.
            let mut resolved = Vec::new();
            for dep in base.iter().filter(|d| d.executable_target.is_none()) {
                resolved.extend(interfaces::resolve_interface_dependency(
                    self,
                    module,
                    dep.clone(),
                )?);
            }
            Ok(distinct_by(resolved, |d: &Dependency| d.finalize_key()))
        })
    }

    // ----- closure ------------------------------------------------------

    fn direct_layer(
        &self,
        module: &Rc<Module>,
        layer: DirectLayer,
    ) -> Result<Rc<[Dependency]>, ResolveError> {
        match layer {
            DirectLayer::PreEmulation => self.direct_pre_emulation(module),
            DirectLayer::PreProviders => self.direct_pre_providers(module),
            DirectLayer::PreFinalize => self.direct_pre_finalize(module),
        }
    }

    /// Depth-first closure over a direct layer. The visited set is
    /// keyed by the full `(source, destination, kind)` identity so
    /// mutually-referencing modules terminate.
    fn closure(
        &self,
        seeds: &Rc<[Dependency]>,
        layer: DirectLayer,
    ) -> Result<Vec<Dependency>, ResolveError> {
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        for dep in seeds.iter() {
            self.closure_visit(dep, layer, &mut visited, &mut out)?;
        }
        Ok(out)
    }

    fn closure_visit(
        &self,
        dep: &Dependency,
        layer: DirectLayer,
        visited: &mut HashSet<(ModuleId, ModuleId, DependencyKind)>,
        out: &mut Vec<Dependency>,
    ) -> Result<(), ResolveError> {
        if !visited.insert(dep.key()) {
            return Ok(());
        }
        out.push(dep.clone());
        let destination = self.registry().get(dep.destination);
        for next in self.direct_layer(&destination, layer)?.iter() {
            self.closure_visit(next, layer, visited, out)?;
        }
        Ok(())
    }
}
