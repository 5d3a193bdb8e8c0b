//! resolve::providers
//!
//! Service-provider resolution for executable modules.
//!
//! # Algorithm
//!
//! A worklist fixed-point. The walk starts from the collecting module
//! and its pre-provider closure; each walked module contributes the
//! required and optional service interfaces its sources (or snapshot)
//! use. Required services resolve to exactly one provider — searched
//! first among the walked modules, then in the required scope — and
//! the chosen provider joins the walk together with its own closure,
//! because providers may use further services. Optional services
//! accumulate every matching provider. The loop ends when the walk
//! stops growing.
//!
//! When the collecting module differs from the executable (interface
//! resolution collects providers for a concrete implementation), a
//! single pass runs and the walk never grows.
//!
//! # Determinism
//!
//! Candidates are ordered by descending target grade, then ascending
//! module name; the emitted provider list is sorted by service name.
//! Unresolved required services produce a warning, never an abort.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::core::module::{Module, ModuleId};
use crate::core::target::Target;
use crate::core::types::ServiceName;

use super::{ResolveError, Resolver, Warning};

/// The providers chosen for one service interface point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Providers {
    pub service: ServiceName,
    /// Exactly one module for required services; all matches for
    /// optional services.
    pub modules: Vec<ModuleId>,
}

/// Run the provider fixed-point for `collecting` in the context of
/// `executable`. Returns nothing when the executable is not actually
/// executable.
pub(crate) fn collect(
    resolver: &Resolver,
    executable: &Rc<Module>,
    collecting: &Rc<Module>,
) -> Result<Vec<Providers>, ResolveError> {
    if !executable.is_executable() {
        return Ok(Vec::new());
    }
    let full_walk = collecting.id() == executable.id();

    let mut walking: Vec<ModuleId> = Vec::new();
    let mut walked: HashSet<ModuleId> = HashSet::new();
    let push_walking =
        |walking: &mut Vec<ModuleId>, walked: &mut HashSet<ModuleId>, id: ModuleId| {
            if walked.insert(id) {
                walking.push(id);
            }
        };
    push_walking(&mut walking, &mut walked, collecting.id());
    for dep in resolver.transitive_pre_providers(collecting)?.iter() {
        push_walking(&mut walking, &mut walked, dep.destination);
    }

    let required_scope = resolver.required_provider_scope(executable)?;
    let optional_scope = resolver.optional_provider_scope(executable)?;

    let mut required: Vec<ServiceName> = Vec::new();
    let mut optional: Vec<ServiceName> = Vec::new();
    let mut providers: BTreeMap<ServiceName, Vec<ModuleId>> = BTreeMap::new();

    let mut walking_index = 0;
    loop {
        // Drain the walk into the service worklists.
        while walking_index < walking.len() {
            let module = resolver.registry().get(walking[walking_index]);
            for spi in resolver.used_required_services(&module)?.iter() {
                if !required.contains(spi) && !providers.contains_key(spi) {
                    required.push(spi.clone());
                }
            }
            for spi in resolver.used_optional_services(&module)?.iter() {
                if !optional.contains(spi) {
                    optional.push(spi.clone());
                }
            }
            walking_index += 1;
        }

        let walking_before = walking.len();

        // Resolve required services: one provider each, walked
        // modules searched before the wider scope.
        let mut unresolved = Vec::new();
        for spi in std::mem::take(&mut required) {
            let mut candidates = find_providers(resolver, &walking, &spi, executable.target())?;
            if candidates.is_empty() {
                candidates = find_providers(resolver, &required_scope, &spi, executable.target())?;
            }
            match candidates.first() {
                Some(&pick) => {
                    providers.insert(spi, vec![pick]);
                    if full_walk {
                        push_walking(&mut walking, &mut walked, pick);
                        let provider = resolver.registry().get(pick);
                        for dep in resolver.transitive_pre_providers(&provider)?.iter() {
                            push_walking(&mut walking, &mut walked, dep.destination);
                        }
                    }
                }
                None => unresolved.push(spi),
            }
        }
        required = unresolved;

        // Merge optional providers from the optional scope and the
        // walked modules.
        for spi in &optional {
            if !providers.contains_key(spi) {
                let found = find_providers(resolver, &optional_scope, spi, collecting.target())?;
                providers.insert(spi.clone(), found);
            }
            let additional = find_providers(resolver, &walking, spi, collecting.target())?;
            if let Some(entry) = providers.get_mut(spi) {
                for module in additional {
                    if !entry.contains(&module) {
                        entry.push(module);
                    }
                    if full_walk {
                        push_walking(&mut walking, &mut walked, module);
                    }
                }
            }
        }

        // A nested collection (interface resolution) runs one pass;
        // the executable's own collection loops until the walk stops
        // growing, because newly added providers may use services too.
        if !full_walk {
            break;
        }
        if walking.len() == walking_before {
            break;
        }
    }

    if full_walk {
        for spi in required {
            let scope = required_scope
                .iter()
                .map(|&id| resolver.registry().get(id).name().clone())
                .collect();
            resolver.warn(Warning::UnresolvedRequiredService {
                service: spi,
                scope,
            });
        }
    }

    Ok(providers
        .into_iter()
        .map(|(service, modules)| Providers { service, modules })
        .collect())
}

/// Modules in `scope` declaring a provider for `spi`, filtered to
/// target-compatible ones and ordered by descending grade then
/// ascending name.
fn find_providers(
    resolver: &Resolver,
    scope: &[ModuleId],
    spi: &ServiceName,
    target: &Target,
) -> Result<Vec<ModuleId>, ResolveError> {
    let mut graded = Vec::new();
    for &id in scope {
        let module = resolver.registry().get(id);
        if !module.descriptor().provided_services.contains(spi) {
            continue;
        }
        let grade = module.target().grade(target);
        if grade >= 0 {
            graded.push((grade, module.name().clone(), id));
        }
    }
    graded.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(graded.into_iter().map(|(_, _, id)| id).collect())
}
