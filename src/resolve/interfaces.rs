//! resolve::interfaces
//!
//! Interface-to-implementation resolution.
//!
//! # Behavior
//!
//! During executable finalization, a dependency whose destination is
//! an interface module is replaced by the best target-compatible
//! concrete module declaring `implements-module` for it: highest
//! target grade wins, ties break on the smaller module name. The
//! replacement pulls in the concrete module's pre-provider closure and
//! the providers a one-pass collection discovers for it, all as
//! implicit-provider dependencies; interface destinations surviving
//! inside that expansion are filtered out so the outer pass resolves
//! them by the same rule.
//!
//! A missing implementation keeps the interface dependency and emits a
//! warning.

use std::rc::Rc;

use crate::core::dependency::Dependency;
use crate::core::module::Module;
use crate::core::types::ModuleName;
use crate::derive::distinct;

use super::{providers, ResolveError, Resolver, Warning};

/// Resolve one dependency in the context of an executable. Returns
/// the dependency itself when nothing applies.
pub(crate) fn resolve_interface_dependency(
    resolver: &Resolver,
    executable: &Rc<Module>,
    dep: Dependency,
) -> Result<Vec<Dependency>, ResolveError> {
    if !executable.is_executable() {
        return Ok(vec![dep]);
    }
    let destination = resolver.registry().get(dep.destination);
    if !resolver.registry().is_interface_module(&destination) {
        return Ok(vec![dep]);
    }

    let Some(concrete) = best_implementation(resolver, executable, destination.name())? else {
        resolver.warn(Warning::MissingInterfaceImplementation {
            interface: destination.name().clone(),
            target: executable.target().clone(),
        });
        return Ok(vec![dep]);
    };

    let mut expanded = vec![Dependency::implicit_provider(
        executable.id(),
        concrete.id(),
    )];
    expanded.extend(resolver.transitive_pre_providers(&concrete)?.iter().cloned());
    // The concrete module may use services of its own; a one-pass
    // provider collection folds their modules in.
    for provider_set in providers::collect(resolver, executable, &concrete)? {
        for provider in provider_set.modules {
            expanded.push(Dependency::implicit_provider(executable.id(), provider));
        }
    }
    let expanded = expanded
        .into_iter()
        .filter(|d| {
            let module = resolver.registry().get(d.destination);
            !resolver.registry().is_interface_module(&module)
        })
        .collect::<Vec<_>>();
    Ok(distinct(expanded))
}

/// The best concrete implementation of an interface module for the
/// executable's target, if any.
fn best_implementation(
    resolver: &Resolver,
    executable: &Rc<Module>,
    interface: &ModuleName,
) -> Result<Option<Rc<Module>>, ResolveError> {
    let scope = resolver.required_provider_scope(executable)?;
    let mut best: Option<(i32, Rc<Module>)> = None;
    for &id in scope.iter() {
        let candidate = resolver.registry().get(id);
        if candidate.implements() != Some(interface) {
            continue;
        }
        let grade = candidate.target().grade(executable.target());
        if grade < 0 {
            continue;
        }
        let better = match &best {
            None => true,
            Some((best_grade, best_module)) => {
                grade > *best_grade
                    || (grade == *best_grade && candidate.name() < best_module.name())
            }
        };
        if better {
            best = Some((grade, candidate));
        }
    }
    Ok(best.map(|(_, module)| module))
}
