//! resolve::emulation
//!
//! Per-target emulation module selection.
//!
//! # Policy
//!
//! Executables need extra modules that re-implement platform APIs
//! their target lacks:
//!
//! - browser targets get the fixed trio: the web UI kit, the base
//!   runtime emulation and the time library;
//! - desktop/mobile JVM targets (`openfx` or `native`) get the OpenFX
//!   kit and the boot module, plus the media emulation when the
//!   pre-emulation closure already uses it;
//! - plain JVM targets keep only the emulation modules already present
//!   in their pre-emulation closure;
//! - everything else gets nothing.
//!
//! Named modules must be registered; a missing one is an
//! `UnknownModule` failure, not a silent skip.

use std::rc::Rc;

use crate::core::dependency::Dependency;
use crate::core::module::Module;
use crate::core::target::TargetTag;
use crate::core::types::ModuleName;
use crate::derive::distinct;

use super::{ResolveError, Resolver};

/// Module names injected for browser-transpiled executables.
const WEB_EMULATION: [&str; 3] = ["kit-web", "javabase-emul-web", "time-web"];
/// The OpenFX UI kit for desktop/mobile JVM executables.
const OPENFX_KIT: &str = "kit-openfx";
/// Media emulation, injected only when the graph already uses it.
const MEDIA_EMULATION: &str = "kit-media-emul";
/// JVM boot module for desktop/mobile JVM executables.
const JAVA_BOOT: &str = "boot-java";

/// Whether a module name denotes an emulation module.
pub(crate) fn is_emulation_name(name: &ModuleName) -> bool {
    name.as_str().ends_with("-emul") || name.as_str().contains("-emul-")
}

/// Compute the emulation dependencies for a module; empty unless it
/// is executable.
pub(crate) fn emulation_dependencies(
    resolver: &Resolver,
    module: &Rc<Module>,
) -> Result<Vec<Dependency>, ResolveError> {
    if !module.is_executable() {
        return Ok(Vec::new());
    }
    let target = module.target().clone();

    let mut destinations = Vec::new();
    if target.has_tag(TargetTag::Web) {
        for name in WEB_EMULATION {
            destinations.push(lookup(resolver, name)?);
        }
    } else if target.has_tag(TargetTag::Jre)
        && (target.has_tag(TargetTag::OpenFx) || target.has_tag(TargetTag::Native))
    {
        let uses_media = resolver
            .transitive_pre_emulation(module)?
            .iter()
            .any(|d| {
                resolver
                    .registry()
                    .get(d.destination)
                    .name()
                    .as_str()
                    .contains(MEDIA_EMULATION)
            });
        destinations.push(lookup(resolver, OPENFX_KIT)?);
        if uses_media {
            destinations.push(lookup(resolver, MEDIA_EMULATION)?);
        }
        destinations.push(lookup(resolver, JAVA_BOOT)?);
    } else if target.has_tag(TargetTag::Jre) {
        for dep in resolver.transitive_pre_emulation(module)?.iter() {
            let destination = resolver.registry().get(dep.destination);
            if is_emulation_name(destination.name()) {
                destinations.push(destination);
            }
        }
    }

    Ok(distinct(
        destinations
            .into_iter()
            .map(|dest| Dependency::emulation(module.id(), dest.id()))
            .collect::<Vec<_>>(),
    ))
}

fn lookup(resolver: &Resolver, name: &str) -> Result<Rc<Module>, ResolveError> {
    let name = ModuleName::new(name)?;
    Ok(resolver.registry().require(&name)?)
}
