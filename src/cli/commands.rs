//! cli::commands
//!
//! Command handlers.
//!
//! # Architecture
//!
//! Each handler opens the workspace, drives the resolver, and formats
//! output through [`crate::ui::output`]. Handlers never mutate the
//! workspace; the resolver is read-only by construction.

use std::path::Path;
use std::rc::Rc;

use anyhow::{Context as _, Result};

use crate::core::module::Module;
use crate::core::types::ModuleName;
use crate::resolve::Resolver;
use crate::ui::output::{self, Verbosity};
use crate::workspace::Workspace;

/// Shared command context derived from global flags.
pub struct Context {
    pub cwd: std::path::PathBuf,
    pub verbosity: Verbosity,
}

/// Print a module's resolved dependencies.
pub fn resolve(ctx: &Context, module: &Option<String>, transitive: bool, json: bool) -> Result<()> {
    let workspace = open_workspace(&ctx.cwd)?;
    let resolver = workspace.resolver();
    let module = target_module(&workspace, module)?;

    let deps = if transitive {
        resolver.transitive_dependencies(&module)?
    } else {
        resolver.direct_dependencies(&module)?
    };

    if json {
        let entries: Vec<serde_json::Value> = deps
            .iter()
            .map(|dep| {
                serde_json::json!({
                    "module": resolver.registry().get(dep.destination).name().as_str(),
                    "kind": dep.kind.as_str(),
                    "optional": dep.optional,
                    "scope": dep.scope,
                    "classifier": dep.classifier,
                    "executable-target": dep.executable_target.as_ref().map(|t| t.to_string()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let set = if transitive { "transitive" } else { "direct" };
        output::print(
            format!("{} {set} dependencies ({})", module.name(), deps.len()),
            ctx.verbosity,
        );
        for dep in deps.iter() {
            let destination = resolver.registry().get(dep.destination);
            let mut line = format!("  {} ({})", destination.name(), dep.kind.as_str());
            if dep.optional {
                line.push_str(" [optional]");
            }
            if let Some(target) = &dep.executable_target {
                line.push_str(&format!(" [executable-target: {target}]"));
            }
            output::print(line, ctx.verbosity);
        }
    }

    report_warnings(&resolver, ctx.verbosity);
    Ok(())
}

/// Print an executable's resolved service providers.
pub fn providers(ctx: &Context, module: &Option<String>) -> Result<()> {
    let workspace = open_workspace(&ctx.cwd)?;
    let resolver = workspace.resolver();
    let module = target_module(&workspace, module)?;

    let providers = resolver.executable_providers(&module)?;
    output::print(
        format!("{} providers ({})", module.name(), providers.len()),
        ctx.verbosity,
    );
    for entry in providers.iter() {
        let names: Vec<String> = entry
            .modules
            .iter()
            .map(|&id| resolver.registry().get(id).name().to_string())
            .collect();
        output::print(
            format!("  {} -> [{}]", entry.service, names.join(", ")),
            ctx.verbosity,
        );
    }

    report_warnings(&resolver, ctx.verbosity);
    Ok(())
}

/// Print a module's export snapshot regenerated from computed facts.
pub fn snapshot(ctx: &Context, module: &Option<String>) -> Result<()> {
    let workspace = open_workspace(&ctx.cwd)?;
    let resolver = workspace.resolver();
    let module = target_module(&workspace, module)?;

    let snapshot = resolver.export_snapshot(&module)?;
    print!("{}", snapshot.to_xml());

    report_warnings(&resolver, ctx.verbosity);
    Ok(())
}

fn open_workspace(cwd: &Path) -> Result<Workspace> {
    Workspace::open(cwd).with_context(|| format!("failed to open workspace at '{}'", cwd.display()))
}

fn target_module(workspace: &Workspace, name: &Option<String>) -> Result<Rc<Module>> {
    match name {
        Some(name) => {
            let name = ModuleName::new(name.as_str())?;
            Ok(workspace.require(&name)?)
        }
        None => Ok(workspace.root()),
    }
}

fn report_warnings(resolver: &Resolver, verbosity: Verbosity) {
    for warning in resolver.warnings() {
        output::warn(warning, verbosity);
    }
}
