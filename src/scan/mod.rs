//! scan
//!
//! Syntactic scanning of a module's Java sources.
//!
//! # Architecture
//!
//! The scanner enumerates `.java` files under a module's source root
//! and extracts, per file:
//!
//! - the declared package and the file's qualified class name
//! - used packages (imports plus fully-qualified references)
//! - used required service interfaces (`Services.load(X.class)`)
//! - used optional service interfaces (`Services.loadOptional(X.class)`)
//!
//! Extraction is purely textual — no compilation, no classpath.
//! Comments and string literals are blanked before matching so a
//! commented-out import never becomes a dependency.
//!
//! # Invariants
//!
//! - File enumeration is sorted by path; output order is a function of
//!   the source tree only.
//! - `*-info.java` files and `super/` overlay directories are skipped.
//! - Modules without a source root produce empty sequences.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{PackageName, ServiceName};

/// Errors from source scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read source tree '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to scan source file '{path}': {detail}")]
    Parse { path: PathBuf, detail: String },
}

/// Facts extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// The file's declared package.
    pub package: PackageName,
    /// Fully-qualified class name (`package.FileStem`).
    pub class_name: String,
    /// Packages referenced by imports or qualified references, in
    /// first-seen order.
    pub used_packages: Vec<PackageName>,
    pub required_services: Vec<ServiceName>,
    pub optional_services: Vec<ServiceName>,
}

/// Enumerate and parse all source files under a root, sorted by path.
pub fn scan_source_root(root: &Path) -> Result<Vec<SourceFile>, ScanError> {
    let mut paths = Vec::new();
    collect_java_files(root, &mut paths)?;
    paths.sort();
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|source| ScanError::Io {
            path: path.clone(),
            source,
        })?;
        files.push(parse_source(&path, &text)?);
    }
    Ok(files)
}

fn collect_java_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ScanError> {
    let entries = fs::read_dir(dir).map_err(|source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut entries: Vec<_> = entries
        .collect::<Result<_, _>>()
        .map_err(|source| ScanError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            // Target-specific overlay sources shadow regular sources
            // at build time; they never feed dependency analysis.
            if name == "super" {
                continue;
            }
            collect_java_files(&path, out)?;
        } else if name.ends_with(".java") && !name.ends_with("-info.java") {
            out.push(path);
        }
    }
    Ok(())
}

/// Parse one source file's text.
pub fn parse_source(path: &Path, text: &str) -> Result<SourceFile, ScanError> {
    let clean = blank_comments_and_strings(text);

    let package = declared_package(&clean).ok_or_else(|| ScanError::Parse {
        path: path.to_path_buf(),
        detail: "missing package declaration".into(),
    })?;
    let package = PackageName::new(package).map_err(|e| ScanError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let class_name = format!("{package}.{stem}");

    let imports = parse_imports(&clean);
    let mut used_packages = Vec::new();
    let mut push_package = |pkg: PackageName| {
        if !used_packages.contains(&pkg) {
            used_packages.push(pkg);
        }
    };
    for import in &imports {
        push_package(import.package.clone());
    }
    for pkg in qualified_reference_packages(&clean) {
        push_package(pkg);
    }

    let (required_services, optional_services) =
        service_uses(&clean, &imports, &package).map_err(|detail| ScanError::Parse {
            path: path.to_path_buf(),
            detail,
        })?;

    Ok(SourceFile {
        path: path.to_path_buf(),
        package,
        class_name,
        used_packages,
        required_services,
        optional_services,
    })
}

struct Import {
    package: PackageName,
    /// Simple class name for non-wildcard imports.
    simple: Option<String>,
}

/// Replace comments and string/char literals with spaces, preserving
/// length and line structure.
fn blank_comments_and_strings(src: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Code,
        Line,
        Block,
        Str,
        Chr,
    }
    let mut out = String::with_capacity(src.len());
    let mut mode = Mode::Code;
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        match mode {
            Mode::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    mode = Mode::Line;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    mode = Mode::Block;
                }
                '"' => {
                    out.push(' ');
                    mode = Mode::Str;
                }
                '\'' => {
                    out.push(' ');
                    mode = Mode::Chr;
                }
                _ => out.push(c),
            },
            Mode::Line => {
                if c == '\n' {
                    out.push('\n');
                    mode = Mode::Code;
                } else {
                    out.push(' ');
                }
            }
            Mode::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    mode = Mode::Code;
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            Mode::Str | Mode::Chr => {
                let quote = if mode == Mode::Str { '"' } else { '\'' };
                if c == '\\' {
                    chars.next();
                    out.push_str("  ");
                } else if c == quote {
                    out.push(' ');
                    mode = Mode::Code;
                } else {
                    out.push(' ');
                }
            }
        }
    }
    out
}

fn declared_package(clean: &str) -> Option<String> {
    for line in clean.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("package ") {
            let name = rest.split(';').next()?.trim();
            return Some(name.to_string());
        }
    }
    None
}

fn parse_imports(clean: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    for line in clean.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("import ") else {
            continue;
        };
        let rest = rest.trim();
        let (is_static, rest) = match rest.strip_prefix("static ") {
            Some(r) => (true, r.trim()),
            None => (false, rest),
        };
        let Some(name) = rest.split(';').next() else {
            continue;
        };
        let name = name.trim();
        let import = if let Some(pkg) = name.strip_suffix(".*") {
            PackageName::new(pkg).ok().map(|package| Import {
                package,
                simple: None,
            })
        } else if is_static {
            // import static a.b.C.member → package a.b
            name.rsplit_once('.')
                .and_then(|(qualified, _)| qualified.rsplit_once('.'))
                .and_then(|(pkg, _)| PackageName::new(pkg).ok())
                .map(|package| Import {
                    package,
                    simple: None,
                })
        } else {
            name.rsplit_once('.').and_then(|(pkg, class)| {
                PackageName::new(pkg).ok().map(|package| Import {
                    package,
                    simple: Some(class.to_string()),
                })
            })
        };
        if let Some(import) = import {
            imports.push(import);
        }
    }
    imports
}

/// Packages referenced through fully-qualified names in code: a dotted
/// identifier chain whose first uppercase segment is preceded by at
/// least one lowercase package segment (`com.ex.ui.Widget` uses
/// `com.ex.ui`).
fn qualified_reference_packages(clean: &str) -> Vec<PackageName> {
    let mut out = Vec::new();
    for segments in identifier_chains(clean) {
        let Some(split) = segments
            .iter()
            .position(|s| s.starts_with(|c: char| c.is_ascii_uppercase()))
        else {
            continue;
        };
        if split == 0 {
            continue;
        }
        if let Ok(pkg) = PackageName::new(segments[..split].join(".")) {
            if !out.contains(&pkg) {
                out.push(pkg);
            }
        }
    }
    out
}

fn identifier_chains(clean: &str) -> Vec<Vec<String>> {
    let bytes = clean.as_bytes();
    let is_start = |b: u8| b.is_ascii_alphabetic() || b == b'_' || b == b'$';
    let is_part = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'$';
    let mut chains = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !is_start(bytes[i]) {
            // Skip the rest of a token starting with a digit so
            // numeric literals like 1.5e3 never look like chains.
            while i < bytes.len() && is_part(bytes[i]) {
                i += 1;
            }
            i += 1;
            continue;
        }
        let mut segments = Vec::new();
        loop {
            let start = i;
            while i < bytes.len() && is_part(bytes[i]) {
                i += 1;
            }
            segments.push(clean[start..i].to_string());
            if i + 1 < bytes.len() && bytes[i] == b'.' && is_start(bytes[i + 1]) {
                i += 1;
                continue;
            }
            break;
        }
        if segments.len() >= 2 {
            chains.push(segments);
        }
    }
    chains
}

fn service_uses(
    clean: &str,
    imports: &[Import],
    own_package: &PackageName,
) -> Result<(Vec<ServiceName>, Vec<ServiceName>), String> {
    let mut required = Vec::new();
    let mut optional = Vec::new();
    for (pos, _) in clean.match_indices("Services.load") {
        if pos > 0 {
            let before = clean.as_bytes()[pos - 1];
            if before.is_ascii_alphanumeric() || before == b'_' || before == b'$' || before == b'.'
            {
                continue;
            }
        }
        let rest = &clean[pos + "Services.load".len()..];
        let (is_optional, args) = if let Some(args) = rest.strip_prefix("Optional(") {
            (true, args)
        } else if let Some(args) = rest.strip_prefix('(') {
            (false, args)
        } else {
            continue;
        };
        let Some(arg) = args.split(')').next() else {
            continue;
        };
        let Some(class_ref) = arg.trim().strip_suffix(".class") else {
            continue;
        };
        let service = resolve_class_reference(class_ref.trim(), imports, own_package)?;
        let bucket = if is_optional { &mut optional } else { &mut required };
        if !bucket.contains(&service) {
            bucket.push(service);
        }
    }
    Ok((required, optional))
}

fn resolve_class_reference(
    class_ref: &str,
    imports: &[Import],
    own_package: &PackageName,
) -> Result<ServiceName, String> {
    if class_ref.contains('.') {
        return ServiceName::new(class_ref).map_err(|e| e.to_string());
    }
    let package = imports
        .iter()
        .find(|i| i.simple.as_deref() == Some(class_ref))
        .map(|i| &i.package)
        .unwrap_or(own_package);
    ServiceName::new(format!("{package}.{class_ref}")).map_err(|e| e.to_string())
}
