//! descriptor
//!
//! Parsing of `weft.xml` module descriptors.
//!
//! # Overview
//!
//! Every module is described by a `weft.xml` file: declared
//! dependencies by kind, provided services, auto-injection conditions,
//! target tags, interface/executable markers, and (for repository
//! modules) an export snapshot of precomputed dependency facts.
//!
//! The parsed [`Descriptor`] is a passive record; dependency names are
//! kept as names and resolved against the registry when the graph
//! builder runs.
//!
//! # Failure
//!
//! Malformed XML fails the owning module's analysis with
//! [`DescriptorError::Parse`]; the resolver surfaces this without
//! attempting to recover. Parsing reads only the elements it models;
//! unrecognized elements and attributes are ignored, so descriptors
//! from newer tool versions stay loadable.

pub mod snapshot;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::dependency::DependencyKind;
use crate::core::target::Target;
use crate::core::types::{ArtifactCoords, ModuleName, PackageName, ServiceName};

pub use snapshot::ExportSnapshot;

/// Errors from descriptor operations.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read descriptor '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse descriptor '{path}': {detail}")]
    Parse { path: PathBuf, detail: String },
}

/// A dependency as declared in a descriptor, prior to registry
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub name: ModuleName,
    pub kind: DependencyKind,
    pub optional: bool,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    pub executable_target: Option<Target>,
}

/// A repository module declared by the root descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDecl {
    pub name: ModuleName,
    pub coords: ArtifactCoords,
}

/// Parsed view of a module's `weft.xml`.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    /// Module name; falls back to the directory name when absent.
    pub name: Option<ModuleName>,
    pub group: Option<String>,
    pub artifact: Option<String>,
    pub version: Option<String>,

    /// Entry-point marker with the target it is built for.
    pub executable: Option<Target>,
    /// Target tags for non-executable compatibility grading.
    pub target_tags: Target,
    /// Explicit interface-module marker.
    pub interface_flag: bool,
    /// Declares this module as a concrete implementation of an
    /// interface module.
    pub implements: Option<ModuleName>,
    /// Child module directory names (aggregates).
    pub children: Vec<ModuleName>,
    /// When set, the source scanner contributes no detected
    /// dependencies for this module.
    pub auto_detect_disabled: bool,

    pub explicit_source_deps: Vec<DeclaredDependency>,
    pub undetected_source_deps: Vec<DeclaredDependency>,
    pub resource_deps: Vec<DeclaredDependency>,
    pub application_dep: Option<DeclaredDependency>,
    pub plugin_deps: Vec<DeclaredDependency>,

    /// Service interfaces this module provides an implementation for.
    pub provided_services: Vec<ServiceName>,
    /// Package conditions that auto-inject this module into
    /// executables whose closure uses every listed package.
    pub auto_injection_conditions: Vec<PackageName>,
    /// Packages this module explicitly exports (package-index
    /// precedence over mere source containment).
    pub exported_packages: Vec<PackageName>,

    /// Repository modules pulled from the artifact cache (root
    /// descriptor only).
    pub libraries: Vec<LibraryDecl>,
    /// Name prefixes of registered roots searched for providers.
    pub provider_root_prefixes: Vec<String>,

    pub export_snapshot: Option<ExportSnapshot>,
}

impl Descriptor {
    /// Read and parse a descriptor file.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let text = fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse descriptor text; `path` is used for error reporting only.
    pub fn parse(text: &str, path: &Path) -> Result<Self, DescriptorError> {
        let err = |detail: String| DescriptorError::Parse {
            path: path.to_path_buf(),
            detail,
        };
        let doc = roxmltree::Document::parse(text).map_err(|e| err(e.to_string()))?;
        let root = doc.root_element();
        if root.tag_name().name() != "module" {
            return Err(err(format!(
                "expected root element <module>, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut descriptor = Descriptor::default();
        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "name" => {
                    descriptor.name = Some(
                        ModuleName::new(text_of(&child)).map_err(|e| err(e.to_string()))?,
                    );
                }
                "group" => descriptor.group = Some(text_of(&child)),
                "artifact" => descriptor.artifact = Some(text_of(&child)),
                "version" => descriptor.version = Some(text_of(&child)),
                "executable" => {
                    let target = match child.attribute("target") {
                        Some(tags) => Target::parse(tags).map_err(|e| err(e.to_string()))?,
                        None => Target::untagged(),
                    };
                    descriptor.executable = Some(target);
                }
                "target-tags" => {
                    descriptor.target_tags =
                        Target::parse(&text_of(&child)).map_err(|e| err(e.to_string()))?;
                }
                "interface" => descriptor.interface_flag = true,
                "implements-module" => {
                    descriptor.implements = Some(
                        ModuleName::new(text_of(&child)).map_err(|e| err(e.to_string()))?,
                    );
                }
                "no-auto-detect" => descriptor.auto_detect_disabled = true,
                "children" => {
                    for module in elements(&child, "module") {
                        descriptor.children.push(
                            ModuleName::new(text_of(&module)).map_err(|e| err(e.to_string()))?,
                        );
                    }
                }
                "dependencies" => parse_dependencies(&child, &mut descriptor, &err)?,
                "provides" => {
                    for service in elements(&child, "java-service") {
                        descriptor.provided_services.push(
                            ServiceName::new(text_of(&service))
                                .map_err(|e| err(e.to_string()))?,
                        );
                    }
                }
                "auto-injection-conditions" => {
                    for pkg in elements(&child, "uses-package") {
                        descriptor.auto_injection_conditions.push(
                            PackageName::new(text_of(&pkg)).map_err(|e| err(e.to_string()))?,
                        );
                    }
                }
                "exported-packages" => {
                    for pkg in elements(&child, "package") {
                        descriptor.exported_packages.push(
                            PackageName::new(text_of(&pkg)).map_err(|e| err(e.to_string()))?,
                        );
                    }
                }
                "libraries" => {
                    for lib in elements(&child, "library") {
                        descriptor.libraries.push(parse_library(&lib, &err)?);
                    }
                }
                "provider-roots" => {
                    for prefix in elements(&child, "prefix") {
                        descriptor.provider_root_prefixes.push(text_of(&prefix));
                    }
                }
                "export-snapshot" => {
                    descriptor.export_snapshot =
                        Some(ExportSnapshot::from_node(&child).map_err(err)?);
                }
                // Elements outside the modeled vocabulary are ignored.
                _ => {}
            }
        }
        Ok(descriptor)
    }

    /// Whether this module only groups children and has no sources.
    pub fn is_aggregate(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_interface(&self) -> bool {
        self.interface_flag
    }

    pub fn is_executable(&self) -> bool {
        self.executable.is_some()
    }

    pub fn has_export_snapshot(&self) -> bool {
        self.export_snapshot.is_some()
    }
}

fn text_of(node: &roxmltree::Node) -> String {
    node.text().unwrap_or("").trim().to_string()
}

fn elements<'a, 'input>(
    parent: &'a roxmltree::Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    parent
        .children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn parse_dependencies(
    node: &roxmltree::Node,
    descriptor: &mut Descriptor,
    err: &impl Fn(String) -> DescriptorError,
) -> Result<(), DescriptorError> {
    for entry in node.children().filter(|n| n.is_element()) {
        let element = entry.tag_name().name();
        let undetected = entry.attribute("undetected") == Some("true");
        let kind = match element {
            "source" if undetected => DependencyKind::UndetectedSource,
            "source" => DependencyKind::ExplicitSource,
            "resource" => DependencyKind::Resource,
            "application" => DependencyKind::Application,
            "plugin" => DependencyKind::Plugin,
            _ => continue,
        };
        let executable_target = entry
            .attribute("executable-target")
            .map(Target::parse)
            .transpose()
            .map_err(|e| err(e.to_string()))?;
        let dep = DeclaredDependency {
            name: ModuleName::new(text_of(&entry)).map_err(|e| err(e.to_string()))?,
            kind,
            optional: entry.attribute("optional") == Some("true"),
            scope: entry.attribute("scope").map(str::to_string),
            classifier: entry.attribute("classifier").map(str::to_string),
            executable_target,
        };
        match kind {
            DependencyKind::ExplicitSource => descriptor.explicit_source_deps.push(dep),
            DependencyKind::UndetectedSource => descriptor.undetected_source_deps.push(dep),
            DependencyKind::Resource => descriptor.resource_deps.push(dep),
            DependencyKind::Plugin => descriptor.plugin_deps.push(dep),
            DependencyKind::Application => {
                if descriptor.application_dep.is_some() {
                    return Err(err("multiple <application> dependencies".into()));
                }
                descriptor.application_dep = Some(dep);
            }
            _ => unreachable!("derived kinds are never declared"),
        }
    }
    Ok(())
}

fn parse_library(
    node: &roxmltree::Node,
    err: &impl Fn(String) -> DescriptorError,
) -> Result<LibraryDecl, DescriptorError> {
    let attr = |name: &str| {
        node.attribute(name)
            .map(str::to_string)
            .ok_or_else(|| err(format!("<library> missing attribute '{name}'")))
    };
    let name = ModuleName::new(attr("name")?).map_err(|e| err(e.to_string()))?;
    let artifact = match node.attribute("artifact") {
        Some(a) => a.to_string(),
        None => name.as_str().to_string(),
    };
    let coords = ArtifactCoords::new(attr("group")?, artifact, attr("version")?)
        .map_err(|e| err(e.to_string()))?;
    Ok(LibraryDecl { name, coords })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Descriptor {
        Descriptor::parse(text, Path::new("weft.xml")).unwrap()
    }

    #[test]
    fn minimal_descriptor() {
        let d = parse("<module><name>ui</name></module>");
        assert_eq!(d.name.clone().unwrap().as_str(), "ui");
        assert!(!d.is_aggregate());
        assert!(!d.is_executable());
        assert!(!d.is_interface());
    }

    #[test]
    fn executable_with_target() {
        let d = parse(r#"<module><name>app-web</name><executable target="web"/></module>"#);
        assert!(d.is_executable());
        assert_eq!(d.executable.unwrap().to_string(), "web");
    }

    #[test]
    fn dependency_kinds_and_modifiers() {
        let d = parse(
            r#"<module>
                 <name>app</name>
                 <dependencies>
                   <source>css-api</source>
                   <source optional="true" scope="test">utils</source>
                   <source undetected="true">hidden</source>
                   <source executable-target="jre">logging-jre</source>
                   <resource>assets</resource>
                   <application>main-app</application>
                   <plugin>build-plugin</plugin>
                 </dependencies>
               </module>"#,
        );
        assert_eq!(d.explicit_source_deps.len(), 3);
        assert!(d.explicit_source_deps[1].optional);
        assert_eq!(d.explicit_source_deps[1].scope.as_deref(), Some("test"));
        assert_eq!(
            d.explicit_source_deps[2]
                .executable_target
                .as_ref()
                .unwrap()
                .to_string(),
            "jre"
        );
        assert_eq!(d.undetected_source_deps.len(), 1);
        assert_eq!(d.resource_deps.len(), 1);
        assert_eq!(d.application_dep.unwrap().name.as_str(), "main-app");
        assert_eq!(d.plugin_deps.len(), 1);
    }

    #[test]
    fn interface_and_implements() {
        let api = parse("<module><name>css-api</name><interface/></module>");
        assert!(api.is_interface());

        let imp = parse(
            "<module><name>css-api-web</name>\
             <implements-module>css-api</implements-module>\
             <target-tags>web</target-tags></module>",
        );
        assert_eq!(imp.implements.unwrap().as_str(), "css-api");
        assert_eq!(imp.target_tags.to_string(), "web");
    }

    #[test]
    fn aggregate_children() {
        let d = parse(
            "<module><name>root</name>\
             <children><module>ui</module><module>app-web</module></children></module>",
        );
        assert!(d.is_aggregate());
        assert_eq!(d.children.len(), 2);
    }

    #[test]
    fn provides_and_injection_conditions() {
        let d = parse(
            "<module><name>store-idb</name>\
             <provides><java-service>com.ex.spi.Store</java-service></provides>\
             <auto-injection-conditions><uses-package>com.ex.store</uses-package>\
             </auto-injection-conditions></module>",
        );
        assert_eq!(d.provided_services[0].as_str(), "com.ex.spi.Store");
        assert_eq!(d.auto_injection_conditions[0].as_str(), "com.ex.store");
    }

    #[test]
    fn libraries_and_provider_roots() {
        let d = parse(
            r#"<module><name>root</name>
                 <libraries>
                   <library name="kit-web" group="org.weft" version="2.1.0"/>
                 </libraries>
                 <provider-roots><prefix>kit</prefix><prefix>store</prefix></provider-roots>
               </module>"#,
        );
        assert_eq!(d.libraries.len(), 1);
        assert_eq!(d.libraries[0].coords.to_string(), "org.weft:kit-web:2.1.0");
        assert_eq!(d.provider_root_prefixes, vec!["kit", "store"]);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let result = Descriptor::parse("<module><name>x</name>", Path::new("bad.xml"));
        assert!(matches!(result, Err(DescriptorError::Parse { .. })));
    }

    #[test]
    fn unrecognized_content_is_ignored() {
        let d = parse(
            r#"<module><name>ui</name><description>a widget kit</description>
                 <dependencies><source>base</source><maven-scope>compile</maven-scope>
                 </dependencies></module>"#,
        );
        assert_eq!(d.name.unwrap().as_str(), "ui");
        assert_eq!(d.explicit_source_deps.len(), 1);
    }

    #[test]
    fn duplicate_application_rejected() {
        let result = Descriptor::parse(
            "<module><dependencies><application>a</application>\
             <application>b</application></dependencies></module>",
            Path::new("bad.xml"),
        );
        assert!(matches!(result, Err(DescriptorError::Parse { .. })));
    }
}
