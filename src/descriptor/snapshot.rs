//! descriptor::snapshot
//!
//! Export snapshots: precomputed dependency facts embedded in a
//! descriptor.
//!
//! # Purpose
//!
//! Repository modules are published with a snapshot of the facts the
//! resolver would otherwise extract from their sources: source
//! packages, used packages, used services, and scanner-detected
//! source dependencies. When a snapshot is present it is
//! authoritative, so resolution never needs to download a source
//! archive.
//!
//! Snapshots are also *generated*: the resolver can project a
//! workspace module's computed facts into a fresh snapshot, and
//! regenerating from a snapshot-backed module reproduces the same
//! snapshot (a fixed point).

use std::fmt::Write as _;

use crate::core::types::{ModuleName, PackageName, ServiceName};

/// Precomputed dependency facts for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSnapshot {
    /// Packages declared by the module's own sources.
    pub source_packages: Vec<PackageName>,
    /// Packages the module's sources use.
    pub used_packages: Vec<PackageName>,
    pub used_required_services: Vec<ServiceName>,
    pub used_optional_services: Vec<ServiceName>,
    /// Scanner-detected source dependencies, when the snapshot
    /// recorded them. `None` means the snapshot predates detection
    /// and the resolver falls back to used-package lookup.
    pub detected_source_deps: Option<Vec<ModuleName>>,
}

impl ExportSnapshot {
    /// Parse an `<export-snapshot>` element.
    pub(crate) fn from_node(node: &roxmltree::Node) -> Result<Self, String> {
        let mut snapshot = ExportSnapshot::default();
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "source-packages" => {
                    snapshot.source_packages = packages(&child)?;
                }
                "used-packages" => {
                    snapshot.used_packages = packages(&child)?;
                }
                "used-services" => {
                    let required = child.attribute("required") != Some("false");
                    let services = child
                        .children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "service")
                        .map(|n| ServiceName::new(n.text().unwrap_or("").trim()))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| e.to_string())?;
                    if required {
                        snapshot.used_required_services = services;
                    } else {
                        snapshot.used_optional_services = services;
                    }
                }
                "detected-source-dependencies" => {
                    let modules = child
                        .children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "module")
                        .map(|n| ModuleName::new(n.text().unwrap_or("").trim()))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| e.to_string())?;
                    snapshot.detected_source_deps = Some(modules);
                }
                // Sections outside the modeled vocabulary are ignored.
                _ => {}
            }
        }
        Ok(snapshot)
    }

    /// Render the snapshot as an `<export-snapshot>` element.
    ///
    /// The output parses back to an equal snapshot and is stable
    /// across runs given equal inputs.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<export-snapshot>\n");
        write_list(&mut out, "source-packages", "package", &self.source_packages);
        write_list(&mut out, "used-packages", "package", &self.used_packages);
        let _ = writeln!(out, "  <used-services required=\"true\">");
        for service in &self.used_required_services {
            let _ = writeln!(out, "    <service>{service}</service>");
        }
        let _ = writeln!(out, "  </used-services>");
        let _ = writeln!(out, "  <used-services required=\"false\">");
        for service in &self.used_optional_services {
            let _ = writeln!(out, "    <service>{service}</service>");
        }
        let _ = writeln!(out, "  </used-services>");
        if let Some(deps) = &self.detected_source_deps {
            let _ = writeln!(out, "  <detected-source-dependencies>");
            for module in deps {
                let _ = writeln!(out, "    <module>{module}</module>");
            }
            let _ = writeln!(out, "  </detected-source-dependencies>");
        }
        out.push_str("</export-snapshot>\n");
        out
    }
}

fn packages(node: &roxmltree::Node) -> Result<Vec<PackageName>, String> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "package")
        .map(|n| PackageName::new(n.text().unwrap_or("").trim()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())
}

fn write_list(out: &mut String, wrapper: &str, item: &str, values: &[PackageName]) {
    let _ = writeln!(out, "  <{wrapper}>");
    for value in values {
        let _ = writeln!(out, "    <{item}>{value}</{item}>");
    }
    let _ = writeln!(out, "  </{wrapper}>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;
    use std::path::Path;

    fn parse_snapshot(inner: &str) -> ExportSnapshot {
        let text = format!("<module><name>m</name><export-snapshot>{inner}</export-snapshot></module>");
        Descriptor::parse(&text, Path::new("weft.xml"))
            .unwrap()
            .export_snapshot
            .unwrap()
    }

    #[test]
    fn parses_all_sections() {
        let snapshot = parse_snapshot(
            "<source-packages><package>com.ex.util</package></source-packages>\
             <used-packages><package>com.ex.base</package></used-packages>\
             <used-services required=\"true\"><service>com.ex.spi.Store</service></used-services>\
             <used-services required=\"false\"><service>com.ex.spi.Logger</service></used-services>\
             <detected-source-dependencies><module>base</module></detected-source-dependencies>",
        );
        assert_eq!(snapshot.source_packages[0].as_str(), "com.ex.util");
        assert_eq!(snapshot.used_packages[0].as_str(), "com.ex.base");
        assert_eq!(snapshot.used_required_services[0].as_str(), "com.ex.spi.Store");
        assert_eq!(snapshot.used_optional_services[0].as_str(), "com.ex.spi.Logger");
        assert_eq!(
            snapshot.detected_source_deps.as_ref().unwrap()[0].as_str(),
            "base"
        );
    }

    #[test]
    fn absent_detection_section_stays_none() {
        let snapshot = parse_snapshot("<used-packages><package>com.ex</package></used-packages>");
        assert!(snapshot.detected_source_deps.is_none());
    }

    #[test]
    fn empty_detection_section_is_some_empty() {
        let snapshot = parse_snapshot("<detected-source-dependencies/>");
        assert_eq!(snapshot.detected_source_deps, Some(vec![]));
    }

    #[test]
    fn xml_roundtrip() {
        let snapshot = ExportSnapshot {
            source_packages: vec![PackageName::new("com.ex.util").unwrap()],
            used_packages: vec![
                PackageName::new("com.ex.base").unwrap(),
                PackageName::new("com.ex.io").unwrap(),
            ],
            used_required_services: vec![ServiceName::new("com.ex.spi.Store").unwrap()],
            used_optional_services: vec![],
            detected_source_deps: Some(vec![ModuleName::new("base").unwrap()]),
        };
        let reparsed = parse_snapshot(
            snapshot
                .to_xml()
                .trim_start_matches("<export-snapshot>")
                .trim_end()
                .trim_end_matches("</export-snapshot>"),
        );
        assert_eq!(snapshot, reparsed);
    }
}
