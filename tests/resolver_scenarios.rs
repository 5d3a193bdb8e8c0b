//! End-to-end resolver scenarios.
//!
//! Each test builds a fixture workspace (and artifact cache) in temp
//! directories, opens it, and drives the resolver the way the file
//! generators would. The scenarios cover detection, interface
//! resolution, provider uniqueness and multiplicity, snapshot
//! fallback, executable-target relocation, emulation injection, and
//! the determinism and snapshot-fixed-point laws.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::TempDir;

use weft::core::config::Config;
use weft::core::dependency::DependencyKind;
use weft::core::module::Module;
use weft::core::types::{ArtifactCoords, ModuleName};
use weft::fetch::{cache_artifact_path, ArtifactFetcher, FetchError, LocalCacheFetcher};
use weft::resolve::{Resolver, Warning};
use weft::workspace::Workspace;

// =============================================================================
// Fixture plumbing
// =============================================================================

struct Fixture {
    root: TempDir,
    cache: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            cache: tempfile::tempdir().unwrap(),
        }
    }

    /// Write a workspace module's descriptor (path relative to root).
    fn descriptor(&self, module_dir: &str, xml: &str) {
        let path = if module_dir.is_empty() {
            self.root.path().join("weft.xml")
        } else {
            self.root.path().join(module_dir).join("weft.xml")
        };
        write(&path, xml);
    }

    /// Write a source file under a workspace module's `src/`.
    fn source(&self, module_dir: &str, rel: &str, content: &str) {
        write(&self.root.path().join(module_dir).join("src").join(rel), content);
    }

    /// Put a library descriptor into the artifact cache.
    fn library(&self, name: &str, version: &str, xml: &str) {
        let coords = ArtifactCoords::new("org.weft", name, version).unwrap();
        write(
            &cache_artifact_path(
                self.cache.path(),
                &coords,
                &format!("{name}-{version}-weft.xml"),
            ),
            xml,
        );
    }

    fn config(&self) -> Config {
        Config {
            artifact_cache: self.cache.path().to_path_buf(),
            provider_root_prefixes: Vec::new(),
            allow_missing_snapshots: false,
        }
    }

    fn open(&self) -> Workspace {
        let fetcher = Box::new(LocalCacheFetcher::new(self.cache.path()));
        Workspace::open_with(self.root.path(), self.config(), fetcher).unwrap()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn module(ws: &Workspace, name: &str) -> Rc<Module> {
    ws.require(&ModuleName::new(name).unwrap()).unwrap()
}

/// `(destination, kind)` pairs of a dependency sequence, in order.
fn dep_pairs(resolver: &Resolver, deps: &[weft::core::dependency::Dependency]) -> Vec<(String, DependencyKind)> {
    deps.iter()
        .map(|d| {
            (
                resolver.registry().get(d.destination).name().to_string(),
                d.kind,
            )
        })
        .collect()
}

fn destinations(resolver: &Resolver, deps: &[weft::core::dependency::Dependency]) -> Vec<String> {
    deps.iter()
        .map(|d| resolver.registry().get(d.destination).name().to_string())
        .collect()
}

/// The standard multi-module fixture used by most scenarios.
fn standard_fixture() -> Fixture {
    let f = Fixture::new();
    f.descriptor(
        "",
        r#"<module>
             <name>demo</name>
             <group>com.ex</group>
             <version>1.0.0</version>
             <children>
               <module>ui</module>
               <module>spi</module>
               <module>css-api</module>
               <module>css-api-web</module>
               <module>css-api-desktop</module>
               <module>media-api</module>
               <module>media-api-web</module>
               <module>store-idb</module>
               <module>store-mem</module>
               <module>log-console</module>
               <module>log-remote</module>
               <module>util</module>
               <module>logging-jre</module>
               <module>clock-emul</module>
               <module>app-web</module>
               <module>app-jre</module>
               <module>app-fx</module>
               <module>app-fx-media</module>
               <module>app-ghost</module>
             </children>
             <libraries>
               <library name="kit-web" group="org.weft" version="2.1.0"/>
               <library name="javabase-emul-web" group="org.weft" version="2.1.0"/>
               <library name="time-web" group="org.weft" version="2.1.0"/>
               <library name="kit-openfx" group="org.weft" version="2.1.0"/>
               <library name="kit-media-emul" group="org.weft" version="2.1.0"/>
               <library name="boot-java" group="org.weft" version="2.1.0"/>
             </libraries>
           </module>"#,
    );

    // Plain source modules.
    f.descriptor("ui", "<module><name>ui</name></module>");
    f.source("ui", "com/ex/ui/Widget.java", "package com.ex.ui;\npublic class Widget {}\n");

    f.descriptor("spi", "<module><name>spi</name></module>");
    f.source("spi", "com/ex/spi/Store.java", "package com.ex.spi;\npublic interface Store {}\n");
    f.source("spi", "com/ex/spi/Logger.java", "package com.ex.spi;\npublic interface Logger {}\n");

    f.descriptor("util",
        "<module><name>util</name>\
         <dependencies><source executable-target=\"jre\">logging-jre</source></dependencies>\
         </module>");
    f.source("util", "com/ex/util/Strings.java", "package com.ex.util;\npublic class Strings {}\n");

    f.descriptor("logging-jre", "<module><name>logging-jre</name></module>");
    f.source(
        "logging-jre",
        "com/ex/logging/JreLog.java",
        "package com.ex.logging;\npublic class JreLog {}\n",
    );

    f.descriptor("clock-emul", "<module><name>clock-emul</name></module>");
    f.source(
        "clock-emul",
        "com/ex/clock/Clock.java",
        "package com.ex.clock;\npublic class Clock {}\n",
    );

    // Interface modules and implementations.
    f.descriptor("css-api", "<module><name>css-api</name><interface/></module>");
    f.source("css-api", "com/ex/css/Css.java", "package com.ex.css;\npublic interface Css {}\n");

    f.descriptor(
        "css-api-web",
        "<module><name>css-api-web</name>\
         <implements-module>css-api</implements-module>\
         <target-tags>web</target-tags></module>",
    );
    f.source(
        "css-api-web",
        "com/ex/css/web/WebCss.java",
        "package com.ex.css.web;\nimport com.ex.css.Css;\npublic class WebCss implements Css {}\n",
    );

    f.descriptor(
        "css-api-desktop",
        "<module><name>css-api-desktop</name>\
         <implements-module>css-api</implements-module>\
         <target-tags>desktop</target-tags></module>",
    );
    f.source(
        "css-api-desktop",
        "com/ex/css/desktop/DesktopCss.java",
        "package com.ex.css.desktop;\nimport com.ex.css.Css;\npublic class DesktopCss implements Css {}\n",
    );

    f.descriptor("media-api", "<module><name>media-api</name><interface/></module>");
    f.source(
        "media-api",
        "com/ex/media/Media.java",
        "package com.ex.media;\npublic interface Media {}\n",
    );
    f.descriptor(
        "media-api-web",
        "<module><name>media-api-web</name>\
         <implements-module>media-api</implements-module>\
         <target-tags>web</target-tags></module>",
    );
    f.source(
        "media-api-web",
        "com/ex/media/web/WebMedia.java",
        "package com.ex.media.web;\npublic class WebMedia {}\n",
    );

    // Service providers.
    f.descriptor(
        "store-idb",
        "<module><name>store-idb</name><target-tags>web</target-tags>\
         <provides><java-service>com.ex.spi.Store</java-service></provides></module>",
    );
    f.source(
        "store-idb",
        "com/ex/store/idb/IdbStore.java",
        "package com.ex.store.idb;\nimport com.ex.spi.Store;\npublic class IdbStore implements Store {}\n",
    );
    f.descriptor(
        "store-mem",
        "<module><name>store-mem</name><target-tags>web,desktop</target-tags>\
         <provides><java-service>com.ex.spi.Store</java-service></provides></module>",
    );
    f.source(
        "store-mem",
        "com/ex/store/mem/MemStore.java",
        "package com.ex.store.mem;\nimport com.ex.spi.Store;\npublic class MemStore implements Store {}\n",
    );

    f.descriptor(
        "log-console",
        "<module><name>log-console</name>\
         <provides><java-service>com.ex.spi.Logger</java-service></provides>\
         <auto-injection-conditions><uses-package>com.ex.spi</uses-package>\
         </auto-injection-conditions></module>",
    );
    f.source(
        "log-console",
        "com/ex/log/console/ConsoleLog.java",
        "package com.ex.log.console;\nimport com.ex.spi.Logger;\npublic class ConsoleLog implements Logger {}\n",
    );
    f.descriptor(
        "log-remote",
        "<module><name>log-remote</name>\
         <provides><java-service>com.ex.spi.Logger</java-service></provides>\
         <auto-injection-conditions><uses-package>com.ex.spi</uses-package>\
         </auto-injection-conditions></module>",
    );
    f.source(
        "log-remote",
        "com/ex/log/remote/RemoteLog.java",
        "package com.ex.log.remote;\nimport com.ex.spi.Logger;\npublic class RemoteLog implements Logger {}\n",
    );

    // Executables.
    f.descriptor(
        "app-web",
        "<module><name>app-web</name><executable target=\"web\"/>\
         <dependencies><source>css-api</source></dependencies></module>",
    );
    f.source(
        "app-web",
        "com/ex/app/Main.java",
        "package com.ex.app;\n\
         import com.ex.ui.Widget;\n\
         import com.ex.util.Strings;\n\
         import com.ex.spi.Store;\n\
         import com.ex.spi.Logger;\n\
         public class Main {\n\
             Store store = Services.load(Store.class);\n\
             Object log = Services.loadOptional(Logger.class);\n\
         }\n",
    );

    f.descriptor(
        "app-jre",
        "<module><name>app-jre</name><executable target=\"jre\"/>\
         <dependencies><source>media-api</source><source>clock-emul</source></dependencies>\
         </module>",
    );
    f.source(
        "app-jre",
        "com/ex/appjre/Main.java",
        "package com.ex.appjre;\nimport com.ex.util.Strings;\npublic class Main {}\n",
    );

    f.descriptor(
        "app-fx",
        "<module><name>app-fx</name><executable target=\"jre,openfx\"/></module>",
    );
    f.source(
        "app-fx",
        "com/ex/appfx/Main.java",
        "package com.ex.appfx;\npublic class Main {}\n",
    );

    f.descriptor(
        "app-fx-media",
        "<module><name>app-fx-media</name><executable target=\"jre,openfx\"/>\
         <dependencies><source>kit-media-emul</source></dependencies></module>",
    );
    f.source(
        "app-fx-media",
        "com/ex/appfxm/Main.java",
        "package com.ex.appfxm;\npublic class Main {}\n",
    );

    f.descriptor(
        "app-ghost",
        "<module><name>app-ghost</name><executable target=\"web\"/></module>",
    );
    f.source(
        "app-ghost",
        "com/ex/ghost/Main.java",
        "package com.ex.ghost;\n\
         public class Main { Object g = Services.load(com.ex.spi.Ghost.class); }\n",
    );

    // Target-tagged libraries backing the emulation table.
    for lib in [
        "kit-web",
        "javabase-emul-web",
        "time-web",
    ] {
        f.library(
            lib,
            "2.1.0",
            &format!("<module><name>{lib}</name><target-tags>web</target-tags></module>"),
        );
    }
    for lib in ["kit-openfx", "kit-media-emul", "boot-java"] {
        f.library(
            lib,
            "2.1.0",
            &format!("<module><name>{lib}</name><target-tags>jre</target-tags></module>"),
        );
    }

    f
}

// =============================================================================
// S1: detection + emulation for a browser executable
// =============================================================================

#[test]
fn s1_detected_dependency_and_web_emulation() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-web");

    let direct = resolver.direct_dependencies(&app).unwrap();
    let pairs = dep_pairs(&resolver, &direct);

    assert!(pairs.contains(&("ui".into(), DependencyKind::DetectedSource)));
    for emul in ["kit-web", "javabase-emul-web", "time-web"] {
        assert!(
            pairs.contains(&(emul.into(), DependencyKind::Emulation)),
            "missing emulation module {emul}: {pairs:?}"
        );
    }
}

// =============================================================================
// S2: interface resolution
// =============================================================================

#[test]
fn s2_interface_replaced_by_target_implementation() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-web");

    let direct = destinations(&resolver, &resolver.direct_dependencies(&app).unwrap());
    let transitive = destinations(&resolver, &resolver.transitive_dependencies(&app).unwrap());

    assert!(direct.contains(&"css-api-web".to_string()));
    assert!(!direct.contains(&"css-api".to_string()));
    assert!(!transitive.contains(&"css-api".to_string()));
    assert!(!direct.contains(&"css-api-desktop".to_string()));
}

#[test]
fn missing_interface_implementation_keeps_dependency_and_warns() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-jre");

    // media-api has only a web implementation; a jre executable keeps
    // the interface module and records a warning.
    let direct = destinations(&resolver, &resolver.direct_dependencies(&app).unwrap());
    assert!(direct.contains(&"media-api".to_string()));
    assert!(resolver.warnings().iter().any(|w| matches!(
        w,
        Warning::MissingInterfaceImplementation { interface, .. }
            if interface.as_str() == "media-api"
    )));
}

// =============================================================================
// S3/S4: provider resolution
// =============================================================================

#[test]
fn s3_required_service_resolves_to_tightest_provider() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-web");

    let providers = resolver.executable_providers(&app).unwrap();
    let store = providers
        .iter()
        .find(|p| p.service.as_str() == "com.ex.spi.Store")
        .expect("Store must be resolved");
    let names: Vec<String> = store
        .modules
        .iter()
        .map(|&id| resolver.registry().get(id).name().to_string())
        .collect();
    assert_eq!(names, vec!["store-idb"]);
}

#[test]
fn s4_optional_service_lists_all_providers_sorted() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-web");

    let providers = resolver.executable_providers(&app).unwrap();
    let logger = providers
        .iter()
        .find(|p| p.service.as_str() == "com.ex.spi.Logger")
        .expect("Logger providers must be collected");
    let names: Vec<String> = logger
        .modules
        .iter()
        .map(|&id| resolver.registry().get(id).name().to_string())
        .collect();
    assert_eq!(names, vec!["log-console", "log-remote"]);
}

#[test]
fn provider_modules_become_implicit_dependencies() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-web");

    let pairs = dep_pairs(&resolver, &resolver.direct_dependencies(&app).unwrap());
    for provider in ["store-idb", "log-console", "log-remote"] {
        assert!(
            pairs.contains(&(provider.into(), DependencyKind::ImplicitProvider)),
            "missing implicit provider {provider}: {pairs:?}"
        );
    }
}

#[test]
fn unresolved_required_service_warns_without_aborting() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-ghost");

    let providers = resolver.executable_providers(&app).unwrap();
    assert!(providers
        .iter()
        .all(|p| p.service.as_str() != "com.ex.spi.Ghost"));
    assert!(resolver.warnings().iter().any(|w| matches!(
        w,
        Warning::UnresolvedRequiredService { service, .. }
            if service.as_str() == "com.ex.spi.Ghost"
    )));
    // Resolution still completes.
    assert!(resolver.direct_dependencies(&app).is_ok());
}

#[test]
fn executables_only_have_providers() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let util = module(&ws, "util");
    assert!(resolver.executable_providers(&util).unwrap().is_empty());
}

// =============================================================================
// S5: snapshot fallback for repository modules
// =============================================================================

/// Wraps the cache fetcher and records every requested classifier.
struct RecordingFetcher {
    inner: LocalCacheFetcher,
    requests: Rc<RefCell<Vec<(String, String)>>>,
}

impl ArtifactFetcher for RecordingFetcher {
    fn fetch(&self, coords: &ArtifactCoords, classifier: &str) -> Result<PathBuf, FetchError> {
        self.requests
            .borrow_mut()
            .push((coords.artifact.clone(), classifier.to_string()));
        self.inner.fetch(coords, classifier)
    }
}

#[test]
fn s5_snapshot_answers_without_fetching_sources() {
    let f = Fixture::new();
    f.descriptor(
        "",
        r#"<module><name>root</name><group>com.ex</group><version>1.0</version>
             <children><module>util</module></children>
             <libraries>
               <library name="repo-lib" group="org.weft" version="3.0.0"/>
             </libraries>
           </module>"#,
    );
    f.descriptor("util", "<module><name>util</name></module>");
    f.source("util", "com/ex/util/Strings.java", "package com.ex.util;\npublic class Strings {}\n");
    f.library(
        "repo-lib",
        "3.0.0",
        "<module><name>repo-lib</name>\
         <export-snapshot>\
           <source-packages><package>com.ex.repolib</package></source-packages>\
           <used-packages><package>com.ex.util</package></used-packages>\
         </export-snapshot></module>",
    );

    let requests = Rc::new(RefCell::new(Vec::new()));
    let fetcher = Box::new(RecordingFetcher {
        inner: LocalCacheFetcher::new(f.cache.path()),
        requests: Rc::clone(&requests),
    });
    let ws = Workspace::open_with(f.root.path(), f.config(), fetcher).unwrap();
    let resolver = ws.resolver();
    let repo_lib = module(&ws, "repo-lib");

    let pairs = dep_pairs(&resolver, &resolver.direct_dependencies(&repo_lib).unwrap());
    assert!(pairs.contains(&("util".into(), DependencyKind::DetectedSource)));

    // The snapshot answered everything: no source archive was fetched.
    assert!(requests
        .borrow()
        .iter()
        .all(|(artifact, classifier)| !(artifact == "repo-lib" && classifier == "sources")));
}

// =============================================================================
// S6: executable-target relocation
// =============================================================================

#[test]
fn s6_executable_target_relocation() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();

    let app_jre = module(&ws, "app-jre");
    let direct = destinations(&resolver, &resolver.direct_dependencies(&app_jre).unwrap());
    let transitive = destinations(
        &resolver,
        &resolver.transitive_dependencies(&app_jre).unwrap(),
    );
    assert!(direct.contains(&"logging-jre".to_string()));
    assert!(!transitive.contains(&"logging-jre".to_string()));

    let app_web = module(&ws, "app-web");
    let direct = destinations(&resolver, &resolver.direct_dependencies(&app_web).unwrap());
    let transitive = destinations(
        &resolver,
        &resolver.transitive_dependencies(&app_web).unwrap(),
    );
    assert!(!direct.contains(&"logging-jre".to_string()));
    assert!(!transitive.contains(&"logging-jre".to_string()));
}

#[test]
fn non_executables_drop_executable_target_dependencies() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let util = module(&ws, "util");

    let direct = destinations(&resolver, &resolver.direct_dependencies(&util).unwrap());
    let transitive = destinations(&resolver, &resolver.transitive_dependencies(&util).unwrap());
    assert!(!direct.contains(&"logging-jre".to_string()));
    assert!(!transitive.contains(&"logging-jre".to_string()));
}

#[test]
fn final_transitive_set_never_carries_executable_targets() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    for name in ["app-web", "app-jre", "app-fx", "util", "ui"] {
        let m = module(&ws, name);
        let transitive = resolver.transitive_dependencies(&m).unwrap();
        assert!(
            transitive.iter().all(|d| d.executable_target.is_none()),
            "{name} leaked an executable-target dependency"
        );
    }
}

// =============================================================================
// Emulation policies
// =============================================================================

#[test]
fn openfx_emulation_without_media() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-fx");

    let pairs = dep_pairs(&resolver, &resolver.direct_dependencies(&app).unwrap());
    assert!(pairs.contains(&("kit-openfx".into(), DependencyKind::Emulation)));
    assert!(pairs.contains(&("boot-java".into(), DependencyKind::Emulation)));
    assert!(!pairs.contains(&("kit-media-emul".into(), DependencyKind::Emulation)));
}

#[test]
fn openfx_emulation_with_media_in_closure() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-fx-media");

    let pairs = dep_pairs(&resolver, &resolver.direct_dependencies(&app).unwrap());
    assert!(pairs.contains(&("kit-openfx".into(), DependencyKind::Emulation)));
    assert!(pairs.contains(&("kit-media-emul".into(), DependencyKind::Emulation)));
    assert!(pairs.contains(&("boot-java".into(), DependencyKind::Emulation)));
}

#[test]
fn plain_jre_keeps_only_emulation_modules_already_used() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-jre");

    let pairs = dep_pairs(&resolver, &resolver.direct_dependencies(&app).unwrap());
    assert!(pairs.contains(&("clock-emul".into(), DependencyKind::Emulation)));
    assert!(!pairs.contains(&("kit-openfx".into(), DependencyKind::Emulation)));
    assert!(!pairs.contains(&("kit-web".into(), DependencyKind::Emulation)));
}

#[test]
fn non_executables_get_no_emulation() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let ui = module(&ws, "ui");
    let pairs = dep_pairs(&resolver, &resolver.direct_dependencies(&ui).unwrap());
    assert!(pairs.iter().all(|(_, k)| *k != DependencyKind::Emulation));
}

// =============================================================================
// Structural laws
// =============================================================================

#[test]
fn direct_is_subset_of_transitive_for_non_executables() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    for name in ["ui", "util", "store-idb", "css-api-web"] {
        let m = module(&ws, name);
        let direct = resolver.direct_dependencies(&m).unwrap();
        let transitive = resolver.transitive_dependencies(&m).unwrap();
        for dep in direct.iter() {
            assert!(
                transitive.iter().any(|t| t == dep),
                "{name}: direct dependency missing from transitive set"
            );
        }
    }
}

#[test]
fn aggregates_produce_no_scan_output() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let root = ws.root();
    assert!(root.is_aggregate());
    assert!(resolver.source_files(&root).unwrap().is_empty());
    assert!(resolver.used_packages(&root).unwrap().is_empty());
}

#[test]
fn cyclic_module_references_terminate() {
    let f = Fixture::new();
    f.descriptor(
        "",
        "<module><name>root</name><group>com.ex</group><version>1.0</version>\
         <children><module>alpha</module><module>beta</module></children></module>",
    );
    f.descriptor(
        "alpha",
        "<module><name>alpha</name>\
         <dependencies><source>beta</source></dependencies></module>",
    );
    f.descriptor(
        "beta",
        "<module><name>beta</name>\
         <dependencies><source>alpha</source></dependencies></module>",
    );
    let ws = f.open();
    let resolver = ws.resolver();
    let alpha = module(&ws, "alpha");

    let transitive = destinations(&resolver, &resolver.transitive_dependencies(&alpha).unwrap());
    assert_eq!(transitive, vec!["beta".to_string(), "alpha".to_string()]);
}

#[test]
fn determinism_across_independent_runs() {
    let fixture = standard_fixture();

    let render = || {
        let ws = fixture.open();
        let resolver = ws.resolver();
        let mut out = String::new();
        for name in ["app-web", "app-jre", "app-fx", "ui", "util", "store-idb"] {
            let m = module(&ws, name);
            out.push_str(&format!(
                "{name} direct: {:?}\n",
                dep_pairs(&resolver, &resolver.direct_dependencies(&m).unwrap())
            ));
            out.push_str(&format!(
                "{name} transitive: {:?}\n",
                dep_pairs(&resolver, &resolver.transitive_dependencies(&m).unwrap())
            ));
        }
        let app = module(&ws, "app-web");
        for p in resolver.executable_providers(&app).unwrap().iter() {
            let names: Vec<String> = p
                .modules
                .iter()
                .map(|&id| resolver.registry().get(id).name().to_string())
                .collect();
            out.push_str(&format!("{} -> {names:?}\n", p.service));
        }
        out
    };

    assert_eq!(render(), render());
}

#[test]
fn derivations_replay_identically() {
    let fixture = standard_fixture();
    let ws = fixture.open();
    let resolver = ws.resolver();
    let app = module(&ws, "app-web");

    let first = resolver.direct_dependencies(&app).unwrap();
    let second = resolver.direct_dependencies(&app).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn declared_services_are_used_services_with_a_local_class() {
    let f = Fixture::new();
    f.descriptor(
        "",
        "<module><name>root</name><group>com.ex</group><version>1.0</version>\
         <children><module>engine</module></children></module>",
    );
    f.descriptor("engine", "<module><name>engine</name></module>");
    f.source(
        "engine",
        "com/ex/eng/Driver.java",
        "package com.ex.eng;\npublic interface Driver {}\n",
    );
    f.source(
        "engine",
        "com/ex/eng/Engine.java",
        "package com.ex.eng;\n\
         public class Engine {\n\
             Driver d = Services.load(Driver.class);\n\
             Object s = Services.load(com.ex.spi.Store.class);\n\
         }\n",
    );
    let ws = f.open();
    let resolver = ws.resolver();
    let engine = module(&ws, "engine");

    // Both services are used, but only Driver has a class in this
    // module.
    let used: Vec<String> = resolver
        .used_required_services(&engine)
        .unwrap()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(used, vec!["com.ex.eng.Driver", "com.ex.spi.Store"]);

    let declared: Vec<String> = resolver
        .declared_services(&engine)
        .unwrap()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(declared, vec!["com.ex.eng.Driver"]);
}

// =============================================================================
// Snapshot generation fixed point
// =============================================================================

#[test]
fn snapshot_generation_is_a_fixed_point() {
    // First workspace: `widgets` is a workspace module with sources.
    let f1 = Fixture::new();
    f1.descriptor(
        "",
        "<module><name>root</name><group>com.ex</group><version>1.0</version>\
         <children><module>base</module><module>widgets</module></children></module>",
    );
    f1.descriptor("base", "<module><name>base</name></module>");
    f1.source("base", "com/ex/base/Thing.java", "package com.ex.base;\npublic class Thing {}\n");
    f1.descriptor("widgets", "<module><name>widgets</name></module>");
    f1.source(
        "widgets",
        "com/ex/widgets/Grid.java",
        "package com.ex.widgets;\n\
         import com.ex.base.Thing;\n\
         public class Grid { Object s = Services.load(com.ex.spi.Store.class); }\n",
    );

    let ws1 = f1.open();
    let resolver1 = ws1.resolver();
    let widgets1 = module(&ws1, "widgets");
    let from_sources = dep_pairs(&resolver1, &resolver1.direct_dependencies(&widgets1).unwrap());
    let snapshot = resolver1.export_snapshot(&widgets1).unwrap();

    // Second workspace: the same module as a repository module whose
    // descriptor embeds the generated snapshot. No sources exist.
    let f2 = Fixture::new();
    f2.descriptor(
        "",
        "<module><name>root</name><group>com.ex</group><version>1.0</version>\
         <children><module>base</module></children>\
         <libraries><library name=\"widgets\" group=\"org.weft\" version=\"1.0\"/></libraries>\
         </module>",
    );
    f2.descriptor("base", "<module><name>base</name></module>");
    f2.source("base", "com/ex/base/Thing.java", "package com.ex.base;\npublic class Thing {}\n");
    f2.library(
        "widgets",
        "1.0",
        &format!("<module><name>widgets</name>{}</module>", snapshot.to_xml()),
    );

    let ws2 = f2.open();
    let resolver2 = ws2.resolver();
    let widgets2 = module(&ws2, "widgets");
    let from_snapshot = dep_pairs(&resolver2, &resolver2.direct_dependencies(&widgets2).unwrap());

    assert_eq!(from_sources, from_snapshot);

    // Regenerating from the snapshot-backed module reproduces the
    // snapshot.
    let regenerated = resolver2.export_snapshot(&widgets2).unwrap();
    assert_eq!(snapshot, regenerated);
}
