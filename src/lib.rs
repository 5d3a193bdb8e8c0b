//! Weft - build orchestration for cross-platform application modules
//!
//! Weft is a single-binary tool that keeps generated build files
//! (package manifests, module descriptors, service-loader
//! registrations, target-specific resource manifests) in sync with a
//! workspace of framework modules targeting multiple runtimes: a
//! browser-transpiled target, a desktop JVM target, and a native-image
//! mobile target. Its core is the module dependency resolver.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates)
//! - [`workspace`] - Workspace ingestion and the resolver entry point
//! - [`resolve`] - The dependency graph builder and its resolvers
//! - [`core`] - Domain types, target grading, the module registry
//! - [`descriptor`] - `weft.xml` parsing and export snapshots
//! - [`scan`] - Syntactic Java source scanning
//! - [`derive`] - Memoized replayable derivations
//! - [`fetch`] - The artifact-fetcher seam
//! - [`ui`] - Output utilities
//!
//! # Correctness Invariants
//!
//! 1. Every dependency's destination is an interned module
//! 2. Resolution is deterministic: equal inputs produce byte-identical
//!    output sequences
//! 3. Finalized executable graphs contain no interface modules with an
//!    available implementation and no executable-target dependencies
//!    in the transitive set
//! 4. Derivations materialize once and replay identically

pub mod cli;
pub mod core;
pub mod derive;
pub mod descriptor;
pub mod fetch;
pub mod resolve;
pub mod scan;
pub mod ui;
pub mod workspace;
