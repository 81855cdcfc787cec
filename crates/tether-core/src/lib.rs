#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::return_self_not_must_use)]

//! Dependency-scoped module resolution.
//!
//! An external planner snapshots the install-time dependency graph into
//! two read-only tables: a manifest store (package identity to install
//! directory and declared dependency edges) and a location index
//! (directory prefix to owning identity). Given a request string and the
//! file that issued it, the resolver determines which installed package
//! version satisfies the request and which concrete file must be loaded,
//! without ever searching the directory tree. Cross-package references
//! that do not match a declared dependency edge are rejected with a
//! typed error.

pub mod builtins;
pub mod config;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod paths;
pub mod resolver;
pub mod version;

pub use config::Config;
pub use error::Error;
pub use graph::{DependencyGraph, IndexedLocator, Locator, PackageInfo};
pub use hooks::PatchRegistry;
pub use resolver::{
    HostFallbackReason, HostResolver, NoHostResolver, Resolution, ResolveError, ResolveOptions,
    Resolver, ResolverConfig, API_MODULE_NAME, DEFAULT_EXTENSIONS,
};
pub use version::{GRAPH_SCHEMA_VERSION, STANDARD_VERSION, VERSION};
