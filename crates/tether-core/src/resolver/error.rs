//! Typed resolution failures.
//!
//! Every failure carries the triggering request/issuer plus enough
//! structured context for a caller to act without parsing the message.
//! The stable string codes double as the wire protocol of the debug CLI.

use crate::graph::Locator;
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, as emitted on the CLI wire protocol.
pub mod codes {
    /// Resolution crossed the collapsed target of a disambiguation symlink.
    pub const BLACKLISTED: &str = "BLACKLISTED";
    /// Dependency declared as a peer but currently unsatisfied.
    pub const MISSING_PEER_DEPENDENCY: &str = "MISSING_PEER_DEPENDENCY";
    /// Dependency never declared by the issuing package.
    pub const UNDECLARED_DEPENDENCY: &str = "UNDECLARED_DEPENDENCY";
    /// Declared dependency without a materialized install directory.
    pub const MISSING_DEPENDENCY: &str = "MISSING_DEPENDENCY";
    /// No file, extension, index or main candidate was found.
    pub const QUALIFIED_PATH_RESOLUTION_FAILED: &str = "QUALIFIED_PATH_RESOLUTION_FAILED";
    /// Resolution was delegated to the host and the host failed too.
    pub const BUILTIN_RESOLUTION_FAIL: &str = "BUILTIN_RESOLUTION_FAIL";
    /// A non-canonical issuer path masked the true failure.
    pub const SYMLINKED_PATH_DETECTED: &str = "SYMLINKED_PATH_DETECTED";
    /// Invariant violation inside the tables.
    pub const INTERNAL: &str = "INTERNAL";
}

/// Why request resolution was delegated to the host resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFallbackReason {
    /// The issuer matched the configured ignore pattern.
    IgnoredIssuer,
    /// The issuer is not owned by any package in the location index.
    UnownedIssuer,
}

fn fallback_label(reason: &HostFallbackReason) -> &'static str {
    match reason {
        HostFallbackReason::IgnoredIssuer => "the issuer matched the configured ignore pattern",
        HostFallbackReason::UnownedIssuer => {
            "the issuer is not owned by any package in the dependency graph"
        }
    }
}

fn locator_label(locator: &Locator) -> String {
    if locator.is_top_level() {
        "the top-level package".to_string()
    } else {
        format!("package \"{locator}\"")
    }
}

/// A resolution failure.
///
/// Resolution is a pure function of its inputs and the immutable table
/// snapshot, so identical inputs always fail with the identical kind;
/// retrying is never useful apart from the single canonical-issuer retry
/// performed by [`Resolver::resolve_request`](crate::Resolver::resolve_request).
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The location index matched the blacklist sentinel.
    #[error("a package has been resolved through a blacklisted path ({}); this usually means a tool called \"realpath\" on a resolved module path, collapsing the symlink that disambiguates peer dependencies - resolved paths must be passed on untransformed", .location.display())]
    Blacklisted { location: PathBuf },

    /// Dependency edge explicitly declared, but with no resolution.
    #[error("{} is requiring \"{dependency_name}\" (via \"{request}\") as a peer dependency, but no ancestor provides it", locator_label(.issuer_locator))]
    MissingPeerDependency {
        request: String,
        issuer: PathBuf,
        issuer_locator: Locator,
        dependency_name: String,
    },

    /// Dependency edge never declared by the issuing package.
    #[error("{} (via \"{}\") is requiring \"{dependency_name}\" without listing it in its dependencies ({})", locator_label(.issuer_locator), .issuer.display(), .candidates.join(", "))]
    UndeclaredDependency {
        request: String,
        issuer: PathBuf,
        issuer_locator: Locator,
        dependency_name: String,
        /// Declared dependency names of the issuer, sorted.
        candidates: Vec<String>,
    },

    /// Edge declared and resolved, but the target was never materialized
    /// (partial installs on production environments can cause this).
    #[error("package \"{dependency_locator}\" is a valid dependency, but it has no install directory in the graph and cannot be required")]
    MissingDependency {
        request: String,
        issuer: PathBuf,
        dependency_locator: Locator,
    },

    /// No file/extension/index/main candidate for an unqualified path.
    #[error("couldn't find a suitable resolution for the unqualified path {}", .unqualified_path.display())]
    QualifiedPathResolution {
        unqualified_path: PathBuf,
        request: Option<String>,
        issuer: Option<PathBuf>,
    },

    /// The host's own resolution algorithm was consulted and failed.
    #[error("the host resolution algorithm was unable to resolve \"{request}\" requested from {} ({})", .issuer.display(), fallback_label(.reason))]
    HostResolution {
        request: String,
        issuer: PathBuf,
        reason: HostFallbackReason,
    },

    /// The issuer was a symlinked path; resolving through its canonical
    /// form would have succeeded.
    #[error("\"{request}\" has been required from what seems to be a symlinked path ({}); modules must be invoked through their fully resolved path on the filesystem (here {})", .issuer.display(), .real_issuer.display())]
    SymlinkedPath {
        request: String,
        issuer: PathBuf,
        real_issuer: PathBuf,
    },

    /// Invariant violation: the tables disagree with each other.
    #[error("{message}")]
    Internal { message: String },
}

impl ResolveError {
    /// The stable code for this failure kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Blacklisted { .. } => codes::BLACKLISTED,
            Self::MissingPeerDependency { .. } => codes::MISSING_PEER_DEPENDENCY,
            Self::UndeclaredDependency { .. } => codes::UNDECLARED_DEPENDENCY,
            Self::MissingDependency { .. } => codes::MISSING_DEPENDENCY,
            Self::QualifiedPathResolution { .. } => codes::QUALIFIED_PATH_RESOLUTION_FAILED,
            Self::HostResolution { .. } => codes::BUILTIN_RESOLUTION_FAIL,
            Self::SymlinkedPath { .. } => codes::SYMLINKED_PATH_DETECTED,
            Self::Internal { .. } => codes::INTERNAL,
        }
    }

    /// Structured diagnostic context, one object per kind.
    #[must_use]
    pub fn data(&self) -> Value {
        match self {
            Self::Blacklisted { location } => json!({
                "location": location.to_string_lossy(),
            }),
            Self::MissingPeerDependency {
                request,
                issuer,
                issuer_locator,
                dependency_name,
            } => json!({
                "request": request,
                "issuer": issuer.to_string_lossy(),
                "issuerLocator": issuer_locator,
                "dependencyName": dependency_name,
            }),
            Self::UndeclaredDependency {
                request,
                issuer,
                issuer_locator,
                dependency_name,
                candidates,
            } => json!({
                "request": request,
                "issuer": issuer.to_string_lossy(),
                "issuerLocator": issuer_locator,
                "dependencyName": dependency_name,
                "candidates": candidates,
            }),
            Self::MissingDependency {
                request,
                issuer,
                dependency_locator,
            } => json!({
                "request": request,
                "issuer": issuer.to_string_lossy(),
                "dependencyLocator": dependency_locator,
            }),
            Self::QualifiedPathResolution {
                unqualified_path,
                request,
                issuer,
            } => json!({
                "unqualifiedPath": unqualified_path.to_string_lossy(),
                "request": request,
                "issuer": issuer.as_ref().map(|path| path.to_string_lossy()),
            }),
            Self::HostResolution { request, issuer, .. } => json!({
                "request": request,
                "issuer": issuer.to_string_lossy(),
            }),
            Self::SymlinkedPath {
                request,
                issuer,
                real_issuer,
            } => json!({
                "request": request,
                "issuer": issuer.to_string_lossy(),
                "realIssuer": real_issuer.to_string_lossy(),
            }),
            Self::Internal { .. } => json!({}),
        }
    }

    /// Wire rendering for the debug CLI: `{code, message, data}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code(),
            "message": self.to_string(),
            "data": self.data(),
        })
    }
}
