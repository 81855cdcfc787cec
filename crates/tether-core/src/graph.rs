//! Install-time dependency graph tables.
//!
//! An external planner serializes the dependency graph into a snapshot
//! holding two tables: a manifest store (package identity to install
//! directory and declared dependency edges) and a location index
//! (directory prefix to owning identity). Both are loaded once at
//! startup and stay immutable for the life of the process; every
//! resolution reads them through `&self`.
//!
//! ## Snapshot format
//!
//! The snapshot is a JSON file named `tether.graph.json`:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "root": "/repo",
//!   "packages": [
//!     { "name": "left-pad", "reference": "1.3.0",
//!       "location": "./store/left-pad-1.3.0/",
//!       "dependencies": { "wcwidth": "1.1.0", "supports-color": null } }
//!   ],
//!   "locations": [
//!     { "path": "./store/left-pad-1.3.0/", "name": "left-pad", "reference": "1.3.0" },
//!     { "path": "./store/peer-variants/abcd1234/", "blacklisted": true }
//!   ]
//! }
//! ```
//!
//! A dependency mapped to `null` is a declared peer dependency that is
//! currently unsatisfied; a missing key means the dependency was never
//! declared. The two produce different resolution errors and must not be
//! conflated. The convention for emitting `null` belongs to the planner.

use crate::error::Error;
use crate::paths;
use crate::version::GRAPH_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Identity of one installed package version in one dependency context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Package name; `None` for the top-level package.
    pub name: Option<String>,
    /// Opaque reference distinguishing this resolution of the name
    /// (version, pinned source, or peer-dependency variant); `None` for
    /// the top-level package.
    pub reference: Option<String>,
}

impl Locator {
    #[must_use]
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            reference: Some(reference.into()),
        }
    }

    /// The reserved identity of the top-level package.
    #[must_use]
    pub fn top_level() -> Self {
        Self {
            name: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.name.is_none() && self.reference.is_none()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.reference) {
            (Some(name), Some(reference)) => write!(f, "{name}@{reference}"),
            (Some(name), None) => f.write_str(name),
            _ => f.write_str("top-level"),
        }
    }
}

/// A location-index value: either a real owner or the blacklist sentinel.
///
/// The planner plants the sentinel on the canonical target of each
/// peer-dependency disambiguation symlink. A lookup that lands on it
/// means the caller canonicalized a path and collapsed the symlink that
/// encoded which dependency set applies, which is unrecoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexedLocator {
    Blacklisted,
    Valid(Locator),
}

/// Per-package manifest: install directory plus declared dependency edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Install directory, absolute or relative to the graph root.
    pub location: PathBuf,

    /// Declared dependency edges, name to reference. `Some(reference)` is
    /// a resolved edge; an explicit `None` is a declared peer dependency
    /// with no resolution. An absent key means never declared.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Option<String>>,
}

/// Longest-prefix location index.
///
/// Prefixes are slash-terminated install-directory boundaries relative
/// to the graph root, never arbitrary substrings; no two entries share a
/// prefix. Because package directories can nest (a vendored copy inside
/// another package's tree), the deepest enclosing directory wins. The
/// set of distinct prefix lengths is computed once at load time, so any
/// install layout is supported.
#[derive(Debug, Default)]
pub struct LocationIndex {
    by_prefix: HashMap<String, IndexedLocator>,
    /// Distinct prefix lengths, longest first.
    lengths: Vec<usize>,
}

impl LocationIndex {
    fn insert(&mut self, prefix: String, owner: IndexedLocator) {
        self.by_prefix.insert(prefix, owner);
    }

    fn freeze(&mut self) {
        let mut lengths: Vec<usize> = self.by_prefix.keys().map(String::len).collect();
        lengths.sort_unstable_by(|a, b| b.cmp(a));
        lengths.dedup();
        self.lengths = lengths;
    }

    /// Deepest registered prefix that is an exact ancestor of `location`.
    ///
    /// `location` must be in slash-separated, root-relative form with a
    /// trailing slash when it denotes a directory.
    #[must_use]
    pub fn lookup(&self, location: &str) -> Option<&IndexedLocator> {
        for &len in &self.lengths {
            if location.len() >= len && location.as_bytes()[len - 1] == b'/' {
                if let Some(owner) = self.by_prefix.get(&location[..len]) {
                    return Some(owner);
                }
            }
        }

        None
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }
}

/// One package entry in the snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub location: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, Option<String>>,
}

/// One location-index entry in the snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub path: String,
    #[serde(default)]
    pub blacklisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphFile {
    schema_version: u32,
    #[serde(default)]
    root: Option<PathBuf>,
    #[serde(default)]
    packages: Vec<PackageRecord>,
    #[serde(default)]
    locations: Vec<LocationRecord>,
}

/// The full read-only snapshot: manifest store, location index and
/// fallback list.
///
/// The fallback list is consulted when a non-top-level issuer's direct
/// dependency lookup misses. It is seeded with the top-level locator and
/// may only be extended through `&mut self`, which forces all setup to
/// finish before the graph is shared with concurrent resolvers.
#[derive(Debug)]
pub struct DependencyGraph {
    root: PathBuf,
    packages: HashMap<Locator, PackageInfo>,
    locations: LocationIndex,
    fallback: Vec<Locator>,
}

impl DependencyGraph {
    /// Load a snapshot file. The graph root defaults to the snapshot's
    /// own directory when the file does not carry one.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|source| Error::GraphRead {
            path: path.to_path_buf(),
            source,
        })?;

        let file: GraphFile = serde_json::from_str(&text).map_err(|source| Error::GraphParse {
            path: path.to_path_buf(),
            source,
        })?;

        if file.schema_version != GRAPH_SCHEMA_VERSION {
            return Err(Error::GraphVersion {
                path: path.to_path_buf(),
                found: file.schema_version,
                expected: GRAPH_SCHEMA_VERSION,
            });
        }

        let root = file
            .root
            .unwrap_or_else(|| path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf());

        Ok(Self::from_records(root, file.packages, file.locations))
    }

    /// Build a graph from in-memory records (the snapshot file without
    /// the serialization step).
    #[must_use]
    pub fn from_records(
        root: PathBuf,
        packages: Vec<PackageRecord>,
        locations: Vec<LocationRecord>,
    ) -> Self {
        let mut store = HashMap::with_capacity(packages.len());
        for record in packages {
            let locator = Locator {
                name: record.name,
                reference: record.reference,
            };
            store.insert(
                locator,
                PackageInfo {
                    location: PathBuf::from(record.location),
                    dependencies: record.dependencies,
                },
            );
        }

        let mut index = LocationIndex::default();
        for record in locations {
            let prefix = paths::ensure_trailing_slash(record.path);
            let owner = if record.blacklisted {
                IndexedLocator::Blacklisted
            } else {
                IndexedLocator::Valid(Locator {
                    name: record.name,
                    reference: record.reference,
                })
            };
            index.insert(prefix, owner);
        }
        index.freeze();

        Self {
            root,
            packages: store,
            locations: index,
            fallback: vec![Locator::top_level()],
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Manifest for a locator, if the store has one.
    #[must_use]
    pub fn package(&self, locator: &Locator) -> Option<&PackageInfo> {
        self.packages.get(locator)
    }

    #[must_use]
    pub fn locations(&self) -> &LocationIndex {
        &self.locations
    }

    /// Absolute, normalized install directory for a manifest. Empty when
    /// the manifest carries no location (the package was planned but
    /// never materialized).
    #[must_use]
    pub fn install_dir(&self, info: &PackageInfo) -> PathBuf {
        if info.location.as_os_str().is_empty() {
            return PathBuf::new();
        }

        if info.location.is_absolute() {
            paths::clean(&info.location)
        } else {
            paths::clean(&self.root.join(&info.location))
        }
    }

    /// Ordered fallback locators, first match wins.
    #[must_use]
    pub fn fallback(&self) -> &[Locator] {
        &self.fallback
    }

    /// Append a locator to the fallback list. Setup only: the borrow
    /// checker keeps this unavailable once the graph is shared.
    pub fn add_fallback(&mut self, locator: Locator) {
        self.fallback.push(locator);
    }

    /// Append every installed reference of `name` to the fallback list,
    /// sorted by reference for determinism. Returns how many were added.
    pub fn add_fallbacks_for_name(&mut self, name: &str) -> usize {
        let mut found: Vec<Locator> = self
            .packages
            .keys()
            .filter(|locator| locator.name.as_deref() == Some(name))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.reference.cmp(&b.reference));

        let count = found.len();
        self.fallback.extend(found);
        count
    }
}
