//! Mapping filesystem locations to their owning package.

use super::{ResolveError, Resolver};
use crate::graph::{IndexedLocator, Locator};
use crate::paths;
use std::path::Path;

impl Resolver {
    /// Find the package that owns `location`.
    ///
    /// Paths that denote a directory must keep their trailing slash;
    /// without it the location reads as a file and a package's own
    /// install directory will not match itself.
    ///
    /// Returns `Ok(None)` when no package owns the location, so the
    /// caller can defer to the surrounding resolution. A hit on the
    /// blacklist sentinel fails instead: the caller canonicalized a path
    /// whose symlink encoded the applicable peer-dependency context, and
    /// that context cannot be reconstructed here.
    pub fn find_package_locator(&self, location: &Path) -> Result<Option<&Locator>, ResolveError> {
        let relative = relative_location(self.graph.root(), location);

        match self.graph.locations().lookup(&relative) {
            Some(IndexedLocator::Valid(locator)) => Ok(Some(locator)),
            Some(IndexedLocator::Blacklisted) => Err(ResolveError::Blacklisted {
                location: location.to_path_buf(),
            }),
            None => Ok(None),
        }
    }
}

/// Slash-separated form of `location` relative to the graph root:
/// `./`-prefixed unless it escapes the root, trailing slash preserved
/// for directories.
fn relative_location(root: &Path, location: &Path) -> String {
    let mut relative = paths::to_slashes(&paths::relative_to(root, location));

    if !relative.starts_with("./") && !relative.starts_with("../") && relative != ".." {
        relative = if relative == "." {
            "./".to_string()
        } else {
            format!("./{relative}")
        };
    }

    if paths::denotes_directory(location) && !relative.ends_with('/') {
        relative.push('/');
    }

    relative
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyGraph, LocationRecord, PackageRecord};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn graph() -> DependencyGraph {
        let packages = vec![
            PackageRecord {
                name: None,
                reference: None,
                location: "./".to_string(),
                dependencies: BTreeMap::new(),
            },
            PackageRecord {
                name: Some("dep".to_string()),
                reference: Some("1.0.0".to_string()),
                location: "./store/dep/".to_string(),
                dependencies: BTreeMap::new(),
            },
        ];
        let locations = vec![
            LocationRecord {
                path: "./".to_string(),
                blacklisted: false,
                name: None,
                reference: None,
            },
            LocationRecord {
                path: "./store/dep/".to_string(),
                blacklisted: false,
                name: Some("dep".to_string()),
                reference: Some("1.0.0".to_string()),
            },
            LocationRecord {
                path: "./store/variants/dep-peer-a1b2/".to_string(),
                blacklisted: true,
                name: None,
                reference: None,
            },
        ];

        DependencyGraph::from_records(PathBuf::from("/repo"), packages, locations)
    }

    #[test]
    fn test_file_in_package_dir() {
        let resolver = Resolver::new(graph());

        let locator = resolver
            .find_package_locator(Path::new("/repo/store/dep/lib/util.js"))
            .unwrap();
        assert_eq!(locator, Some(&Locator::new("dep", "1.0.0")));
    }

    #[test]
    fn test_deepest_enclosing_package_wins_over_root() {
        let resolver = Resolver::new(graph());

        let locator = resolver
            .find_package_locator(Path::new("/repo/src/index.js"))
            .unwrap();
        assert_eq!(locator, Some(&Locator::top_level()));

        let locator = resolver
            .find_package_locator(Path::new("/repo/store/dep/entry.js"))
            .unwrap();
        assert_eq!(locator, Some(&Locator::new("dep", "1.0.0")));
    }

    #[test]
    fn test_directory_needs_trailing_slash_to_match_itself() {
        let resolver = Resolver::new(graph());

        let locator = resolver
            .find_package_locator(Path::new("/repo/store/dep/"))
            .unwrap();
        assert_eq!(locator, Some(&Locator::new("dep", "1.0.0")));
    }

    #[test]
    fn test_unowned_location() {
        let resolver = Resolver::new(graph());

        let locator = resolver
            .find_package_locator(Path::new("/elsewhere/x.js"))
            .unwrap();
        assert_eq!(locator, None);
    }

    #[test]
    fn test_blacklisted_location_fails() {
        let resolver = Resolver::new(graph());

        let error = resolver
            .find_package_locator(Path::new("/repo/store/variants/dep-peer-a1b2/index.js"))
            .unwrap_err();
        assert_eq!(error.code(), super::super::codes::BLACKLISTED);
    }

    #[test]
    fn test_relative_location_forms() {
        let root = Path::new("/repo");
        assert_eq!(relative_location(root, Path::new("/repo/a/b.js")), "./a/b.js");
        assert_eq!(relative_location(root, Path::new("/repo/a/")), "./a/");
        assert_eq!(relative_location(root, Path::new("/repo/")), "./");
        assert_eq!(
            relative_location(root, Path::new("/store/pkg/x.js")),
            "../store/pkg/x.js"
        );
    }
}
