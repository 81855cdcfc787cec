use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version for the dependency graph snapshot file.
/// Bump this when changing the snapshot format incompatibly.
pub const GRAPH_SCHEMA_VERSION: u32 = 1;

/// Version of the resolution standard implemented by this resolver.
/// Extensions may add methods but never override the standard surface.
pub const STANDARD_VERSION: u32 = 1;

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("tether {VERSION}");

    if let Some(hash) = option_env!("TETHER_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
