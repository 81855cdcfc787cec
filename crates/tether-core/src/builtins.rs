//! Builtin modules of the host runtime.
//!
//! Builtin requests never go through the dependency graph: the resolver
//! reports them as deferred and the host loader serves them natively.

/// Module names provided natively by the host runtime, sorted for
/// binary search.
pub const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Whether a request names a builtin module. The explicit `node:` scheme
/// prefix is accepted as an alias for the bare name.
#[must_use]
pub fn is_builtin(request: &str) -> bool {
    let name = request.strip_prefix("node:").unwrap_or(request);
    BUILTIN_MODULES.binary_search(&name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        let mut sorted = BUILTIN_MODULES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, BUILTIN_MODULES);
    }

    #[test]
    fn test_common_builtins() {
        assert!(is_builtin("fs"));
        assert!(is_builtin("path"));
        assert!(is_builtin("string_decoder"));
    }

    #[test]
    fn test_scheme_prefix() {
        assert!(is_builtin("node:fs"));
        assert!(!is_builtin("node:left-pad"));
    }

    #[test]
    fn test_packages_are_not_builtins() {
        assert!(!is_builtin("lodash"));
        assert!(!is_builtin("@scope/fs"));
    }
}
