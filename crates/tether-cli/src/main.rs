#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod logging;
mod resolve;

use clap::Parser;
use miette::{miette, IntoDiagnostic, Result};
use std::path::PathBuf;
use tether_core::paths;
use tether_core::{Config, DependencyGraph, Resolver};

/// Exit code for command line usage errors.
const EX_USAGE: i32 = 64;

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version, about = "Dependency-scoped module resolution", long_about = None)]
struct Cli {
    /// Module request to resolve; requires ISSUER. With neither, reads
    /// newline-delimited JSON [request, issuer] pairs from stdin
    request: Option<String>,

    /// File the request was issued from
    issuer: Option<String>,

    /// Dependency graph snapshot (default: nearest tether.graph.json
    /// above the working directory)
    #[arg(long, short = 'g', value_name = "FILE", env = paths::GRAPH_PATH_ENV)]
    graph: Option<PathBuf>,

    /// Package name whose installed references join the fallback list
    /// (repeatable)
    #[arg(long, value_name = "NAME")]
    fallback: Vec<String>,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted logs (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Exactly one positional cannot be a resolution request.
    if cli.request.is_some() != cli.issuer.is_some() {
        eprintln!("Usage: tether [OPTIONS] <request> <issuer>");
        std::process::exit(EX_USAGE);
    }

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_graph_path(cli.graph);

    logging::init(config.verbosity, config.json_logs);
    prepend_bin_path();

    let graph_path = config
        .graph_path
        .clone()
        .or_else(|| paths::find_graph_file(&config.cwd))
        .ok_or_else(|| {
            miette!(
                "no {} found above {} (pass --graph or set {})",
                paths::GRAPH_FILE_NAME,
                config.cwd.display(),
                paths::GRAPH_PATH_ENV
            )
        })?;

    let mut graph = DependencyGraph::from_file(&graph_path).into_diagnostic()?;
    for name in &cli.fallback {
        let added = graph.add_fallbacks_for_name(name);
        tracing::debug!(name = %name, added, "registered fallback references");
    }

    let resolver = Resolver::new(graph);

    match (cli.request, cli.issuer) {
        (Some(request), Some(issuer)) => resolve::run_single(&resolver, &request, &issuer),
        _ => resolve::run_stream(&resolver),
    }
}

/// Prepend the configured prefix to the executable search path.
fn prepend_bin_path() {
    let Some(prefix) = std::env::var_os(paths::BIN_PATH_ENV) else {
        return;
    };

    let current = std::env::var_os("PATH").unwrap_or_default();
    let mut entries = vec![PathBuf::from(prefix)];
    entries.extend(std::env::split_paths(&current));

    if let Ok(joined) = std::env::join_paths(entries) {
        std::env::set_var("PATH", joined);
    }
}
