//! One-shot and streamed resolution over the JSON wire protocol.
//!
//! Every response is one line on stdout: `[error, resolution]` with
//! exactly one non-null side (a deferred builtin is `[null, null]`).
//! Stream mode reads `[request, issuer]` JSON pairs from stdin until the
//! stream closes; a malformed input line yields an `INVALID_JSON` error
//! response rather than aborting the stream.

use miette::{IntoDiagnostic, Result};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tether_core::{Resolution, ResolveOptions, Resolver, API_MODULE_NAME};

pub fn run_single(resolver: &Resolver, request: &str, issuer: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_response(&mut out, resolver, request, issuer)
}

pub fn run_stream(resolver: &Resolver) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.into_diagnostic()?;

        match serde_json::from_str::<(String, String)>(&line) {
            Ok((request, issuer)) => write_response(&mut out, resolver, &request, &issuer)?,
            Err(error) => write_line(
                &mut out,
                &json!([
                    { "code": "INVALID_JSON", "message": error.to_string(), "data": Value::Null },
                    Value::Null
                ]),
            )?,
        }
    }

    Ok(())
}

fn write_response(
    out: &mut impl Write,
    resolver: &Resolver,
    request: &str,
    issuer: &str,
) -> Result<()> {
    let options = ResolveOptions::default();

    let response = match resolver.resolve_request(request, Path::new(issuer), &options) {
        Ok(Resolution::Path(path)) => json!([Value::Null, path.to_string_lossy()]),
        Ok(Resolution::Deferred) => json!([Value::Null, Value::Null]),
        Ok(Resolution::Api) => json!([Value::Null, API_MODULE_NAME]),
        Err(error) => json!([error.to_json(), Value::Null]),
    };

    write_line(out, &response)
}

fn write_line(out: &mut impl Write, value: &Value) -> Result<()> {
    writeln!(out, "{value}").into_diagnostic()
}
