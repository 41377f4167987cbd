//! Version command implementation.

use anyhow::Result;
use serde::Serialize;

use crate::format::print_json;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    backends: [&'a str; 3],
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };

    if json {
        return print_json(&VersionOutput {
            version,
            build,
            backends: ["file", "local", "realtime"],
        });
    }

    println!("schoolfix {version} ({build})");
    Ok(())
}
