//! Stats command implementation.

use anyhow::Result;
use schoolfix_lib::service;
use schoolfix_lib::store::file;

use crate::config::Config;
use crate::format::{format_stats, print_json};

/// Execute the stats command.
///
/// # Errors
///
/// Returns an error if the data file is unreadable.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let issues = file::load(&config.data_file)?;
    let stats = service::stats(&issues);

    if json {
        print_json(&stats)
    } else {
        println!("{}", format_stats(&stats));
        Ok(())
    }
}
