//! `schoolfix` - school facility issue reporting
//!
//! The binary crate: an HTTP JSON API and an operator CLI over the stores
//! in [`schoolfix_lib`].
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Layered configuration (defaults, YAML, env, flags)
//! - [`format`] - Output formatting (text, JSON)
//! - [`http`] - axum router and handlers
//! - [`logging`] - tracing subscriber setup

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod format;
pub mod http;
pub mod logging;

pub use cli::run;
