//! Command implementations.

pub mod check;
pub mod completions;
pub mod list;
pub mod serve;
pub mod stats;
pub mod version;
