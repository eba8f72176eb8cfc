//! Subcommand implementations.
//!
//! Each module exports an `*Args` struct for clap and a `run` function taking
//! the parsed args and the loaded [`Config`](toolcat_core::Config).

pub mod ask;
pub mod call;
pub mod describe;
pub mod graph;
pub mod serve;
pub mod summarize;
