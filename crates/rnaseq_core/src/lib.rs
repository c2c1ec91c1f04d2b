//! RNA-seq core - Orchestration of an external RNA-seq toolchain
//!
//! This crate resolves read files, builds tool commands, runs them in
//! dependency order and optionally inside a throwaway container. It has
//! no CLI dependencies and can be driven by any front end.

pub mod command;
pub mod config;
pub mod container;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod results;
pub mod runner;
pub mod samples;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
