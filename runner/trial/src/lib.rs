//! Trial - a grouped, isolating test-run orchestrator for trial scripts.
//!
//! # Architecture
//!
//! - `config`: TOML run configuration, validated once into an immutable value
//! - `paths`: bidirectional raw identifier / source path table
//! - `registry`: per-worker module registry, reset before every file
//! - `test`: discovery, per-file engine, parallel runner, results, coverage
//! - `reporting`: console text, JSON run document, coverage artifacts
//! - `commands`: the `trial test` command
//!
//! Control flow: discovery yields files, workers reset their registry and run
//! each file's cases, the reporter rewrites paths and renders the outcome.

pub mod commands;
pub mod config;
pub mod errors;
pub mod paths;
pub mod registry;
pub mod reporting;
pub mod test;

pub use config::{Config, ConfigError, CoverageFormat, GroupConfig};
pub use errors::RunError;
pub use paths::{PathError, PathRewriter};
pub use registry::{LoadError, ModuleRegistry};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the tracing subscriber.
///
/// Reads the filter from `TRIAL_LOG`, falling back to `RUST_LOG`; does
/// nothing when neither is set. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        let directives = std::env::var("TRIAL_LOG").or_else(|_| std::env::var("RUST_LOG"));
        if let Ok(directives) = directives {
            tracing_subscriber::registry()
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .with(EnvFilter::new(directives))
                .init();
        }
    });
}
