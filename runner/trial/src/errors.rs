//! Errors that abort a run.
//!
//! Case failures and file load errors are results, not errors: they end up
//! in a [`FileReport`](crate::test::FileReport). Only configuration, path
//! table and output problems stop the run, and they all funnel into
//! [`RunError`] for the command layer.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::paths::PathError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode results: {0}")]
    Json(#[from] serde_json::Error),
}
