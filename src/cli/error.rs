//! CLI-specific error types

use crate::fvt::FvtError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Suite error: {0}")]
    SuiteError(#[from] FvtError),

    #[error("{failed} of {total} connections failed")]
    SuiteFailed { failed: usize, total: usize },
}
