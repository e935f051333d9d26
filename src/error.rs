//! Error taxonomy for the profile engine.
//!
//! The engine distinguishes four failure classes so callers can decide what
//! is fatal, what is retryable by the user, and what is a plain skip:
//! - [`Error::Validation`]: bad input (empty name, unusable path). Raised
//!   before any I/O happens.
//! - [`Error::NotFound`]: an expected directory or file is missing. Fatal for
//!   the profiles root or a named profile root; individual category files are
//!   skipped instead and never raise this.
//! - [`Error::DuplicateName`]: name collision on create/rename.
//! - [`Error::Io`]: underlying read/write/copy/delete failure. Never retried
//!   automatically.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("a profile named '{0}' already exists")]
    DuplicateName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }
}
