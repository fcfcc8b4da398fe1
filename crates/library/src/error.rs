//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Every error surfacing from this crate is fatal to the operation that
//! raised it. Per-archive problems that a scan can step over never get this
//! far; they are logged and skipped in [`scan`](crate::scan()).

use derive_more::{Display, Error};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File or directory does not exist
    #[display("not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// A package in the pool could not be loaded, and the failure was not
    /// one a scan may skip.
    #[display("failed to load package: {_0}")]
    Package(#[error(not(source))] String),
    /// A repository database is unreadable or malformed.
    #[display("malformed repository database: {_0}")]
    Database(#[error(not(source))] String),
    /// A target specifier could not be understood.
    #[display("invalid target: {_0}")]
    InvalidTarget(#[error(not(source))] String),
}

impl ErrorKind {
    /// Classify an I/O error raised while accessing `path`.
    pub(crate) fn io(err: IoError, path: &Path) -> Self {
        match err.kind() {
            IoErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            IoErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified() {
        let path = Path::new("/srv/pool");
        let kind = ErrorKind::io(IoError::from(IoErrorKind::NotFound), path);
        assert!(matches!(kind, ErrorKind::NotFound(p) if p == path));
        let kind = ErrorKind::io(IoError::from(IoErrorKind::PermissionDenied), path);
        assert!(matches!(kind, ErrorKind::PermissionDenied(_)));
        let kind = ErrorKind::io(IoError::from(IoErrorKind::Interrupted), path);
        assert!(matches!(kind, ErrorKind::Io(_)));
    }
}
