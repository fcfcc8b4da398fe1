//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Errors come in two tiers. Problems confined to a single archive (it is
//! unreadable, or carries no usable manifest) are *recoverable*: a scanner
//! logs them and moves on to the next file. Everything else means the input
//! contradicts itself or the filesystem misbehaved, and is *fatal*.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive could not be opened, its format was not recognized, or its
    /// container is corrupt.
    #[display("unreadable package archive")]
    Archive,
    /// The archive was readable but contains no `.PKGINFO` entry.
    #[display("archive contains no .PKGINFO manifest")]
    MissingManifest,
    /// A required field was never assigned.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// An identity field (`name`, `version`) was assigned twice with
    /// different values.
    #[display("{field} mismatch: record has '{existing}', found '{found}'")]
    IdentityMismatch {
        /// The identity field being reassigned.
        field: &'static str,
        /// The value already held by the record.
        existing: String,
        /// The conflicting value.
        found: String,
    },
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// The raw value (lossily decoded).
        value: String,
    },
    /// A metadata key that no table recognizes.
    #[display("unknown metadata key: {_0}")]
    UnknownKey(#[error(not(source))] String),
    /// A signature sidecar exists but could not be read.
    #[display("failed to read signature: {_0}")]
    Signature(#[error(not(source))] String),
    /// An I/O operation on an already opened package failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if the error only concerns the archive being loaded,
    /// and scanning may continue with the next file.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Archive | Self::MissingManifest | Self::MissingField(_))
    }
}
