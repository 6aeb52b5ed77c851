// src/error.rs

//! Error types for ibex
//!
//! One taxonomy for the whole crate. Fatal variants abort the run
//! (`ManifestUnreadable`, `EncryptedBackup`, `UntestedFormatVersion`,
//! `OutputRootUnwritable`); per-record variants are logged, counted in the
//! run summary, and skipped (`RecordDecode`, `SourceMissing`,
//! `PathTraversal`, `InvalidPath`).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or extracting a backup
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest database is absent or cannot be opened
    #[error("cannot read backup manifest at '{path}': {reason}")]
    ManifestUnreadable { path: PathBuf, reason: String },

    /// One of the envelope plists is absent or malformed
    #[error("cannot read backup envelope file '{path}': {reason}")]
    EnvelopeUnreadable { path: PathBuf, reason: String },

    /// The backup is encrypted; decryption is out of scope
    #[error("backup is encrypted; ibex only reads unencrypted backups")]
    EncryptedBackup,

    /// The backup format version does not match the tested one
    #[error(
        "backup format version {found} has not been tested (expected {expected}); \
         pass --allow-untested to proceed anyway"
    )]
    UntestedFormatVersion { found: String, expected: String },

    /// The output root cannot be created or written to
    #[error("output root '{path}' is not writable: {source}")]
    OutputRootUnwritable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A record's metadata blob failed to decode
    #[error("failed to decode file metadata for {file_id}: {reason}")]
    RecordDecode { file_id: String, reason: String },

    /// A record's content file is absent from the backup
    #[error("source content file missing for {file_id}")]
    SourceMissing { file_id: String },

    /// A logical path tried to escape the output root
    #[error("path traversal detected: {0}")]
    PathTraversal(String),

    /// A path or fileID that cannot name a file
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Manifest database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a decode failure with the record it belongs to
    pub(crate) fn record_decode(file_id: &str, reason: impl ToString) -> Self {
        Self::RecordDecode {
            file_id: file_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
