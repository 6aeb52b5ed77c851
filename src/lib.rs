// src/lib.rs

//! ibex - iOS backup extractor
//!
//! Reads the unencrypted on-disk layout of an iTunes/Finder device
//! backup and extracts user files into a browsable folder tree, using
//! the backup's `Manifest.db` to map hashed filenames back to their
//! original logical paths.
//!
//! # Architecture
//!
//! - Manifest-first: the SQLite `Files` table is the single source of
//!   truth; content files are located by hash, never guessed at
//! - One pass: records stream through the extractor sequentially and
//!   independently; per-record failures are counted, not fatal
//! - Sanitized writes: every destination path is proven to sit inside
//!   the output root before anything touches the filesystem

pub mod backup;
mod error;
pub mod extract;
pub mod filesystem;
pub mod mime;
pub mod progress;

pub use backup::{
    Backup, BackupRecord, Category, ContentStore, Envelope, FileMetadata, Manifest, RecordFilter,
};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, Extractor, RunSummary};
