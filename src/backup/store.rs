// src/backup/store.rs

//! Read-only access to the backup's content-addressed file layout
//!
//! Content files are named by their fileID and grouped into shard
//! directories named by the first two hex characters of that ID:
//!
//! ```text
//! <root>/ab/ab12c3...   (sharded layout, iOS 10 and later)
//! <root>/ab12c3...      (flat layout written by older tool versions)
//! ```
//!
//! A backup is never written to; this store only derives and checks
//! source paths. fileIDs come from the manifest, which is untrusted
//! input, so they are validated as hex before they are allowed to name
//! a path component.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Length of a fileID: hex SHA-1 of `domain-relativePath`
const FILE_ID_LEN: usize = 40;

/// Number of leading hex characters naming a shard directory
const SHARD_LEN: usize = 2;

/// Read-only view of a backup's sharded content layout
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The backup root this store reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the on-disk source file for a fileID
    ///
    /// Tries the sharded location first, then the flat root for backups
    /// written by older tool versions. A fileID with no file at either
    /// location is a missing source (skippable, not fatal).
    pub fn source_path(&self, file_id: &str) -> Result<PathBuf> {
        validate_file_id(file_id)?;

        let sharded = self
            .root
            .join(&file_id[..SHARD_LEN])
            .join(file_id);
        if sharded.is_file() {
            return Ok(sharded);
        }

        let flat = self.root.join(file_id);
        if flat.is_file() {
            return Ok(flat);
        }

        Err(Error::SourceMissing {
            file_id: file_id.to_string(),
        })
    }

    /// Whether a content file exists for this fileID
    pub fn exists(&self, file_id: &str) -> bool {
        self.source_path(file_id).is_ok()
    }

    /// Walk the content layout and cross-check it against the manifest
    ///
    /// `referenced` is the set of fileIDs the manifest knows about.
    /// Reports content files no record points at (orphaned) and records
    /// with no content file (missing).
    pub fn scan(&self, referenced: &BTreeSet<String>) -> Result<ScanReport> {
        let mut on_disk = BTreeSet::new();

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(2) {
            let entry = entry.map_err(|e| {
                Error::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("walk error without I/O cause")
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !is_file_id(name) {
                continue;
            }
            // Accept flat entries at the root and sharded entries whose
            // parent directory matches the ID's two-character prefix
            let in_shard = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|d| d.to_str())
                .map(|d| d == &name[..SHARD_LEN]);
            match entry.depth() {
                1 => on_disk.insert(name.to_string()),
                2 if in_shard == Some(true) => on_disk.insert(name.to_string()),
                _ => continue,
            };
        }

        let orphaned: Vec<String> = on_disk.difference(referenced).cloned().collect();
        let missing: Vec<String> = referenced
            .iter()
            .filter(|id| !on_disk.contains(*id))
            .cloned()
            .collect();

        Ok(ScanReport {
            present: on_disk.len(),
            orphaned,
            missing,
        })
    }
}

/// Result of cross-checking content files against the manifest
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanReport {
    /// Content files found on disk
    pub present: usize,
    /// Content files on disk that no manifest record references
    pub orphaned: Vec<String>,
    /// Manifest fileIDs with no content file on disk
    pub missing: Vec<String>,
}

/// True for names shaped like a fileID (40 hex characters)
fn is_file_id(name: &str) -> bool {
    name.len() == FILE_ID_LEN && hex::decode(name).is_ok()
}

/// Reject fileIDs that could not have come from the backup tool
///
/// The ID becomes a path component, so anything that is not plain hex
/// must never reach the filesystem.
fn validate_file_id(file_id: &str) -> Result<()> {
    if file_id.len() < SHARD_LEN || hex::decode(file_id).is_err() {
        return Err(Error::InvalidPath(format!(
            "fileID '{file_id}' is not a hex content hash"
        )));
    }
    Ok(())
}
