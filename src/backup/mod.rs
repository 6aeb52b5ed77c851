// src/backup/mod.rs

//! Reading the on-disk layout of an iOS device backup
//!
//! A backup root contains three envelope plists (`Info.plist`,
//! `Manifest.plist`, `Status.plist`), the manifest database
//! (`Manifest.db`), and the content files themselves, named by their
//! fileID and grouped into two-hex-character shard directories.
//!
//! This module provides:
//! - Typed envelope parsing (`Envelope`)
//! - The manifest reader (`Manifest`), a lazy sequence of `BackupRecord`s
//! - The typed metadata-blob decoder (`FileMetadata`)
//! - Read-only access to the sharded content layout (`ContentStore`)

mod info;
mod manifest;
mod metadata;
mod store;

pub use info::{BackupStatus, DeviceInfo, Envelope, ManifestInfo, SUPPORTED_STATUS_VERSION};
pub use manifest::{BackupRecord, Category, Manifest, RecordFilter};
pub use metadata::FileMetadata;
pub use store::{ContentStore, ScanReport};

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// An opened, unencrypted backup: envelope plus manifest database
pub struct Backup {
    root: PathBuf,
    envelope: Envelope,
    manifest: Manifest,
}

impl Backup {
    /// Open the backup at `root`
    ///
    /// Parses the envelope plists, refuses encrypted backups, and opens
    /// the manifest database read-only. All failures here are fatal to
    /// the run.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::ManifestUnreadable {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let envelope = Envelope::load(root)?;
        if envelope.manifest.is_encrypted {
            return Err(Error::EncryptedBackup);
        }

        let manifest = Manifest::open(root)?;

        Ok(Self {
            root: root.to_path_buf(),
            envelope,
            manifest,
        })
    }

    /// The backup root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The parsed envelope plists
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// The manifest database reader
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// A content store rooted at this backup
    pub fn content_store(&self) -> ContentStore {
        ContentStore::new(&self.root)
    }

    /// Fail unless the backup's format version is the tested one
    ///
    /// `Status.plist` carries the backup tool's format version; only 3.3
    /// has been exercised. `allow_untested` overrides the gate.
    pub fn ensure_supported_version(&self, allow_untested: bool) -> Result<()> {
        let found = self.envelope.status.version.as_str();
        if found == SUPPORTED_STATUS_VERSION || allow_untested {
            Ok(())
        } else {
            Err(Error::UntestedFormatVersion {
                found: found.to_string(),
                expected: SUPPORTED_STATUS_VERSION.to_string(),
            })
        }
    }

    /// One-line description of the device this backup came from
    pub fn banner(&self) -> String {
        let device = &self.envelope.device;
        format!(
            "Found backup (v{}) from '{}' (#{}, {}) with iOS {}",
            self.envelope.status.version,
            device.device_name,
            device.serial_number.as_deref().unwrap_or("unknown"),
            device.product_type.as_deref().unwrap_or("unknown"),
            device.product_version,
        )
    }
}
