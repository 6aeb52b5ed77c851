// src/backup/info.rs

//! Typed parsing of the backup envelope plists
//!
//! Three property lists sit next to the manifest database:
//! - `Info.plist`: device identity (name, serial, product, iOS version)
//! - `Manifest.plist`: backup-wide flags, most importantly `IsEncrypted`
//! - `Status.plist`: the backup tool's own format version and snapshot state

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// The only backup format version this tool has been exercised against
pub const SUPPORTED_STATUS_VERSION: &str = "3.3";

/// Device identity from `Info.plist`
///
/// Apple writes these keys with embedded spaces. Only the fields the
/// tool reports are modeled; everything else in the plist is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "Device Name")]
    pub device_name: String,
    #[serde(rename = "Serial Number", default)]
    pub serial_number: Option<String>,
    #[serde(rename = "Product Type", default)]
    pub product_type: Option<String>,
    #[serde(rename = "Product Version")]
    pub product_version: String,
    #[serde(rename = "Build Version", default)]
    pub build_version: Option<String>,
    #[serde(rename = "Unique Identifier", default)]
    pub unique_identifier: Option<String>,
    #[serde(rename = "Last Backup Date", default)]
    pub last_backup_date: Option<plist::Date>,
}

/// Backup-wide flags from `Manifest.plist`
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestInfo {
    #[serde(rename = "IsEncrypted", default)]
    pub is_encrypted: bool,
    #[serde(rename = "Date", default)]
    pub date: Option<plist::Date>,
    #[serde(rename = "Version", default)]
    pub version: Option<String>,
    #[serde(rename = "WasPasscodeSet", default)]
    pub was_passcode_set: bool,
    #[serde(rename = "SystemDomainsVersion", default)]
    pub system_domains_version: Option<String>,
}

/// Snapshot state from `Status.plist`
#[derive(Debug, Clone, Deserialize)]
pub struct BackupStatus {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "SnapshotState", default)]
    pub snapshot_state: Option<String>,
    #[serde(rename = "IsFullBackup", default)]
    pub is_full_backup: bool,
    #[serde(rename = "UUID", default)]
    pub uuid: Option<String>,
    #[serde(rename = "Date", default)]
    pub date: Option<plist::Date>,
}

/// The three envelope plists of one backup
#[derive(Debug, Clone)]
pub struct Envelope {
    pub device: DeviceInfo,
    pub manifest: ManifestInfo,
    pub status: BackupStatus,
}

impl Envelope {
    /// Parse the three envelope plists at the backup root
    ///
    /// A missing or malformed plist is fatal: without the envelope the
    /// tool cannot tell an encrypted backup from a readable one.
    pub fn load(root: &Path) -> Result<Self> {
        Ok(Self {
            device: read_plist(&root.join("Info.plist"))?,
            manifest: read_plist(&root.join("Manifest.plist"))?,
            status: read_plist(&root.join("Status.plist"))?,
        })
    }
}

fn read_plist<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    plist::from_file(path).map_err(|e| Error::EnvelopeUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
