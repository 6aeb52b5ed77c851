// src/backup/metadata.rs

//! Typed decoder for the per-record metadata blob
//!
//! Each row of the manifest's `Files` table embeds a binary property list
//! in NSKeyedArchiver envelope format: a dictionary with `$archiver`,
//! `$objects` (a heap of archived values), and `$top.root` (a UID index
//! into that heap). The root object is the file record itself; scalar
//! fields are stored inline, string fields as UIDs into the heap.
//!
//! Any structural mismatch is a decode error for that record only, never
//! a panic. The run skips the record and keeps going.

use crate::error::{Error, Result};
use plist::Value;
use std::io::Cursor;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;

/// Decoded file metadata from a manifest record's blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Unix mode word: file type bits plus permission bits
    pub mode: u32,
    /// Recorded file size in bytes
    pub size: u64,
    /// Modification time, seconds since the Unix epoch
    pub last_modified: Option<i64>,
    /// Creation time, seconds since the Unix epoch
    pub birth: Option<i64>,
    pub user_id: Option<i64>,
    pub group_id: Option<i64>,
    /// iOS data-protection class of the original file
    pub protection_class: Option<i64>,
    /// Symlink target, when the mode marks a symlink
    pub link_target: Option<String>,
}

impl FileMetadata {
    /// Decode a metadata blob
    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let value = Value::from_reader(Cursor::new(blob))
            .map_err(|e| decode_err(format!("not a property list: {e}")))?;

        let archive = value
            .as_dictionary()
            .ok_or_else(|| decode_err("archive root is not a dictionary"))?;

        match archive.get("$archiver").and_then(Value::as_string) {
            Some("NSKeyedArchiver") => {}
            Some(other) => return Err(decode_err(format!("unexpected archiver '{other}'"))),
            None => return Err(decode_err("missing $archiver marker")),
        }

        let objects = archive
            .get("$objects")
            .and_then(Value::as_array)
            .ok_or_else(|| decode_err("missing $objects heap"))?;

        let root_uid = archive
            .get("$top")
            .and_then(Value::as_dictionary)
            .and_then(|top| top.get("root"))
            .and_then(as_uid)
            .ok_or_else(|| decode_err("missing $top.root reference"))?;

        let record = objects
            .get(root_uid as usize)
            .and_then(Value::as_dictionary)
            .ok_or_else(|| decode_err("$top.root does not reference a dictionary"))?;

        let mode = int_field(objects, record, "Mode")
            .ok_or_else(|| decode_err("missing Mode field"))? as u32;
        let size = int_field(objects, record, "Size")
            .ok_or_else(|| decode_err("missing Size field"))? as u64;

        let metadata = Self {
            mode,
            size,
            last_modified: int_field(objects, record, "LastModified"),
            birth: int_field(objects, record, "Birth"),
            user_id: int_field(objects, record, "UserID"),
            group_id: int_field(objects, record, "GroupID"),
            protection_class: int_field(objects, record, "ProtectionClass"),
            link_target: string_field(objects, record, "Target"),
        };

        Ok(metadata)
    }

    /// True when the mode word marks a directory
    pub fn is_directory(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    /// True when the mode word marks a symlink
    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    /// The permission bits alone (mode with the file-type bits masked off)
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

fn decode_err(reason: impl ToString) -> Error {
    // The manifest reader rewraps this with the owning fileID
    Error::RecordDecode {
        file_id: String::new(),
        reason: reason.to_string(),
    }
}

/// Follow a UID reference into the `$objects` heap; inline values pass through
fn resolve<'a>(objects: &'a [Value], value: &'a Value) -> &'a Value {
    if let Value::Uid(uid) = value {
        objects.get(uid.get() as usize).unwrap_or(value)
    } else {
        value
    }
}

fn as_uid(value: &Value) -> Option<u64> {
    if let Value::Uid(uid) = value {
        Some(uid.get())
    } else {
        None
    }
}

fn int_field(objects: &[Value], dict: &plist::Dictionary, key: &str) -> Option<i64> {
    let value = resolve(objects, dict.get(key)?);
    value
        .as_signed_integer()
        .or_else(|| value.as_unsigned_integer().map(|u| u as i64))
}

fn string_field(objects: &[Value], dict: &plist::Dictionary, key: &str) -> Option<String> {
    resolve(objects, dict.get(key)?)
        .as_string()
        .map(str::to_string)
}
