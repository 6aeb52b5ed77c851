// src/backup/manifest.rs

//! The manifest reader
//!
//! `Manifest.db` is a SQLite database whose `Files` table maps each
//! content hash (fileID) to its domain, logical relative path, entry
//! flags, and an embedded metadata blob:
//!
//! ```text
//! Files(fileID TEXT, domain TEXT, relativePath TEXT, flags INTEGER, file BLOB)
//! ```
//!
//! The reader streams rows through a prepared statement (one pass, no
//! rewind) and decodes each row's metadata blob into a typed
//! [`FileMetadata`]. Directory entries (`flags = 2`) are filtered out in
//! SQL; a per-record decode failure travels with the record so the
//! consumer can skip and count it.

use crate::backup::metadata::FileMetadata;
use crate::error::{Error, Result};
use rusqlite::{Connection, OpenFlags};
use std::ops::ControlFlow;
use std::path::Path;
use tracing::debug;

/// Entry flag value marking a directory row
const FLAG_DIRECTORY: i64 = 2;

/// One file entry from the manifest
#[derive(Debug)]
pub struct BackupRecord {
    /// Content hash; also the source file's on-disk name
    pub file_id: String,
    /// Backup category label, e.g. "CameraRollDomain"
    pub domain: String,
    /// Original device-relative path
    pub relative_path: String,
    /// Raw entry flags from the manifest row
    pub flags: i64,
    /// Decoded metadata, or the decode error for this record
    pub metadata: std::result::Result<FileMetadata, Error>,
}

/// File categories the tool knows how to select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    /// Every file entry in the manifest
    #[default]
    All,
    /// Photos and videos under Media/DCIM/<nnn>APPLE/
    CameraRoll,
    /// SMS/iMessage attachments in MediaDomain
    Messages,
}

/// Record selection, compiled into the manifest query's WHERE clause
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub category: Category,
    pub domain: Option<String>,
}

impl RecordFilter {
    /// WHERE clause plus bound parameters for this selection
    ///
    /// Directory rows are always excluded; the reader's contract is one
    /// record per file entry.
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = vec![format!("flags != {FLAG_DIRECTORY}")];
        let mut params = Vec::new();

        match self.category {
            Category::All => {}
            Category::CameraRoll => {
                conditions.push("relativePath LIKE 'Media/DCIM/%APPLE/%'".to_string());
            }
            Category::Messages => {
                conditions.push("domain = 'MediaDomain'".to_string());
                conditions.push("relativePath LIKE 'Library/SMS/Attachments/%'".to_string());
            }
        }

        if let Some(domain) = &self.domain {
            conditions.push("domain = ?".to_string());
            params.push(domain.clone());
        }

        (format!("WHERE {}", conditions.join(" AND ")), params)
    }
}

/// Read-only handle on a backup's manifest database
#[derive(Debug)]
pub struct Manifest {
    conn: Connection,
}

impl Manifest {
    /// Open `<root>/Manifest.db` read-only
    ///
    /// Absence, corruption, or a missing `Files` table is fatal: the tool
    /// cannot proceed without the manifest.
    pub fn open(backup_root: &Path) -> Result<Self> {
        let db_path = backup_root.join("Manifest.db");
        if !db_path.is_file() {
            return Err(Error::ManifestUnreadable {
                path: db_path,
                reason: "no such file".to_string(),
            });
        }

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::ManifestUnreadable {
            path: db_path.clone(),
            reason: e.to_string(),
        })?;

        // Sanity check; also surfaces "file is not a database" for corrupt files
        let has_files_table: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'Files'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::ManifestUnreadable {
                path: db_path.clone(),
                reason: e.to_string(),
            })?;
        if has_files_table == 0 {
            return Err(Error::ManifestUnreadable {
                path: db_path,
                reason: "no Files table".to_string(),
            });
        }

        debug!("Opened manifest database: {}", db_path.display());
        Ok(Self { conn })
    }

    /// Number of file records matching the filter
    pub fn count(&self, filter: &RecordFilter) -> Result<u64> {
        let (where_clause, params) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM Files {where_clause}");
        let count: i64 =
            self.conn
                .query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    /// Stream matching records through `f`, one pass, in manifest order
    ///
    /// The sequence is lazy and non-restartable; `f` returns
    /// `ControlFlow::Break(())` to stop early. Record order carries no
    /// meaning; entries are independent.
    pub fn for_each_record<F>(&self, filter: &RecordFilter, mut f: F) -> Result<()>
    where
        F: FnMut(BackupRecord) -> ControlFlow<()>,
    {
        let (where_clause, params) = filter.where_clause();
        let sql = format!(
            "SELECT fileID, domain, relativePath, flags, file FROM Files {where_clause}"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

        while let Some(row) = rows.next()? {
            let file_id: String = row.get(0)?;
            let domain: String = row.get(1)?;
            let relative_path: String = row.get(2)?;
            let flags: i64 = row.get(3)?;
            let blob: Option<Vec<u8>> = row.get(4)?;

            let metadata = match blob {
                Some(blob) if !blob.is_empty() => {
                    FileMetadata::from_blob(&blob).map_err(|e| rewrap_decode(&file_id, e))
                }
                _ => Err(Error::record_decode(&file_id, "missing metadata blob")),
            };

            let record = BackupRecord {
                file_id,
                domain,
                relative_path,
                flags,
                metadata,
            };

            if let ControlFlow::Break(()) = f(record) {
                break;
            }
        }

        Ok(())
    }
}

/// Attach the owning fileID to a decode error raised inside the blob decoder
fn rewrap_decode(file_id: &str, err: Error) -> Error {
    match err {
        Error::RecordDecode { reason, .. } => Error::record_decode(file_id, reason),
        other => Error::record_decode(file_id, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FID_PHOTO: &str = "ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12";
    const FID_NOTE: &str = "cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34";
    const FID_DIR: &str = "ef56ef56ef56ef56ef56ef56ef56ef56ef56ef56";

    fn metadata_blob(mode: u64, size: u64) -> Vec<u8> {
        use plist::{Dictionary, Uid, Value};

        let mut fields = Dictionary::new();
        fields.insert("Mode".into(), Value::Integer(mode.into()));
        fields.insert("Size".into(), Value::Integer(size.into()));

        let objects = vec![
            Value::String("$null".to_string()),
            Value::Dictionary(fields),
        ];
        let mut top = Dictionary::new();
        top.insert("root".into(), Value::Uid(Uid::new(1)));

        let mut archive = Dictionary::new();
        archive.insert(
            "$archiver".into(),
            Value::String("NSKeyedArchiver".to_string()),
        );
        archive.insert("$objects".into(), Value::Array(objects));
        archive.insert("$top".into(), Value::Dictionary(top));

        let mut blob = std::io::Cursor::new(Vec::new());
        Value::Dictionary(archive)
            .to_writer_binary(&mut blob)
            .unwrap();
        blob.into_inner()
    }

    fn make_manifest(root: &Path) {
        let conn = Connection::open(root.join("Manifest.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE Files (
                fileID TEXT PRIMARY KEY,
                domain TEXT,
                relativePath TEXT,
                flags INTEGER,
                file BLOB
            )",
        )
        .unwrap();

        conn.execute(
            "INSERT INTO Files VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                FID_PHOTO,
                "CameraRollDomain",
                "Media/DCIM/100APPLE/IMG_0001.JPG",
                1,
                metadata_blob(0o100644, 4),
            ],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO Files VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                FID_NOTE,
                "HomeDomain",
                "Library/Notes/notes.sqlite",
                1,
                metadata_blob(0o100600, 16),
            ],
        )
        .unwrap();
        // Directory rows are excluded by the reader
        conn.execute(
            "INSERT INTO Files VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                FID_DIR,
                "CameraRollDomain",
                "Media/DCIM/100APPLE",
                2,
                metadata_blob(0o040755, 0),
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_open_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ManifestUnreadable { .. }));
    }

    #[test]
    fn test_open_corrupt_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Manifest.db"), b"definitely not sqlite").unwrap();
        let err = Manifest::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ManifestUnreadable { .. }));
    }

    #[test]
    fn test_count_excludes_directories() {
        let dir = TempDir::new().unwrap();
        make_manifest(dir.path());
        let manifest = Manifest::open(dir.path()).unwrap();

        assert_eq!(manifest.count(&RecordFilter::default()).unwrap(), 2);
    }

    #[test]
    fn test_camera_roll_filter() {
        let dir = TempDir::new().unwrap();
        make_manifest(dir.path());
        let manifest = Manifest::open(dir.path()).unwrap();

        let filter = RecordFilter {
            category: Category::CameraRoll,
            domain: None,
        };
        assert_eq!(manifest.count(&filter).unwrap(), 1);

        let mut seen = Vec::new();
        manifest
            .for_each_record(&filter, |record| {
                seen.push(record.relative_path);
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(seen, vec!["Media/DCIM/100APPLE/IMG_0001.JPG"]);
    }

    #[test]
    fn test_domain_filter_binds_param() {
        let dir = TempDir::new().unwrap();
        make_manifest(dir.path());
        let manifest = Manifest::open(dir.path()).unwrap();

        let filter = RecordFilter {
            category: Category::All,
            domain: Some("HomeDomain".to_string()),
        };
        assert_eq!(manifest.count(&filter).unwrap(), 1);
    }

    #[test]
    fn test_records_decode_metadata() {
        let dir = TempDir::new().unwrap();
        make_manifest(dir.path());
        let manifest = Manifest::open(dir.path()).unwrap();

        let mut modes = Vec::new();
        manifest
            .for_each_record(&RecordFilter::default(), |record| {
                modes.push(record.metadata.unwrap().mode);
                ControlFlow::Continue(())
            })
            .unwrap();
        modes.sort_unstable();
        assert_eq!(modes, vec![0o100600, 0o100644]);
    }

    #[test]
    fn test_early_break_stops_iteration() {
        let dir = TempDir::new().unwrap();
        make_manifest(dir.path());
        let manifest = Manifest::open(dir.path()).unwrap();

        let mut visited = 0;
        manifest
            .for_each_record(&RecordFilter::default(), |_| {
                visited += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(visited, 1);
    }
}
