// src/extract.rs

//! The extraction pass
//!
//! Consumes the manifest's record sequence and mirrors each file into
//! `<output>/<domain>/<sanitized logical path>`. One synchronous pass,
//! records processed independently; per-record failures are logged and
//! counted, never fatal. Only an unopenable manifest or an unwritable
//! output root aborts a run.

use crate::backup::{BackupRecord, ContentStore, FileMetadata, Manifest, RecordFilter};
use crate::error::{Error, Result};
use crate::filesystem::{safe_join, sanitize_component};
use crate::mime::{MimeDetector, NoopMime};
use crate::progress::ProgressTracker;
use filetime::FileTime;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Leading bytes captured during the copy, enough for every magic the
/// MIME detector knows (the longest, SQLite's, is 16 bytes)
const MAGIC_LEN: usize = 16;

/// Extraction behavior knobs
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Which records to extract
    pub filter: RecordFilter,
    /// Restore recorded permissions and modification times
    pub apply_metadata: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            filter: RecordFilter::default(),
            apply_metadata: true,
        }
    }
}

/// Aggregate outcome of one extraction pass
///
/// The counters live here rather than in any global state; a run returns
/// its summary and that is the whole story.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Files copied successfully
    pub extracted: u64,
    /// Records skipped because their metadata blob failed to decode
    pub decode_errors: u64,
    /// Records skipped because no content file exists for them
    pub missing_sources: u64,
    /// Records skipped because the destination could not be derived or written
    pub write_errors: u64,
    /// Extracted files whose permissions/timestamps could not be restored
    pub metadata_errors: u64,
    /// Records whose metadata marks a directory (nothing to copy)
    pub skipped_directories: u64,
    /// Total content bytes copied
    pub bytes_copied: u64,
}

impl RunSummary {
    /// Records that were skipped rather than extracted
    pub fn failures(&self) -> u64 {
        self.decode_errors + self.missing_sources + self.write_errors
    }

    /// True when every record extracted cleanly
    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

/// Mirrors manifest records into a browsable output tree
pub struct Extractor {
    store: ContentStore,
    output_root: PathBuf,
    options: ExtractOptions,
    mime: Box<dyn MimeDetector>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("store", &self.store)
            .field("output_root", &self.output_root)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Create an extractor writing under `output_root`
    ///
    /// The output root is created up front; failure to create or write
    /// it is fatal before any record is touched.
    pub fn new<P: AsRef<Path>>(store: ContentStore, output_root: P) -> Result<Self> {
        let output_root = output_root.as_ref().to_path_buf();
        ensure_writable_root(&output_root)?;

        Ok(Self {
            store,
            output_root,
            options: ExtractOptions::default(),
            mime: Box::new(NoopMime),
        })
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Inject a MIME detection capability (no-op by default)
    pub fn with_mime_detector(mut self, mime: Box<dyn MimeDetector>) -> Self {
        self.mime = mime;
        self
    }

    /// Run one extraction pass over the manifest
    pub fn run(&self, manifest: &Manifest, progress: &dyn ProgressTracker) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        manifest.for_each_record(&self.options.filter, |record| {
            progress.set_message(&record.relative_path);
            self.extract_record(&record, &mut summary);
            progress.increment(1);
            ControlFlow::Continue(())
        })?;

        info!(
            "Extraction finished: {} extracted, {} failed, {} bytes",
            summary.extracted,
            summary.failures(),
            summary.bytes_copied
        );
        Ok(summary)
    }

    fn extract_record(&self, record: &BackupRecord, summary: &mut RunSummary) {
        let metadata = match &record.metadata {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping record: {}", e);
                summary.decode_errors += 1;
                return;
            }
        };

        // Defense in depth: the reader already filters directory rows,
        // but the mode word is authoritative
        if metadata.is_directory() {
            summary.skipped_directories += 1;
            return;
        }

        let destination = match self.destination(record) {
            Ok(destination) => destination,
            Err(e) => {
                warn!("Skipping {}: {}", record.file_id, e);
                summary.write_errors += 1;
                return;
            }
        };

        let source = match self.store.source_path(&record.file_id) {
            Ok(source) => source,
            Err(e @ Error::SourceMissing { .. }) => {
                warn!("{}", e);
                summary.missing_sources += 1;
                return;
            }
            Err(e) => {
                warn!("Skipping {}: {}", record.file_id, e);
                summary.write_errors += 1;
                return;
            }
        };

        let (bytes, header, header_len) = match copy_file(&source, &destination) {
            Ok(copied) => copied,
            Err(e) => {
                warn!(
                    "Failed to write {}: {}",
                    destination.display(),
                    e
                );
                summary.write_errors += 1;
                return;
            }
        };
        summary.extracted += 1;
        summary.bytes_copied += bytes;
        debug!(
            "Extracted {}/{} -> {}",
            record.domain,
            record.relative_path,
            destination.display()
        );

        if self.options.apply_metadata {
            if let Err(e) = apply_metadata(&destination, metadata) {
                debug!(
                    "Could not restore metadata on {}: {}",
                    destination.display(),
                    e
                );
                summary.metadata_errors += 1;
            }
        }

        if let Some(mime) = self.mime.detect(&header[..header_len]) {
            info!("{}/{}: mime={}", record.domain, record.relative_path, mime);
        }
    }

    /// Destination path for a record, proven to sit inside the output root
    fn destination(&self, record: &BackupRecord) -> Result<PathBuf> {
        let domain_root = self.output_root.join(sanitize_component(&record.domain)?);
        safe_join(&domain_root, &record.relative_path)
    }
}

/// Create the output root and prove it is writable
fn ensure_writable_root(root: &Path) -> Result<()> {
    let unwritable = |source| Error::OutputRootUnwritable {
        path: root.to_path_buf(),
        source,
    };

    fs::create_dir_all(root).map_err(unwritable)?;

    let probe = root.join(".ibex-write-probe");
    fs::write(&probe, b"").map_err(unwritable)?;
    fs::remove_file(&probe).map_err(unwritable)?;
    Ok(())
}

/// Copy source to destination atomically, capturing the leading bytes
///
/// Writes to `<destination>.ibex-tmp` then renames, so a re-run over an
/// existing tree replaces files whole or not at all.
fn copy_file(source: &Path, destination: &Path) -> Result<(u64, [u8; MAGIC_LEN], usize)> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut reader = fs::File::open(source)?;
    let mut header = [0u8; MAGIC_LEN];
    let header_len = read_header(&mut reader, &mut header)?;

    let tmp = destination.with_extension("ibex-tmp");
    let mut writer = fs::File::create(&tmp)?;
    writer.write_all(&header[..header_len])?;
    let rest = io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    drop(writer);

    fs::rename(&tmp, destination)?;
    Ok((header_len as u64 + rest, header, header_len))
}

/// Fill as much of `buf` as the reader can provide
fn read_header(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Best-effort restore of recorded permissions and modification time
fn apply_metadata(destination: &Path, metadata: &FileMetadata) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions();
        if mode != 0 {
            fs::set_permissions(destination, fs::Permissions::from_mode(mode))?;
        }
    }

    if let Some(mtime) = metadata.last_modified {
        filetime::set_file_mtime(destination, FileTime::from_unix_time(mtime, 0))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_output_root() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("extracted/run1");

        let store = ContentStore::new(dir.path());
        Extractor::new(store, &out).unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn test_unwritable_output_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        // A file where the output root should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();

        let store = ContentStore::new(dir.path());
        let err = Extractor::new(store, blocker.join("out")).unwrap_err();
        assert!(matches!(err, Error::OutputRootUnwritable { .. }));
    }

    #[test]
    fn test_copy_file_overwrites_atomically() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("src");
        let destination = dir.path().join("dst");
        fs::write(&source, b"new content").unwrap();
        fs::write(&destination, b"old content that is longer").unwrap();

        let (bytes, header, header_len) = copy_file(&source, &destination).unwrap();
        assert_eq!(bytes, 11);
        assert_eq!(&header[..header_len], b"new content");
        assert_eq!(fs::read(&destination).unwrap(), b"new content");
        assert!(!dir.path().join("dst.ibex-tmp").exists());
    }

    #[test]
    fn test_read_header_short_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("tiny");
        let destination = dir.path().join("out");
        fs::write(&source, b"hi").unwrap();

        let (bytes, header, header_len) = copy_file(&source, &destination).unwrap();
        assert_eq!(bytes, 2);
        assert_eq!(header_len, 2);
        assert_eq!(&header[..2], b"hi");
    }
}
