// src/commands.rs
//! Command handlers for the ibex CLI

use anyhow::Result;
use ibex::backup::{Backup, Category, Envelope, RecordFilter};
use ibex::extract::{ExtractOptions, Extractor};
use ibex::mime::MagicMime;
use ibex::progress::{ProgressTracker, SilentProgress};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Extract backup contents into a browsable folder tree
#[allow(clippy::too_many_arguments)]
pub fn extract(
    backup_path: &Path,
    output: &Path,
    only: Category,
    domain: Option<String>,
    no_metadata: bool,
    mime: bool,
    quiet: bool,
    allow_untested: bool,
) -> Result<()> {
    let backup = Backup::open(backup_path)?;
    println!("{}", backup.banner());

    if let Err(e) = backup.ensure_supported_version(allow_untested) {
        warn!("This tool has only been tested with v3.3 of the iOS backup format");
        return Err(e.into());
    }

    let filter = RecordFilter {
        category: only,
        domain,
    };
    let total = backup.manifest().count(&filter)?;
    info!("Extracting {} records to '{}'", total, output.display());

    let options = ExtractOptions {
        filter,
        apply_metadata: !no_metadata,
    };
    let mut extractor = Extractor::new(backup.content_store(), output)?.with_options(options);
    if mime {
        extractor = extractor.with_mime_detector(Box::new(MagicMime));
    }

    let progress: Box<dyn ProgressTracker> = if quiet {
        Box::new(SilentProgress::new())
    } else {
        Box::new(CliProgress::new("Extracting", total))
    };

    let summary = extractor.run(backup.manifest(), progress.as_ref())?;
    progress.finish_with_message("Extraction complete");

    println!("Extracted {} files ({} bytes)", summary.extracted, summary.bytes_copied);
    if !summary.is_clean() {
        println!("Skipped records:");
        if summary.decode_errors > 0 {
            println!("  metadata decode errors: {}", summary.decode_errors);
        }
        if summary.missing_sources > 0 {
            println!("  missing source files:   {}", summary.missing_sources);
        }
        if summary.write_errors > 0 {
            println!("  write failures:         {}", summary.write_errors);
        }
    }
    if summary.metadata_errors > 0 {
        println!(
            "Could not restore permissions/timestamps on {} files",
            summary.metadata_errors
        );
    }

    // Per-record failures do not fail the run; the summary is the record
    Ok(())
}

/// JSON-friendly report assembled from the envelope plists
#[derive(Serialize)]
struct InfoReport {
    device_name: String,
    serial_number: Option<String>,
    product_type: Option<String>,
    product_version: String,
    build_version: Option<String>,
    backup_format_version: String,
    snapshot_state: Option<String>,
    is_full_backup: bool,
    is_encrypted: bool,
    backup_date: Option<String>,
    file_records: Option<u64>,
}

/// Print device and backup metadata from the backup envelope
pub fn info(backup_path: &Path, json: bool) -> Result<()> {
    // Envelope only: `info` also works on encrypted backups
    let envelope = Envelope::load(backup_path)?;

    // Record count needs the manifest database, which an encrypted
    // backup does not expose
    let file_records = if envelope.manifest.is_encrypted {
        None
    } else {
        Backup::open(backup_path)
            .and_then(|b| b.manifest().count(&RecordFilter::default()))
            .ok()
    };

    let report = InfoReport {
        device_name: envelope.device.device_name.clone(),
        serial_number: envelope.device.serial_number.clone(),
        product_type: envelope.device.product_type.clone(),
        product_version: envelope.device.product_version.clone(),
        build_version: envelope.device.build_version.clone(),
        backup_format_version: envelope.status.version.clone(),
        snapshot_state: envelope.status.snapshot_state.clone(),
        is_full_backup: envelope.status.is_full_backup,
        is_encrypted: envelope.manifest.is_encrypted,
        backup_date: envelope.manifest.date.map(format_date),
        file_records,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Device:        {}", report.device_name);
    if let Some(serial) = &report.serial_number {
        println!("Serial:        {}", serial);
    }
    if let Some(product) = &report.product_type {
        println!("Model:         {}", product);
    }
    println!("iOS version:   {}", report.product_version);
    if let Some(build) = &report.build_version {
        println!("Build:         {}", build);
    }
    println!("Backup format: v{}", report.backup_format_version);
    if let Some(state) = &report.snapshot_state {
        println!("Snapshot:      {}", state);
    }
    if let Some(date) = &report.backup_date {
        println!("Backup date:   {}", date);
    }
    println!("Encrypted:     {}", if report.is_encrypted { "yes" } else { "no" });
    if let Some(count) = report.file_records {
        println!("File records:  {}", count);
    }

    Ok(())
}

/// List manifest records without extracting anything
pub fn ls(
    backup_path: &Path,
    only: Category,
    domain: Option<String>,
    limit: Option<u64>,
) -> Result<()> {
    let backup = Backup::open(backup_path)?;
    let filter = RecordFilter {
        category: only,
        domain,
    };

    let mut listed: u64 = 0;
    backup.manifest().for_each_record(&filter, |record| {
        let size = record
            .metadata
            .as_ref()
            .map(|m| m.size.to_string())
            .unwrap_or_else(|_| "-".to_string());
        println!(
            "{}  {:>12}  {}/{}",
            record.file_id, size, record.domain, record.relative_path
        );

        listed += 1;
        match limit {
            Some(limit) if listed >= limit => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })?;

    info!("Listed {} records", listed);
    Ok(())
}

/// Cross-check content files on disk against the manifest
pub fn scan(backup_path: &Path) -> Result<()> {
    let backup = Backup::open(backup_path)?;

    let mut referenced = BTreeSet::new();
    backup
        .manifest()
        .for_each_record(&RecordFilter::default(), |record| {
            referenced.insert(record.file_id);
            ControlFlow::Continue(())
        })?;

    let report = backup.content_store().scan(&referenced)?;

    println!("Content files on disk:  {}", report.present);
    println!("Referenced by manifest: {}", referenced.len());
    println!("Orphaned on disk:       {}", report.orphaned.len());
    println!("Missing from disk:      {}", report.missing.len());

    const LISTED: usize = 20;
    for file_id in report.orphaned.iter().take(LISTED) {
        println!("  orphaned: {}", file_id);
    }
    if report.orphaned.len() > LISTED {
        println!("  ... and {} more orphaned", report.orphaned.len() - LISTED);
    }
    for file_id in report.missing.iter().take(LISTED) {
        println!("  missing:  {}", file_id);
    }
    if report.missing.len() > LISTED {
        println!("  ... and {} more missing", report.missing.len() - LISTED);
    }

    Ok(())
}

fn format_date(date: plist::Date) -> String {
    let system_time: std::time::SystemTime = date.into();
    chrono::DateTime::<chrono::Utc>::from(system_time).to_rfc3339()
}

/// Extraction progress display: overall bar plus a status line showing
/// the file currently being copied
pub struct CliProgress {
    _multi: MultiProgress,
    overall: ProgressBar,
    status: ProgressBar,
}

impl CliProgress {
    pub fn new(operation: &str, total: u64) -> Self {
        let multi = MultiProgress::new();

        let overall = ProgressBar::new(total);
        overall.set_style(
            ProgressStyle::default_bar()
                .template("{msg} ({pos}/{len}) [{bar:40.green/dim}] {percent}%")
                .expect("Invalid progress bar template")
                .progress_chars("##-"),
        );
        overall.set_message(operation.to_string());

        // Status line below (spinner with message)
        let status = ProgressBar::new_spinner();
        status.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .expect("Invalid spinner template"),
        );
        status.enable_steady_tick(Duration::from_millis(100));

        let overall = multi.add(overall);
        let status = multi.add(status);

        Self {
            _multi: multi,
            overall,
            status,
        }
    }
}

impl ProgressTracker for CliProgress {
    fn set_message(&self, message: &str) {
        self.status.set_message(message.to_string());
    }

    fn increment(&self, amount: u64) {
        self.overall.inc(amount);
    }

    fn position(&self) -> u64 {
        self.overall.position()
    }

    fn finish_with_message(&self, message: &str) {
        self.status.finish_and_clear();
        self.overall.finish_with_message(message.to_string());
    }
}
