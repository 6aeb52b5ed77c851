// src/cli.rs
//! CLI definitions for ibex
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ibex")]
#[command(author = "ibex Contributors")]
#[command(version)]
#[command(about = "Extract user files from unencrypted iOS device backups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract backup contents into a browsable folder tree
    Extract {
        /// Path to the iOS backup root folder
        #[arg(short, long)]
        backup: PathBuf,

        /// Directory to extract into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Restrict to a file category
        #[arg(long, value_enum, default_value_t = CategoryArg::All)]
        only: CategoryArg,

        /// Restrict to a single backup domain (e.g. CameraRollDomain)
        #[arg(long)]
        domain: Option<String>,

        /// Do not restore recorded permissions and timestamps
        #[arg(long)]
        no_metadata: bool,

        /// Detect and log the MIME type of each extracted file
        #[arg(long)]
        mime: bool,

        /// Suppress the progress display
        #[arg(short, long)]
        quiet: bool,

        /// Proceed even if the backup format version has not been tested
        #[arg(long)]
        allow_untested: bool,
    },

    /// Print device and backup metadata from the backup envelope
    Info {
        /// Path to the iOS backup root folder
        #[arg(short, long)]
        backup: PathBuf,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List manifest records without extracting anything
    Ls {
        /// Path to the iOS backup root folder
        #[arg(short, long)]
        backup: PathBuf,

        /// Restrict to a file category
        #[arg(long, value_enum, default_value_t = CategoryArg::All)]
        only: CategoryArg,

        /// Restrict to a single backup domain (e.g. CameraRollDomain)
        #[arg(long)]
        domain: Option<String>,

        /// Stop after N records
        #[arg(short = 'n', long)]
        limit: Option<u64>,
    },

    /// Cross-check content files on disk against the manifest
    Scan {
        /// Path to the iOS backup root folder
        #[arg(short, long)]
        backup: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// File categories selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Every file entry in the manifest
    All,
    /// Photos and videos from the camera roll
    CameraRoll,
    /// SMS/iMessage attachments
    Messages,
}

impl From<CategoryArg> for ibex::Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::All => ibex::Category::All,
            CategoryArg::CameraRoll => ibex::Category::CameraRoll,
            CategoryArg::Messages => ibex::Category::Messages,
        }
    }
}
