// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: backup root directory
fn backup_arg() -> Arg {
    Arg::new("backup")
        .short('b')
        .long("backup")
        .value_name("PATH")
        .required(true)
        .help("Path to the iOS backup root folder")
}

/// Common argument: category filter
fn only_arg() -> Arg {
    Arg::new("only")
        .long("only")
        .value_name("CATEGORY")
        .value_parser(["all", "camera-roll", "messages"])
        .default_value("all")
        .help("Restrict to a file category")
}

/// Common argument: domain filter
fn domain_arg() -> Arg {
    Arg::new("domain")
        .long("domain")
        .value_name("NAME")
        .help("Restrict to a single backup domain (e.g. CameraRollDomain)")
}

fn build_cli() -> Command {
    Command::new("ibex")
        .version(env!("CARGO_PKG_VERSION"))
        .author("ibex Contributors")
        .about("Extract user files from unencrypted iOS device backups")
        .subcommand_required(false)
        .subcommand(
            Command::new("extract")
                .about("Extract backup contents into a browsable folder tree")
                .arg(backup_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .default_value(".")
                        .help("Directory to extract into"),
                )
                .arg(only_arg())
                .arg(domain_arg())
                .arg(
                    Arg::new("no_metadata")
                        .long("no-metadata")
                        .action(clap::ArgAction::SetTrue)
                        .help("Do not restore recorded permissions and timestamps"),
                )
                .arg(
                    Arg::new("mime")
                        .long("mime")
                        .action(clap::ArgAction::SetTrue)
                        .help("Detect and log the MIME type of each extracted file"),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .action(clap::ArgAction::SetTrue)
                        .help("Suppress the progress display"),
                )
                .arg(
                    Arg::new("allow_untested")
                        .long("allow-untested")
                        .action(clap::ArgAction::SetTrue)
                        .help("Proceed even if the backup format version has not been tested"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Print device and backup metadata from the backup envelope")
                .arg(backup_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Emit the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("ls")
                .about("List manifest records without extracting anything")
                .arg(backup_arg())
                .arg(only_arg())
                .arg(domain_arg())
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("N")
                        .help("Stop after N records"),
                ),
        )
        .subcommand(
            Command::new("scan")
                .about("Cross-check content files on disk against the manifest")
                .arg(backup_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("ibex.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
