// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use std::io;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Extract {
            backup,
            output,
            only,
            domain,
            no_metadata,
            mime,
            quiet,
            allow_untested,
        }) => commands::extract(
            &backup,
            &output,
            only.into(),
            domain,
            no_metadata,
            mime,
            quiet,
            allow_untested,
        ),
        Some(Commands::Info { backup, json }) => commands::info(&backup, json),
        Some(Commands::Ls {
            backup,
            only,
            domain,
            limit,
        }) => commands::ls(&backup, only.into(), domain, limit),
        Some(Commands::Scan { backup }) => commands::scan(&backup),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "ibex", &mut io::stdout());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("ibex v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'ibex --help' for usage information");
            Ok(())
        }
    }
}
