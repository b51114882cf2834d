#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Spotlight complaint ingestion pipeline.
//!
//! Uses `indicatif-log-bridge` (via [`spotlight_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod interactive;
mod pipeline;

use clap::{Parser, Subcommand};
use spotlight_source::registry::{adapters, all_sources, enabled_sources};
use spotlight_store::ResultStore;

/// Complaints printed by `show`.
const SHOW_LIMIT: usize = 20;

#[derive(Parser)]
#[command(name = "spotlight", about = "Consumer complaint ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured complaint sources
    Sources,
    /// Fetch complaints about a company from every enabled source
    Fetch {
        /// Company name (case-insensitive substring)
        company: String,
        /// Comma-separated list of source IDs (overrides `SPOTLIGHT_SOURCES` env var)
        #[arg(long)]
        sources: Option<String>,
    },
    /// Show the stored result of one source for a company
    Show {
        /// Source identifier (e.g., "anatel")
        source: String,
        /// Company name used when fetching
        company: String,
    },
    /// Brand and category counts over every stored result for a company
    Summary {
        /// Company name used when fetching
        company: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = spotlight_cli_utils::init_logger();
    let cli = Cli::parse();
    let store = ResultStore::open_default();

    let Some(command) = cli.command else {
        return interactive::run(&multi, &store).await;
    };

    match command {
        Commands::Sources => {
            println!("{:<16} {:<24} ORIGIN", "ID", "NAME");
            println!("{}", "-".repeat(80));
            for source in &all_sources() {
                println!(
                    "{:<16} {:<24} {}",
                    source.id(),
                    source.name(),
                    source.origin
                );
            }
        }
        Commands::Fetch { company, sources } => {
            let adapters = adapters(&enabled_sources(sources));
            let report = pipeline::fetch_company(&adapters, &company, &store, &multi).await;
            report.print();

            if report.all_failed() {
                return Err(format!("no source produced a result for '{company}'").into());
            }
        }
        Commands::Show { source, company } => match store.load(&source, &company) {
            Some(result) => pipeline::print_result(&result, SHOW_LIMIT),
            None => println!("No data for {source} / {company}"),
        },
        Commands::Summary { company } => {
            let results = store.load_all(&company);
            if results.is_empty() {
                println!("No data for {company}");
            } else {
                pipeline::print_summary(&company, &results);
            }
        }
    }

    Ok(())
}
