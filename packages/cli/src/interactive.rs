//! Interactive mode.
//!
//! Prompts for a company and the sources to query, runs the fetch, and
//! prints the per-source outcomes and the combined summary. Repeats until
//! the user declines another company.

use dialoguer::{Confirm, Input, MultiSelect};
use spotlight_cli_utils::MultiProgress;
use spotlight_source::registry::{adapters, enabled_sources};
use spotlight_source::source_def::SourceDefinition;
use spotlight_store::ResultStore;

use crate::pipeline;

/// Runs the prompt loop.
///
/// # Errors
///
/// Returns an error if a prompt cannot be read from the terminal.
pub async fn run(
    multi: &MultiProgress,
    store: &ResultStore,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Spotlight");
    println!();

    loop {
        let company: String = Input::new()
            .with_prompt("Company name")
            .validate_with(|input: &String| {
                if input.trim().is_empty() {
                    Err("company name cannot be blank")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        let selected = select_sources()?;
        if selected.is_empty() {
            println!("No sources selected.");
        } else {
            let adapters = adapters(&selected);
            let report = pipeline::fetch_company(&adapters, company.trim(), store, multi).await;
            report.print();

            let results = store.load_all(company.trim());
            if !results.is_empty() {
                println!();
                pipeline::print_summary(company.trim(), &results);
            }
        }

        println!();
        let again = Confirm::new()
            .with_prompt("Fetch another company?")
            .default(false)
            .interact()?;
        if !again {
            return Ok(());
        }
    }
}

fn select_sources() -> Result<Vec<SourceDefinition>, dialoguer::Error> {
    let sources = enabled_sources(None);
    let labels: Vec<String> = sources
        .iter()
        .map(|s| format!("{} ({})", s.name(), s.id()))
        .collect();
    let defaults = vec![true; sources.len()];

    let picked = MultiSelect::new()
        .with_prompt("Sources to query (space=toggle, a=all, enter=confirm)")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;

    Ok(sources
        .into_iter()
        .enumerate()
        .filter(|(i, _)| picked.contains(i))
        .map(|(_, s)| s)
        .collect())
}
