//! Fetch orchestration and result summaries.
//!
//! Runs each enabled adapter once for a company, one at a time, and saves
//! every successful result. A failing adapter is reported and skipped; the
//! others still run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use spotlight_analysis::{Tally, corpus, tally_by_brand, tally_by_category};
use spotlight_cli_utils::{IndicatifProgress, MultiProgress};
use spotlight_complaint_models::FetchResult;
use spotlight_source::ComplaintSource;
use spotlight_source::progress::ProgressCallback;
use spotlight_store::ResultStore;

/// Number of rows shown per tally table.
const TALLY_ROWS: usize = 10;

/// What happened to one adapter during a fetch.
#[derive(Debug)]
pub enum Outcome {
    /// The result was fetched and stored.
    Saved {
        source_id: String,
        complaints: usize,
        total_raw: u64,
        path: PathBuf,
    },
    /// The fetch or the save failed.
    Failed { source_id: String, error: String },
}

/// Per-adapter outcomes of one fetch, in adapter order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<Outcome>,
}

impl FetchReport {
    /// Number of adapters whose result was saved.
    #[must_use]
    pub fn saved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Saved { .. }))
            .count()
    }

    /// True when no adapter produced a saved result. An empty report counts
    /// as a total failure.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.saved() == 0
    }

    /// Prints one line per adapter.
    pub fn print(&self) {
        println!();
        for outcome in &self.outcomes {
            match outcome {
                Outcome::Saved {
                    source_id,
                    complaints,
                    total_raw,
                    path,
                } => println!(
                    "  {source_id:<16} {complaints:>6} complaints ({total_raw} scanned) -> {}",
                    path.display()
                ),
                Outcome::Failed { source_id, error } => {
                    println!("  {source_id:<16} FAILED: {error}");
                }
            }
        }
    }
}

/// Runs every adapter in `adapters` for `company` and stores the results
/// under the adapter id.
pub async fn fetch_company(
    adapters: &BTreeMap<String, Arc<dyn ComplaintSource>>,
    company: &str,
    store: &ResultStore,
    multi: &MultiProgress,
) -> FetchReport {
    let start = Instant::now();
    let mut report = FetchReport::default();

    log::info!(
        "Fetching '{company}' from {} source(s): {}",
        adapters.len(),
        adapters.keys().cloned().collect::<Vec<_>>().join(", ")
    );

    let steps = IndicatifProgress::steps_bar(multi, "Sources", adapters.len() as u64);

    for (id, adapter) in adapters {
        steps.set_message(format!("Sources: {}", adapter.name()));
        let fetch_bar = IndicatifProgress::fetch_bar(multi, adapter.name());
        let progress: Arc<dyn ProgressCallback> = fetch_bar.clone();

        let result = adapter.fetch_with_progress(company, progress).await;
        fetch_bar.clear();

        let outcome = match result {
            Ok(result) => save_result(store, id, company, &result),
            Err(e) => {
                log::error!("{e}");
                Outcome::Failed {
                    source_id: id.clone(),
                    error: e.error.to_string(),
                }
            }
        };
        report.outcomes.push(outcome);
        steps.inc(1);
    }

    steps.finish(format!(
        "Fetched {}/{} source(s) in {:.1}s",
        report.saved(),
        adapters.len(),
        start.elapsed().as_secs_f64()
    ));

    report
}

fn save_result(store: &ResultStore, id: &str, company: &str, result: &FetchResult) -> Outcome {
    match store.save(id, company, result) {
        Ok(path) => Outcome::Saved {
            source_id: id.to_owned(),
            complaints: result.complaints().len(),
            total_raw: result.total_raw(),
            path,
        },
        Err(e) => {
            log::error!("Failed to save {id} result for '{company}': {e}");
            Outcome::Failed {
                source_id: id.to_owned(),
                error: e.to_string(),
            }
        }
    }
}

/// Prints the header fields and first complaints of a stored result.
pub fn print_result(result: &FetchResult, limit: usize) {
    println!("Source:     {}", result.source_id());
    println!("Company:    {}", result.company());
    println!("Fetched at: {}", result.fetched_at().to_rfc3339());
    println!("Scanned:    {}", result.total_raw());
    println!("Complaints: {}", result.complaints().len());

    for complaint in result.complaints().iter().take(limit) {
        println!(
            "  {} | {} | {} | {}",
            complaint.date().format("%Y-%m-%d"),
            complaint.raw_brand(),
            complaint.category(),
            truncate(complaint.description(), 80)
        );
    }
    if result.complaints().len() > limit {
        println!("  ... {} more", result.complaints().len() - limit);
    }
}

/// Prints brand and category tallies across `results`.
pub fn print_summary(company: &str, results: &[FetchResult]) {
    let sources: Vec<&str> = results.iter().map(FetchResult::source_id).collect();
    println!(
        "{company}: {} complaint(s) from {} source(s) [{}]",
        corpus(results).len(),
        results.len(),
        sources.join(", ")
    );

    print_tallies("Brands", &tally_by_brand(results));
    print_tallies("Categories", &tally_by_category(results));
}

fn print_tallies(title: &str, tallies: &[Tally]) {
    println!();
    println!("{title}:");
    for tally in tallies.iter().take(TALLY_ROWS) {
        println!("  {:>6}  {}", tally.count, tally.label);
    }
    if tallies.len() > TALLY_ROWS {
        println!("  ... {} more", tallies.len() - TALLY_ROWS);
    }
}

/// Cuts `text` to at most `max` characters.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}
