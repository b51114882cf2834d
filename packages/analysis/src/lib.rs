#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analysis over collected complaints.
//!
//! Defines the seams where scoring, clustering and question-answering
//! backends plug in, plus the corpus helpers the CLI summaries are built
//! from. No model is bundled here: backends implement the traits and are
//! usually wrapped in a [`LazyHandle`] because they are expensive to load.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spotlight_complaint_models::{Complaint, FetchResult};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Errors raised by analysis backends.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The backend could not be loaded.
    #[error("Initialization failed: {message}")]
    Init {
        /// Description.
        message: String,
    },

    /// The backend failed while serving a request.
    #[error("Backend error: {message}")]
    Backend {
        /// Description.
        message: String,
    },
}

/// Polarity of a complaint text.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    /// Praise or a resolved issue.
    Positive,
    /// Neither clearly positive nor negative.
    Neutral,
    /// Dissatisfaction.
    Negative,
}

/// Classifies a single text.
pub trait SentimentScorer: Send + Sync {
    /// Returns the polarity of `text`.
    fn score(&self, text: &str) -> Sentiment;
}

/// Groups texts by topic.
pub trait Clusterer: Send + Sync {
    /// Assigns every text to exactly one cluster, keyed by cluster id.
    fn cluster(&self, texts: &[String]) -> BTreeMap<usize, Vec<String>>;
}

/// Answers free-text questions about a corpus.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Answers `question` using `corpus` as context.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Backend`] if the backend cannot answer.
    async fn answer(&self, corpus: &[String], question: &str) -> Result<String, AnalysisError>;
}

type InitFuture<T> = Pin<Box<dyn Future<Output = Result<T, AnalysisError>> + Send>>;
type InitFn<T> = Box<dyn Fn() -> InitFuture<T> + Send + Sync>;

/// Owned handle to an expensive resource that is built on first use.
///
/// A failed initialization is returned to the caller and leaves the handle
/// empty, so the next [`LazyHandle::get`] tries again.
pub struct LazyHandle<T> {
    name: String,
    cell: OnceCell<T>,
    init: InitFn<T>,
}

impl<T> LazyHandle<T> {
    /// Creates an empty handle that runs `init` on first access.
    pub fn new<F, Fut>(name: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AnalysisError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            cell: OnceCell::new(),
            init: Box::new(move || Box::pin(init())),
        }
    }

    /// Returns the resource, initializing it if needed.
    ///
    /// # Errors
    ///
    /// Returns the initializer's error.
    pub async fn get(&self) -> Result<&T, AnalysisError> {
        self.cell
            .get_or_try_init(|| async {
                log::info!("Loading {}", self.name);
                let value = (self.init)().await;
                if let Err(e) = &value {
                    log::warn!("Loading {} failed: {e}", self.name);
                }
                value
            })
            .await
    }

    /// Whether the resource has been built.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> std::fmt::Debug for LazyHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyHandle")
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

/// Description texts of every complaint, in result order.
#[must_use]
pub fn corpus(results: &[FetchResult]) -> Vec<String> {
    complaints(results)
        .map(|c| c.description().to_owned())
        .collect()
}

/// Scores every complaint's description.
#[must_use]
pub fn tag_sentiments<'a>(
    results: &'a [FetchResult],
    scorer: &dyn SentimentScorer,
) -> Vec<(&'a Complaint, Sentiment)> {
    complaints(results)
        .map(|c| (c, scorer.score(c.description())))
        .collect()
}

/// A label and how many complaints carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub label: String,
    pub count: usize,
}

/// Complaint counts per raw brand, most common first.
#[must_use]
pub fn tally_by_brand(results: &[FetchResult]) -> Vec<Tally> {
    tally(complaints(results).map(Complaint::raw_brand))
}

/// Complaint counts per category, most common first.
#[must_use]
pub fn tally_by_category(results: &[FetchResult]) -> Vec<Tally> {
    tally(complaints(results).map(Complaint::category))
}

fn complaints(results: &[FetchResult]) -> impl Iterator<Item = &Complaint> {
    results.iter().flat_map(FetchResult::complaints)
}

/// Ties are broken alphabetically.
fn tally<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<Tally> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }

    let mut tallies: Vec<Tally> = counts
        .into_iter()
        .map(|(label, count)| Tally {
            label: label.to_owned(),
            count,
        })
        .collect();
    tallies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    tallies
}
