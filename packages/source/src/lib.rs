#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Complaint source adapters.
//!
//! Each origin implements the [`ComplaintSource`] trait to define how its
//! dataset is downloaded, which columns identify the company, and how rows
//! become validated [`Complaint`](spotlight_complaint_models::Complaint)
//! records. Adapters are configured from embedded TOML definitions and
//! enumerated by the [`registry`].

pub mod columns;
pub mod matching;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod source_def;
pub mod sources;

use std::sync::Arc;

use async_trait::async_trait;
use spotlight_complaint_models::{FetchResult, ValidationError};
use spotlight_scraper::ScrapeError;

use crate::progress::{ProgressCallback, null_progress};

/// Errors that can occur while fetching from a single source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The origin could not be reached or answered with an error status.
    #[error("transport failure: {0}")]
    Transport(#[source] ScrapeError),

    /// The downloaded archive, workbook, CSV or HTML could not be read.
    #[error("unreadable container: {0}")]
    ContainerFormat(#[source] ScrapeError),

    /// Required columns could not be located in the container.
    #[error("required columns not found: {}", missing.join(", "))]
    SchemaMismatch {
        /// Every field that could not be resolved.
        missing: Vec<String>,
    },

    /// The query or the assembled result violated the record schema.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A source definition is unusable.
    #[error("invalid source configuration: {message}")]
    Config {
        /// Description of what is wrong.
        message: String,
    },

    /// I/O error (temp file write/read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking parse task panicked or was cancelled.
    #[error("parse task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<ScrapeError> for SourceError {
    fn from(error: ScrapeError) -> Self {
        match error {
            ScrapeError::Io(e) => Self::Io(e),
            e if e.is_transport() => Self::Transport(e),
            e => Self::ContainerFormat(e),
        }
    }
}

impl SourceError {
    /// Attaches source and company context.
    #[must_use]
    pub fn in_fetch(self, source_id: &str, company: &str) -> FetchError {
        FetchError {
            source_id: source_id.to_owned(),
            company: company.to_owned(),
            error: self,
        }
    }
}

/// A fatal fetch failure, naming the source and the company query.
#[derive(Debug, thiserror::Error)]
#[error("{source_id} fetch for '{company}' failed: {error}")]
pub struct FetchError {
    /// Identifier of the failing source.
    pub source_id: String,
    /// Company query that was being fetched.
    pub company: String,
    /// Underlying cause.
    #[source]
    pub error: SourceError,
}

/// Trait that all complaint sources implement.
///
/// A fetch returns either a complete [`FetchResult`] or an error; partial
/// results are never returned. Zero matching rows is a successful, empty
/// result.
#[async_trait]
pub trait ComplaintSource: Send + Sync {
    /// Returns the stable identifier of this source (e.g. `"anatel"`).
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetches every complaint whose company fields contain `company`
    /// (case-insensitive), reporting row progress to `progress`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the download, the container, or the column
    /// layout is unusable, or if `company` is blank.
    async fn fetch_with_progress(
        &self,
        company: &str,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<FetchResult, FetchError>;

    /// Fetches without progress reporting.
    ///
    /// # Errors
    ///
    /// See [`ComplaintSource::fetch_with_progress`].
    async fn fetch(&self, company: &str) -> Result<FetchResult, FetchError> {
        self.fetch_with_progress(company, null_progress()).await
    }
}
