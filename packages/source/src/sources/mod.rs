//! Concrete complaint source implementations.
//!
//! Each module implements the [`ComplaintSource`](crate::ComplaintSource)
//! trait for one origin. Downloads are kept apart from the pure `parse_*`
//! functions that turn container contents into a [`FetchResult`].

pub mod anatel;
pub mod consumidor_gov;
pub mod cvm;
pub mod procon;
pub mod reclame_aqui;

use std::time::Duration;

use chrono::{DateTime, Utc};
use spotlight_complaint_models::{Complaint, FetchResult};
use spotlight_scraper::build_client;

use crate::SourceError;

/// Identity shared by every adapter: id, display name and the user agent
/// sent to the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Stable identifier (e.g. `"anatel"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl SourceInfo {
    /// Uppercased id, used as log prefix and as the result's `source_id`.
    #[must_use]
    pub fn label(&self) -> String {
        self.id.to_uppercase()
    }

    /// Builds an HTTP client with this source's user agent and `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Transport`] if the client cannot be built.
    pub fn client(&self, timeout: Duration) -> Result<reqwest::Client, SourceError> {
        Ok(build_client(&self.user_agent, timeout)?)
    }
}

/// Accumulates the complaints of one fetch.
///
/// Rows that violate the record schema are skipped and logged at warn; they
/// never abort the fetch.
#[derive(Debug)]
pub struct Collector {
    label: String,
    complaints: Vec<Complaint>,
    skipped: u64,
}

impl Collector {
    /// Creates an empty collector logging under `label`.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            complaints: Vec::new(),
            skipped: 0,
        }
    }

    /// Validates one matched row and keeps it if valid.
    pub fn push(&mut self, date: DateTime<Utc>, category: &str, description: &str, brand: &str) {
        match Complaint::new(date, category, description, brand) {
            Ok(complaint) => self.complaints.push(complaint),
            Err(e) => {
                self.skipped += 1;
                log::warn!("[{}] Skipping row for '{brand}': {e}", self.label);
            }
        }
    }

    /// Number of complaints kept so far.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.complaints.len()
    }

    /// Assembles the final result.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Validation`] if `company` is blank.
    pub fn finish(self, company: &str, total_raw: u64) -> Result<FetchResult, SourceError> {
        log::info!(
            "[{}] {total_raw} raw rows, {} complaints for '{company}' ({} rows skipped)",
            self.label,
            self.complaints.len(),
            self.skipped
        );
        Ok(FetchResult::new(
            &self.label,
            company,
            total_raw,
            self.complaints,
        )?)
    }
}
