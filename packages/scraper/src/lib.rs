#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Download and container-format primitives for complaint sources.
//!
//! Provides the transport helpers ([`build_client`], [`download`]) and the
//! readers for every container shape the origins publish: delimited text
//! ([`delimited`]), ZIP archives ([`archive`]), XLSX workbooks
//! ([`workbook`]) and paginated HTML listings ([`html_blocks`]).
//!
//! This crate knows nothing about complaints. It turns bytes into headers and
//! rows (or HTML blocks) that the source adapters interpret.

pub mod archive;
pub mod delimited;
pub mod download;
pub mod html_blocks;
pub mod workbook;

use std::time::Duration;

/// Errors that can occur while downloading or reading a container.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The origin answered with a non-success status.
    #[error("HTTP status {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code returned by the origin.
        status: u16,
    },

    /// Parsing the response body failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The ZIP archive could not be opened or decompressed.
    #[error("ZIP error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A named entry is missing from the ZIP archive.
    #[error("entry '{name}' not found in archive (entries: {})", available.join(", "))]
    MissingEntry {
        /// Entry that was requested.
        name: String,
        /// Entries the archive does contain.
        available: Vec<String>,
    },

    /// The XLSX workbook could not be read.
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::XlsxError),
}

impl ScrapeError {
    /// Returns `true` if the failure happened while talking to the origin,
    /// as opposed to while reading what it returned.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}

/// A fully-read tabular container: one header row and its data rows.
///
/// Rows may be shorter or longer than the header (ragged files); use
/// [`Table::cell`] for bounds-tolerant access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Cleaned header names, in column order.
    pub headers: Vec<String>,
    /// Data rows, each a list of trimmed cell values.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Returns the cell at `index`, or `""` if the row is too short.
    #[must_use]
    pub fn cell(row: &[String], index: usize) -> &str {
        row.get(index).map_or("", String::as_str)
    }
}

/// Configuration shared by paginated scrapers.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// URL template; `{page}` is replaced by the page number.
    pub url_template: String,
    /// Number of the first page.
    pub first_page: u32,
    /// Maximum number of pages to fetch.
    pub max_pages: Option<u32>,
    /// Delay in milliseconds between page fetches.
    pub delay_ms: Option<u64>,
}

impl ScrapeConfig {
    /// Creates a new `ScrapeConfig` starting at page 1 with no page cap and
    /// no delay.
    #[must_use]
    pub fn new(url_template: &str) -> Self {
        Self {
            url_template: url_template.to_owned(),
            first_page: 1,
            max_pages: None,
            delay_ms: None,
        }
    }

    /// Sets the maximum number of pages to fetch.
    #[must_use]
    pub const fn with_max_pages(mut self, max: u32) -> Self {
        self.max_pages = Some(max);
        self
    }

    /// Sets the delay between page fetches.
    #[must_use]
    pub const fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = Some(ms);
        self
    }

    /// Builds the URL of the given page.
    #[must_use]
    pub fn page_url(&self, page: u32) -> String {
        self.url_template.replace("{page}", &page.to_string())
    }
}

/// Builds an HTTP client that sends `user_agent` and aborts any request
/// still running after `timeout`.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] if the TLS backend cannot be initialized.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, ScrapeError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(ScrapeError::Http)
}
