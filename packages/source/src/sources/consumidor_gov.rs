//! Consumidor.gov.br complaints.
//!
//! The Ministry of Justice publishes the complete complaint base as one
//! semicolon-delimited CSV. Rows are matched on the company's trade name.
//! Dates are `dd/mm/YYYY`; unreadable dates fall back to the current time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spotlight_complaint_models::FetchResult;
use spotlight_scraper::Table;
use spotlight_scraper::delimited::{DelimitedOptions, read_table};
use spotlight_scraper::download::download_bytes;

use crate::columns::{ColumnMatcher, FieldSpec, resolve_columns};
use crate::matching::CompanyQuery;
use crate::parsing::date_or_now;
use crate::progress::ProgressCallback;
use crate::sources::{Collector, SourceInfo};
use crate::{ComplaintSource, FetchError, SourceError};

const COLUMNS: &[FieldSpec] = &[
    FieldSpec::required("brand", ColumnMatcher::Exact("nome fantasia")),
    FieldSpec::required("date", ColumnMatcher::Exact("data abertura")),
    FieldSpec::required("category", ColumnMatcher::Exact("assunto")),
    FieldSpec::required("description", ColumnMatcher::Exact("problema")),
];

/// Consumidor.gov.br complaints source.
#[derive(Debug, Clone)]
pub struct ConsumidorGovSource {
    info: SourceInfo,
    url: String,
    options: DelimitedOptions,
    timeout: Duration,
}

impl ConsumidorGovSource {
    /// Creates the source for the CSV at `url`.
    #[must_use]
    pub fn new(info: SourceInfo, url: &str, options: DelimitedOptions, timeout: Duration) -> Self {
        Self {
            info,
            url: url.to_owned(),
            options,
            timeout,
        }
    }

    async fn run(
        &self,
        company: &str,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<FetchResult, SourceError> {
        let query = CompanyQuery::new(company)?;
        let label = self.info.label();
        let client = self.info.client(self.timeout)?;

        log::info!("[{label}] Downloading {}", self.url);
        progress.set_message(format!("{label}: downloading"));
        let bytes = download_bytes(&client, &self.url).await?;
        log::info!("[{label}] CSV downloaded ({} bytes)", bytes.len());
        progress.set_message(format!("{label}: scanning rows"));

        scan_csv(bytes, self.options, query, label, progress).await
    }
}

/// Parses a downloaded CSV on the blocking pool and keeps the rows matching
/// `query`.
///
/// # Errors
///
/// Returns [`SourceError`] if the CSV cannot be read, required columns are
/// absent, or the blocking task panics.
pub async fn scan_csv(
    bytes: Vec<u8>,
    options: DelimitedOptions,
    query: CompanyQuery,
    label: String,
    progress: Arc<dyn ProgressCallback>,
) -> Result<FetchResult, SourceError> {
    tokio::task::spawn_blocking(move || {
        let table = read_table(bytes.as_slice(), &options)?;
        progress.set_total(table.rows.len() as u64);
        let result = parse_table(&table, &query, &label);
        progress.inc(table.rows.len() as u64);
        result
    })
    .await?
}

/// Keeps the rows whose trade name contains `query`.
///
/// # Errors
///
/// Returns [`SourceError::SchemaMismatch`] if required columns are absent.
pub fn parse_table(
    table: &Table,
    query: &CompanyQuery,
    label: &str,
) -> Result<FetchResult, SourceError> {
    let columns = resolve_columns(&table.headers, COLUMNS)?;
    let mut collector = Collector::new(label);

    for row in &table.rows {
        let brand = columns.value(row, "brand");
        if !query.matches(brand) {
            continue;
        }
        collector.push(
            date_or_now(label, columns.value(row, "date")),
            columns.value(row, "category"),
            columns.value(row, "description"),
            brand,
        );
    }

    collector.finish(query.text(), table.rows.len() as u64)
}

#[async_trait]
impl ComplaintSource for ConsumidorGovSource {
    fn id(&self) -> &str {
        &self.info.id
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    async fn fetch_with_progress(
        &self,
        company: &str,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<FetchResult, FetchError> {
        self.run(company, progress)
            .await
            .map_err(|e| e.in_fetch(&self.info.label(), company))
    }
}
