//! Anatel (telecom regulator) consumer complaints.
//!
//! The open-data panel publishes a single ZIP archive holding one large
//! semicolon-delimited CSV. The archive is streamed to a temp file and the
//! CSV entry is read in fixed-size row batches so the full table is never
//! held in memory.

use std::io::{Read, Seek};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spotlight_complaint_models::FetchResult;
use spotlight_scraper::archive::{open_archive, with_entry};
use spotlight_scraper::delimited::{BatchReader, DelimitedOptions};
use spotlight_scraper::download::download_to_tempfile;

use crate::columns::{ColumnMatcher, FieldSpec, resolve_columns};
use crate::matching::CompanyQuery;
use crate::parsing::date_or_now;
use crate::progress::ProgressCallback;
use crate::sources::{Collector, SourceInfo};
use crate::{ComplaintSource, FetchError, SourceError};

const COLUMNS: &[FieldSpec] = &[
    FieldSpec::required("date", ColumnMatcher::Prefix("data")),
    FieldSpec::required("brand", ColumnMatcher::Exact("marca")),
    FieldSpec::required("category", ColumnMatcher::Prefix("problema")),
    FieldSpec::required("description", ColumnMatcher::Exact("assunto")),
];

/// Anatel complaints source.
#[derive(Debug, Clone)]
pub struct AnatelSource {
    info: SourceInfo,
    url: String,
    entry: String,
    options: DelimitedOptions,
    timeout: Duration,
}

impl AnatelSource {
    /// Creates the source for the archive at `url`, reading `entry`.
    #[must_use]
    pub fn new(
        info: SourceInfo,
        url: &str,
        entry: &str,
        options: DelimitedOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            info,
            url: url.to_owned(),
            entry: entry.to_owned(),
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
        let (file, bytes) = download_to_tempfile(&client, &self.url).await?;
        log::info!("[{label}] Archive downloaded ({bytes} bytes), scanning rows");
        progress.set_message(format!("{label}: scanning rows"));

        let entry = self.entry.clone();
        let options = self.options;
        let result = tokio::task::spawn_blocking(move || {
            parse_archive(file, &entry, &options, &query, &label, progress.as_ref())
        })
        .await??;

        Ok(result)
    }
}

/// Reads the CSV `entry` from a ZIP archive and filters it for `query`.
///
/// # Errors
///
/// Returns [`SourceError::ContainerFormat`] for an unreadable archive or
/// CSV, and [`SourceError::SchemaMismatch`] if required columns are absent.
pub fn parse_archive<R: Read + Seek>(
    archive: R,
    entry: &str,
    options: &DelimitedOptions,
    query: &CompanyQuery,
    label: &str,
    progress: &dyn ProgressCallback,
) -> Result<FetchResult, SourceError> {
    let mut archive = open_archive(archive)?;
    with_entry(&mut archive, entry, |reader| {
        parse_rows(reader, options, query, label, progress)
    })
}

/// Filters a delimited stream for `query`, one batch at a time.
///
/// `total_raw` counts every data row across all batches.
///
/// # Errors
///
/// Returns [`SourceError::ContainerFormat`] if the CSV cannot be read, and
/// [`SourceError::SchemaMismatch`] if required columns are absent.
pub fn parse_rows(
    reader: impl Read,
    options: &DelimitedOptions,
    query: &CompanyQuery,
    label: &str,
    progress: &dyn ProgressCallback,
) -> Result<FetchResult, SourceError> {
    let mut batches = BatchReader::new(reader, options)?;
    let columns = resolve_columns(batches.headers(), COLUMNS)?;

    let mut collector = Collector::new(label);
    let mut total_raw: u64 = 0;
    let mut batch_number: u64 = 0;

    while let Some(batch) = batches.next_batch()? {
        batch_number += 1;
        total_raw += batch.len() as u64;

        for row in &batch {
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

        progress.inc(batch.len() as u64);
        log::debug!(
            "[{label}] Batch {batch_number}: {} rows ({total_raw} total, {} matched)",
            batch.len(),
            collector.matched()
        );
    }

    collector.finish(query.text(), total_raw)
}

#[async_trait]
impl ComplaintSource for AnatelSource {
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
