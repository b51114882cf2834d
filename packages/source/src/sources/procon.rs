//! Procon (consumer-protection agencies) complaints.
//!
//! The national Procon registry is published as an XLSX workbook. A row
//! matches when any of its registered-name or trade-name columns (as
//! declared by the agency or as found in the federal tax registry)
//! contains the query.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spotlight_complaint_models::FetchResult;
use spotlight_scraper::Table;
use spotlight_scraper::download::download_bytes;
use spotlight_scraper::workbook::read_first_sheet;

use crate::columns::{ColumnMatcher, FieldSpec, resolve_columns};
use crate::matching::CompanyQuery;
use crate::parsing::date_or_now;
use crate::progress::ProgressCallback;
use crate::sources::{Collector, SourceInfo};
use crate::{ComplaintSource, FetchError, SourceError};

/// Company-name fields, in `raw_brand` preference order.
const NAME_FIELDS: &[&str] = &[
    "razao_social",
    "nome_fantasia",
    "razao_social_rfb",
    "nome_fantasia_rfb",
];

const COLUMNS: &[FieldSpec] = &[
    FieldSpec::optional("razao_social", ColumnMatcher::Exact("strRazaoSocial")),
    FieldSpec::optional("nome_fantasia", ColumnMatcher::Exact("strNomeFantasia")),
    FieldSpec::optional("razao_social_rfb", ColumnMatcher::Exact("RazaoSocialRFB")),
    FieldSpec::optional("nome_fantasia_rfb", ColumnMatcher::Exact("NomeFantasiaRFB")),
    FieldSpec::required("date", ColumnMatcher::Exact("DataAbertura")),
    FieldSpec::required("category", ColumnMatcher::Exact("DescricaoAssunto")),
    FieldSpec::required("description", ColumnMatcher::Exact("DescricaoProblema")),
];

/// Procon complaints source.
#[derive(Debug, Clone)]
pub struct ProconSource {
    info: SourceInfo,
    url: String,
    timeout: Duration,
}

impl ProconSource {
    /// Creates the source for the workbook at `url`.
    #[must_use]
    pub fn new(info: SourceInfo, url: &str, timeout: Duration) -> Self {
        Self {
            info,
            url: url.to_owned(),
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
        log::info!("[{label}] Workbook downloaded ({} bytes)", bytes.len());
        progress.set_message(format!("{label}: reading workbook"));

        let result = tokio::task::spawn_blocking(move || {
            let table = read_first_sheet(&bytes)?;
            progress.set_total(table.rows.len() as u64);
            let result = parse_table(&table, &query, &label);
            progress.inc(table.rows.len() as u64);
            result
        })
        .await??;

        Ok(result)
    }
}

/// Keeps the rows where any company-name column contains `query`.
///
/// `raw_brand` is the registered name, or the first non-empty name column
/// when the registered name is blank.
///
/// # Errors
///
/// Returns [`SourceError::SchemaMismatch`] if the date, subject or problem
/// columns are absent, or if none of the name columns exists.
pub fn parse_table(
    table: &Table,
    query: &CompanyQuery,
    label: &str,
) -> Result<FetchResult, SourceError> {
    let columns = resolve_columns(&table.headers, COLUMNS)?;
    columns.require_any(NAME_FIELDS)?;

    let mut collector = Collector::new(label);

    for row in &table.rows {
        let names: Vec<&str> = NAME_FIELDS
            .iter()
            .map(|field| columns.value(row, field))
            .collect();
        if !query.matches_any(names.iter().copied()) {
            continue;
        }
        let brand = names.iter().copied().find(|n| !n.is_empty()).unwrap_or("");
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
impl ComplaintSource for ProconSource {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|s| (*s).to_owned()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| (*s).to_owned()).collect())
                .collect(),
        }
    }

    const HEADERS: &[&str] = &[
        "DataAbertura",
        "strRazaoSocial",
        "strNomeFantasia",
        "RazaoSocialRFB",
        "NomeFantasiaRFB",
        "DescricaoAssunto",
        "DescricaoProblema",
    ];

    #[test]
    fn matches_any_name_column() {
        let table = table(
            HEADERS,
            &[
                &["2023-04-01T10:00:00", "Acme Comércio Ltda", "", "", "", "Celular", "Vício"],
                &["2023-04-02T10:00:00", "Lojas Beta", "Acme Store", "", "", "Eletro", "Garantia"],
                &["2023-04-03T10:00:00", "", "", "", "ACME RFB", "Banco", "Juros"],
                &["2023-04-04T10:00:00", "Gama SA", "Gama", "GAMA SA", "GAMA", "Banco", "Tarifa"],
            ],
        );
        let query = CompanyQuery::new("acme").unwrap();
        let result = parse_table(&table, &query, "PROCON").unwrap();

        assert_eq!(result.total_raw(), 4);
        let brands: Vec<&str> = result.complaints().iter().map(|c| c.raw_brand()).collect();
        assert_eq!(brands, vec!["ACME COMÉRCIO LTDA", "LOJAS BETA", "ACME RFB"]);
        assert_eq!(result.complaints()[1].category(), "ELETRO");
        assert_eq!(
            result.complaints()[0].date().to_string(),
            "2023-04-01 10:00:00 UTC"
        );
    }

    #[test]
    fn no_match_still_counts_every_row() {
        let table = table(
            HEADERS,
            &[
                &["2023-04-01T10:00:00", "Lojas Beta", "Beta", "", "", "Eletro", "Garantia"],
                &["2023-04-02T10:00:00", "Gama SA", "Gama", "GAMA SA", "GAMA", "Banco", "Tarifa"],
            ],
        );
        let query = CompanyQuery::new("acme").unwrap();
        let result = parse_table(&table, &query, "PROCON").unwrap();

        assert!(result.complaints().is_empty());
        assert_eq!(result.total_raw(), 2);
    }

    #[test]
    fn works_with_a_single_name_column() {
        let table = table(
            &["DataAbertura", "strNomeFantasia", "DescricaoAssunto", "DescricaoProblema"],
            &[&["2023-04-01", "Acme", "Celular", "Vício"]],
        );
        let query = CompanyQuery::new("acme").unwrap();
        let result = parse_table(&table, &query, "PROCON").unwrap();
        assert_eq!(result.complaints().len(), 1);
    }

    #[test]
    fn requires_some_name_column() {
        let table = table(
            &["DataAbertura", "DescricaoAssunto", "DescricaoProblema"],
            &[],
        );
        let query = CompanyQuery::new("acme").unwrap();
        let err = parse_table(&table, &query, "PROCON").unwrap_err();
        assert!(matches!(err, SourceError::SchemaMismatch { .. }));
    }

    #[test]
    fn missing_problem_column() {
        let table = table(&HEADERS[..6], &[]);
        let query = CompanyQuery::new("acme").unwrap();
        match parse_table(&table, &query, "PROCON").unwrap_err() {
            SourceError::SchemaMismatch { missing } => assert_eq!(missing, vec!["description"]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
