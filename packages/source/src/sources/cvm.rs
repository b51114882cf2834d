//! CVM (securities regulator) sanctioning proceedings.
//!
//! The archive holds two Latin-1 CSVs: the proceedings themselves and the
//! accused parties of each proceeding. They are left-joined on `NUP`, so a
//! proceeding with no accused row is still examined (matching on its
//! subject only) and a proceeding with several accused parties is examined
//! once per party.

use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spotlight_complaint_models::FetchResult;
use spotlight_scraper::Table;
use spotlight_scraper::archive::{open_archive, with_entry};
use spotlight_scraper::delimited::{DelimitedOptions, read_table};
use spotlight_scraper::download::download_to_tempfile;

use crate::columns::{ColumnMap, ColumnMatcher, FieldSpec, resolve_columns};
use crate::matching::CompanyQuery;
use crate::parsing::date_or_now;
use crate::progress::ProgressCallback;
use crate::sources::{Collector, SourceInfo};
use crate::{ComplaintSource, FetchError, SourceError};

const PROCEEDING_COLUMNS: &[FieldSpec] = &[
    FieldSpec::required("nup", ColumnMatcher::Exact("nup")),
    FieldSpec::required("date", ColumnMatcher::Prefix("data_abertura")),
    FieldSpec::optional("objeto", ColumnMatcher::Exact("objeto")),
    FieldSpec::required("ementa", ColumnMatcher::Exact("ementa")),
];

const ACCUSED_COLUMNS: &[FieldSpec] = &[
    FieldSpec::required("accused_nup", ColumnMatcher::Exact("nup")),
    FieldSpec::optional("acusado", ColumnMatcher::Prefix("nome_acusado")),
];

/// CVM sanctioning proceedings source.
#[derive(Debug, Clone)]
pub struct CvmSource {
    info: SourceInfo,
    url: String,
    proceedings_entry: String,
    accused_entry: String,
    options: DelimitedOptions,
    timeout: Duration,
}

impl CvmSource {
    /// Creates the source for the archive at `url`.
    #[must_use]
    pub fn new(
        info: SourceInfo,
        url: &str,
        proceedings_entry: &str,
        accused_entry: &str,
        options: DelimitedOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            info,
            url: url.to_owned(),
            proceedings_entry: proceedings_entry.to_owned(),
            accused_entry: accused_entry.to_owned(),
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
        log::info!("[{label}] Archive downloaded ({bytes} bytes)");
        progress.set_message(format!("{label}: joining proceedings"));

        let source = self.clone();
        let result = tokio::task::spawn_blocking(move || {
            let (proceedings, accused) = source.read_archive(file)?;
            progress.set_total(proceedings.rows.len() as u64);
            let result = parse_tables(&proceedings, &accused, &query, &label);
            progress.inc(proceedings.rows.len() as u64);
            result
        })
        .await??;

        Ok(result)
    }

    /// Reads both CSV entries from the archive.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ContainerFormat`] if the archive or either
    /// entry cannot be read.
    pub fn read_archive<R: Read + Seek>(&self, reader: R) -> Result<(Table, Table), SourceError> {
        let mut archive = open_archive(reader)?;
        let proceedings = with_entry(&mut archive, &self.proceedings_entry, |r| {
            read_table(r, &self.options)
        })?;
        let accused = with_entry(&mut archive, &self.accused_entry, |r| {
            read_table(r, &self.options)
        })?;
        Ok((proceedings, accused))
    }
}

/// Resolves both tables' columns, reporting every missing field at once.
fn resolve_both(
    proceedings: &Table,
    accused: &Table,
) -> Result<(ColumnMap, ColumnMap), SourceError> {
    match (
        resolve_columns(&proceedings.headers, PROCEEDING_COLUMNS),
        resolve_columns(&accused.headers, ACCUSED_COLUMNS),
    ) {
        (Ok(p), Ok(a)) => {
            if !p.has("objeto") && !a.has("acusado") {
                return Err(SourceError::SchemaMismatch {
                    missing: vec!["acusado or objeto".to_owned()],
                });
            }
            Ok((p, a))
        }
        (
            Err(SourceError::SchemaMismatch { mut missing }),
            Err(SourceError::SchemaMismatch { missing: more }),
        ) => {
            missing.extend(more);
            Err(SourceError::SchemaMismatch { missing })
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

/// Left-joins proceedings to accused parties on `NUP` and keeps the joined
/// rows where the accused name or the proceeding subject contains `query`.
///
/// `total_raw` counts proceeding rows, not joined rows.
///
/// # Errors
///
/// Returns [`SourceError::SchemaMismatch`] if required columns are absent,
/// or if neither the accused name nor the subject column exists.
pub fn parse_tables(
    proceedings: &Table,
    accused: &Table,
    query: &CompanyQuery,
    label: &str,
) -> Result<FetchResult, SourceError> {
    let (p_cols, a_cols) = resolve_both(proceedings, accused)?;

    let mut accused_by_nup: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for row in &accused.rows {
        accused_by_nup
            .entry(a_cols.value(row, "accused_nup"))
            .or_default()
            .push(a_cols.value(row, "acusado"));
    }

    let mut collector = Collector::new(label);

    for row in &proceedings.rows {
        let objeto = p_cols.value(row, "objeto");
        let names = accused_by_nup
            .get(p_cols.value(row, "nup"))
            .map_or(&[""][..], Vec::as_slice);

        for name in names {
            if !query.matches_any([*name, objeto]) {
                continue;
            }
            let brand = if name.is_empty() { objeto } else { *name };
            collector.push(
                date_or_now(label, p_cols.value(row, "date")),
                objeto,
                p_cols.value(row, "ementa"),
                brand,
            );
        }
    }

    collector.finish(query.text(), proceedings.rows.len() as u64)
}

#[async_trait]
impl ComplaintSource for CvmSource {
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
    use std::io::{Cursor, Write as _};

    use spotlight_scraper::delimited::TextEncoding;

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

    fn proceedings() -> Table {
        table(
            &["NUP", "Data_Abertura", "Objeto", "Ementa"],
            &[
                &["1", "2020-05-01", "Irregularidades na Acme", "Apuração de fraude"],
                &["2", "2021-06-01", "Insider trading", "Uso de informação"],
                &["3", "2022-07-01", "Auditoria", "Falha de auditoria"],
            ],
        )
    }

    #[test]
    fn left_join_keeps_proceedings_without_accused() {
        let accused = table(&["NUP", "Nome_Acusado"], &[&["2", "João"]]);
        let query = CompanyQuery::new("acme").unwrap();
        let result = parse_tables(&proceedings(), &accused, &query, "CVM").unwrap();

        assert_eq!(result.total_raw(), 3);
        assert_eq!(result.complaints().len(), 1);
        let complaint = &result.complaints()[0];
        assert_eq!(complaint.raw_brand(), "IRREGULARIDADES NA ACME");
        assert_eq!(complaint.category(), "IRREGULARIDADES NA ACME");
        assert_eq!(complaint.description(), "APURAÇÃO DE FRAUDE");
    }

    #[test]
    fn matches_on_accused_name_once_per_party() {
        let accused = table(
            &["NUP", "Nome_Acusado"],
            &[
                &["2", "Acme Investimentos"],
                &["2", "Acme Holding"],
                &["2", "Fulano"],
                &["3", "Beltrano"],
            ],
        );
        let query = CompanyQuery::new("ACME").unwrap();
        let result = parse_tables(&proceedings(), &accused, &query, "CVM").unwrap();

        assert_eq!(result.total_raw(), 3);
        let brands: Vec<&str> = result.complaints().iter().map(|c| c.raw_brand()).collect();
        assert_eq!(
            brands,
            vec![
                "IRREGULARIDADES NA ACME",
                "ACME INVESTIMENTOS",
                "ACME HOLDING"
            ]
        );
        assert_eq!(result.complaints()[1].category(), "INSIDER TRADING");
    }

    #[test]
    fn no_match_still_counts_every_proceeding() {
        let accused = table(&["NUP", "Nome_Acusado"], &[&["2", "Fulano"], &["3", "Beltrano"]]);
        let query = CompanyQuery::new("Zeta Corp").unwrap();
        let result = parse_tables(&proceedings(), &accused, &query, "CVM").unwrap();

        assert!(result.complaints().is_empty());
        assert_eq!(result.total_raw(), 3);
        assert_eq!(result.company(), "ZETA CORP");
    }

    #[test]
    fn reports_missing_columns_from_both_tables() {
        let proceedings = table(&["NUP", "Objeto"], &[]);
        let accused = table(&["Nome_Acusado"], &[]);
        let query = CompanyQuery::new("acme").unwrap();

        match parse_tables(&proceedings, &accused, &query, "CVM").unwrap_err() {
            SourceError::SchemaMismatch { missing } => {
                assert_eq!(missing, vec!["date", "ementa", "accused_nup"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn requires_accused_or_subject_column() {
        let proceedings = table(&["NUP", "Data_Abertura", "Ementa"], &[]);
        let accused = table(&["NUP", "CPF"], &[]);
        let query = CompanyQuery::new("acme").unwrap();

        let err = parse_tables(&proceedings, &accused, &query, "CVM").unwrap_err();
        assert!(err.to_string().contains("acusado or objeto"));
    }

    #[test]
    fn reads_latin1_entries_from_archive() {
        let mut proceedings = b"NUP;Data_Abertura;Objeto;Ementa\n1;2020-05-01;Acme;Apura".to_vec();
        proceedings.extend_from_slice(&[0xe7, 0xe3, b'o', b'\n']);
        let accused = b"NUP;Nome_Acusado\n1;Acme S/A\n".to_vec();

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("processo_sancionador.csv", options).unwrap();
        writer.write_all(&proceedings).unwrap();
        writer.start_file("processo_sancionador_acusado.csv", options).unwrap();
        writer.write_all(&accused).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let source = CvmSource::new(
            SourceInfo {
                id: "cvm".to_owned(),
                name: "CVM".to_owned(),
                user_agent: "Spotlight/1.0".to_owned(),
            },
            "http://127.0.0.1:9/unused.zip",
            "processo_sancionador.csv",
            "processo_sancionador_acusado.csv",
            DelimitedOptions::new(b';').with_encoding(TextEncoding::Latin1),
            Duration::from_secs(1),
        );

        let (p, a) = source.read_archive(Cursor::new(bytes)).unwrap();
        let query = CompanyQuery::new("acme").unwrap();
        let result = parse_tables(&p, &a, &query, "CVM").unwrap();

        assert_eq!(result.complaints().len(), 1);
        assert_eq!(result.complaints()[0].description(), "APURAÇÃO");
        assert_eq!(result.complaints()[0].raw_brand(), "ACME S/A");
    }
}
