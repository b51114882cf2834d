//! Config-driven source definitions.
//!
//! [`SourceDefinition`] captures everything configurable about a source
//! (identity, origin URLs, container layout, timeouts) in a TOML document.
//! Column detection and row semantics stay in the per-origin modules under
//! [`crate::sources`]; the `[fetcher]` table selects which one is built.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use spotlight_scraper::delimited::{DEFAULT_BATCH_SIZE, DelimitedOptions, TextEncoding};

use crate::sources::SourceInfo;
use crate::sources::anatel::AnatelSource;
use crate::sources::consumidor_gov::ConsumidorGovSource;
use crate::sources::cvm::CvmSource;
use crate::sources::procon::ProconSource;
use crate::sources::reclame_aqui::{CardSelectors, ReclameAquiSource};
use crate::{ComplaintSource, SourceError};

/// `User-Agent` sent when a definition does not override it.
pub const DEFAULT_USER_AGENT: &str = "Spotlight/1.0";

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_owned()
}

const fn default_delimiter() -> char {
    ';'
}

const fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

// ── Top-level source definition ──────────────────────────────────────────

/// A complete source definition, loaded from embedded TOML.
#[derive(Debug, Deserialize)]
pub struct SourceDefinition {
    /// Stable identifier, also the registry key (e.g. `"anatel"`).
    pub id: String,
    /// Human-readable name (e.g. `"Anatel"`).
    pub name: String,
    /// Who publishes the data and what it covers.
    pub origin: String,
    /// `User-Agent` header sent to the origin.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// How to fetch and read the dataset.
    pub fetcher: FetcherConfig,
}

// ── Fetcher config ───────────────────────────────────────────────────────

/// How to fetch raw data, one variant per origin.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// ZIP archive with one delimited file, read in row batches.
    Anatel {
        /// Archive URL.
        url: String,
        /// Name of the CSV entry inside the archive.
        entry: String,
        /// Field delimiter.
        #[serde(default = "default_delimiter")]
        delimiter: char,
        /// Text encoding of the CSV.
        #[serde(default)]
        encoding: TextEncoding,
        /// Request timeout in seconds.
        timeout_secs: u64,
        /// Rows per batch.
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
    /// ZIP archive with a proceedings CSV and an accused-parties CSV.
    Cvm {
        /// Archive URL.
        url: String,
        /// Name of the proceedings entry.
        proceedings_entry: String,
        /// Name of the accused-parties entry.
        accused_entry: String,
        /// Field delimiter.
        #[serde(default = "default_delimiter")]
        delimiter: char,
        /// Text encoding of both CSVs.
        #[serde(default)]
        encoding: TextEncoding,
        /// Request timeout in seconds.
        timeout_secs: u64,
    },
    /// Plain delimited file.
    ConsumidorGov {
        /// CSV URL.
        url: String,
        /// Field delimiter.
        #[serde(default = "default_delimiter")]
        delimiter: char,
        /// Text encoding of the CSV.
        #[serde(default)]
        encoding: TextEncoding,
        /// Request timeout in seconds.
        timeout_secs: u64,
    },
    /// XLSX workbook, first sheet.
    Procon {
        /// Workbook URL.
        url: String,
        /// Request timeout in seconds.
        timeout_secs: u64,
    },
    /// Paginated HTML listing scoped to the company.
    ReclameAqui {
        /// Page URL with `{slug}` and `{page}` placeholders.
        url_template: String,
        /// CSS selector for complaint text blocks.
        block_selector: String,
        /// CSS selector for the complaint title.
        title_selector: Option<String>,
        /// CSS selector for the complaint timestamp.
        date_selector: Option<String>,
        /// Per-page request timeout in seconds.
        timeout_secs: u64,
        /// Delay between page fetches in milliseconds.
        delay_ms: Option<u64>,
        /// Maximum number of pages to fetch.
        max_pages: Option<u32>,
    },
}

impl FetcherConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        let secs = match self {
            Self::Anatel { timeout_secs, .. }
            | Self::Cvm { timeout_secs, .. }
            | Self::ConsumidorGov { timeout_secs, .. }
            | Self::Procon { timeout_secs, .. }
            | Self::ReclameAqui { timeout_secs, .. } => *timeout_secs,
        };
        Duration::from_secs(secs)
    }

    /// The URL (or URL template) the fetcher downloads from.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Anatel { url, .. }
            | Self::Cvm { url, .. }
            | Self::ConsumidorGov { url, .. }
            | Self::Procon { url, .. } => url,
            Self::ReclameAqui { url_template, .. } => url_template,
        }
    }
}

/// Converts a configured delimiter to the single byte the CSV reader needs.
fn delimiter_byte(delimiter: char) -> Result<u8, SourceError> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| SourceError::Config {
            message: format!("delimiter {delimiter:?} is not a single ASCII character"),
        })
}

impl SourceDefinition {
    /// Returns the source identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Builds the adapter this definition describes.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if a value cannot be used (e.g. a
    /// multi-byte delimiter or a zero timeout).
    pub fn build(&self) -> Result<Arc<dyn ComplaintSource>, SourceError> {
        let timeout = self.fetcher.timeout();
        if timeout.is_zero() {
            return Err(SourceError::Config {
                message: format!("{}: timeout_secs must be positive", self.id),
            });
        }
        let info = self.info();

        let source: Arc<dyn ComplaintSource> = match &self.fetcher {
            FetcherConfig::Anatel {
                url,
                entry,
                delimiter,
                encoding,
                timeout_secs: _,
                batch_size,
            } => Arc::new(AnatelSource::new(
                info,
                url,
                entry,
                DelimitedOptions::new(delimiter_byte(*delimiter)?)
                    .with_encoding(*encoding)
                    .with_batch_size(*batch_size),
                timeout,
            )),
            FetcherConfig::Cvm {
                url,
                proceedings_entry,
                accused_entry,
                delimiter,
                encoding,
                timeout_secs: _,
            } => Arc::new(CvmSource::new(
                info,
                url,
                proceedings_entry,
                accused_entry,
                DelimitedOptions::new(delimiter_byte(*delimiter)?).with_encoding(*encoding),
                timeout,
            )),
            FetcherConfig::ConsumidorGov {
                url,
                delimiter,
                encoding,
                timeout_secs: _,
            } => Arc::new(ConsumidorGovSource::new(
                info,
                url,
                DelimitedOptions::new(delimiter_byte(*delimiter)?).with_encoding(*encoding),
                timeout,
            )),
            FetcherConfig::Procon {
                url,
                timeout_secs: _,
            } => Arc::new(ProconSource::new(info, url, timeout)),
            FetcherConfig::ReclameAqui {
                url_template,
                block_selector,
                title_selector,
                date_selector,
                timeout_secs: _,
                delay_ms,
                max_pages,
            } => Arc::new(ReclameAquiSource::new(
                info,
                url_template,
                CardSelectors {
                    block: block_selector.clone(),
                    title: title_selector.clone(),
                    date: date_selector.clone(),
                },
                timeout,
                *delay_ms,
                *max_pages,
            )),
        };

        Ok(source)
    }
}

/// Parses a [`SourceDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or missing required fields.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV_TOML: &str = r#"
        id = "test_csv"
        name = "Test CSV"
        origin = "Unit test"

        [fetcher]
        type = "consumidor_gov"
        url = "https://example.test/base.csv"
        timeout_secs = 60
    "#;

    #[test]
    fn applies_defaults() {
        let def = parse_source_toml(CSV_TOML).unwrap();
        assert_eq!(def.user_agent, DEFAULT_USER_AGENT);
        match &def.fetcher {
            FetcherConfig::ConsumidorGov {
                delimiter,
                encoding,
                ..
            } => {
                assert_eq!(*delimiter, ';');
                assert_eq!(*encoding, TextEncoding::Utf8);
            }
            other => panic!("unexpected fetcher: {other:?}"),
        }
        assert_eq!(def.fetcher.timeout(), Duration::from_secs(60));
        assert_eq!(def.fetcher.url(), "https://example.test/base.csv");
    }

    #[test]
    fn builds_adapter_with_definition_identity() {
        let source = parse_source_toml(CSV_TOML).unwrap().build().unwrap();
        assert_eq!(source.id(), "test_csv");
        assert_eq!(source.name(), "Test CSV");
    }

    #[test]
    fn parses_latin1_zip_definition() {
        let def = parse_source_toml(
            r#"
            id = "cvm"
            name = "CVM"
            origin = "Unit test"
            user_agent = "Custom/2.0"

            [fetcher]
            type = "cvm"
            url = "https://example.test/p.zip"
            proceedings_entry = "p.csv"
            accused_entry = "a.csv"
            encoding = "latin1"
            timeout_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(def.user_agent, "Custom/2.0");
        assert!(matches!(
            def.fetcher,
            FetcherConfig::Cvm {
                encoding: TextEncoding::Latin1,
                ..
            }
        ));
    }

    #[test]
    fn rejects_multibyte_delimiter() {
        let def = parse_source_toml(
            r#"
            id = "bad"
            name = "Bad"
            origin = "Unit test"

            [fetcher]
            type = "consumidor_gov"
            url = "https://example.test/base.csv"
            delimiter = "§"
            timeout_secs = 60
            "#,
        )
        .unwrap();

        assert!(matches!(def.build(), Err(SourceError::Config { .. })));
    }

    #[test]
    fn rejects_zero_timeout() {
        let def = parse_source_toml(&CSV_TOML.replace("timeout_secs = 60", "timeout_secs = 0"))
            .unwrap();
        assert!(matches!(def.build(), Err(SourceError::Config { .. })));
    }

    #[test]
    fn rejects_unknown_fetcher_type() {
        let result = parse_source_toml(&CSV_TOML.replace("consumidor_gov", "ftp"));
        assert!(result.is_err());
    }
}
