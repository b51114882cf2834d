//! Delimited-text reader.
//!
//! Parses semicolon/comma separated files whose first row is a header.
//! Fields are read as raw bytes and decoded with the file's declared
//! [`TextEncoding`], so a Latin-1 file never fails on invalid UTF-8.
//!
//! Large files are consumed in fixed-size batches through [`BatchReader`]
//! so that at most one batch of rows is held in memory at a time.

use std::io::Read;

use serde::Deserialize;

use crate::{ScrapeError, Table};

/// Default number of rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Character encoding of a delimited file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// UTF-8; invalid sequences are replaced rather than rejected.
    #[default]
    Utf8,
    /// ISO-8859-1, one byte per character.
    Latin1,
}

impl TextEncoding {
    /// Decodes one field.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().copied().map(char::from).collect(),
        }
    }
}

/// Parsing options for a delimited file.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Text encoding of the file.
    pub encoding: TextEncoding,
    /// Rows per batch for [`BatchReader`].
    pub batch_size: usize,
}

impl DelimitedOptions {
    /// Creates options for the given delimiter, UTF-8 text, and the default
    /// batch size.
    #[must_use]
    pub const fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            encoding: TextEncoding::Utf8,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the text encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the number of rows per batch.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Strips byte-order marks (raw, or mis-decoded as `ï»¿`) and surrounding
/// whitespace from a header name.
#[must_use]
pub fn clean_header(header: &str) -> String {
    header
        .replace('\u{feff}', "")
        .replace("ï»¿", "")
        .trim()
        .to_owned()
}

/// Streams a delimited file as batches of rows.
pub struct BatchReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    encoding: TextEncoding,
    batch_size: usize,
    record: csv::ByteRecord,
    finished: bool,
}

impl<R: Read> BatchReader<R> {
    /// Reads the header row and prepares to stream the rest.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the header row cannot be read or is empty.
    pub fn new(source: R, options: &DelimitedOptions) -> Result<Self, ScrapeError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .flexible(true)
            .from_reader(source);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| clean_header(&options.encoding.decode(h)))
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(ScrapeError::Parse(
                "delimited file contains no header row".to_owned(),
            ));
        }

        Ok(Self {
            reader,
            headers,
            encoding: options.encoding,
            batch_size: options.batch_size.max(1),
            record: csv::ByteRecord::new(),
            finished: false,
        })
    }

    /// The cleaned header row.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Reads up to `batch_size` rows. Returns `None` once the file is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Csv`] if the underlying reader fails mid-file
    /// (truncated archive entry, I/O error).
    pub fn next_batch(&mut self) -> Result<Option<Vec<Vec<String>>>, ScrapeError> {
        if self.finished {
            return Ok(None);
        }

        let mut batch = Vec::with_capacity(self.batch_size.min(4096));
        while batch.len() < self.batch_size {
            if !self.reader.read_byte_record(&mut self.record)? {
                self.finished = true;
                break;
            }
            batch.push(
                self.record
                    .iter()
                    .map(|field| self.encoding.decode(field).trim().to_owned())
                    .collect(),
            );
        }

        Ok(if batch.is_empty() { None } else { Some(batch) })
    }
}

impl<R: Read> Iterator for BatchReader<R> {
    type Item = Result<Vec<Vec<String>>, ScrapeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}

/// Reads a whole delimited file into memory.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the header row is missing or the file cannot
/// be parsed.
pub fn read_table(source: impl Read, options: &DelimitedOptions) -> Result<Table, ScrapeError> {
    let mut reader = BatchReader::new(source, options)?;
    let headers = reader.headers().to_vec();
    let mut rows = Vec::new();
    while let Some(batch) = reader.next_batch()? {
        rows.extend(batch);
    }
    log::debug!("Read {} rows x {} columns", rows.len(), headers.len());
    Ok(Table { headers, rows })
}
