#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result store.
//!
//! Persists one pretty-printed JSON document per `(source_id, company)` pair
//! in a flat directory. Saving overwrites the previous document for the
//! same key. A document that is missing, does not parse as a valid
//! [`FetchResult`], or belongs to another key is reported as absent.
//!
//! File names are a readable sanitized stem followed by a short SHA-256 of
//! the normalized key, so keys that sanitize to the same stem still get
//! distinct files.

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest as _, Sha256};
use spotlight_complaint_models::FetchResult;

static NON_ALPHANUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid regex"));

/// Bytes of the key digest kept in the file name.
const KEY_HASH_BYTES: usize = 8;

/// Errors that can occur while saving a result.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// File-system failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being written.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The result could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lowercases `part` and replaces every non-alphanumeric character with `_`.
#[must_use]
pub fn sanitize(part: &str) -> String {
    NON_ALPHANUMERIC_RE
        .replace_all(&part.trim().to_lowercase(), "_")
        .into_owned()
}

/// Trims and uppercases one key part, matching how [`FetchResult`]
/// normalizes its own `source_id` and `company`.
fn normalize_key(part: &str) -> String {
    part.trim().to_uppercase()
}

/// Hex digest identifying the normalized `(source_id, company)` key.
///
/// The parts are separated by a NUL byte so that moving characters across
/// the boundary changes the digest.
#[must_use]
pub fn key_hash(source_id: &str, company: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_key(source_id).as_bytes());
    hasher.update([0u8]);
    hasher.update(normalize_key(company).as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..KEY_HASH_BYTES])
}

/// File name for a key: `{source}_{company}-{hash}.json`, with both parts
/// sanitized and the hash taken from [`key_hash`].
#[must_use]
pub fn file_name(source_id: &str, company: &str) -> String {
    format!(
        "{}_{}-{}.json",
        sanitize(source_id),
        sanitize(company),
        key_hash(source_id, company)
    )
}

fn belongs_to(result: &FetchResult, source_id: &str, company: &str) -> bool {
    normalize_key(result.source_id()) == normalize_key(source_id)
        && normalize_key(result.company()) == normalize_key(company)
}

/// Directory-backed store of [`FetchResult`] documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Creates a store rooted at `root`. The directory is created on the
    /// first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store in [`paths::data_dir`].
    #[must_use]
    pub fn open_default() -> Self {
        Self::new(paths::data_dir())
    }

    /// The directory holding the documents.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for a key.
    #[must_use]
    pub fn path_for(&self, source_id: &str, company: &str) -> PathBuf {
        self.root.join(file_name(source_id, company))
    }

    /// Writes `result` under `(source_id, company)`, replacing any previous
    /// document. The write goes to a temp file that is then renamed, so a
    /// reader never sees a half-written document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory or file cannot be written.
    pub fn save(
        &self,
        source_id: &str,
        company: &str,
        result: &FetchResult,
    ) -> Result<PathBuf, StoreError> {
        paths::ensure_dir(&self.root).map_err(|e| StoreError::Io {
            path: self.root.display().to_string(),
            source: e,
        })?;

        let path = self.path_for(source_id, company);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(result)?;

        std::fs::write(&tmp_path, json).map_err(|e| StoreError::Io {
            path: tmp_path.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        log::info!(
            "Saved {} complaints to {}",
            result.complaints().len(),
            path.display()
        );
        Ok(path)
    }

    /// Reads the document for `(source_id, company)`.
    ///
    /// Returns `None` if it was never saved, cannot be read, does not hold
    /// a valid result, or holds the result of a different key; every case
    /// but the first is logged at warn.
    #[must_use]
    pub fn load(&self, source_id: &str, company: &str) -> Option<FetchResult> {
        let path = self.path_for(source_id, company);
        let result = read_document(&path)?;

        if belongs_to(&result, source_id, company) {
            Some(result)
        } else {
            log::warn!(
                "Ignoring {}: holds {} / {}, expected {source_id} / {company}",
                path.display(),
                result.source_id(),
                result.company()
            );
            None
        }
    }

    /// Reads every stored result for `company`, across all sources, ordered
    /// by file name. Corrupt documents are skipped.
    #[must_use]
    pub fn load_all(&self, company: &str) -> Vec<FetchResult> {
        let wanted = normalize_key(company);

        let Ok(entries) = std::fs::read_dir(&self.root) else {
            log::debug!("No data directory at {}", self.root.display());
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths
            .iter()
            .filter_map(|path| read_document(path))
            .filter(|result| normalize_key(result.company()) == wanted)
            .collect()
    }
}

fn read_document(path: &Path) -> Option<FetchResult> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("Could not read {}: {e}", path.display());
            return None;
        }
    };

    match serde_json::from_str(&text) {
        Ok(result) => Some(result),
        Err(e) => {
            log::warn!("Ignoring corrupt result {}: {e}", path.display());
            None
        }
    }
}
