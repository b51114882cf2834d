//! Declarative column detection.
//!
//! Origins rename and reorder columns between dataset vintages, so adapters
//! never index columns by position. Each field an adapter needs is declared
//! as a [`FieldSpec`] and resolved once per fetch against the observed
//! headers. Resolution either locates every required field or fails with a
//! [`SourceError::SchemaMismatch`] naming all of the missing ones.

use std::collections::BTreeMap;

use spotlight_scraper::Table;

use crate::SourceError;

/// How a header name is recognised. Comparisons are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMatcher {
    /// The whole header equals this name.
    Exact(&'static str),
    /// The header starts with this prefix.
    Prefix(&'static str),
}

impl ColumnMatcher {
    /// Returns `true` if `header` satisfies this matcher.
    #[must_use]
    pub fn matches(self, header: &str) -> bool {
        let header = header.to_lowercase();
        match self {
            Self::Exact(name) => header == name.to_lowercase(),
            Self::Prefix(prefix) => header.starts_with(&prefix.to_lowercase()),
        }
    }
}

/// A named field and the matcher that locates its column.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Logical field name (e.g. `"brand"`).
    pub field: &'static str,
    /// How to recognise the column.
    pub matcher: ColumnMatcher,
    /// Whether resolution fails when the column is absent.
    pub required: bool,
}

impl FieldSpec {
    /// A field that must be present.
    #[must_use]
    pub const fn required(field: &'static str, matcher: ColumnMatcher) -> Self {
        Self {
            field,
            matcher,
            required: true,
        }
    }

    /// A field that may be absent.
    #[must_use]
    pub const fn optional(field: &'static str, matcher: ColumnMatcher) -> Self {
        Self {
            field,
            matcher,
            required: false,
        }
    }
}

/// Field name → column index, the outcome of [`resolve_columns`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: BTreeMap<&'static str, usize>,
}

impl ColumnMap {
    /// Column index of `field`, if it was resolved.
    #[must_use]
    pub fn index(&self, field: &str) -> Option<usize> {
        self.indices.get(field).copied()
    }

    /// Whether `field` was resolved.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.indices.contains_key(field)
    }

    /// Value of `field` in `row`, or `""` if the field was not resolved or
    /// the row is too short.
    #[must_use]
    pub fn value<'a>(&self, row: &'a [String], field: &str) -> &'a str {
        self.index(field).map_or("", |i| Table::cell(row, i))
    }

    /// Fails unless at least one of `fields` was resolved.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::SchemaMismatch`] naming the alternatives.
    pub fn require_any(&self, fields: &[&str]) -> Result<(), SourceError> {
        if fields.iter().any(|f| self.has(f)) {
            return Ok(());
        }
        Err(SourceError::SchemaMismatch {
            missing: vec![fields.join(" or ")],
        })
    }
}

/// Resolves every spec against `headers`. The first matching header wins.
///
/// # Errors
///
/// Returns [`SourceError::SchemaMismatch`] listing every required field
/// that matched no header.
pub fn resolve_columns(headers: &[String], specs: &[FieldSpec]) -> Result<ColumnMap, SourceError> {
    let mut indices = BTreeMap::new();
    let mut missing = Vec::new();

    for spec in specs {
        match headers.iter().position(|h| spec.matcher.matches(h)) {
            Some(index) => {
                log::debug!(
                    "Column '{}' resolved to header '{}'",
                    spec.field,
                    headers[index]
                );
                indices.insert(spec.field, index);
            }
            None if spec.required => missing.push(spec.field.to_owned()),
            None => log::debug!("Optional column '{}' not present", spec.field),
        }
    }

    if !missing.is_empty() {
        log::debug!("Observed headers: {headers:?}");
        return Err(SourceError::SchemaMismatch { missing });
    }

    Ok(ColumnMap { indices })
}
