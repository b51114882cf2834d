#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Validated complaint record schema.
//!
//! Every ingestion source produces a [`FetchResult`] holding zero or more
//! [`Complaint`] records. Both types validate and normalize their fields at
//! construction time (and when deserialized), so a value of either type
//! always satisfies the schema invariants:
//!
//! * text fields are trimmed, uppercased and non-empty
//! * timestamps are valid and never later than the moment of validation
//! * `total_raw` is non-negative

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// External field name under which [`Complaint::raw_brand`] is serialized.
pub const BRAND_FIELD: &str = "razao_social";

/// Errors raised when a value violates the record schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A text field was empty after trimming.
    #[error("{field} cannot be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A timestamp given as text could not be parsed.
    #[error("invalid {field} format '{value}', must be ISO-8601")]
    Format {
        /// Name of the offending field.
        field: &'static str,
        /// The raw text that failed to parse.
        value: String,
    },

    /// A timestamp lies after the moment of validation.
    #[error("{field} cannot be in the future ({value})")]
    Future {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected instant.
        value: DateTime<Utc>,
    },

    /// `total_raw` was negative.
    #[error("total_raw must be non-negative (got {0})")]
    NegativeTotal(i64),

    /// `complaints` was neither a sequence nor a single record.
    #[error("complaints must be a list or a single record")]
    ComplaintsShape,

    /// A nested complaint record failed to deserialize.
    #[error("invalid complaint record: {message}")]
    Record {
        /// Underlying deserialization message.
        message: String,
    },
}

/// A timestamp as handed to the schema: either already parsed, or text that
/// still has to be parsed as ISO-8601.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimestamp {
    /// A native timestamp, accepted as-is.
    Parsed(DateTime<Utc>),
    /// ISO-8601 text.
    Text(String),
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Parsed(value)
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RawTimestamp {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Trims, uppercases, and rejects empty values.
///
/// Normalizing an already-normalized value returns it unchanged.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] if nothing is left after trimming.
pub fn normalize_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(normalized)
}

/// Parses ISO-8601 text into a UTC timestamp.
///
/// Accepts RFC 3339 (with offset), naive date-times with `T` or space
/// separators and optional fractional seconds, and bare dates. Naive values
/// are interpreted as UTC.
///
/// # Errors
///
/// Returns [`ValidationError::Format`] if none of the accepted layouts match.
pub fn parse_iso_timestamp(
    field: &'static str,
    value: &str,
) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(naive.and_utc());
    }

    Err(ValidationError::Format {
        field,
        value: value.to_owned(),
    })
}

/// Resolves a [`RawTimestamp`] and rejects instants strictly after `now`.
///
/// # Errors
///
/// Returns [`ValidationError::Format`] for unparseable text and
/// [`ValidationError::Future`] for future instants.
pub fn validate_timestamp(
    field: &'static str,
    value: RawTimestamp,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    let parsed = match value {
        RawTimestamp::Parsed(dt) => dt,
        RawTimestamp::Text(text) => parse_iso_timestamp(field, &text)?,
    };
    if parsed > now {
        return Err(ValidationError::Future {
            field,
            value: parsed,
        });
    }
    Ok(parsed)
}

/// One normalized grievance record.
///
/// Fields are private so a constructed complaint cannot be mutated into an
/// invalid state; use [`Complaint::new`] to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawComplaint")]
pub struct Complaint {
    date: DateTime<Utc>,
    category: String,
    description: String,
    #[serde(rename = "razao_social")]
    raw_brand: String,
}

impl Complaint {
    /// Validates and normalizes a complaint.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if any text field is blank, the date text
    /// is not ISO-8601, or the date lies in the future.
    pub fn new(
        date: impl Into<RawTimestamp>,
        category: &str,
        description: &str,
        raw_brand: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            date: validate_timestamp("date", date.into(), Utc::now())?,
            category: normalize_text("category", category)?,
            description: normalize_text("description", description)?,
            raw_brand: normalize_text(BRAND_FIELD, raw_brand)?,
        })
    }

    /// When the complaint was filed.
    #[must_use]
    pub const fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Source-supplied classification, uppercased.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Free-text narrative, uppercased.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Company/brand name exactly as the source row named it, uppercased.
    #[must_use]
    pub fn raw_brand(&self) -> &str {
        &self.raw_brand
    }
}

#[derive(Deserialize)]
struct RawComplaint {
    date: String,
    category: String,
    description: String,
    #[serde(rename = "razao_social", alias = "raw_brand")]
    raw_brand: String,
}

impl TryFrom<RawComplaint> for Complaint {
    type Error = ValidationError;

    fn try_from(raw: RawComplaint) -> Result<Self, Self::Error> {
        Self::new(raw.date, &raw.category, &raw.description, &raw.raw_brand)
    }
}

/// The validated output of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFetchResult")]
pub struct FetchResult {
    source_id: String,
    company: String,
    fetched_at: DateTime<Utc>,
    total_raw: u64,
    complaints: Vec<Complaint>,
}

impl FetchResult {
    /// Builds a result stamped with the current time.
    ///
    /// An empty `complaints` list is valid: it means the company had no
    /// matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if `source_id` or `company` is blank.
    pub fn new(
        source_id: &str,
        company: &str,
        total_raw: u64,
        complaints: Vec<Complaint>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            source_id: normalize_text("source_id", source_id)?,
            company: normalize_text("company", company)?,
            fetched_at: Utc::now(),
            total_raw,
            complaints,
        })
    }

    /// Replaces the completion timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the timestamp is unparseable or in the
    /// future.
    pub fn with_fetched_at(
        mut self,
        fetched_at: impl Into<RawTimestamp>,
    ) -> Result<Self, ValidationError> {
        self.fetched_at = validate_timestamp("fetched_at", fetched_at.into(), Utc::now())?;
        Ok(self)
    }

    /// Identifier of the adapter that produced this result, uppercased.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The company query, uppercased.
    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    /// When the fetch completed.
    #[must_use]
    pub const fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Number of source rows examined before filtering.
    #[must_use]
    pub const fn total_raw(&self) -> u64 {
        self.total_raw
    }

    /// Matching complaints, in source order.
    #[must_use]
    pub fn complaints(&self) -> &[Complaint] {
        &self.complaints
    }
}

#[derive(Deserialize)]
struct RawFetchResult {
    #[serde(alias = "plugin")]
    source_id: String,
    company: String,
    #[serde(default)]
    fetched_at: Option<String>,
    total_raw: i64,
    #[serde(default)]
    complaints: serde_json::Value,
}

impl TryFrom<RawFetchResult> for FetchResult {
    type Error = ValidationError;

    fn try_from(raw: RawFetchResult) -> Result<Self, Self::Error> {
        let total_raw =
            u64::try_from(raw.total_raw).map_err(|_| ValidationError::NegativeTotal(raw.total_raw))?;
        let complaints = complaints_from_value(raw.complaints)?;
        let result = Self::new(&raw.source_id, &raw.company, total_raw, complaints)?;

        match raw.fetched_at {
            Some(fetched_at) => result.with_fetched_at(fetched_at),
            None => Ok(result),
        }
    }
}

/// Coerces the raw `complaints` value: a sequence is taken as-is, a single
/// record becomes a one-element sequence, anything else is rejected.
fn complaints_from_value(value: serde_json::Value) -> Result<Vec<Complaint>, ValidationError> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        record @ serde_json::Value::Object(_) => vec![record],
        _ => return Err(ValidationError::ComplaintsShape),
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| ValidationError::Record {
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn sample_complaint() -> Complaint {
        Complaint::new("2024-01-01", "billing", "x", "ACME S/A").unwrap()
    }

    #[test]
    fn normalizes_text_fields() {
        let complaint =
            Complaint::new("2024-01-01", "  cobrança indevida ", "sinal fraco", " claro s/a").unwrap();
        assert_eq!(complaint.category(), "COBRANÇA INDEVIDA");
        assert_eq!(complaint.description(), "SINAL FRACO");
        assert_eq!(complaint.raw_brand(), "CLARO S/A");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_text("category", "  Billing issue ").unwrap();
        let twice = normalize_text("category", &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_whitespace_only_category() {
        let err = Complaint::new("2024-01-01", "   ", "x", "ACME").unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "category" });
    }

    #[test]
    fn rejects_empty_brand() {
        let err = Complaint::new("2024-01-01", "billing", "x", "").unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: BRAND_FIELD });
    }

    #[test]
    fn rejects_date_one_second_in_the_future() {
        let future = Utc::now() + Duration::seconds(1);
        let err = Complaint::new(future, "billing", "x", "ACME").unwrap_err();
        assert!(matches!(err, ValidationError::Future { field: "date", .. }));
    }

    #[test]
    fn rejects_future_date_text() {
        let err = Complaint::new("2999-01-01T00:00:00", "billing", "x", "ACME").unwrap_err();
        assert!(matches!(err, ValidationError::Future { .. }));
    }

    #[test]
    fn rejects_non_iso_date_text() {
        let err = Complaint::new("01/02/2024", "billing", "x", "ACME").unwrap_err();
        assert!(matches!(err, ValidationError::Format { field: "date", .. }));
    }

    #[test]
    fn accepts_native_timestamp_as_is() {
        let now = Utc::now();
        let complaint = Complaint::new(now, "billing", "x", "ACME").unwrap();
        assert_eq!(complaint.date(), now);
    }

    #[test]
    fn parses_iso_layouts() {
        let expected = "2024-01-15 14:30:00 UTC";
        for text in [
            "2024-01-15T14:30:00",
            "2024-01-15T14:30:00.000",
            "2024-01-15 14:30:00",
            "2024-01-15T14:30:00Z",
            "2024-01-15T11:30:00-03:00",
        ] {
            let parsed = parse_iso_timestamp("date", text).unwrap();
            assert_eq!(parsed.to_string(), expected, "layout {text}");
        }
        let date_only = parse_iso_timestamp("date", "2024-01-15").unwrap();
        assert_eq!(date_only.to_string(), "2024-01-15 00:00:00 UTC");
    }

    #[test]
    fn complaint_serializes_brand_as_razao_social() {
        let value = serde_json::to_value(sample_complaint()).unwrap();
        assert_eq!(value[BRAND_FIELD], "ACME S/A");
        assert!(value.get("raw_brand").is_none());
    }

    #[test]
    fn complaint_round_trips() {
        let complaint = Complaint::new(Utc::now(), "billing", "late fee", "acme").unwrap();
        let json = serde_json::to_string(&complaint).unwrap();
        let back: Complaint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, complaint);
    }

    #[test]
    fn complaint_deserialization_validates() {
        let err = serde_json::from_value::<Complaint>(json!({
            "date": "2024-01-01",
            "category": " ",
            "description": "x",
            "razao_social": "ACME",
        }));
        assert!(err.is_err());
    }

    #[test]
    fn fetch_result_normalizes_metadata() {
        let result = FetchResult::new(" anatel ", "claro", 10, vec![]).unwrap();
        assert_eq!(result.source_id(), "ANATEL");
        assert_eq!(result.company(), "CLARO");
        assert_eq!(result.total_raw(), 10);
        assert!(result.complaints().is_empty());
        assert!(result.fetched_at() <= Utc::now());
    }

    #[test]
    fn fetch_result_rejects_blank_company() {
        let err = FetchResult::new("ANATEL", "  ", 0, vec![]).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "company" });
    }

    #[test]
    fn fetch_result_rejects_future_fetched_at() {
        let result = FetchResult::new("ANATEL", "CLARO", 0, vec![]).unwrap();
        let err = result
            .with_fetched_at(Utc::now() + Duration::minutes(5))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Future { field: "fetched_at", .. }));
    }

    #[test]
    fn fetch_result_round_trips() {
        let result = FetchResult::new("SRC", "ACME", 3, vec![sample_complaint()]).unwrap();
        let json = serde_json::to_string_pretty(&result).unwrap();
        let back: FetchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn coerces_single_complaint_into_list() {
        let result: FetchResult = serde_json::from_value(json!({
            "source_id": "src",
            "company": "acme",
            "total_raw": 1,
            "complaints": {
                "date": "2024-01-01",
                "category": "billing",
                "description": "x",
                "razao_social": "ACME S/A",
            },
        }))
        .unwrap();
        assert_eq!(result.complaints().len(), 1);
        assert_eq!(result.complaints()[0].raw_brand(), "ACME S/A");
    }

    #[test]
    fn rejects_scalar_complaints() {
        let err = serde_json::from_value::<FetchResult>(json!({
            "source_id": "src",
            "company": "acme",
            "total_raw": 1,
            "complaints": "nope",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("complaints must be a list"));
    }

    #[test]
    fn rejects_negative_total_raw() {
        let err = serde_json::from_value::<FetchResult>(json!({
            "source_id": "src",
            "company": "acme",
            "total_raw": -1,
            "complaints": [],
        }))
        .unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn defaults_missing_fetched_at_to_now() {
        let before = Utc::now();
        let result: FetchResult = serde_json::from_value(json!({
            "source_id": "src",
            "company": "acme",
            "total_raw": 0,
            "complaints": [],
        }))
        .unwrap();
        assert!(result.fetched_at() >= before);
    }

    #[test]
    fn accepts_legacy_plugin_field() {
        let result: FetchResult = serde_json::from_value(json!({
            "plugin": "anatel",
            "company": "claro",
            "fetched_at": "2025-05-16T12:30:00",
            "total_raw": 1_523_456,
            "complaints": [],
        }))
        .unwrap();
        assert_eq!(result.source_id(), "ANATEL");
        assert_eq!(result.fetched_at().to_string(), "2025-05-16 12:30:00 UTC");
    }
}
