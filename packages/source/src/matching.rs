//! Company query matching.
//!
//! A row matches when one of its company fields contains the query as a
//! case-insensitive substring. No accent folding or fuzzy matching is done.

use spotlight_complaint_models::ValidationError;

use crate::SourceError;

/// A validated, non-blank company query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyQuery {
    text: String,
    needle: String,
}

impl CompanyQuery {
    /// Trims `company` and prepares it for matching.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Validation`] if `company` is blank.
    pub fn new(company: &str) -> Result<Self, SourceError> {
        let text = company.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty { field: "company" }.into());
        }
        Ok(Self {
            text: text.to_owned(),
            needle: text.to_lowercase(),
        })
    }

    /// The trimmed query as typed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether `haystack` contains the query, ignoring case.
    #[must_use]
    pub fn matches(&self, haystack: &str) -> bool {
        !haystack.is_empty() && haystack.to_lowercase().contains(&self.needle)
    }

    /// Whether any of `haystacks` contains the query.
    pub fn matches_any<'a>(&self, haystacks: impl IntoIterator<Item = &'a str>) -> bool {
        haystacks.into_iter().any(|h| self.matches(h))
    }

    /// URL slug for company-scoped pages: lowercase, spaces replaced by `-`.
    #[must_use]
    pub fn slug(&self) -> String {
        self.needle.replace(' ', "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_substring_ignoring_case() {
        let query = CompanyQuery::new("acme").unwrap();
        assert!(query.matches("ACME S/A"));
        assert!(query.matches("Grupo Acme Telecom"));
        assert!(!query.matches("ACM"));
        assert!(!query.matches(""));
    }

    #[test]
    fn matches_any_field() {
        let query = CompanyQuery::new("Claro").unwrap();
        assert!(query.matches_any(["", "CLARO S.A."]));
        assert!(!query.matches_any(["VIVO", "TIM"]));
    }

    #[test]
    fn rejects_blank_query() {
        assert!(matches!(
            CompanyQuery::new("   "),
            Err(SourceError::Validation(ValidationError::Empty { field: "company" }))
        ));
    }

    #[test]
    fn builds_slug() {
        let query = CompanyQuery::new("  Banco Inter ").unwrap();
        assert_eq!(query.text(), "Banco Inter");
        assert_eq!(query.slug(), "banco-inter");
    }
}
