//! Record search: a compiled query matched against the common text
//! fields in a fixed order.

use regex::{Regex, RegexBuilder};

use crate::errors::{PsafeError, Result};

/// Which field a search matched, in display-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchField {
    Title,
    Group,
    Username,
    Url,
    Email,
    Notes,
}

impl std::fmt::Display for MatchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchField::Title => write!(f, "title"),
            MatchField::Group => write!(f, "group"),
            MatchField::Username => write!(f, "username"),
            MatchField::Url => write!(f, "url"),
            MatchField::Email => write!(f, "email"),
            MatchField::Notes => write!(f, "notes"),
        }
    }
}

/// A record search query.  Case-insensitive unless asked otherwise.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    query: Regex,
}

impl RecordFilter {
    pub fn new(query: &str, case_sensitive: bool) -> Result<Self> {
        let query = RegexBuilder::new(query)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| PsafeError::format("search query", e.to_string()))?;
        Ok(Self { query })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.query.is_match(value)
    }

    /// The first field the query matches, trying fields in the order
    /// given.
    pub fn first_match<'a, I>(&self, fields: I) -> Option<MatchField>
    where
        I: IntoIterator<Item = (MatchField, Option<&'a str>)>,
    {
        for (field, value) in fields {
            if let Some(value) = value {
                if self.query.is_match(value) {
                    return Some(field);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_case_insensitive_by_default() {
        let filter = RecordFilter::new("bank", false).unwrap();
        assert!(filter.is_match("My Bank Account"));

        let filter = RecordFilter::new("bank", true).unwrap();
        assert!(!filter.is_match("My Bank Account"));
        assert!(filter.is_match("bank of nowhere"));
    }

    #[test]
    fn first_match_respects_field_order() {
        let filter = RecordFilter::new("web", false).unwrap();
        let hit = filter.first_match([
            (MatchField::Title, Some("email")),
            (MatchField::Group, Some("Web")),
            (MatchField::Notes, Some("webmail notes")),
        ]);
        assert_eq!(hit, Some(MatchField::Group));
    }

    #[test]
    fn invalid_patterns_are_format_errors() {
        assert!(RecordFilter::new("[unclosed", false).is_err());
    }
}
