//! Resolves what the user typed into a single item code.
//!
//! A direct numeric code always wins. Otherwise a description fragment is
//! matched case-insensitively and turned into a candidate list whose labels
//! (`"{description} (Código: {code})"`) parse back into the code.

use crate::error::{Error, Result};
use crate::inventory::InventoryRow;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

lazy_static! {
    static ref LABEL_CODE_REGEX: Regex =
        Regex::new(r"\(Código: *([0-9]+(?:\.[0-9]*)?)\)\s*$").unwrap();
}

/// One disambiguation entry for a description search.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Candidate {
    pub code: u64,
    pub description: String,
    pub label: String,
}

impl Candidate {
    pub fn new(code: u64, description: &str) -> Self {
        Candidate {
            code,
            description: description.to_string(),
            label: candidate_label(description, code),
        }
    }
}

/// Outcome of [`resolve`].
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Resolution {
    /// A code was typed directly.
    Code(u64),
    /// The search text matched; the user must pick one.
    Candidates(Vec<Candidate>),
    /// The search text matched nothing.
    NoMatch,
    /// Nothing to resolve; show the unfiltered view.
    Unfiltered,
}

impl Resolution {
    /// Resolves a picked label against this candidate list.
    ///
    /// A label that parses is accepted even if the list does not contain it;
    /// the aggregator reports an empty result for unknown codes.
    pub fn select(&self, label: &str) -> Result<Option<u64>> {
        match self {
            Resolution::Code(code) => Ok(Some(*code)),
            Resolution::Candidates(_) if label.trim().is_empty() => Ok(None),
            Resolution::Candidates(_) => parse_candidate_label(label).map(Some),
            Resolution::NoMatch | Resolution::Unfiltered => Ok(None),
        }
    }
}

/// Formats a candidate label as shown in the selection dropdown.
pub fn candidate_label(description: &str, code: u64) -> String {
    format!("{} (Código: {})", description, code)
}

/// Extracts the code from the trailing `(Código: N)` of a label.
///
/// Decimal renderings such as `12.0` are truncated to their integer part.
pub fn parse_candidate_label(label: &str) -> Result<u64> {
    let captures = LABEL_CODE_REGEX
        .captures(label)
        .ok_or_else(|| Error::Parse(format!("no item code in selection '{}'", label)))?;
    let digits = &captures[1];
    let integer = digits.split('.').next().unwrap_or(digits);
    integer
        .parse::<u64>()
        .map_err(|e| Error::Parse(format!("invalid item code '{}': {}", digits, e)))
}

/// Validates a directly typed item code: digits only, surrounding blanks ignored.
pub fn parse_item_code(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Parse(format!(
            "'{}' is not a valid item code (whole numbers only)",
            text
        )));
    }
    trimmed
        .parse::<u64>()
        .map_err(|e| Error::Parse(format!("'{}' is not a valid item code: {}", text, e)))
}

/// Case-insensitive description search, deduplicated by code.
///
/// Matches are sorted by description (stable), and the first row of each code
/// wins.
pub fn search_candidates(rows: &[InventoryRow], search_text: &str) -> Vec<Candidate> {
    let needle = search_text.to_lowercase();
    let mut matches: Vec<&InventoryRow> = rows
        .iter()
        .filter(|row| row.description.to_lowercase().contains(&needle))
        .collect();
    matches.sort_by(|a, b| a.description.cmp(&b.description));

    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|row| seen.insert(row.code))
        .map(|row| Candidate::new(row.code, &row.description))
        .collect()
}

/// `resolve(snapshot, explicit_code?, search_text?)`.
///
/// An explicit code that is not a plain non-negative integer is ignored, and
/// the search text is consulted instead.
pub fn resolve(
    rows: &[InventoryRow],
    explicit_code: Option<&str>,
    search_text: Option<&str>,
) -> Resolution {
    if let Some(code) = explicit_code.and_then(|c| parse_item_code(c).ok()) {
        return Resolution::Code(code);
    }

    match search_text.map(str::trim) {
        Some(text) if !text.is_empty() => {
            let candidates = search_candidates(rows, text);
            if candidates.is_empty() {
                Resolution::NoMatch
            } else {
                Resolution::Candidates(candidates)
            }
        }
        _ => Resolution::Unfiltered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn row(code: u64, description: &str) -> InventoryRow {
        let saved_at = NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        InventoryRow {
            code,
            description: description.to_string(),
            quantity: 1.0,
            address: None,
            saved_at,
            saved_date: saved_at.date(),
            extra: BTreeMap::new(),
        }
    }

    fn hardware() -> Vec<InventoryRow> {
        vec![
            row(1000001, "Parafuso M6"),
            row(1000002, "PARAFUSO M8"),
            row(1000003, "Arruela"),
            row(1000001, "Parafuso M6"),
        ]
    }

    #[test]
    fn search_is_case_insensitive_sorted_and_deduplicated() {
        let candidates = search_candidates(&hardware(), "parafuso");
        let labels: Vec<&str> = candidates.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "PARAFUSO M8 (Código: 1000002)",
                "Parafuso M6 (Código: 1000001)"
            ]
        );
    }

    #[test]
    fn dedup_keeps_first_description_per_code() {
        let rows = vec![row(7, "Porca B"), row(7, "Porca A"), row(8, "Porca C")];
        let candidates = search_candidates(&rows, "porca");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].description, "Porca A");
        assert_eq!(candidates[1].code, 8);
    }

    #[test]
    fn explicit_code_wins_over_search_text() {
        let resolution = resolve(&hardware(), Some("1000003"), Some("parafuso"));
        assert_eq!(resolution, Resolution::Code(1000003));
    }

    #[test]
    fn invalid_explicit_code_falls_back_to_search() {
        let resolution = resolve(&hardware(), Some("12a"), Some("arruela"));
        assert_eq!(
            resolution,
            Resolution::Candidates(vec![Candidate::new(1000003, "Arruela")])
        );
    }

    #[test]
    fn no_input_is_unfiltered_and_no_hits_is_no_match() {
        assert_eq!(resolve(&hardware(), None, None), Resolution::Unfiltered);
        assert_eq!(resolve(&hardware(), Some(""), Some("  ")), Resolution::Unfiltered);
        assert_eq!(resolve(&hardware(), None, Some("porca")), Resolution::NoMatch);
    }

    #[test]
    fn labels_round_trip_to_codes() {
        for (description, code) in [
            ("Parafuso M6", 1000001u64),
            ("Cabo (rolo 100m)", 42),
            ("Item (Código: 9)", 10),
            ("", 0),
        ] {
            let label = candidate_label(description, code);
            assert_eq!(parse_candidate_label(&label).unwrap(), code);
        }
    }

    #[test]
    fn decimal_code_rendering_is_truncated() {
        assert_eq!(parse_candidate_label("Arruela (Código: 1000003.0)").unwrap(), 1000003);
    }

    #[test]
    fn unparseable_label_is_a_parse_error() {
        assert!(matches!(
            parse_candidate_label("Arruela"),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            parse_candidate_label("Arruela (Código: abc)"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn select_from_candidates() {
        let resolution = resolve(&hardware(), None, Some("m8"));
        assert_eq!(
            resolution.select("PARAFUSO M8 (Código: 1000002)").unwrap(),
            Some(1000002)
        );
        assert_eq!(resolution.select("").unwrap(), None);
        assert!(resolution.select("garbage").is_err());
        assert_eq!(Resolution::Unfiltered.select("x").unwrap(), None);
    }

    #[test]
    fn item_code_validation() {
        assert_eq!(parse_item_code(" 1000001 ").unwrap(), 1000001);
        assert!(matches!(parse_item_code("-1"), Err(Error::Parse(_))));
        assert!(matches!(parse_item_code("10.5"), Err(Error::Parse(_))));
        assert!(matches!(parse_item_code(""), Err(Error::Parse(_))));
    }
}
