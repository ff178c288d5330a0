//! Field Extraction Engine
//!
//! Two independent extraction rules over the ordered page sequence: a date
//! rule scanning text lines and an aggregate-energy rule scanning table rows.
//! Both are pure functions of their input; either failing fails the whole
//! extraction (no partial record is ever returned).

use chrono::NaiveDate;
use hydroreport_models::{Page, ReportRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Report date statement, e.g. "8.01.2026 й." (one- or two-digit day).
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{2})\.(\d{4})\s*й\.").unwrap());

/// Tokens identifying the national aggregate row («Ўзбекгидроэнерго» АЖ бўйича).
/// Matched individually because the label wraps differently across layouts.
const ORG_ROW_KEYWORDS: [&str; 3] = ["Ўзбекгидроэнерго", "АЖ", "бўйича"];

/// The total-production figure sits two columns right of the label cell
/// (name, installed capacity, daily energy).
const ENERGY_COLUMN_OFFSET: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Date not found in PDF")]
    DateNotFound,

    #[error("Aggregate energy row not found in PDF tables")]
    EnergyFieldNotFound,

    #[error("Malformed value in {field}: {value}")]
    MalformedNumericValue { field: String, value: String },
}

impl ExtractionError {
    fn malformed(field: &str, value: impl Into<String>) -> Self {
        Self::MalformedNumericValue {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Run both extraction rules against the full page sequence.
///
/// The rules target disjoint data, so the order of application cannot change
/// the outcome; the date rule is checked first and the first failure wins.
pub fn extract(pages: &[Page]) -> Result<ReportRecord, ExtractionError> {
    let report_date = extract_date(pages)?;
    let total_energy = extract_total_energy(pages)?;

    ReportRecord::new(report_date, total_energy).ok_or_else(|| {
        ExtractionError::malformed("total_energy_production", total_energy.to_string())
    })
}

/// Date rule: first text line (document order) matching the date pattern.
///
/// Exactly one date statement is assumed authoritative; if a corrupted
/// document carries several, the first occurrence wins.
fn extract_date(pages: &[Page]) -> Result<NaiveDate, ExtractionError> {
    for page in pages {
        for line in &page.lines {
            if let Some(caps) = DATE_RE.captures(line) {
                let day: u32 = caps[1]
                    .parse()
                    .map_err(|_| ExtractionError::malformed("report_date", &caps[0]))?;
                let month: u32 = caps[2]
                    .parse()
                    .map_err(|_| ExtractionError::malformed("report_date", &caps[0]))?;
                let year: i32 = caps[3]
                    .parse()
                    .map_err(|_| ExtractionError::malformed("report_date", &caps[0]))?;

                let date = NaiveDate::from_ymd_opt(year, month, day)
                    .ok_or_else(|| ExtractionError::malformed("report_date", &caps[0]))?;

                debug!(date = %date, "date pattern matched");
                return Ok(date);
            }
        }
    }

    Err(ExtractionError::DateNotFound)
}

/// Aggregate-energy rule: first table row (page and row order) whose label
/// cell carries the organization phrase; the figure is read from a fixed
/// column offset and parsed locale-tolerantly.
fn extract_total_energy(pages: &[Page]) -> Result<Decimal, ExtractionError> {
    for page in pages {
        for table in &page.tables {
            for row in &table.rows {
                let Some(label_idx) = org_label_position(row) else {
                    continue;
                };

                debug!(label_idx, row_len = row.len(), "aggregate row found");

                let target_idx = label_idx + ENERGY_COLUMN_OFFSET;
                let cell = row.get(target_idx).ok_or_else(|| {
                    ExtractionError::malformed("total_energy_production", "<missing cell>")
                })?;

                return parse_decimal(cell).ok_or_else(|| {
                    ExtractionError::malformed("total_energy_production", cell.clone())
                });
            }
        }
    }

    Err(ExtractionError::EnergyFieldNotFound)
}

/// Position of the cell holding the organization label, if this row is the
/// aggregate row. Comparison is case-sensitive Cyrillic, tolerant of
/// whitespace variants and surrounding quotation marks.
fn org_label_position(row: &[String]) -> Option<usize> {
    row.iter().position(|cell| {
        let text = strip_quote_chars(&normalize_whitespace(cell));
        ORG_ROW_KEYWORDS.iter().all(|kw| text.contains(kw))
    })
}

/// Collapse whitespace runs (incl. newlines and non-breaking-space variants)
/// into single spaces and trim.
fn normalize_whitespace(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '\u{a0}' | '\u{2007}' | '\u{202f}' => ' ',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_quote_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                c,
                '«' | '»' | '"' | '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' | '\''
            )
        })
        .collect()
}

/// Parse a table cell as a decimal, accepting both `.` and `,` as the decimal
/// separator and stripping space-based thousands separators.
fn parse_decimal(raw: &str) -> Option<Decimal> {
    let normalized = normalize_whitespace(raw);
    if normalized.is_empty() || normalized == "-" || normalized == "—" {
        return None;
    }

    let mut cleaned = normalized.replace(' ', "").replace(',', ".");
    cleaned.retain(|c| c.is_ascii_digit() || c == '.' || c == '-');
    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydroreport_models::Table;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    const ORG_LABEL: &str = "\u{ab}Ўзбекгидроэнерго\u{bb} АЖ бўйича";

    fn page_with_lines(lines: &[&str]) -> Page {
        Page {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            tables: Vec::new(),
        }
    }

    fn page_with_row(cells: &[&str]) -> Page {
        Page {
            lines: Vec::new(),
            tables: vec![Table {
                rows: vec![cells.iter().map(|s| s.to_string()).collect()],
            }],
        }
    }

    fn well_formed_pages(energy_cell: &str) -> Vec<Page> {
        vec![
            page_with_lines(&["Кунлик маълумот 8.01.2026 й. ҳолатига"]),
            page_with_row(&[ORG_LABEL, "2065.6", energy_cell, "85.2"]),
        ]
    }

    #[test]
    fn test_date_single_digit_day() {
        let pages = vec![page_with_lines(&["8.01.2026 й."])];
        let date = extract_date(&pages).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 8).unwrap());
    }

    #[test]
    fn test_date_two_digit_day() {
        let pages = vec![page_with_lines(&["28.02.2026 й."])];
        let date = extract_date(&pages).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn test_date_embedded_in_line() {
        let pages = vec![page_with_lines(&[
            "ГЭС ҳисоботи",
            "Маълумот 15.06.2025 й. ҳолатига",
        ])];
        let date = extract_date(&pages).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
    }

    #[test]
    fn test_date_first_match_wins() {
        let pages = vec![page_with_lines(&["8.01.2026 й.", "9.01.2026 й."])];
        let date = extract_date(&pages).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 8).unwrap());
    }

    #[test]
    fn test_date_not_found() {
        let pages = vec![page_with_lines(&["no date here", "8.01.2026"])];
        assert_eq!(extract_date(&pages), Err(ExtractionError::DateNotFound));
    }

    #[test]
    fn test_date_requires_marker_token() {
        // Same digits without the "й." marker must not match.
        let pages = vec![page_with_lines(&["8.01.2026 report"])];
        assert_eq!(extract_date(&pages), Err(ExtractionError::DateNotFound));
    }

    #[test]
    fn test_invalid_calendar_date_is_malformed() {
        let pages = vec![page_with_lines(&["31.02.2026 й."])];
        assert!(matches!(
            extract_date(&pages),
            Err(ExtractionError::MalformedNumericValue { ref field, .. }) if field == "report_date"
        ));
    }

    #[test]
    fn test_energy_dot_separator() {
        let pages = vec![page_with_row(&[ORG_LABEL, "2065.6", "81.03"])];
        assert_eq!(extract_total_energy(&pages).unwrap(), dec!(81.03));
    }

    #[test]
    fn test_energy_comma_separator() {
        let pages = vec![page_with_row(&[ORG_LABEL, "2065,6", "81,03"])];
        assert_eq!(extract_total_energy(&pages).unwrap(), dec!(81.03));
    }

    #[test]
    fn test_energy_row_with_wrapped_label() {
        // pdf layouts often wrap the label across lines inside one cell
        let pages = vec![page_with_row(&[
            "\u{ab}Ўзбекгидроэнерго\u{bb}\nАЖ бўйича",
            "2065.6",
            "81.03",
        ])];
        assert_eq!(extract_total_energy(&pages).unwrap(), dec!(81.03));
    }

    #[test]
    fn test_energy_row_with_nbsp_and_quote_variants() {
        let pages = vec![page_with_row(&[
            "\u{201e}Ўзбекгидроэнерго\u{201c}\u{a0}АЖ\u{a0}бўйича",
            "2065.6",
            "81.03",
        ])];
        assert_eq!(extract_total_energy(&pages).unwrap(), dec!(81.03));
    }

    #[test]
    fn test_energy_field_not_found() {
        let pages = vec![page_with_row(&["Чорвоқ ГЭС", "620.5", "10.2"])];
        assert_eq!(
            extract_total_energy(&pages),
            Err(ExtractionError::EnergyFieldNotFound)
        );
    }

    #[test]
    fn test_energy_malformed_cell() {
        let pages = vec![page_with_row(&[ORG_LABEL, "2065.6", "n/a"])];
        assert!(matches!(
            extract_total_energy(&pages),
            Err(ExtractionError::MalformedNumericValue { ref field, .. })
                if field == "total_energy_production"
        ));
    }

    #[test]
    fn test_energy_ragged_row_missing_target_cell() {
        let pages = vec![page_with_row(&[ORG_LABEL, "2065.6"])];
        assert!(matches!(
            extract_total_energy(&pages),
            Err(ExtractionError::MalformedNumericValue { .. })
        ));
    }

    #[test]
    fn test_energy_first_matching_row_wins() {
        let pages = vec![
            page_with_row(&[ORG_LABEL, "2065.6", "81.03"]),
            page_with_row(&[ORG_LABEL, "2065.6", "99.99"]),
        ];
        assert_eq!(extract_total_energy(&pages).unwrap(), dec!(81.03));
    }

    #[test]
    fn test_extract_success() {
        let record = extract(&well_formed_pages("81.03")).unwrap();
        assert_eq!(
            record.report_date,
            NaiveDate::from_ymd_opt(2026, 1, 8).unwrap()
        );
        assert_eq!(record.total_energy_production, dec!(81.03));
    }

    #[test]
    fn test_extract_date_failure_wins_first() {
        let pages = vec![page_with_row(&[ORG_LABEL, "2065.6", "81.03"])];
        assert_eq!(extract(&pages), Err(ExtractionError::DateNotFound));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let pages = well_formed_pages("81,03");
        assert_eq!(extract(&pages), extract(&pages));
    }

    #[test]
    fn test_parse_decimal_thousands_separator() {
        assert_eq!(parse_decimal("1 234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal("1\u{a0}234.56"), Some(dec!(1234.56)));
    }

    #[test]
    fn test_parse_decimal_placeholders() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("-"), None);
        assert_eq!(parse_decimal("—"), None);
    }

    proptest! {
        #[test]
        fn prop_date_rule_recovers_any_valid_date(
            day in 1u32..=28,
            month in 1u32..=12,
            year in 1990i32..=2100,
        ) {
            let line = format!("{}.{:02}.{} й.", day, month, year);
            let pages = vec![page_with_lines(&[line.as_str()])];
            let extracted = extract_date(&pages).unwrap();
            prop_assert_eq!(extracted, NaiveDate::from_ymd_opt(year, month, day).unwrap());
        }

        #[test]
        fn prop_decimal_separator_equivalence(int in 0u32..=100_000, frac in 0u32..=99) {
            let with_dot = format!("{}.{:02}", int, frac);
            let with_comma = format!("{},{:02}", int, frac);
            prop_assert_eq!(parse_decimal(&with_dot), parse_decimal(&with_comma));
            prop_assert!(parse_decimal(&with_dot).is_some());
        }
    }
}
