//! Domain models for hydropower report data.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One page of a source document: raw text lines plus any detected tables.
///
/// Pages are produced once by the document extractor and owned by the
/// extraction pipeline for the lifetime of a single request.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub lines: Vec<String>,
    pub tables: Vec<Table>,
}

/// A detected tabular structure.
///
/// Rows may be ragged: no invariant holds on column count across rows, and
/// cells may be empty strings where the source layout had gaps.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// The validated facts extracted from one report document.
///
/// Immutable once constructed; exists only for the lifetime of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub report_date: NaiveDate,
    pub total_energy_production: Decimal,
}

impl ReportRecord {
    /// Build a record, enforcing the non-negative energy invariant.
    pub fn new(report_date: NaiveDate, total_energy_production: Decimal) -> Option<Self> {
        if total_energy_production.is_sign_negative() {
            return None;
        }
        Some(Self {
            report_date,
            total_energy_production,
        })
    }
}

/// Wire payload sent to the external collector.
///
/// Exactly two keys: `date` (ISO-8601 `YYYY-MM-DD`) and
/// `total_energy_production` (decimal number).
#[derive(Debug, Clone, Serialize)]
pub struct ForwardPayload {
    pub date: NaiveDate,
    pub total_energy_production: Decimal,
}

impl From<&ReportRecord> for ForwardPayload {
    fn from(record: &ReportRecord) -> Self {
        Self {
            date: record.report_date,
            total_energy_production: record.total_energy_production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_rejects_negative_energy() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        assert!(ReportRecord::new(date, dec!(-0.01)).is_none());
        assert!(ReportRecord::new(date, dec!(0)).is_some());
        assert!(ReportRecord::new(date, dec!(81.03)).is_some());
    }

    #[test]
    fn test_payload_wire_shape() {
        let record = ReportRecord::new(
            NaiveDate::from_ymd_opt(2026, 1, 8).unwrap(),
            dec!(81.03),
        )
        .unwrap();
        let payload = ForwardPayload::from(&record);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "date": "2026-01-08",
                "total_energy_production": 81.03
            })
        );
    }

    #[test]
    fn test_payload_has_exactly_two_keys() {
        let record = ReportRecord::new(
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
            dec!(74.5),
        )
        .unwrap();
        let json = serde_json::to_value(ForwardPayload::from(&record)).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
