//! PDF page source
//!
//! Converts a raw PDF byte stream into an ordered page sequence exposing
//! both raw text lines and tables reconstructed from the text layout.

use hydroreport_models::{Page, Table};
use hydroreport_utils::ReportError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Runs of two or more whitespace characters separate table cells in the
/// plain-text rendering of the source reports.
static CELL_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

pub struct PdfSource;

impl PdfSource {
    pub fn new() -> Self {
        Self
    }

    /// Extract the ordered page sequence from PDF bytes.
    ///
    /// A document that cannot be decoded at all is fatal to the request and
    /// never retried.
    pub fn extract_pages(&self, data: &[u8]) -> Result<Vec<Page>, ReportError> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| ReportError::document_unreadable(e.to_string()))?;

        // pdf-extract emits form feeds between pages when the source marks
        // them; otherwise the whole document counts as one page. The
        // extraction rules scan all pages in order, so the split only
        // matters for observability.
        let pages: Vec<Page> = text.split('\u{c}').map(page_from_text).collect();

        debug!(page_count = pages.len(), "pdf text extracted");
        Ok(pages)
    }
}

impl Default for PdfSource {
    fn default() -> Self {
        Self::new()
    }
}

fn page_from_text(text: &str) -> Page {
    let lines: Vec<String> = text.lines().map(str::to_string).collect();

    // Reconstruct tabular structure from the text layout: any line that
    // splits into two or more cells is treated as a table row. Ragged rows
    // are expected; the extraction rules tolerate them.
    let rows: Vec<Vec<String>> = lines
        .iter()
        .filter_map(|line| {
            let cells: Vec<String> = CELL_SPLIT_RE
                .split(line.trim())
                .map(str::to_string)
                .collect();
            (cells.len() >= 2).then_some(cells)
        })
        .collect();

    let tables = if rows.is_empty() {
        Vec::new()
    } else {
        vec![Table { rows }]
    };

    Page { lines, tables }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_from_text_detects_rows() {
        let text = "Кунлик маълумот 8.01.2026 й.\n\
                    «Ўзбекгидроэнерго» АЖ бўйича  2065.6  81.03  85.2\n\
                    Чорвоқ ГЭС  620.5  10.2  12.1";
        let page = page_from_text(text);

        assert_eq!(page.lines.len(), 3);
        assert_eq!(page.tables.len(), 1);
        assert_eq!(page.tables[0].rows.len(), 2);
        assert_eq!(page.tables[0].rows[0][0], "«Ўзбекгидроэнерго» АЖ бўйича");
        assert_eq!(page.tables[0].rows[0][2], "81.03");
    }

    #[test]
    fn test_page_without_tables() {
        let page = page_from_text("a single line of prose");
        assert!(page.tables.is_empty());
        assert_eq!(page.lines.len(), 1);
    }

    #[test]
    fn test_unreadable_document() {
        let source = PdfSource::new();
        let err = source.extract_pages(b"not a pdf").unwrap_err();
        assert_eq!(err.http_status_code(), 400);
    }
}
