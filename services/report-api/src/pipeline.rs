//! Report processing pipeline
//!
//! Sequences document extraction, field extraction and forwarding for one
//! request. The uploaded bytes live only in request scope and are dropped on
//! every exit path.

use hydroreport_models::Page;
use hydroreport_utils::{AppConfig, ReportError, ReportResult};
use tracing::{error, info};
use uuid::Uuid;

use crate::extraction;
use crate::forward_client::ForwardClient;
use crate::pdf_source::PdfSource;

/// Successful end-to-end result for one request.
#[derive(Debug)]
pub struct ProcessReport {
    pub record: hydroreport_models::ReportRecord,
    pub forward_response: String,
}

pub struct Pipeline {
    source: PdfSource,
    client: ForwardClient,
}

impl Pipeline {
    pub fn from_config(config: &AppConfig) -> ReportResult<Self> {
        Ok(Self {
            source: PdfSource::new(),
            client: ForwardClient::from_config(&config.forwarding)?,
        })
    }

    #[cfg(test)]
    pub fn with_client(client: ForwardClient) -> Self {
        Self {
            source: PdfSource::new(),
            client,
        }
    }

    /// Process one uploaded document end to end.
    pub async fn process(&self, pdf_bytes: &[u8], request_id: Uuid) -> ReportResult<ProcessReport> {
        let pages = self.source.extract_pages(pdf_bytes)?;
        self.process_pages(pages, request_id).await
    }

    async fn process_pages(&self, pages: Vec<Page>, request_id: Uuid) -> ReportResult<ProcessReport> {
        let record = extraction::extract(&pages).map_err(|e| {
            error!(%request_id, reason = %e, "extraction failed");
            ReportError::extraction(e.to_string())
        })?;

        info!(
            %request_id,
            date = %record.report_date,
            total_energy = %record.total_energy_production,
            "report extracted"
        );

        // The client bounds its own retry loop with the overall deadline; a
        // stalled collector cannot hold the request open indefinitely.
        let forward_response = self.client.forward(&record).await?;

        info!(%request_id, "report forwarded to collector");

        Ok(ProcessReport {
            record,
            forward_response,
        })
    }
}
