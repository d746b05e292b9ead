//! Forwarding of authorised invoices to the external invoicing system.
//!
//! [`InvoiceSink`] POSTs the invoice as JSON to `INVOICE_SINK_URL`. A 2xx
//! answer means the invoice was accepted; an optional `reference` field in the
//! response body is stored as the invoice's `external_ref`. No retries: a
//! failed forward leaves the invoice as a local draft for the caller to retry.

use std::time::Duration;

use serde::Deserialize;
use studyroom_db::models::invoice::Invoice;

/// HTTP request timeout for a single forward.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// `INVOICE_SINK_URL` is not set.
    #[error("Invoice sink is not configured")]
    NotConfigured,

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Invoice sink returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// InvoiceSink
// ---------------------------------------------------------------------------

/// What the sink told us about an accepted invoice.
#[derive(Debug, Default, Deserialize)]
pub struct SinkReceipt {
    pub reference: Option<String>,
}

pub struct InvoiceSink {
    client: reqwest::Client,
    url: Option<String>,
}

impl InvoiceSink {
    pub fn new(url: Option<String>) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, url })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Forward one invoice. Returns the sink's receipt on a 2xx response.
    pub async fn submit(&self, invoice: &Invoice) -> Result<SinkReceipt, SinkError> {
        let url = self.url.as_deref().ok_or(SinkError::NotConfigured)?;

        let response = self.client.post(url).json(invoice).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                invoice_id = invoice.id,
                status = status.as_u16(),
                "Invoice sink rejected invoice"
            );
            return Err(SinkError::HttpStatus(status.as_u16()));
        }

        // An empty or non-JSON body is still an acceptance.
        let receipt = response.json::<SinkReceipt>().await.unwrap_or_default();
        tracing::info!(
            invoice_id = invoice.id,
            reference = ?receipt.reference,
            "Invoice forwarded to sink"
        );
        Ok(receipt)
    }
}
