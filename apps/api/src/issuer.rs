//! Local invoice issuer.
//!
//! Stands in for a PAC (authorized stamping provider): every stamp gets
//! a fresh CFDI UUID and a sequential folio in the configured series.
//! Real stamping would live behind the same [`InvoiceIssuer`] trait.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

use verde_db::{InvoiceIssuer, IssuanceError, IssueRequest, IssuedInvoice};

/// Issues folios of the form `SERIES-000001`, `SERIES-000002`, ...
pub struct FolioIssuer {
    series: String,
    next: AtomicU64,
}

impl FolioIssuer {
    /// Creates an issuer whose first folio number is `issued_so_far + 1`,
    /// so numbering continues across restarts.
    pub fn new(series: impl Into<String>, issued_so_far: u64) -> Self {
        FolioIssuer {
            series: series.into(),
            next: AtomicU64::new(issued_so_far),
        }
    }
}

#[async_trait]
impl InvoiceIssuer for FolioIssuer {
    async fn issue(&self, request: &IssueRequest) -> Result<IssuedInvoice, IssuanceError> {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let folio = format!("{}-{:06}", self.series, n);
        debug!(
            %folio,
            period = %request.period,
            total = %request.total,
            "Stamping global invoice"
        );
        Ok(IssuedInvoice {
            cfdi_uuid: Uuid::new_v4().to_string(),
            folio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verde_core::{Money, Period};

    #[tokio::test]
    async fn test_sequential_folios() {
        let issuer = FolioIssuer::new("GLOBAL", 2);
        let request = IssueRequest {
            period: Period::parse("2025-01-01", "2025-01-31").unwrap(),
            sale_count: 1,
            total: Money::from_cents(11600),
            tax: Money::from_cents(1600),
        };

        let first = issuer.issue(&request).await.unwrap();
        let second = issuer.issue(&request).await.unwrap();
        assert_eq!(first.folio, "GLOBAL-000003");
        assert_eq!(second.folio, "GLOBAL-000004");
        assert_ne!(first.cfdi_uuid, second.cfdi_uuid);
    }
}
