//! # Invoice Batch Coordinator
//!
//! Sweeps uninvoiced sales in a date range into one consolidated global
//! invoice (factura global). The coordinator is a workflow over two
//! tables rather than a table gateway, so it lives outside the
//! repository module.
//!
//! ## Commit Protocol
//! ```text
//! 1. BEGIN
//! 2. SELECT uninvoiced sales in the period
//! 3. call the issuer (stamping)           ← failure here rolls back
//! 4. INSERT global_invoices row
//! 5. per sale: UPDATE ... WHERE invoiced = 0  (guarded flip)
//! 6. COMMIT only if every flip affected a row
//! ```
//! The guarded flip makes concurrent commits over overlapping periods
//! safe: whichever transaction loses the race sees a row it selected
//! already flipped, aborts with [`BatchError::ConcurrencyConflict`], and
//! leaves the database untouched.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use verde_core::{
    aggregate, GlobalInvoiceBatch, Money, PaymentMethod, Period, Sale, SaleRecord, SalesReport,
    IVA_RATE_BPS,
};

const SALE_COLUMNS: &str = "id, client_id, sold_at, total_cents, payment_method, invoiced, global_invoice_id, notes, created_at, updated_at";

// =============================================================================
// Issuer Seam
// =============================================================================

/// What the issuer needs to stamp a global invoice.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub period: Period,
    pub sale_count: usize,
    /// IVA-inclusive grand total.
    pub total: Money,
    /// IVA portion extracted from the total.
    pub tax: Money,
}

/// What a successful stamping returns.
#[derive(Debug, Clone)]
pub struct IssuedInvoice {
    pub cfdi_uuid: String,
    pub folio: String,
}

/// Failure reported by the issuer; the commit transaction rolls back.
#[derive(Debug, thiserror::Error)]
#[error("invoice issuance failed: {0}")]
pub struct IssuanceError(pub String);

/// Stamps invoices with the tax authority (or a stand-in).
///
/// Called inside the commit transaction so an issuance failure leaves no
/// trace in the database.
#[async_trait]
pub trait InvoiceIssuer: Send + Sync {
    async fn issue(&self, request: &IssueRequest) -> Result<IssuedInvoice, IssuanceError>;
}

// =============================================================================
// Errors
// =============================================================================

/// Batch workflow failures.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// No uninvoiced sales in the period; nothing to invoice.
    #[error("no uninvoiced sales in {0}")]
    EmptyBatch(Period),

    /// The issuer refused or failed to stamp.
    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    /// Another commit claimed one of the selected sales first.
    #[error("a concurrent batch claimed one of the selected sales")]
    ConcurrencyConflict,

    /// Single-sale commit target does not exist.
    #[error("sale not found: {0}")]
    SaleNotFound(String),

    /// Single-sale commit target already belongs to a batch.
    #[error("sale {0} is already invoiced")]
    AlreadyInvoiced(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for BatchError {
    fn from(err: sqlx::Error) -> Self {
        BatchError::Db(DbError::from(err))
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Read-only dry run of a batch: what would be invoiced, with the full
/// sales report for the period.
#[derive(Debug, Clone)]
pub struct BatchPreview {
    pub period: Period,
    pub report: SalesReport,
    pub sale_ids: Vec<String>,
    pub total: Money,
    pub tax: Money,
}

/// Result of a committed batch.
#[derive(Debug, Clone)]
pub struct CommittedBatch {
    pub batch: GlobalInvoiceBatch,
    pub sale_ids: Vec<String>,
}

/// Coordinates global-invoice batches over sales.
#[derive(Debug, Clone)]
pub struct InvoiceBatchCoordinator {
    pool: SqlitePool,
}

impl InvoiceBatchCoordinator {
    /// Creates a new InvoiceBatchCoordinator.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceBatchCoordinator { pool }
    }

    /// Previews the batch a commit over `period` would produce. Never
    /// writes; safe to call repeatedly.
    pub async fn preview(&self, period: &Period) -> Result<BatchPreview, BatchError> {
        let sales = self.uninvoiced_in(&self.pool, period).await?;
        let records = self.with_items(&self.pool, sales).await?;
        Ok(Self::build_preview(*period, records))
    }

    fn build_preview(period: Period, records: Vec<SaleRecord>) -> BatchPreview {
        let report = aggregate(&records, &period);
        let sale_ids = records.iter().map(|r| r.sale.id.clone()).collect();
        let total = Money::from_cents(records.iter().map(|r| r.sale.total_cents).sum());
        let tax = total.extract_included_tax(IVA_RATE_BPS);
        BatchPreview {
            period,
            report,
            sale_ids,
            total,
            tax,
        }
    }

    /// Commits a batch over `period`: stamps via `issuer`, records the
    /// batch, and flips every covered sale to invoiced — all in one
    /// transaction. See the module docs for the protocol.
    pub async fn commit(
        &self,
        period: &Period,
        issuer: &dyn InvoiceIssuer,
    ) -> Result<CommittedBatch, BatchError> {
        let mut tx = self.pool.begin().await?;

        let sales = self.uninvoiced_in(&mut *tx, period).await?;
        if sales.is_empty() {
            return Err(BatchError::EmptyBatch(*period));
        }

        let committed = self.commit_sales(&mut tx, period, sales, issuer).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            batch = %committed.batch.id,
            folio = %committed.batch.folio,
            sales = committed.sale_ids.len(),
            total_cents = committed.batch.total_cents,
            "Global invoice batch committed"
        );
        Ok(committed)
    }

    /// Commits a single-day batch, the common end-of-day flow.
    pub async fn commit_day(
        &self,
        date: NaiveDate,
        issuer: &dyn InvoiceIssuer,
    ) -> Result<CommittedBatch, BatchError> {
        self.commit(&Period::single_day(date), issuer).await
    }

    /// Commits a batch containing exactly one sale, for a customer who
    /// asked for an invoice after the fact.
    pub async fn commit_sale(
        &self,
        sale_id: &str,
        issuer: &dyn InvoiceIssuer,
    ) -> Result<CommittedBatch, BatchError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale: Option<Sale> = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;
        let sale = sale.ok_or_else(|| BatchError::SaleNotFound(sale_id.to_string()))?;
        if sale.invoiced {
            return Err(BatchError::AlreadyInvoiced(sale_id.to_string()));
        }

        let period = Period::single_day(sale.sold_on());
        let committed = self.commit_sales(&mut tx, &period, vec![sale], issuer).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            batch = %committed.batch.id,
            sale = sale_id,
            "Single-sale global invoice committed"
        );
        Ok(committed)
    }

    /// Shared tail of every commit path. Runs inside the caller's
    /// transaction; dropping the transaction on error rolls everything
    /// back, issuance included.
    async fn commit_sales(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        period: &Period,
        sales: Vec<Sale>,
        issuer: &dyn InvoiceIssuer,
    ) -> Result<CommittedBatch, BatchError> {
        let total = Money::from_cents(sales.iter().map(|s| s.total_cents).sum());
        let tax = total.extract_included_tax(IVA_RATE_BPS);
        let by_method = |m: PaymentMethod| -> i64 {
            sales
                .iter()
                .filter(|s| s.payment_method == m)
                .map(|s| s.total_cents)
                .sum()
        };

        let request = IssueRequest {
            period: *period,
            sale_count: sales.len(),
            total,
            tax,
        };
        let issued = issuer.issue(&request).await?;

        let now = Utc::now();
        let batch = GlobalInvoiceBatch {
            id: Uuid::new_v4().to_string(),
            start_date: period.start(),
            end_date: period.end(),
            sale_count: sales.len() as i64,
            total_cents: total.cents(),
            tax_cents: tax.cents(),
            cash_cents: by_method(PaymentMethod::Cash),
            card_cents: by_method(PaymentMethod::Card),
            transfer_cents: by_method(PaymentMethod::Transfer),
            cfdi_uuid: issued.cfdi_uuid,
            folio: issued.folio,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO global_invoices (id, start_date, end_date, sale_count, total_cents,
                                         tax_cents, cash_cents, card_cents, transfer_cents,
                                         cfdi_uuid, folio, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&batch.id)
        .bind(batch.start_date)
        .bind(batch.end_date)
        .bind(batch.sale_count)
        .bind(batch.total_cents)
        .bind(batch.tax_cents)
        .bind(batch.cash_cents)
        .bind(batch.card_cents)
        .bind(batch.transfer_cents)
        .bind(&batch.cfdi_uuid)
        .bind(&batch.folio)
        .bind(batch.created_at)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        // Guarded flip: the WHERE invoiced = 0 clause detects a sale a
        // concurrent commit already claimed.
        let mut sale_ids = Vec::with_capacity(sales.len());
        for sale in &sales {
            let result = sqlx::query(
                r#"
                UPDATE sales
                SET invoiced = 1, global_invoice_id = ?2, updated_at = ?3
                WHERE id = ?1 AND invoiced = 0
                "#,
            )
            .bind(&sale.id)
            .bind(&batch.id)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(DbError::from)?;

            if result.rows_affected() != 1 {
                warn!(sale = %sale.id, "Sale claimed by a concurrent batch, aborting");
                return Err(BatchError::ConcurrencyConflict);
            }
            sale_ids.push(sale.id.clone());
        }

        Ok(CommittedBatch { batch, sale_ids })
    }

    /// All committed batches, newest first.
    pub async fn history(&self) -> DbResult<Vec<GlobalInvoiceBatch>> {
        let batches = sqlx::query_as::<_, GlobalInvoiceBatch>(
            r#"
            SELECT id, start_date, end_date, sale_count, total_cents, tax_cents,
                   cash_cents, card_cents, transfer_cents, cfdi_uuid, folio, created_at
            FROM global_invoices
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Every sale still waiting for a batch, oldest first.
    pub async fn pending(&self) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE invoiced = 0 ORDER BY sold_at"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql).fetch_all(&self.pool).await?;
        Ok(sales)
    }

    /// The sales a committed batch covers.
    pub async fn batch_sale_ids(&self, batch_id: &str) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM sales WHERE global_invoice_id = ?1 ORDER BY sold_at",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn uninvoiced_in<'e, E>(&self, executor: E, period: &Period) -> DbResult<Vec<Sale>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales
            WHERE invoiced = 0
              AND date(sold_at) >= ?1 AND date(sold_at) <= ?2
            ORDER BY sold_at
            "#
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(period.start())
            .bind(period.end())
            .fetch_all(executor)
            .await?;
        Ok(sales)
    }

    async fn with_items(
        &self,
        pool: &SqlitePool,
        sales: Vec<Sale>,
    ) -> DbResult<Vec<SaleRecord>> {
        let mut records = Vec::with_capacity(sales.len());
        for sale in sales {
            let items = sqlx::query_as::<_, verde_core::SaleItem>(
                r#"
                SELECT id, sale_id, product_id, name_snapshot, unit_price_cents, quantity, line_total_cents
                FROM sale_items
                WHERE sale_id = ?1
                ORDER BY rowid
                "#,
            )
            .bind(&sale.id)
            .fetch_all(pool)
            .await?;
            records.push(SaleRecord { sale, items });
        }
        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::sale::{NewSale, NewSaleItem};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Deterministic stand-in issuer.
    struct StubIssuer {
        counter: AtomicU64,
    }

    impl StubIssuer {
        fn new() -> Self {
            StubIssuer {
                counter: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl InvoiceIssuer for StubIssuer {
        async fn issue(&self, _request: &IssueRequest) -> Result<IssuedInvoice, IssuanceError> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedInvoice {
                cfdi_uuid: Uuid::new_v4().to_string(),
                folio: format!("TEST-{n:06}"),
            })
        }
    }

    struct FailingIssuer;

    #[async_trait]
    impl InvoiceIssuer for FailingIssuer {
        async fn issue(&self, _request: &IssueRequest) -> Result<IssuedInvoice, IssuanceError> {
            Err(IssuanceError("PAC rejected the request".to_string()))
        }
    }

    async fn seed_sale(db: &Database, date: (i32, u32, u32), cents: i64) -> String {
        let record = db
            .sales()
            .create(NewSale {
                client_id: None,
                sold_at: Some(
                    chrono::Utc
                        .with_ymd_and_hms(date.0, date.1, date.2, 10, 0, 0)
                        .unwrap(),
                ),
                payment_method: PaymentMethod::Cash,
                notes: None,
                items: vec![NewSaleItem {
                    product_id: "p".to_string(),
                    name: "Producto".to_string(),
                    unit_price_cents: cents,
                    quantity: 1,
                }],
            })
            .await
            .unwrap();
        record.sale.id
    }

    fn january() -> Period {
        Period::parse("2025-01-01", "2025-01-31").unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected_without_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = db.invoices();

        let err = coordinator.commit(&january(), &StubIssuer::new()).await.unwrap_err();
        assert!(matches!(err, BatchError::EmptyBatch(_)));
        assert!(coordinator.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preview_is_read_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = db.invoices();
        seed_sale(&db, (2025, 1, 10), 11600).await;

        let first = coordinator.preview(&january()).await.unwrap();
        let second = coordinator.preview(&january()).await.unwrap();
        assert_eq!(first.sale_ids, second.sale_ids);
        assert_eq!(first.total, Money::from_cents(11600));
        assert_eq!(first.tax, Money::from_cents(1600));
        assert_eq!(coordinator.pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_flips_sales_and_records_batch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = db.invoices();
        let a = seed_sale(&db, (2025, 1, 10), 11600).await;
        let b = seed_sale(&db, (2025, 1, 20), 23200).await;
        // Outside the period; must stay pending.
        seed_sale(&db, (2025, 2, 1), 5000).await;

        let committed = coordinator.commit(&january(), &StubIssuer::new()).await.unwrap();

        assert_eq!(committed.sale_ids, vec![a.clone(), b.clone()]);
        assert_eq!(committed.batch.sale_count, 2);
        assert_eq!(committed.batch.total_cents, 34800);
        assert_eq!(committed.batch.tax_cents, 4800);
        assert_eq!(committed.batch.cash_cents, 34800);
        assert_eq!(committed.batch.folio, "TEST-000001");

        let record = db.sales().get_record(&a).await.unwrap().unwrap();
        assert!(record.sale.invoiced);
        assert_eq!(record.sale.global_invoice_id.as_deref(), Some(committed.batch.id.as_str()));

        let pending = coordinator.pending().await.unwrap();
        assert_eq!(pending.len(), 1);

        let covered = coordinator.batch_sale_ids(&committed.batch.id).await.unwrap();
        assert_eq!(covered, vec![a, b]);
    }

    #[tokio::test]
    async fn test_issuance_failure_rolls_back_everything() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = db.invoices();
        let id = seed_sale(&db, (2025, 1, 10), 11600).await;

        let err = coordinator.commit(&january(), &FailingIssuer).await.unwrap_err();
        assert!(matches!(err, BatchError::Issuance(_)));

        let record = db.sales().get_record(&id).await.unwrap().unwrap();
        assert!(!record.sale.invoiced);
        assert!(record.sale.global_invoice_id.is_none());
        assert!(coordinator.history().await.unwrap().is_empty());
        assert_eq!(coordinator.pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sequential_commits_are_disjoint() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = db.invoices();
        let issuer = StubIssuer::new();
        seed_sale(&db, (2025, 1, 10), 10000).await;

        let first = coordinator.commit(&january(), &issuer).await.unwrap();
        assert_eq!(first.batch.sale_count, 1);

        // Same period again: the sale is claimed, so the batch is empty.
        let err = coordinator.commit(&january(), &issuer).await.unwrap_err();
        assert!(matches!(err, BatchError::EmptyBatch(_)));

        // New sale in an overlapping period lands in a second batch.
        seed_sale(&db, (2025, 1, 15), 5000).await;
        let second = coordinator.commit(&january(), &issuer).await.unwrap();
        assert_eq!(second.batch.sale_count, 1);
        assert!(first.sale_ids.iter().all(|id| !second.sale_ids.contains(id)));
        assert_eq!(coordinator.history().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_selection_aborts_with_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = db.invoices();
        let issuer = StubIssuer::new();
        let a = seed_sale(&db, (2025, 1, 10), 10000).await;
        let b = seed_sale(&db, (2025, 1, 11), 5000).await;

        // Snapshot the period the way an in-flight commit would.
        let stale = coordinator
            .uninvoiced_in(db.pool(), &january())
            .await
            .unwrap();
        assert_eq!(stale.len(), 2);

        // A competing commit claims the first sale before our flip runs.
        coordinator
            .commit_day(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(), &issuer)
            .await
            .unwrap();

        // Replaying the stale selection must hit the guarded flip and abort.
        let mut tx = db.pool().begin().await.unwrap();
        let err = coordinator
            .commit_sales(&mut tx, &january(), stale, &issuer)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::ConcurrencyConflict));
        drop(tx); // rollback

        // Only the winning batch exists; the unclaimed sale is untouched.
        assert_eq!(coordinator.history().await.unwrap().len(), 1);
        let winner = db.sales().get_record(&a).await.unwrap().unwrap();
        assert!(winner.sale.invoiced);
        let pending = coordinator.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b);
        assert!(pending[0].global_invoice_id.is_none());
    }

    #[tokio::test]
    async fn test_commit_single_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = db.invoices();
        let issuer = StubIssuer::new();
        let id = seed_sale(&db, (2025, 1, 10), 11600).await;

        let committed = coordinator.commit_sale(&id, &issuer).await.unwrap();
        assert_eq!(committed.sale_ids, vec![id.clone()]);
        assert_eq!(committed.batch.sale_count, 1);

        let err = coordinator.commit_sale(&id, &issuer).await.unwrap_err();
        assert!(matches!(err, BatchError::AlreadyInvoiced(_)));

        let err = coordinator.commit_sale("missing", &issuer).await.unwrap_err();
        assert!(matches!(err, BatchError::SaleNotFound(_)));
    }

    #[tokio::test]
    async fn test_commit_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = db.invoices();
        seed_sale(&db, (2025, 1, 10), 10000).await;
        seed_sale(&db, (2025, 1, 11), 5000).await;

        let committed = coordinator
            .commit_day(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(), &StubIssuer::new())
            .await
            .unwrap();
        assert_eq!(committed.batch.sale_count, 1);
        assert_eq!(coordinator.pending().await.unwrap().len(), 1);
    }
}
