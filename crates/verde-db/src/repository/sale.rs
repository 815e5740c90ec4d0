//! # Sale Repository
//!
//! Database operations for sales and their line items.
//!
//! ## Sale Lifecycle
//! ```text
//! 1. CREATE      create() → sale + items in one transaction,
//!                total derived from the items (invariant by construction)
//! 2. REPORT      records_in_period() feeds the pure aggregator
//! 3. INVOICE     the batch coordinator flips `invoiced` (crate::invoice)
//! 4. DELETE      only while invoiced = 0; invoiced sales are immutable
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use verde_core::validation::{validate_price_cents, validate_quantity};
use verde_core::{PaymentMethod, Period, Sale, SaleItem, SaleRecord};

const SALE_COLUMNS: &str = "id, client_id, sold_at, total_cents, payment_method, invoiced, global_invoice_id, notes, created_at, updated_at";

// =============================================================================
// Inputs
// =============================================================================

/// A line item at creation time; the price is snapshotted from the
/// catalog by the caller.
#[derive(Debug, Clone)]
pub struct NewSaleItem {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

/// Input for recording a sale. The total is always derived from the
/// items, so the stored-total invariant holds by construction.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub client_id: Option<String>,
    /// Defaults to now when absent.
    pub sold_at: Option<DateTime<Utc>>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub items: Vec<NewSaleItem>,
}

/// Filters for the paginated sale listing.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub min_cents: Option<i64>,
    pub max_cents: Option<i64>,
}

/// Quick stats over a date range, computed in SQL.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SaleStats {
    pub total_sales: i64,
    pub total_cents: i64,
    pub average_cents: i64,
    pub max_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale with its line items in one transaction.
    pub async fn create(&self, input: NewSale) -> DbResult<SaleRecord> {
        if input.items.is_empty() {
            return Err(DbError::Conflict(
                "a sale needs at least one line item".to_string(),
            ));
        }
        for item in &input.items {
            validate_quantity(item.quantity).map_err(DbError::InvalidInput)?;
            validate_price_cents(item.unit_price_cents).map_err(DbError::InvalidInput)?;
        }

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let sold_at = input.sold_at.unwrap_or(now);

        let items: Vec<SaleItem> = input
            .items
            .into_iter()
            .map(|i| SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: i.product_id,
                name_snapshot: i.name,
                line_total_cents: i.unit_price_cents * i.quantity,
                unit_price_cents: i.unit_price_cents,
                quantity: i.quantity,
            })
            .collect();
        let total_cents: i64 = items.iter().map(|i| i.line_total_cents).sum();

        let sale = Sale {
            id: sale_id.clone(),
            client_id: input.client_id,
            sold_at,
            total_cents,
            payment_method: input.payment_method,
            invoiced: false,
            global_invoice_id: None,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %sale.id, total_cents, items = items.len(), "Recording sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (id, client_id, sold_at, total_cents, payment_method,
                               invoiced, global_invoice_id, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.client_id)
        .bind(sale.sold_at)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.invoiced)
        .bind(&sale.global_invoice_id)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (id, sale_id, product_id, name_snapshot,
                                        unit_price_cents, quantity, line_total_cents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(SaleRecord { sale, items })
    }

    /// Gets a sale with its items.
    pub async fn get_record(&self, id: &str) -> DbResult<Option<SaleRecord>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(sale) = sale else { return Ok(None) };
        let items = self.items_for(&sale.id).await?;
        Ok(Some(SaleRecord { sale, items }))
    }

    /// Line items of one sale, in insertion order.
    pub async fn items_for(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, name_snapshot, unit_price_cents, quantity, line_total_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Paginated, filtered listing — newest first. `page` is 1-based.
    pub async fn list(&self, filter: &SaleFilter, page: i64, per_page: i64) -> DbResult<Vec<Sale>> {
        let per_page = per_page.clamp(1, 100);
        let offset = (page.max(1) - 1) * per_page;

        let mut qb = self.filtered(SALE_COLUMNS, filter);
        qb.push(" ORDER BY sold_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    /// Number of sales matching a filter (for pagination totals).
    pub async fn count(&self, filter: &SaleFilter) -> DbResult<i64> {
        let mut qb = self.filtered("COUNT(*)", filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    fn filtered<'a>(&self, projection: &str, filter: &'a SaleFilter) -> QueryBuilder<'a, Sqlite> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {projection} FROM sales WHERE 1 = 1"));
        if let Some(start) = filter.start {
            qb.push(" AND date(sold_at) >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            qb.push(" AND date(sold_at) <= ").push_bind(end);
        }
        if let Some(min) = filter.min_cents {
            qb.push(" AND total_cents >= ").push_bind(min);
        }
        if let Some(max) = filter.max_cents {
            qb.push(" AND total_cents <= ").push_bind(max);
        }
        qb
    }

    /// All sale records in a period (date-only bounds, inclusive),
    /// oldest first — the aggregator's input.
    pub async fn records_in_period(&self, period: &Period) -> DbResult<Vec<SaleRecord>> {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales
            WHERE date(sold_at) >= ?1 AND date(sold_at) <= ?2
            ORDER BY sold_at
            "#
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(period.start())
            .bind(period.end())
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(sales.len());
        for sale in sales {
            let items = self.items_for(&sale.id).await?;
            records.push(SaleRecord { sale, items });
        }
        Ok(records)
    }

    /// Aggregate stats over an optional date range, computed in SQL.
    pub async fn stats(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> DbResult<SaleStats> {
        let filter = SaleFilter {
            start,
            end,
            ..SaleFilter::default()
        };
        let mut qb = self.filtered(
            "COUNT(*) AS total_sales, \
             COALESCE(SUM(total_cents), 0) AS total_cents, \
             COALESCE(CAST(ROUND(AVG(total_cents)) AS INTEGER), 0) AS average_cents, \
             COALESCE(MAX(total_cents), 0) AS max_cents",
            &filter,
        );
        let stats = qb
            .build_query_as::<SaleStats>()
            .fetch_one(&self.pool)
            .await?;
        Ok(stats)
    }

    /// Deletes a sale. Allowed only before invoicing; once `invoiced` is
    /// set the sale is frozen into its batch.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?1 AND invoiced = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Distinguish "missing" from "frozen".
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM sales WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            return match exists {
                Some(_) => Err(DbError::Conflict(format!(
                    "sale {id} is invoiced and cannot be deleted"
                ))),
                None => Err(DbError::not_found("Sale", id)),
            };
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;

    pub(crate) fn new_sale(
        date: (i32, u32, u32),
        method: PaymentMethod,
        items: Vec<(i64, i64)>, // (quantity, unit_price_cents)
    ) -> NewSale {
        NewSale {
            client_id: None,
            sold_at: Some(
                Utc.with_ymd_and_hms(date.0, date.1, date.2, 12, 0, 0)
                    .unwrap(),
            ),
            payment_method: method,
            notes: None,
            items: items
                .into_iter()
                .enumerate()
                .map(|(n, (quantity, unit_price_cents))| NewSaleItem {
                    product_id: format!("prod-{n}"),
                    name: format!("Producto {n}"),
                    unit_price_cents,
                    quantity,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_derives_total_from_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let record = repo
            .create(new_sale((2025, 1, 5), PaymentMethod::Cash, vec![(2, 3000), (1, 1500)]))
            .await
            .unwrap();

        assert_eq!(record.sale.total_cents, 7500);
        assert!(record.is_well_formed());
        assert!(!record.sale.invoiced);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        assert!(repo
            .create(new_sale((2025, 1, 5), PaymentMethod::Cash, vec![]))
            .await
            .is_err());
        assert!(repo
            .create(new_sale((2025, 1, 5), PaymentMethod::Cash, vec![(0, 100)]))
            .await
            .is_err());
        assert!(repo
            .create(new_sale((2025, 1, 5), PaymentMethod::Cash, vec![(1, -100)]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        repo.create(new_sale((2025, 1, 5), PaymentMethod::Cash, vec![(1, 5000)]))
            .await
            .unwrap();
        repo.create(new_sale((2025, 1, 20), PaymentMethod::Card, vec![(1, 20000)]))
            .await
            .unwrap();
        repo.create(new_sale((2025, 2, 2), PaymentMethod::Cash, vec![(1, 900)]))
            .await
            .unwrap();

        let january = SaleFilter {
            start: Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            end: Some(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()),
            ..SaleFilter::default()
        };
        let sales = repo.list(&january, 1, 20).await.unwrap();
        assert_eq!(sales.len(), 2);
        // newest first
        assert!(sales[0].sold_at > sales[1].sold_at);
        assert_eq!(repo.count(&january).await.unwrap(), 2);

        let expensive = SaleFilter {
            min_cents: Some(10000),
            ..SaleFilter::default()
        };
        assert_eq!(repo.count(&expensive).await.unwrap(), 1);

        let page2 = repo.list(&SaleFilter::default(), 2, 2).await.unwrap();
        assert_eq!(page2.len(), 1);
    }

    #[tokio::test]
    async fn test_records_in_period_include_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        repo.create(new_sale((2025, 1, 5), PaymentMethod::Cash, vec![(2, 3000)]))
            .await
            .unwrap();
        let period = Period::parse("2025-01-01", "2025-01-31").unwrap();
        let records = repo.records_in_period(&period).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].items.len(), 1);
        assert_eq!(records[0].items[0].line_total_cents, 6000);
    }

    #[tokio::test]
    async fn test_stats() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        repo.create(new_sale((2025, 1, 5), PaymentMethod::Cash, vec![(1, 5000)]))
            .await
            .unwrap();
        repo.create(new_sale((2025, 1, 6), PaymentMethod::Card, vec![(1, 3000)]))
            .await
            .unwrap();

        let stats = repo.stats(None, None).await.unwrap();
        assert_eq!(stats.total_sales, 2);
        assert_eq!(stats.total_cents, 8000);
        assert_eq!(stats.average_cents, 4000);
        assert_eq!(stats.max_cents, 5000);

        let empty = repo
            .stats(
                Some(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()),
                Some(NaiveDate::from_ymd_opt(2030, 1, 31).unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(empty.total_sales, 0);
        assert_eq!(empty.total_cents, 0);
    }

    #[tokio::test]
    async fn test_delete_guards() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let record = repo
            .create(new_sale((2025, 1, 5), PaymentMethod::Cash, vec![(1, 1000)]))
            .await
            .unwrap();

        repo.delete(&record.sale.id).await.unwrap();
        assert!(repo.get_record(&record.sale.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&record.sale.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
