//! # Cash Cut Repository
//!
//! Append-only register closings (cortes de caja). A cut records the
//! drawer state at close of shift: opening/closing amounts, sales split
//! by payment method, and withdrawals. Cuts are never updated or
//! deleted; corrections are new cuts with explanatory notes.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use verde_core::validation::validate_non_negative_cents;
use verde_core::{CashCut, CutMonthlyTotals, Period};

const CUT_COLUMNS: &str = "id, recorded_at, opening_cents, closing_cents, cash_sales_cents, card_sales_cents, transfer_sales_cents, withdrawals_cents, notes, created_at";

/// Input for recording a cash cut.
#[derive(Debug, Clone)]
pub struct NewCashCut {
    /// Defaults to now when absent.
    pub recorded_at: Option<DateTime<Utc>>,
    pub opening_cents: i64,
    pub closing_cents: i64,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub transfer_sales_cents: i64,
    pub withdrawals_cents: i64,
    pub notes: Option<String>,
}

impl NewCashCut {
    fn validate(&self) -> DbResult<()> {
        validate_non_negative_cents("opening", self.opening_cents)?;
        validate_non_negative_cents("closing", self.closing_cents)?;
        validate_non_negative_cents("cash_sales", self.cash_sales_cents)?;
        validate_non_negative_cents("card_sales", self.card_sales_cents)?;
        validate_non_negative_cents("transfer_sales", self.transfer_sales_cents)?;
        validate_non_negative_cents("withdrawals", self.withdrawals_cents)?;
        Ok(())
    }
}

/// Repository for cash-cut database operations.
#[derive(Debug, Clone)]
pub struct CashCutRepository {
    pool: SqlitePool,
}

impl CashCutRepository {
    /// Creates a new CashCutRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashCutRepository { pool }
    }

    /// Records a cash cut.
    pub async fn create(&self, input: NewCashCut) -> DbResult<CashCut> {
        input.validate()?;

        let now = Utc::now();
        let cut = CashCut {
            id: Uuid::new_v4().to_string(),
            recorded_at: input.recorded_at.unwrap_or(now),
            opening_cents: input.opening_cents,
            closing_cents: input.closing_cents,
            cash_sales_cents: input.cash_sales_cents,
            card_sales_cents: input.card_sales_cents,
            transfer_sales_cents: input.transfer_sales_cents,
            withdrawals_cents: input.withdrawals_cents,
            notes: input.notes,
            created_at: now,
        };

        debug!(id = %cut.id, total = %cut.sales_total(), "Recording cash cut");

        sqlx::query(
            r#"
            INSERT INTO cash_cuts (id, recorded_at, opening_cents, closing_cents,
                                   cash_sales_cents, card_sales_cents, transfer_sales_cents,
                                   withdrawals_cents, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&cut.id)
        .bind(cut.recorded_at)
        .bind(cut.opening_cents)
        .bind(cut.closing_cents)
        .bind(cut.cash_sales_cents)
        .bind(cut.card_sales_cents)
        .bind(cut.transfer_sales_cents)
        .bind(cut.withdrawals_cents)
        .bind(&cut.notes)
        .bind(cut.created_at)
        .execute(&self.pool)
        .await?;

        Ok(cut)
    }

    /// Gets a cut by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashCut>> {
        let sql = format!("SELECT {CUT_COLUMNS} FROM cash_cuts WHERE id = ?1");
        let cut = sqlx::query_as::<_, CashCut>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(cut)
    }

    /// Lists cuts, newest first, optionally restricted to a period.
    pub async fn list(&self, period: Option<&Period>) -> DbResult<Vec<CashCut>> {
        let cuts = match period {
            Some(period) => {
                let sql = format!(
                    r#"
                    SELECT {CUT_COLUMNS} FROM cash_cuts
                    WHERE date(recorded_at) >= ?1 AND date(recorded_at) <= ?2
                    ORDER BY recorded_at DESC
                    "#
                );
                sqlx::query_as::<_, CashCut>(&sql)
                    .bind(period.start())
                    .bind(period.end())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql =
                    format!("SELECT {CUT_COLUMNS} FROM cash_cuts ORDER BY recorded_at DESC");
                sqlx::query_as::<_, CashCut>(&sql).fetch_all(&self.pool).await?
            }
        };

        Ok(cuts)
    }

    /// Sums one calendar month of cuts into a single totals row.
    pub async fn monthly_totals(&self, year: i32, month: u32) -> DbResult<CutMonthlyTotals> {
        let period = Period::for_month(year, month)
            .map_err(|e| DbError::Conflict(e.to_string()))?;

        #[derive(sqlx::FromRow)]
        struct Row {
            cash_sales_cents: i64,
            card_sales_cents: i64,
            transfer_sales_cents: i64,
            withdrawals_cents: i64,
            cut_count: i64,
        }

        let row: Row = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(cash_sales_cents), 0) AS cash_sales_cents,
                   COALESCE(SUM(card_sales_cents), 0) AS card_sales_cents,
                   COALESCE(SUM(transfer_sales_cents), 0) AS transfer_sales_cents,
                   COALESCE(SUM(withdrawals_cents), 0) AS withdrawals_cents,
                   COUNT(*) AS cut_count
            FROM cash_cuts
            WHERE date(recorded_at) >= ?1 AND date(recorded_at) <= ?2
            "#,
        )
        .bind(period.start())
        .bind(period.end())
        .fetch_one(&self.pool)
        .await?;

        Ok(CutMonthlyTotals {
            year,
            month,
            cash_sales_cents: row.cash_sales_cents,
            card_sales_cents: row.card_sales_cents,
            transfer_sales_cents: row.transfer_sales_cents,
            total_sales_cents: row.cash_sales_cents
                + row.card_sales_cents
                + row.transfer_sales_cents,
            withdrawals_cents: row.withdrawals_cents,
            cut_count: row.cut_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use verde_core::Money;

    fn cut_on(date: (i32, u32, u32), cash: i64, card: i64, transfer: i64) -> NewCashCut {
        NewCashCut {
            recorded_at: Some(
                Utc.with_ymd_and_hms(date.0, date.1, date.2, 21, 30, 0)
                    .unwrap(),
            ),
            opening_cents: 50000,
            closing_cents: 50000 + cash,
            cash_sales_cents: cash,
            card_sales_cents: card,
            transfer_sales_cents: transfer,
            withdrawals_cents: 0,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.cuts();

        let created = repo.create(cut_on((2025, 3, 10), 12000, 8000, 0)).await.unwrap();
        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.sales_total(), Money::from_cents(20000));
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut bad = cut_on((2025, 3, 10), 1000, 0, 0);
        bad.withdrawals_cents = -1;
        assert!(matches!(
            db.cuts().create(bad).await.unwrap_err(),
            DbError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_period() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.cuts();

        repo.create(cut_on((2025, 3, 1), 1000, 0, 0)).await.unwrap();
        repo.create(cut_on((2025, 3, 15), 2000, 0, 0)).await.unwrap();
        repo.create(cut_on((2025, 4, 1), 3000, 0, 0)).await.unwrap();

        let all = repo.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].cash_sales_cents, 3000);

        let march = Period::for_month(2025, 3).unwrap();
        let march_cuts = repo.list(Some(&march)).await.unwrap();
        assert_eq!(march_cuts.len(), 2);
    }

    #[tokio::test]
    async fn test_monthly_totals() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.cuts();

        repo.create(cut_on((2025, 3, 1), 10000, 5000, 2000)).await.unwrap();
        repo.create(cut_on((2025, 3, 31), 4000, 1000, 0)).await.unwrap();
        repo.create(cut_on((2025, 4, 1), 99900, 0, 0)).await.unwrap();

        let totals = repo.monthly_totals(2025, 3).await.unwrap();
        assert_eq!(totals.cut_count, 2);
        assert_eq!(totals.cash_sales_cents, 14000);
        assert_eq!(totals.card_sales_cents, 6000);
        assert_eq!(totals.transfer_sales_cents, 2000);
        assert_eq!(totals.total_sales_cents, 22000);

        let empty = repo.monthly_totals(2024, 12).await.unwrap();
        assert_eq!(empty.cut_count, 0);
        assert_eq!(empty.total_sales_cents, 0);
    }
}
