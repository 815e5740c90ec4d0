//! # Sales Aggregator
//!
//! Pure rollup of sale records over a period into daily summaries and
//! monthly totals.
//!
//! ## Aggregation Shape
//! ```text
//! [SaleRecord] ──filter by period──► group by calendar date
//!                                        │
//!                       ┌────────────────┴────────────────┐
//!                       ▼                                 ▼
//!                 DailySummary[]                    MonthlyTotals
//!                 count/sum/min/max/avg             count, grand total,
//!                 per-product rollups               per-method totals,
//!                 ascending by date                 per-day average
//! ```
//!
//! Invariants the rest of the system leans on:
//! - integer-cent arithmetic: Σ daily totals == monthly total, exactly
//! - days with zero sales never appear in the daily list
//! - malformed records are skipped and counted, never fatal
//! - deterministic: same input, same output, no side effects

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::period::Period;
use crate::types::{PaymentMethod, SaleRecord};

// =============================================================================
// Output Types
// =============================================================================

/// Per-product rollup within one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDailyTotal {
    pub product_id: String,
    /// Name snapshot from the first line item seen for this product.
    pub name: String,
    /// Total units sold.
    pub quantity: i64,
    /// Σ quantity × unit price.
    pub total_cents: i64,
    /// Average unit amount (total / quantity), half-up rounded.
    pub average_cents: i64,
}

/// One day's sales, emitted only for dates with at least one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sale_count: i64,
    pub total_cents: i64,
    pub min_cents: i64,
    pub max_cents: i64,
    /// total / count, half-up rounded.
    pub average_cents: i64,
    pub products: Vec<ProductDailyTotal>,
}

/// Whole-period totals across the filtered set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub sale_count: i64,
    pub total_cents: i64,
    /// Number of distinct days with at least one sale.
    pub day_count: i64,
    /// total / day_count; zero when there were no sales at all.
    pub daily_average_cents: i64,
    pub cash_cents: i64,
    pub card_cents: i64,
    pub transfer_cents: i64,
}

impl MonthlyTotals {
    /// Per-method total, zero for methods with no sales.
    pub fn for_method(&self, method: PaymentMethod) -> Money {
        let cents = match method {
            PaymentMethod::Cash => self.cash_cents,
            PaymentMethod::Card => self.card_cents,
            PaymentMethod::Transfer => self.transfer_cents,
        };
        Money::from_cents(cents)
    }
}

/// Full aggregation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    /// Ascending by date.
    pub daily: Vec<DailySummary>,
    pub totals: MonthlyTotals,
    /// Records dropped for violating the sale/line-item invariants.
    /// Partial data must not block reporting.
    pub skipped_records: usize,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Working accumulator per calendar date.
#[derive(Default)]
struct DayAccumulator {
    count: i64,
    total: i64,
    min: i64,
    max: i64,
    // BTreeMap keeps per-product output deterministic
    products: BTreeMap<String, ProductAccumulator>,
}

struct ProductAccumulator {
    name: String,
    quantity: i64,
    total: i64,
}

/// Aggregates sale records falling inside `period` (date-only comparison,
/// inclusive bounds) into daily summaries and monthly totals.
pub fn aggregate(records: &[SaleRecord], period: &Period) -> SalesReport {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
    let mut totals = MonthlyTotals::default();
    let mut skipped = 0usize;

    for record in records {
        let date = record.sale.sold_on();
        if !period.contains(date) {
            continue;
        }
        if !record.is_well_formed() {
            skipped += 1;
            continue;
        }

        let amount = record.sale.total_cents;
        let day = days.entry(date).or_default();
        if day.count == 0 {
            day.min = amount;
            day.max = amount;
        } else {
            day.min = day.min.min(amount);
            day.max = day.max.max(amount);
        }
        day.count += 1;
        day.total += amount;

        for item in &record.items {
            let product = day
                .products
                .entry(item.product_id.clone())
                .or_insert_with(|| ProductAccumulator {
                    name: item.name_snapshot.clone(),
                    quantity: 0,
                    total: 0,
                });
            product.quantity += item.quantity;
            product.total += item.line_total_cents;
        }

        totals.sale_count += 1;
        totals.total_cents += amount;
        match record.sale.payment_method {
            PaymentMethod::Cash => totals.cash_cents += amount,
            PaymentMethod::Card => totals.card_cents += amount,
            PaymentMethod::Transfer => totals.transfer_cents += amount,
        }
    }

    totals.day_count = days.len() as i64;
    totals.daily_average_cents = Money::from_cents(totals.total_cents)
        .divide_rounded(totals.day_count)
        .cents();

    let daily = days
        .into_iter()
        .map(|(date, day)| DailySummary {
            date,
            sale_count: day.count,
            total_cents: day.total,
            min_cents: day.min,
            max_cents: day.max,
            average_cents: Money::from_cents(day.total).divide_rounded(day.count).cents(),
            products: day
                .products
                .into_iter()
                .map(|(product_id, p)| ProductDailyTotal {
                    product_id,
                    name: p.name,
                    average_cents: Money::from_cents(p.total).divide_rounded(p.quantity).cents(),
                    quantity: p.quantity,
                    total_cents: p.total,
                })
                .collect(),
        })
        .collect();

    SalesReport {
        daily,
        totals,
        skipped_records: skipped,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
