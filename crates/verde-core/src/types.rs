//! # Domain Types
//!
//! Core domain types for the Verde POS reporting and invoicing engine.
//!
//! ## Type Overview
//! ```text
//! Product / Client        catalog entities (full CRUD, owned by the db layer)
//! Sale + SaleItem         checkout output; snapshot pattern on line items
//! SaleRecord              a sale together with its line items
//! CashCut                 end-of-shift reconciliation, append-only
//! GlobalInvoiceBatch      one consolidated invoice over a date range
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID v4 `id` (immutable, used for relations); human
//! identifiers (SKU, folio, RFC) live beside it and may carry business
//! meaning.
//!
//! Monetary fields are stored as raw `_cents` integers so the types map
//! directly onto database rows; `Money` accessors wrap them for arithmetic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Bank transfer (SPEI and friends).
    Transfer,
}

impl PaymentMethod {
    /// All methods, in reporting order. Monthly totals emit a bucket for
    /// every method even when it saw no sales.
    pub const ALL: [PaymentMethod; 3] =
        [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Transfer];
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale.
///
/// `invoiced` is monotonic: it flips false→true exactly once, when an
/// invoice batch commits, and the sale becomes immutable from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Buyer; defaults to the generic-public client when absent.
    pub client_id: Option<String>,
    /// Point in time of the sale. Date-only for report bucketing,
    /// time-of-day retained for ordering within a day.
    pub sold_at: DateTime<Utc>,
    /// Derived = Σ quantity × unit price, stored redundantly for fast
    /// aggregation.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// Whether this sale is covered by a committed invoice batch.
    pub invoiced: bool,
    /// Back-reference to the covering batch, set together with `invoiced`.
    pub global_invoice_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Calendar date of the sale, the aggregation key.
    #[inline]
    pub fn sold_on(&self) -> NaiveDate {
        self.sold_at.date_naive()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A sale together with its line items — the aggregator's input unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

impl SaleRecord {
    /// Checks the creation-time invariant: the stored total must equal
    /// the sum of its line items, and every item must have a positive
    /// quantity and non-negative price. Records that fail this are
    /// skipped (and counted) by the aggregator rather than aborting a
    /// whole report.
    pub fn is_well_formed(&self) -> bool {
        let items_ok = self
            .items
            .iter()
            .all(|i| i.quantity >= 1 && i.unit_price_cents >= 0 && i.line_total_cents == i.unit_price_cents * i.quantity);
        if !items_ok {
            return false;
        }
        // Sales imported without line detail carry only a total; accept them.
        if self.items.is_empty() {
            return self.sale.total_cents >= 0;
        }
        let item_sum: i64 = self.items.iter().map(|i| i.line_total_cents).sum();
        item_sum == self.sale.total_cents
    }
}

// =============================================================================
// Cash Cut ("corte")
// =============================================================================

/// An end-of-shift cash reconciliation record.
///
/// Cuts are an append-only log: created at shift close, never edited or
/// deleted. All monetary fields are ≥ 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashCut {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    /// Cash in the drawer when the shift opened.
    pub opening_cents: i64,
    /// Cash counted when the shift closed.
    pub closing_cents: i64,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub transfer_sales_cents: i64,
    /// Cash withdrawn from the drawer during the shift.
    pub withdrawals_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashCut {
    /// Combined sales across all payment methods for the shift.
    pub fn sales_total(&self) -> Money {
        Money::from_cents(self.cash_sales_cents + self.card_sales_cents + self.transfer_sales_cents)
    }
}

/// Per-month rollup over cash cuts, keyed by (year, month).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutMonthlyTotals {
    pub year: i32,
    pub month: u32,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub transfer_sales_cents: i64,
    pub total_sales_cents: i64,
    pub withdrawals_cents: i64,
    pub cut_count: i64,
}

// =============================================================================
// Global Invoice Batch
// =============================================================================

/// One consolidated invoice covering every uninvoiced sale in a date
/// range. Created only by the batch coordinator's commit transaction and
/// never mutated afterward. A sale belongs to at most one batch ever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GlobalInvoiceBatch {
    pub id: String,
    /// Inclusive period the batch covers.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sale_count: i64,
    /// IVA-inclusive grand total.
    pub total_cents: i64,
    /// Extracted IVA portion of the total.
    pub tax_cents: i64,
    pub cash_cents: i64,
    pub card_cents: i64,
    pub transfer_cents: i64,
    /// Tax-authority document id returned by the issuer.
    pub cfdi_uuid: String,
    /// Issuer folio (human-readable invoice number).
    pub folio: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Business identifier, unique when present.
    pub sku: Option<String>,
    pub price_cents: i64,
    /// Whether to track inventory for this product.
    pub track_stock: bool,
    /// Current stock level; meaningful only when `track_stock` is set.
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Client
// =============================================================================

/// A billing client. The reserved generic-public client (fixed id, RFC
/// `XAXX010101000`) always exists and is the default selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// RFC tax identifier.
    pub rfc: String,
    /// SAT fiscal regime code (e.g. "616").
    pub fiscal_regime: Option<String>,
    pub postal_code: Option<String>,
    /// CFDI usage code (e.g. "S01").
    pub cfdi_use: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(total_cents: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s1".to_string(),
            client_id: None,
            sold_at: now,
            total_cents,
            payment_method: PaymentMethod::Cash,
            invoiced: false,
            global_invoice_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(quantity: i64, unit_price_cents: i64) -> SaleItem {
        SaleItem {
            id: "i1".to_string(),
            sale_id: "s1".to_string(),
            product_id: "p1".to_string(),
            name_snapshot: "Widget".to_string(),
            unit_price_cents,
            quantity,
            line_total_cents: unit_price_cents * quantity,
        }
    }

    #[test]
    fn test_well_formed_record() {
        let record = SaleRecord {
            sale: sale(897),
            items: vec![item(3, 299)],
        };
        assert!(record.is_well_formed());
    }

    #[test]
    fn test_total_mismatch_is_malformed() {
        let record = SaleRecord {
            sale: sale(900),
            items: vec![item(3, 299)],
        };
        assert!(!record.is_well_formed());
    }

    #[test]
    fn test_bad_quantity_is_malformed() {
        let record = SaleRecord {
            sale: sale(0),
            items: vec![item(0, 299)],
        };
        assert!(!record.is_well_formed());
    }

    #[test]
    fn test_itemless_record_is_accepted() {
        let record = SaleRecord {
            sale: sale(5000),
            items: vec![],
        };
        assert!(record.is_well_formed());
    }

    #[test]
    fn test_payment_method_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Transfer).unwrap(),
            "\"transfer\""
        );
    }
}
