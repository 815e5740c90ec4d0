//! # verde-core: Pure Business Logic for Verde POS
//!
//! The heart of the sales reporting and invoice batching engine: all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   apps/api (axum REST)                       │
//! │   /daily_summary  /api/cortes  /generate_global_invoice ...  │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │              ★ verde-core (THIS CRATE) ★                     │
//! │                                                              │
//! │   money     period      report        buckets    validation  │
//! │   Money     Period      aggregate()   Distribution  rules    │
//! │                                                              │
//! │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS         │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │               verde-db (SQLite persistence)                  │
//! │      repositories, migrations, invoice batch coordinator     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output — the aggregator and
//!    bucketizer are safe for any number of concurrent readers
//! 2. **No I/O**: database, network, file system access is forbidden here
//! 3. **Integer money**: all monetary values are centavos (i64); currency
//!    never touches floating point inside the engine
//! 4. **Explicit errors**: typed enums, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod buckets;
pub mod error;
pub mod money;
pub mod period;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use buckets::Distribution;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use period::Period;
pub use report::{aggregate, DailySummary, MonthlyTotals, SalesReport};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Fixed id of the reserved "generic public" client.
///
/// ## Why a constant?
/// Walk-in sales have no named buyer; the tax authority expects them
/// billed to the generic public RFC. The row is seeded by migration,
/// always exists, and is the default client selection everywhere.
pub const GENERIC_PUBLIC_CLIENT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// RFC of the generic public client.
pub const GENERIC_PUBLIC_RFC: &str = "XAXX010101000";

/// IVA rate in basis points (16%). Retail totals are IVA-inclusive; the
/// invoice batch extracts this portion when it commits.
pub const IVA_RATE_BPS: u32 = 1600;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g. typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
