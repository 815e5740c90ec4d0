//! # Repository Module
//!
//! Database repository implementations for Verde POS. Each repository
//! wraps the pool and isolates the SQL for one aggregate:
//!
//! - [`product::ProductRepository`] - catalog CRUD
//! - [`client::ClientRepository`] - client CRUD and search
//! - [`sale::SaleRepository`] - sales, line items, filters, stats
//! - [`cut::CashCutRepository`] - append-only cash cuts + monthly totals
//!
//! The invoice batch coordinator lives in [`crate::invoice`] rather than
//! here: it spans sales and global invoices in one transaction and is
//! more a workflow than a table gateway.

pub mod client;
pub mod cut;
pub mod product;
pub mod sale;
