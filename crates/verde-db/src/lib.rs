//! # verde-db: SQLite Persistence for Verde POS
//!
//! Everything that touches the database: the pool, embedded migrations,
//! per-aggregate repositories, and the invoice batch coordinator.
//!
//! ## Module Organization
//! ```text
//! verde-db/
//! ├── pool        - Database handle, pool config, WAL setup
//! ├── migrations  - Embedded migration runner (sqlx::migrate!)
//! ├── error       - DbError with sqlx constraint mapping
//! ├── repository/ - products, clients, sales, cash cuts
//! └── invoice     - global-invoice batch coordinator + issuer seam
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use verde_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("verde.db")).await?;
//! let report_input = db.sales().records_in_period(&period).await?;
//! ```

pub mod error;
pub mod invoice;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use invoice::{
    BatchError, BatchPreview, CommittedBatch, InvoiceBatchCoordinator, InvoiceIssuer,
    IssuanceError, IssueRequest, IssuedInvoice,
};
pub use pool::{Database, DbConfig};
pub use repository::client::{ClientInput, ClientRepository};
pub use repository::cut::{CashCutRepository, NewCashCut};
pub use repository::product::{ProductInput, ProductRepository};
pub use repository::sale::{NewSale, NewSaleItem, SaleFilter, SaleRepository, SaleStats};
