//! # perk-db: Database Layer for Perk POS
//!
//! All persistence for the loyalty settlement engine: SQLite via sqlx,
//! embedded migrations, and one repository per aggregate.
//!
//! ## Concurrency Contract
//!
//! Settlements arrive concurrently from multiple terminals with no
//! per-customer lock. Every contended mutation is therefore expressed in
//! SQL, not in application state:
//!
//! - wallet balances move via `balance_cents = balance_cents ± ?` with a
//!   `balance_cents >= ?` guard on debits
//! - coupon transitions are conditional UPDATEs guarded by
//!   `status = 'active'`; zero rows affected means the transition lost
//! - stamp counters are upsert increments with `RETURNING`
//! - reward evaluation is claimed through the outbox, once per transaction
//!
//! ## Usage
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("./perk.db")).await?;
//! let balance = db.wallet().balance(&customer_id).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// =============================================================================
// Test Utilities
// =============================================================================
