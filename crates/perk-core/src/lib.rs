//! # perk-core: Pure Business Logic for Perk POS
//!
//! This crate is the **heart** of the loyalty settlement engine. It contains
//! all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Perk POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Terminals / Operator Consoles                  │   │
//! │  │        scan ──► lookup ──► select reward ──► settle             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               perk-engine (Settlement Services)                 │   │
//! │  │    SettlementService, CampaignEngine, lookup, ingestion         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ perk-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │   types   │  │   money   │  │  reward   │  │ validation│   │   │
//! │  │   │ Campaign  │  │   Money   │  │ stacking  │  │   rules   │   │   │
//! │  │   │  Coupon   │  │  percent  │  │  clamping │  │  checks   │   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    perk-db (Database Layer)                     │   │
//! │  │          SQLite queries, migrations, repositories               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Campaign, CustomerCoupon, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`reward`] - Reward resolution math (stacking, clamping)
//! - [`coupon_code`] - Short display codes for coupons
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon_code;
pub mod error;
pub mod money;
pub mod reward;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use perk_core::Money` instead of
// `use perk_core::money::Money`

pub use error::ValidationError;
pub use money::Money;
pub use reward::{resolve_amount, ManualDiscount};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Price tolerance, in cents, for the legacy price-matched bundle path.
///
/// A settled charge equal to a paid bundle's price within this tolerance is
/// treated as a purchase of that bundle when no explicit campaign was
/// selected.
pub const PRICE_MATCH_TOLERANCE_CENTS: i64 = 1;

/// Attempts after which the reward outbox worker parks an entry as failed.
///
/// ## Business Reason
/// A reward grant that keeps failing needs operator attention, not an
/// infinite retry loop next to live settlement traffic.
pub const MAX_REWARD_ATTEMPTS: i64 = 5;
