//! # perk-engine: Settlement Services for Perk POS
//!
//! The service layer terminals and operator consoles talk to. Everything a
//! settlement needs happens behind one of the services in this crate.
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        perk-engine Services                             │
//! │                                                                         │
//! │  Terminal scan ──► IngestService ──► ScanEvent (broadcast)              │
//! │                          │                                              │
//! │  Console         ┌───────▼────────┐                                     │
//! │  ────────        │ LookupService  │  uid → card + customer + coupons    │
//! │                  └───────┬────────┘                                     │
//! │                          │                                              │
//! │                  ┌───────▼──────────┐                                   │
//! │                  │SettlementService │  validate → resolve → commit      │
//! │                  └───────┬──────────┘                                   │
//! │                          │ post-commit                                  │
//! │                  ┌───────▼────────┐      ┌──────────────┐               │
//! │                  │ CampaignEngine │ ◄────│ RewardWorker │ (retries)     │
//! │                  └────────────────┘      └──────────────┘               │
//! │                                                                         │
//! │  Admin ──► CouponService (manual grants, listings, voids)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let config = EngineConfig::load()?;
//! let db = Database::new(DbConfig::new(&config.database_path)).await?;
//!
//! let settlement = SettlementService::new(db.clone());
//! if config.worker_enabled {
//!     let (worker, _handle) = RewardWorker::new(db.clone(), &config);
//!     tokio::spawn(worker.run());
//! }
//! ```

pub mod campaign;
pub mod config;
pub mod coupons;
pub mod error;
pub mod ingest;
pub mod lookup;
pub mod rewards;
pub mod settlement;
pub mod worker;

pub use campaign::CampaignEngine;
pub use config::{ConfigError, EngineConfig};
pub use coupons::CouponService;
pub use error::{EngineError, EngineResult, ErrorCode};
pub use ingest::{hash_secret, IngestService, ScanEvent};
pub use lookup::{CardProfile, LookupService};
pub use settlement::{SettlementRequest, SettlementResponse, SettlementService};
pub use worker::{RewardWorker, RewardWorkerHandle};
