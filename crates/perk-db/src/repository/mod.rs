//! Repository implementations.
//!
//! One repository per aggregate. Every contended mutation (wallet balance,
//! coupon status, stamp counters, outbox claims) is a conditional UPDATE or
//! an in-SQL increment, never an application-level read-modify-write.

pub mod campaign;
pub mod coupon;
pub mod customer;
pub mod discount;
pub mod outbox;
pub mod progress;
pub mod terminal;
pub mod transaction;
pub mod wallet;
