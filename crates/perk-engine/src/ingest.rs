//! # Terminal Scan Ingestion
//!
//! Authenticates hardware terminals and republishes their card scans.
//!
//! ## Scan Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scan Ingestion                                     │
//! │                                                                         │
//! │  Terminal ──► { terminal_id, secret, uid }                              │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  1. Load terminal row; unknown or inactive ──► Unauthorized             │
//! │  2. argon2 verify secret against secret_hash ──► Unauthorized           │
//! │  3. Publish ScanEvent on the broadcast channel                          │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  Operator consoles subscribe() and drive lookup from the event          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Authentication failures all collapse to `Unauthorized`: a probing client
//! cannot distinguish an unknown terminal id from a wrong secret.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use perk_db::Database;

/// A card scan accepted from an authenticated terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub terminal_id: String,
    pub branch_id: String,
    pub uid: String,
    pub scanned_at: DateTime<Utc>,
}

/// Accepts scans from terminals and fans them out to subscribers.
#[derive(Debug, Clone)]
pub struct IngestService {
    db: Database,
    events: broadcast::Sender<ScanEvent>,
}

impl IngestService {
    /// Creates a new IngestService with the given broadcast capacity.
    pub fn new(db: Database, channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity);
        IngestService { db, events }
    }

    /// Subscribes to the scan event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// Authenticates a terminal and publishes its scan.
    pub async fn ingest_scan(
        &self,
        terminal_id: &str,
        secret: &str,
        uid: &str,
    ) -> EngineResult<ScanEvent> {
        let terminal = self
            .db
            .terminals()
            .get_by_id(terminal_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or_else(|| {
                warn!(terminal_id = %terminal_id, "Scan from unknown or inactive terminal");
                EngineError::Unauthorized("terminal authentication failed".to_string())
            })?;

        if !verify_secret(secret, &terminal.secret_hash) {
            warn!(terminal_id = %terminal_id, "Terminal secret mismatch");
            return Err(EngineError::Unauthorized(
                "terminal authentication failed".to_string(),
            ));
        }

        let event = ScanEvent {
            terminal_id: terminal.id,
            branch_id: terminal.branch_id,
            uid: uid.to_string(),
            scanned_at: Utc::now(),
        };

        debug!(terminal_id = %event.terminal_id, uid = %event.uid, "Scan accepted");

        // Err means no live subscriber, which is fine: the scan is still
        // acknowledged to the terminal.
        let _ = self.events.send(event.clone());

        Ok(event)
    }
}

/// Verify a terminal secret against its stored hash.
fn verify_secret(secret: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Hash a terminal secret for storage.
pub fn hash_secret(secret: &str) -> EngineResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| EngineError::Internal(format!("Failed to hash terminal secret: {}", e)))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_secret("front-desk-secret").unwrap();
        assert!(verify_secret("front-desk-secret", &hash));
        assert!(!verify_secret("wrong", &hash));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_secret("anything", "not-a-phc-string"));
    }
}
