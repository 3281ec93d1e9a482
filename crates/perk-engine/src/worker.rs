//! # Reward Outbox Worker
//!
//! Background retry loop for campaign evaluations that did not complete
//! inline.
//!
//! ## Worker Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Reward Worker                                       │
//! │                                                                         │
//! │  every poll_interval:                                                   │
//! │    SELECT pending outbox entries (oldest first, batch-limited)          │
//! │    for each entry:                                                      │
//! │      evaluate ── claim is the gate, so a concurrent inline              │
//! │      │           evaluation can never double-grant                      │
//! │      └─ on failure: attempts += 1; park as 'failed' at the cap          │
//! │                                                                         │
//! │  A pending entry is a promise: the charge committed, the rewards        │
//! │  have not. The worker keeps that promise or parks it loudly.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::campaign::CampaignEngine;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use perk_core::MAX_REWARD_ATTEMPTS;
use perk_db::Database;

/// Background processor for pending reward outbox entries.
pub struct RewardWorker {
    db: Database,
    engine: CampaignEngine,
    poll_interval: Duration,
    batch_size: i64,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running [`RewardWorker`].
#[derive(Debug, Clone)]
pub struct RewardWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl RewardWorkerHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl RewardWorker {
    /// Creates a new reward worker and its shutdown handle.
    pub fn new(db: Database, config: &EngineConfig) -> (Self, RewardWorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = RewardWorker {
            engine: CampaignEngine::new(db.clone()),
            db,
            poll_interval: Duration::from_secs(config.worker_poll_interval_secs),
            batch_size: config.worker_batch_size,
            shutdown_rx,
        };

        (worker, RewardWorkerHandle { shutdown_tx })
    }

    /// Runs the worker loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            batch_size = self.batch_size,
            "Reward worker starting"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.process_pending().await {
                        error!(error = %e, "Failed to process reward outbox batch");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Reward worker shutting down");
                    break;
                }
            }
        }

        info!("Reward worker stopped");
    }

    /// Evaluates one batch of pending entries.
    ///
    /// Public so tests (and embedders without a long-lived runtime) can
    /// drive the worker a tick at a time.
    pub async fn process_pending(&self) -> EngineResult<()> {
        let entries = self.db.reward_outbox().get_pending(self.batch_size).await?;

        if entries.is_empty() {
            debug!("No pending reward evaluations");
            return Ok(());
        }

        info!(count = entries.len(), "Retrying pending reward evaluations");

        for entry in entries {
            match self.engine.evaluate_outbox_entry(&entry).await {
                Ok(granted) => {
                    debug!(
                        transaction_id = %entry.transaction_id,
                        granted = granted.len(),
                        "Deferred evaluation completed"
                    );
                }
                Err(e) => {
                    warn!(
                        transaction_id = %entry.transaction_id,
                        attempts = entry.attempts,
                        error = %e,
                        "Deferred evaluation failed"
                    );
                    self.db
                        .reward_outbox()
                        .mark_failed(&entry.transaction_id, &e.to_string(), MAX_REWARD_ATTEMPTS)
                        .await?;
                }
            }
        }

        Ok(())
    }
}
