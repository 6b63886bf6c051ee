//! Claim update broadcasting for downstream notification consumers.
//!
//! Updates are published after every persisted transition. Delivery is
//! best effort: failures are logged and swallowed, and never influence
//! the pipeline outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::claim::Claim;
use crate::db::{claim_repo, Database};

/// Errors raised while assembling an update event.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Claim {0} not found")]
    UnknownClaim(String),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

/// Update event delivered to subscribers after a claim changes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimUpdateEvent {
    /// Identifier of the user the update is addressed to.
    pub owner_id: String,
    /// Stored claim state at publish time.
    pub claim: Claim,
    pub timestamp: DateTime<Utc>,
}

/// Broadcasts claim update events for streaming.
///
/// The event carries the claim as currently persisted, not the
/// in-flight pipeline copy, so subscribers always see what a
/// subsequent read would return.
#[derive(Clone)]
pub struct UpdatePublisher {
    db: Database,
    sender: Arc<broadcast::Sender<ClaimUpdateEvent>>,
}

impl UpdatePublisher {
    /// Creates a publisher with the specified channel capacity.
    pub fn new(db: Database, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            db,
            sender: Arc::new(sender),
        }
    }

    /// Creates a new subscriber for update events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClaimUpdateEvent> {
        self.sender.subscribe()
    }

    /// Publishes the stored state of the claim to all subscribers.
    /// Failures are logged at error level and otherwise ignored.
    pub fn publish(&self, claim_id: &str) {
        if let Err(e) = self.try_publish(claim_id) {
            log::error!("Failed to publish update for claim {}: {}", claim_id, e);
        }
    }

    fn try_publish(&self, claim_id: &str) -> Result<(), NotifyError> {
        let claim = claim_repo::find_by_id(&self.db, claim_id)?
            .ok_or_else(|| NotifyError::UnknownClaim(claim_id.to_string()))?;

        let event = ClaimUpdateEvent {
            owner_id: claim.owner_id.clone(),
            claim,
            timestamp: Utc::now(),
        };
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }
}
