//! Background bonus dispatch.
//!
//! Signup and daily-visit bonuses must never fail or delay the request that
//! triggers them. Triggers go onto a bounded queue drained by one worker task;
//! a full queue drops the trigger with a warning.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tally_shared::types::UserId;

use crate::repositories::{BonusClaimOutcome, BonusRepository};

/// Event that may earn a user a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusTrigger {
    /// A user account was just created.
    Signup(UserId),
    /// A user opened the app.
    DailyVisit(UserId),
}

impl BonusTrigger {
    /// The user the trigger concerns.
    #[must_use]
    pub const fn user_id(self) -> UserId {
        match self {
            Self::Signup(id) | Self::DailyVisit(id) => id,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Signup(_) => "signup",
            Self::DailyVisit(_) => "daily_visit",
        }
    }
}

/// Handle for queueing bonus triggers.
#[derive(Debug, Clone)]
pub struct BonusDispatcher {
    tx: mpsc::Sender<BonusTrigger>,
}

impl BonusDispatcher {
    /// Starts the worker. It exits once every dispatcher handle is dropped
    /// and the queue is drained.
    #[must_use]
    pub fn spawn(bonus: BonusRepository, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(bonus, rx));
        tracing::info!(capacity, "bonus dispatcher started");
        (Self { tx }, handle)
    }

    /// Queues a trigger without waiting. Returns false if it was dropped.
    pub fn dispatch(&self, trigger: BonusTrigger) -> bool {
        match self.tx.try_send(trigger) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    user_id = %trigger.user_id(),
                    trigger = trigger.label(),
                    error = %err,
                    "bonus trigger dropped"
                );
                false
            }
        }
    }
}

async fn run(bonus: BonusRepository, mut rx: mpsc::Receiver<BonusTrigger>) {
    while let Some(trigger) = rx.recv().await {
        let outcome: BonusClaimOutcome = match trigger {
            BonusTrigger::Signup(user_id) => bonus.grant_signup_bonus(user_id).await,
            BonusTrigger::DailyVisit(user_id) => bonus.check_daily_visit_bonus(user_id).await,
        };
        tracing::debug!(
            user_id = %trigger.user_id(),
            trigger = trigger.label(),
            granted = outcome.granted,
            reason = outcome.reason.map(|r| r.as_str()),
            "bonus trigger processed"
        );
    }
    tracing::info!("bonus dispatcher stopped");
}
