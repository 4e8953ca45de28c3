//! Auth events published on every session status transition.
//!
//! Producers never learn who is listening; UI and analytics observers
//! subscribe through [`AuthEventBus::subscribe`].

use tokio::sync::broadcast;

use crate::auth::{Generation, SessionStatus, SessionToken};

/// Default channel capacity for auth events.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    /// Submission that caused the transition.
    pub generation: Generation,
    pub previous: SessionStatus,
    pub status: SessionStatus,
    /// Present only on the transition into `Authenticated`.
    pub token: Option<SessionToken>,
}

impl AuthEvent {
    pub fn description(&self) -> String {
        format!(
            "generation {}: {} -> {}",
            self.generation, self.previous, self.status
        )
    }
}

/// Broadcaster for auth events.
#[derive(Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of receivers that got the event; 0 without subscribers.
    pub fn publish(&self, event: AuthEvent) -> usize {
        tracing::debug!("Publishing auth event: {}", event.description());
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}
