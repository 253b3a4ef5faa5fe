//! Agent event system: observability for runs, steps and retries.
//!
//! Events are published as the agent works. Subscribers (loggers, UIs,
//! tests) can watch a run without the agent knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::llm::Usage;

/// All agent events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// A query was accepted and the run began
    RunStarted {
        run_id: Uuid,
        agent: String,
        initial_state: String,
        timestamp: DateTime<Utc>,
    },

    /// A state finished executing
    StepCompleted {
        run_id: Uuid,
        state: String,
        next_state: String,
        usage: Usage,
        timestamp: DateTime<Utc>,
    },

    /// The scratch pad was reduced to fit the context window
    ContextEvicted {
        state: String,
        remaining_notes: usize,
        timestamp: DateTime<Utc>,
    },

    /// An execution attempt of a state failed
    AttemptFailed {
        state: String,
        attempt: u32,
        max_attempts: u32,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The run produced a response
    RunFinished {
        run_id: Uuid,
        steps: usize,
        usage: Usage,
        timestamp: DateTime<Utc>,
    },

    /// The run failed fatally
    RunFailed {
        run_id: Uuid,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for agent events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AgentEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
