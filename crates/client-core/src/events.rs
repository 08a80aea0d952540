//! Event system for the call-session controller
//!
//! Every state change the controller makes is also published as a
//! [`ControllerEvent`] on a tokio broadcast channel. A presentation layer can
//! subscribe once and re-render on each event instead of polling
//! [`crate::CallSessionController::snapshot`].
//!
//! ```rust
//! use voicebuddy_client_core::events::{ControllerEvent, EventEmitter};
//!
//! let emitter = EventEmitter::new(16);
//! let mut rx = emitter.subscribe();
//! emitter.emit(ControllerEvent::DurationTick { seconds: 3 });
//! assert!(matches!(rx.try_recv(), Ok(ControllerEvent::DurationTick { seconds: 3 })));
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::client::types::{CallId, CallStatus};
use crate::error::ErrorCategory;

/// Default capacity of the controller broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events emitted by the call-session controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// Session status changed
    StatusChanged {
        /// Attempt the change belongs to, if any
        call_id: Option<CallId>,
        /// Status before the change
        previous: CallStatus,
        /// Status after the change
        current: CallStatus,
    },

    /// Duration clock ticked
    DurationTick {
        /// Whole seconds since the call became active
        seconds: u64,
    },

    /// Mute flag changed
    MuteChanged {
        /// New mute flag
        muted: bool,
    },

    /// An error became visible
    ErrorRaised {
        /// Taxonomy bucket
        category: ErrorCategory,
        /// User-facing message
        message: String,
    },

    /// The visible error was dismissed
    ErrorCleared,

    /// Message forwarded from the provider (transcripts and the like)
    ProviderMessage {
        /// Attempt the message belongs to
        call_id: CallId,
        /// Raw payload as delivered by the provider
        payload: serde_json::Value,
    },
}

/// Broadcast emitter for controller events
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<ControllerEvent>,
}

impl EventEmitter {
    /// Create a new event emitter with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event
    pub fn emit(&self, event: ControllerEvent) {
        // No receivers is not an error
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_receivers_is_silent() {
        let emitter = EventEmitter::default();
        assert_eq!(emitter.receiver_count(), 0);
        emitter.emit(ControllerEvent::ErrorCleared);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ControllerEvent::MuteChanged { muted: true };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"type": "mute_changed", "muted": true}));
    }
}
