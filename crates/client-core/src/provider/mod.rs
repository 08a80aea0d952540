//! Voice provider abstraction
//!
//! The controller never talks to a concrete SDK. It consumes two traits:
//!
//! - [`VoiceProvider`] constructs a fresh [`ProviderHandle`] from an API key
//! - [`ProviderHandle`] starts/stops one call, forwards the mute flag, and
//!   accepts event listeners for `call-start`, `call-end`, `error` and
//!   `message`
//!
//! Listeners are reference-counted closures. A listener is identified by its
//! `Arc` allocation, so `off` must be given the exact `Listener` that was
//! passed to `on`.
//!
//! ```text
//! ┌──────────────────────────┐
//! │  CallSessionController   │
//! └───────────┬──────────────┘
//!             │ connect(api_key)
//! ┌───────────▼──────────────┐
//! │      VoiceProvider       │
//! └───────────┬──────────────┘
//!             │ Arc<dyn ProviderHandle>
//! ┌───────────▼──────────────┐
//! │  start / stop / set_muted│
//! │  on / off (listeners)    │
//! └──────────────────────────┘
//! ```

pub mod mock;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;

pub use mock::{HandleCall, MockBehavior, MockHandle, MockProvider};

/// Names of the events a provider handle can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEventKind {
    /// The provider established the call
    #[serde(rename = "call-start")]
    CallStart,
    /// The provider ended the call
    #[serde(rename = "call-end")]
    CallEnd,
    /// The provider reported a failure
    #[serde(rename = "error")]
    Error,
    /// Transcript or other assistant message
    #[serde(rename = "message")]
    Message,
}

impl ProviderEventKind {
    /// Every event kind, in registration order
    pub const ALL: [ProviderEventKind; 4] = [
        ProviderEventKind::CallStart,
        ProviderEventKind::CallEnd,
        ProviderEventKind::Error,
        ProviderEventKind::Message,
    ];

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEventKind::CallStart => "call-start",
            ProviderEventKind::CallEnd => "call-end",
            ProviderEventKind::Error => "error",
            ProviderEventKind::Message => "message",
        }
    }
}

impl fmt::Display for ProviderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event delivered by a provider handle to its listeners
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// Call connected
    CallStart,
    /// Call ended on the provider side
    CallEnd,
    /// Provider failure; `message` may be empty when the SDK gave none
    Error { message: String },
    /// Free-form message payload (transcripts, function calls, ...)
    Message(serde_json::Value),
}

impl ProviderEvent {
    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        ProviderEvent::Error {
            message: message.into(),
        }
    }

    /// Kind of listener this event is delivered to
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            ProviderEvent::CallStart => ProviderEventKind::CallStart,
            ProviderEvent::CallEnd => ProviderEventKind::CallEnd,
            ProviderEvent::Error { .. } => ProviderEventKind::Error,
            ProviderEvent::Message(_) => ProviderEventKind::Message,
        }
    }
}

/// Event observer registered on a provider handle
pub type Listener = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

/// Whether two listeners are the same registration
pub fn same_listener(a: &Listener, b: &Listener) -> bool {
    Arc::ptr_eq(a, b)
}

/// Per-call handle to the external voice provider
///
/// `start` resolves once the provider accepted the initiation request. The
/// call is only connected when the `call-start` event fires.
#[async_trait]
pub trait ProviderHandle: Send + Sync {
    /// Ask the provider to begin a call with the given assistant
    async fn start(&self, assistant_id: &str) -> ProviderResult<()>;

    /// Stop the call
    fn stop(&self) -> ProviderResult<()>;

    /// Forward the microphone mute flag
    fn set_muted(&self, muted: bool) -> ProviderResult<()>;

    /// Register a listener for one event kind
    fn on(&self, kind: ProviderEventKind, listener: Listener);

    /// Remove a listener previously passed to [`ProviderHandle::on`]
    fn off(&self, kind: ProviderEventKind, listener: &Listener) -> ProviderResult<()>;
}

/// Factory for provider handles
pub trait VoiceProvider: Send + Sync {
    /// Human-readable provider name used in logs
    fn name(&self) -> &str;

    /// Construct a new handle authenticated with `api_key`
    fn connect(&self, api_key: &str) -> ProviderResult<Arc<dyn ProviderHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names() {
        let names: Vec<&str> = ProviderEventKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["call-start", "call-end", "error", "message"]);
        assert_eq!(
            serde_json::to_string(&ProviderEventKind::CallEnd).unwrap(),
            "\"call-end\""
        );
    }

    #[test]
    fn test_listener_identity() {
        let a: Listener = Arc::new(|_: &ProviderEvent| {});
        let b: Listener = Arc::new(|_: &ProviderEvent| {});
        let a2 = a.clone();
        assert!(same_listener(&a, &a2));
        assert!(!same_listener(&a, &b));
    }

    #[test]
    fn test_event_kind_of_payloads() {
        assert_eq!(ProviderEvent::error("boom").kind(), ProviderEventKind::Error);
        assert_eq!(
            ProviderEvent::Message(serde_json::json!({"type": "transcript"})).kind(),
            ProviderEventKind::Message
        );
    }
}
