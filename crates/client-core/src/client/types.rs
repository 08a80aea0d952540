//! Type definitions for the call-session controller
//!
//! - [`CallStatus`] - the four-state session status
//! - [`CallSnapshot`] - the read model consumed by the presentation layer
//! - [`CallId`] - identifier of one call attempt

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorCategory;

/// Identifier of a single call attempt
pub type CallId = Uuid;

/// Status of the call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// No call; ready to start one
    #[default]
    Idle,
    /// Start requested, waiting for the provider to report `call-start`
    Connecting,
    /// Provider reported the call as connected
    Active,
    /// The last attempt failed; behaves like `Idle` for new attempts
    Error,
}

impl CallStatus {
    /// Whether a call attempt currently holds the provider handle slot
    pub fn is_in_progress(&self) -> bool {
        matches!(self, CallStatus::Connecting | CallStatus::Active)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallStatus::Idle => "idle",
            CallStatus::Connecting => "connecting",
            CallStatus::Active => "active",
            CallStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Error currently shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleError {
    /// Taxonomy bucket
    pub category: ErrorCategory,
    /// User-facing message
    pub message: String,
}

/// Point-in-time view of the call session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSnapshot {
    /// Current attempt, if one is connecting or active
    pub call_id: Option<CallId>,
    /// Session status
    pub status: CallStatus,
    /// When the call became active
    pub started_at: Option<DateTime<Utc>>,
    /// Whole seconds since the call became active; zero unless active
    pub duration_seconds: u64,
    /// Microphone mute flag; always false unless active
    pub is_muted: bool,
    /// Error banner contents, cleared automatically after the display window
    pub last_error: Option<VisibleError>,
}

impl CallSnapshot {
    /// Snapshot of a freshly created controller
    pub fn idle() -> Self {
        Self {
            call_id: None,
            status: CallStatus::Idle,
            started_at: None,
            duration_seconds: 0,
            is_muted: false,
            last_error: None,
        }
    }

    /// `started_at` as epoch milliseconds
    pub fn started_at_epoch_millis(&self) -> Option<i64> {
        self.started_at.map(|t| t.timestamp_millis())
    }

    /// Message of the visible error, if any
    pub fn error_message(&self) -> Option<&str> {
        self.last_error.as_ref().map(|e| e.message.as_str())
    }
}

impl Default for CallSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
