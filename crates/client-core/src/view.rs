//! Presentation model for the call screen
//!
//! [`CallView`] is a pure function of a [`CallSnapshot`]. It carries the
//! strings and affordances a front end needs and no rendering logic of its
//! own.

use serde::{Deserialize, Serialize};

use crate::client::types::{CallSnapshot, CallStatus};

/// Brand shown in the page header
pub const BRAND: &str = "Eobu";

/// First line of the page headline
pub const HEADLINE: &str = "Your Buddy";

/// Second line of the page headline
pub const HEADLINE_SUBTITLE: &str = "in Every Conversation";

/// Copy shown under the headline
pub const TAGLINE: &str = "Experience seamless AI conversations with natural voice interactions";

/// Call to action shown under the tagline
pub const CALL_TO_ACTION: &str = "Just tap and start talking";

/// Title of the error banner
pub const ERROR_BANNER_TITLE: &str = "Connection Error";

/// Format whole seconds as `m:ss`
///
/// ```rust
/// use voicebuddy_client_core::view::format_duration;
///
/// assert_eq!(format_duration(0), "0:00");
/// assert_eq!(format_duration(65), "1:05");
/// assert_eq!(format_duration(3600), "60:00");
/// ```
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Colour family of the status pill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Grey, static
    Ready,
    /// Yellow, pulsing
    Connecting,
    /// Green, pulsing
    Connected,
}

impl Indicator {
    /// Whether the indicator dot animates
    pub fn pulses(&self) -> bool {
        !matches!(self, Indicator::Ready)
    }
}

/// Primary control area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Controls {
    /// Single start button
    StartButton {
        /// Button caption
        label: String,
        /// False while a start is pending
        enabled: bool,
        /// Spinner shown in place of the phone icon
        busy: bool,
    },
    /// Mute toggle and end button
    InCall {
        /// Tooltip of the mute toggle
        mute_title: String,
        /// Whether the microphone is muted
        muted: bool,
        /// End button caption
        end_label: String,
    },
}

/// Transient error banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    /// Banner heading
    pub title: String,
    /// Error message
    pub message: String,
}

/// Everything the call screen displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallView {
    /// Text inside the status pill
    pub status_label: String,
    /// Status pill styling
    pub indicator: Indicator,
    /// Buttons
    pub controls: Controls,
    /// Error banner, if an error is visible
    pub banner: Option<Banner>,
}

impl CallView {
    /// Derive the view from a controller snapshot
    ///
    /// `Error` renders exactly like `Idle`; the failure is only visible
    /// through the banner.
    pub fn from_snapshot(snapshot: &CallSnapshot) -> Self {
        let (status_label, indicator) = match snapshot.status {
            CallStatus::Active => (
                format!("Connected • {}", format_duration(snapshot.duration_seconds)),
                Indicator::Connected,
            ),
            CallStatus::Connecting => ("Connecting...".to_string(), Indicator::Connecting),
            CallStatus::Idle | CallStatus::Error => {
                ("Ready to connect".to_string(), Indicator::Ready)
            }
        };

        let controls = match snapshot.status {
            CallStatus::Active => Controls::InCall {
                mute_title: if snapshot.is_muted { "Unmute" } else { "Mute" }.to_string(),
                muted: snapshot.is_muted,
                end_label: "End Call".to_string(),
            },
            CallStatus::Connecting => Controls::StartButton {
                label: "Connecting...".to_string(),
                enabled: false,
                busy: true,
            },
            CallStatus::Idle | CallStatus::Error => Controls::StartButton {
                label: "Start Conversation".to_string(),
                enabled: true,
                busy: false,
            },
        };

        let banner = snapshot.last_error.as_ref().map(|e| Banner {
            title: ERROR_BANNER_TITLE.to_string(),
            message: e.message.clone(),
        });

        Self {
            status_label,
            indicator,
            controls,
            banner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::VisibleError;
    use crate::error::ErrorCategory;

    #[test]
    fn test_static_copy() {
        assert_eq!(BRAND, "Eobu");
        assert_eq!(HEADLINE, "Your Buddy");
        assert_eq!(ERROR_BANNER_TITLE, "Connection Error");
    }

    #[test]
    fn test_idle_view() {
        let view = CallView::from_snapshot(&CallSnapshot::idle());
        assert_eq!(view.status_label, "Ready to connect");
        assert_eq!(view.indicator, Indicator::Ready);
        assert!(!view.indicator.pulses());
        assert_eq!(
            view.controls,
            Controls::StartButton {
                label: "Start Conversation".into(),
                enabled: true,
                busy: false
            }
        );
        assert!(view.banner.is_none());
    }

    #[test]
    fn test_connecting_disables_start() {
        let snapshot = CallSnapshot {
            status: CallStatus::Connecting,
            ..CallSnapshot::idle()
        };
        let view = CallView::from_snapshot(&snapshot);
        assert_eq!(view.status_label, "Connecting...");
        assert!(matches!(view.controls, Controls::StartButton { enabled: false, busy: true, .. }));
    }

    #[test]
    fn test_active_view_shows_duration_and_mute() {
        let snapshot = CallSnapshot {
            status: CallStatus::Active,
            duration_seconds: 65,
            is_muted: true,
            ..CallSnapshot::idle()
        };
        let view = CallView::from_snapshot(&snapshot);
        assert_eq!(view.status_label, "Connected • 1:05");
        assert_eq!(view.indicator, Indicator::Connected);
        assert_eq!(
            view.controls,
            Controls::InCall {
                mute_title: "Unmute".into(),
                muted: true,
                end_label: "End Call".into()
            }
        );
    }

    #[test]
    fn test_error_renders_as_ready_with_banner() {
        let snapshot = CallSnapshot {
            status: CallStatus::Error,
            last_error: Some(VisibleError {
                category: ErrorCategory::Runtime,
                message: "Connection error: ice failed".into(),
            }),
            ..CallSnapshot::idle()
        };
        let view = CallView::from_snapshot(&snapshot);
        assert_eq!(view.status_label, "Ready to connect");
        assert_eq!(
            view.banner,
            Some(Banner {
                title: "Connection Error".into(),
                message: "Connection error: ice failed".into()
            })
        );
    }
}
