//! Configuration for the call-session controller
//!
//! Credentials are resolved when a call starts, not when the controller is
//! built, so a key exported after start-up is still picked up.
//!
//! # Usage Examples
//!
//! ```rust
//! use voicebuddy_client_core::client::config::{ClientConfig, CredentialSource};
//! use std::time::Duration;
//!
//! // Read VOICE_API_KEY / VOICE_ASSISTANT_ID at call time
//! let config = ClientConfig::new();
//! assert_eq!(config.tick_interval(), Duration::from_secs(1));
//! assert_eq!(config.error_display(), Duration::from_secs(5));
//!
//! // Fixed credentials
//! let config = ClientConfig::new()
//!     .with_credentials(CredentialSource::fixed("pk_live", "assistant-42"));
//! let creds = config.credentials.resolve().unwrap();
//! assert_eq!(creds.assistant_id, "assistant-42");
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::events::DEFAULT_EVENT_CAPACITY;

/// Environment variable holding the provider API key
pub const DEFAULT_API_KEY_VAR: &str = "VOICE_API_KEY";

/// Environment variable holding the assistant identifier
pub const DEFAULT_ASSISTANT_ID_VAR: &str = "VOICE_ASSISTANT_ID";

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_error_display_ms() -> u64 {
    5_000
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

/// Where the API key and assistant identifier come from
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CredentialSource {
    /// Read from environment variables at call-start time
    Environment {
        /// Variable holding the API key
        api_key_var: String,
        /// Variable holding the assistant identifier
        assistant_id_var: String,
    },
    /// Values supplied by the embedding application
    Static {
        /// Provider API key
        #[serde(skip_serializing)]
        api_key: Option<String>,
        /// Assistant identifier
        assistant_id: Option<String>,
    },
}

impl CredentialSource {
    /// Environment source using `VOICE_API_KEY` and `VOICE_ASSISTANT_ID`
    pub fn environment() -> Self {
        CredentialSource::Environment {
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
            assistant_id_var: DEFAULT_ASSISTANT_ID_VAR.to_string(),
        }
    }

    /// Static source with both values present
    pub fn fixed(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        CredentialSource::Static {
            api_key: Some(api_key.into()),
            assistant_id: Some(assistant_id.into()),
        }
    }

    /// Resolve both values, failing on the first one missing or empty
    ///
    /// The API key is checked before the assistant identifier.
    pub fn resolve(&self) -> ClientResult<Credentials> {
        let (api_key, assistant_id) = match self {
            CredentialSource::Environment {
                api_key_var,
                assistant_id_var,
            } => (read_var(api_key_var), read_var(assistant_id_var)),
            CredentialSource::Static {
                api_key,
                assistant_id,
            } => (api_key.clone(), assistant_id.clone()),
        };

        let api_key = non_empty(api_key)
            .ok_or_else(|| ClientError::config("voice API key is not configured"))?;
        let assistant_id = non_empty(assistant_id)
            .ok_or_else(|| ClientError::config("voice assistant ID is not configured"))?;

        Ok(Credentials {
            api_key,
            assistant_id,
        })
    }
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::environment()
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment {
                api_key_var,
                assistant_id_var,
            } => f
                .debug_struct("Environment")
                .field("api_key_var", api_key_var)
                .field("assistant_id_var", assistant_id_var)
                .finish(),
            CredentialSource::Static {
                api_key,
                assistant_id,
            } => f
                .debug_struct("Static")
                .field("api_key", &api_key.as_ref().map(|_| "[REDACTED]"))
                .field("assistant_id", assistant_id)
                .finish(),
        }
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolved credentials for one call attempt
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Provider API key
    pub api_key: String,
    /// Assistant to connect to
    pub assistant_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Credential source
    #[serde(default)]
    pub credentials: CredentialSource,
    /// Duration clock period in milliseconds. Default: 1000.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How long an error stays visible in milliseconds. Default: 5000.
    #[serde(default = "default_error_display_ms")]
    pub error_display_ms: u64,
    /// Capacity of the controller event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl ClientConfig {
    /// Default configuration reading credentials from the environment
    pub fn new() -> Self {
        Self {
            credentials: CredentialSource::environment(),
            tick_interval_ms: default_tick_interval_ms(),
            error_display_ms: default_error_display_ms(),
            event_capacity: default_event_capacity(),
        }
    }

    /// Set the credential source
    pub fn with_credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the duration clock period
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    /// Set how long errors stay visible
    pub fn with_error_display(mut self, window: Duration) -> Self {
        self.error_display_ms = window.as_millis() as u64;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Duration clock period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Error display window
    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_source_checks_api_key_first() {
        let source = CredentialSource::Static {
            api_key: None,
            assistant_id: None,
        };
        let err = source.resolve().unwrap_err();
        assert_eq!(err.to_string(), "voice API key is not configured");
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let source = CredentialSource::Static {
            api_key: Some("pk".into()),
            assistant_id: Some("   ".into()),
        };
        let err = source.resolve().unwrap_err();
        assert_eq!(err.to_string(), "voice assistant ID is not configured");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let source = CredentialSource::fixed("pk_secret", "assistant");
        let rendered = format!("{:?}", source);
        assert!(!rendered.contains("pk_secret"));
        assert!(rendered.contains("[REDACTED]"));

        let creds = source.resolve().unwrap();
        assert!(!format!("{:?}", creds).contains("pk_secret"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "credentials": {
                "source": "environment",
                "api_key_var": "MY_KEY",
                "assistant_id_var": "MY_ASSISTANT"
            }
        }))
        .unwrap();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.error_display_ms, 5_000);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn test_builder_keeps_sub_second_windows() {
        let config = ClientConfig::new()
            .with_tick_interval(Duration::from_millis(250))
            .with_error_display(Duration::from_millis(750))
            .with_event_capacity(0);
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.error_display(), Duration::from_millis(750));
        assert_eq!(config.event_capacity, 1);
    }
}
