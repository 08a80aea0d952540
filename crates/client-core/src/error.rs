//! Error types for the voice client library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for operations performed by a provider handle
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur in the call-session controller
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Required credential or assistant identifier is absent
    #[error("{message}")]
    Configuration { message: String },

    /// A call is already connecting or active
    #[error("Call already in progress")]
    CallInProgress,

    /// The provider refused or failed to initiate the call
    #[error("Failed to start call: {reason}")]
    Initiation { reason: String },

    /// The provider reported a failure during an established operation
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Stopping the call or removing a listener failed
    #[error("Cleanup error: {message}")]
    Cleanup { message: String },

    /// The controller has been torn down
    #[error("Call controller has been shut down")]
    ShutDown,

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ClientError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an initiation error
    pub fn initiation(reason: impl Into<String>) -> Self {
        Self::Initiation {
            reason: reason.into(),
        }
    }

    /// Create a cleanup error
    pub fn cleanup(message: impl Into<String>) -> Self {
        Self::Cleanup {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Taxonomy bucket this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::CallInProgress | Self::Initiation { .. } | Self::ShutDown => {
                ErrorCategory::Initiation
            }
            Self::Provider(_) | Self::Internal { .. } => ErrorCategory::Runtime,
            Self::Cleanup { .. } => ErrorCategory::Cleanup,
        }
    }
}

/// Errors raised by a voice provider handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider rejected the request
    #[error("{0}")]
    Rejected(String),

    /// Transport-level failure reported by the provider SDK
    #[error("transport failure: {0}")]
    Transport(String),

    /// The handle is no longer usable
    #[error("handle is closed")]
    Closed,

    /// The listener was not registered on this handle
    #[error("listener for '{event}' is not registered")]
    UnknownListener { event: String },
}

/// Error categories used to classify surfaced errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Credential or assistant identifier missing
    Configuration,
    /// Provider rejected the call during start
    Initiation,
    /// Provider emitted an error after the call was underway
    Runtime,
    /// Stop or listener removal failed during cleanup
    Cleanup,
}
