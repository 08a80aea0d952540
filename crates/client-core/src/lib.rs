//! # voicebuddy client-core
//!
//! Lifecycle controller for a single voice conversation with an AI assistant
//! hosted by an external real-time voice provider.
//!
//! The provider does all the hard work (audio capture, transport, speech
//! recognition, the assistant itself). This crate keeps the client side
//! honest:
//!
//! - at most one provider handle exists at a time
//! - every listener registered on a handle is removed before the handle is
//!   released
//! - the call duration clock never outlives the active call
//! - errors are surfaced to the presentation layer and dismissed after a
//!   fixed window
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voicebuddy_client_core::{CallSessionController, ClientConfig};
//! use voicebuddy_client_core::provider::MockProvider;
//! use voicebuddy_client_core::view::CallView;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials come from VOICE_API_KEY / VOICE_ASSISTANT_ID
//!     let provider = Arc::new(MockProvider::new());
//!     let controller = CallSessionController::new(provider, ClientConfig::new())?;
//!
//!     controller.start_call().await?;
//!     println!("{}", CallView::from_snapshot(&controller.snapshot()).status_label);
//!
//!     controller.end_call();
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`client`] - the controller, its operations and configuration
//! - [`provider`] - provider traits and the in-memory mock provider
//! - [`events`] - broadcast events published on every state change
//! - [`view`] - presentation model derived from a snapshot
//! - [`error`] - error types

pub mod client;
pub mod error;
pub mod events;
pub mod provider;
pub mod view;

pub use client::{
    CallId, CallSessionController, CallSnapshot, CallStatus, ClientConfig, CredentialSource,
    Credentials, VisibleError,
};
pub use error::{ClientError, ClientResult, ErrorCategory, ProviderError, ProviderResult};
pub use events::{ControllerEvent, EventEmitter};
pub use provider::{Listener, ProviderEvent, ProviderEventKind, ProviderHandle, VoiceProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
