//! Call-session controller and its supporting pieces
//!
//! - [`controller`] - state, provider callbacks, teardown
//! - [`calls`] - start / end / mute operations
//! - [`config`] - credentials and timer settings
//! - [`types`] - status and snapshot types

pub mod calls;
pub mod config;
pub mod controller;
pub mod types;

mod clock;
mod listeners;


pub use config::{ClientConfig, CredentialSource, Credentials};
pub use controller::CallSessionController;
pub use types::{CallId, CallSnapshot, CallStatus, VisibleError};
