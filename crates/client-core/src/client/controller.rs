//! Call-session controller
//!
//! [`CallSessionController`] owns at most one provider handle at a time,
//! together with the listeners registered on it, the duration clock and the
//! error-dismiss timer. User-facing operations (`start_call`, `end_call`,
//! `toggle_mute`) live in [`super::calls`]; this module holds the state, the
//! provider event callbacks and teardown.
//!
//! # Locking
//!
//! Session state sits behind a single `parking_lot::Mutex`. The lock is never
//! held while calling into the provider or across an `.await`, so provider
//! listeners may fire synchronously from inside `start`, `stop` or `off`.
//!
//! # Stale events
//!
//! Each attempt gets a fresh [`CallId`]. Listener callbacks carry the id of
//! the attempt they were bound to and are ignored once that attempt is no
//! longer current.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::DurationClock;
use super::config::ClientConfig;
use super::listeners::{ListenerSet, SessionEventSink};
use super::types::{CallId, CallSnapshot, CallStatus, VisibleError};
use crate::error::{ClientError, ClientResult, ErrorCategory};
use crate::events::{ControllerEvent, EventEmitter};
use crate::provider::{ProviderHandle, VoiceProvider};

/// Provider handle plus the listeners registered on it
pub(crate) struct ActiveCall {
    pub(crate) call_id: CallId,
    pub(crate) handle: Arc<dyn ProviderHandle>,
    pub(crate) listeners: ListenerSet,
}

impl ActiveCall {
    /// Detach listeners, then release the handle without stopping it
    pub(crate) fn release(mut self) {
        self.listeners.detach(self.handle.as_ref());
        debug!("Released provider handle for call {}", self.call_id);
    }

    /// Detach listeners, stop the call, then release the handle
    ///
    /// Every step runs even if an earlier one failed; the first failure is
    /// returned.
    pub(crate) fn shutdown(mut self) -> ClientResult<()> {
        let detach_failures = self.listeners.detach(self.handle.as_ref());
        let stopped = self.handle.stop();
        let call_id = self.call_id;
        drop(self);
        debug!("Released provider handle for call {}", call_id);

        if let Err(e) = stopped {
            return Err(ClientError::cleanup(format!("stop failed: {}", e)));
        }
        match detach_failures.into_iter().next() {
            Some(e) => Err(ClientError::cleanup(format!("listener removal failed: {}", e))),
            None => Ok(()),
        }
    }
}

/// Mutable session state
pub(crate) struct SessionState {
    pub(crate) status: CallStatus,
    pub(crate) call_id: Option<CallId>,
    pub(crate) active: Option<ActiveCall>,
    pub(crate) clock: DurationClock,
    pub(crate) duration_seconds: u64,
    pub(crate) is_muted: bool,
    pub(crate) last_error: Option<VisibleError>,
    error_timer: Option<JoinHandle<()>>,
    error_seq: u64,
    pub(crate) shut_down: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: CallStatus::Idle,
            call_id: None,
            active: None,
            clock: DurationClock::new(),
            duration_seconds: 0,
            is_muted: false,
            last_error: None,
            error_timer: None,
            error_seq: 0,
            shut_down: false,
        }
    }

    /// Reset everything that is only meaningful while active
    pub(crate) fn leave_active(&mut self) {
        self.clock.cancel();
        self.duration_seconds = 0;
        self.is_muted = false;
    }

    /// Whether `call_id` is the attempt currently holding the slot
    pub(crate) fn is_current(&self, call_id: CallId) -> bool {
        self.call_id == Some(call_id)
    }
}

/// Shared core of the controller; listeners and timers hold it weakly
pub(crate) struct SessionInner {
    pub(crate) provider: Arc<dyn VoiceProvider>,
    pub(crate) config: ClientConfig,
    pub(crate) runtime: Handle,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) events: EventEmitter,
    weak_self: Weak<SessionInner>,
}

impl SessionInner {
    /// Weak sink handed to each new listener set
    pub(crate) fn sink(&self) -> Weak<dyn SessionEventSink> {
        self.weak_self.clone()
    }

    /// Change status and publish the transition
    pub(crate) fn transition(&self, state: &mut SessionState, next: CallStatus) {
        if state.status == next {
            return;
        }
        let previous = state.status;
        state.status = next;
        debug!("Call status {} -> {}", previous, next);
        self.events.emit(ControllerEvent::StatusChanged {
            call_id: state.call_id,
            previous,
            current: next,
        });
    }

    /// Show an error and schedule its dismissal
    ///
    /// A newer error replaces the older one and restarts the display window.
    pub(crate) fn raise_error(
        &self,
        state: &mut SessionState,
        category: ErrorCategory,
        message: String,
    ) {
        if let Some(timer) = state.error_timer.take() {
            timer.abort();
        }
        state.error_seq += 1;
        let seq = state.error_seq;

        warn!("Call error ({:?}): {}", category, message);
        state.last_error = Some(VisibleError {
            category,
            message: message.clone(),
        });
        self.events.emit(ControllerEvent::ErrorRaised { category, message });

        let window = self.config.error_display();
        let weak = self.weak_self.clone();
        state.error_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inner) = weak.upgrade() {
                inner.dismiss_error(seq);
            }
        }));
    }

    /// Remove the visible error immediately
    pub(crate) fn clear_error(&self, state: &mut SessionState) {
        if let Some(timer) = state.error_timer.take() {
            timer.abort();
        }
        if state.last_error.take().is_some() {
            self.events.emit(ControllerEvent::ErrorCleared);
        }
    }

    fn dismiss_error(&self, seq: u64) {
        let mut state = self.state.lock();
        if state.error_seq != seq {
            return;
        }
        state.error_timer = None;
        if state.last_error.take().is_some() {
            debug!("Error display window elapsed");
            self.events.emit(ControllerEvent::ErrorCleared);
        }
    }

    /// Move a failed attempt to `Error` and discard its handle
    ///
    /// Returns `false` when `call_id` was already superseded, in which case
    /// nothing is changed.
    pub(crate) fn fail_attempt(&self, call_id: CallId, error: &ClientError) -> bool {
        let active = {
            let mut state = self.state.lock();
            if !state.is_current(call_id) {
                debug!("Ignoring failure of superseded call {}: {}", call_id, error);
                return false;
            }
            let active = state.active.take();
            state.leave_active();
            self.transition(&mut state, CallStatus::Error);
            state.call_id = None;
            self.raise_error(&mut state, error.category(), error.to_string());
            active
        };

        if let Some(active) = active {
            active.release();
        }
        true
    }

    fn start_clock(&self, state: &mut SessionState, call_id: CallId) {
        let weak = self.weak_self.clone();
        state.clock.start(&self.runtime, self.config.tick_interval(), move |seconds| {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            let mut state = inner.state.lock();
            if !state.is_current(call_id) || state.status != CallStatus::Active {
                return false;
            }
            state.duration_seconds = seconds;
            inner.events.emit(ControllerEvent::DurationTick { seconds });
            true
        });
    }

    /// Release everything; safe to call more than once
    pub(crate) fn teardown(&self) {
        let active = {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.leave_active();
            if let Some(timer) = state.error_timer.take() {
                timer.abort();
            }
            let active = state.active.take();
            self.transition(&mut state, CallStatus::Idle);
            state.call_id = None;
            active
        };

        if let Some(active) = active {
            let call_id = active.call_id;
            if let Err(e) = active.shutdown() {
                warn!("Cleanup error while tearing down call {}: {}", call_id, e);
            }
        }
        info!("Call session controller torn down");
    }
}

impl SessionEventSink for SessionInner {
    fn on_provider_call_start(&self, call_id: CallId) {
        let mut state = self.state.lock();
        if !state.is_current(call_id) || state.active.is_none() {
            debug!("Ignoring call-start for stale call {}", call_id);
            return;
        }
        if state.status == CallStatus::Active {
            debug!("Duplicate call-start for call {}", call_id);
            return;
        }

        info!("Call {} connected", call_id);
        self.transition(&mut state, CallStatus::Active);
        self.clear_error(&mut state);
        state.duration_seconds = 0;
        self.start_clock(&mut state, call_id);
    }

    fn on_provider_call_end(&self, call_id: CallId) {
        let active = {
            let mut state = self.state.lock();
            if !state.is_current(call_id) {
                debug!("Ignoring call-end for stale call {}", call_id);
                return;
            }
            let active = state.active.take();
            state.leave_active();
            self.transition(&mut state, CallStatus::Idle);
            state.call_id = None;
            active
        };

        info!("Call {} ended by provider", call_id);
        if let Some(active) = active {
            active.release();
        }
    }

    fn on_provider_error(&self, call_id: CallId, message: String) {
        let active = {
            let mut state = self.state.lock();
            if !state.is_current(call_id) {
                debug!("Ignoring error for stale call {}: {}", call_id, message);
                return;
            }
            let active = state.active.take();
            state.leave_active();
            self.transition(&mut state, CallStatus::Error);
            state.call_id = None;

            let detail = if message.trim().is_empty() {
                "Unknown error"
            } else {
                message.as_str()
            };
            self.raise_error(
                &mut state,
                ErrorCategory::Runtime,
                format!("Connection error: {}", detail),
            );
            active
        };

        if let Some(active) = active {
            if let Err(e) = active.shutdown() {
                warn!("Cleanup error after provider failure on call {}: {}", call_id, e);
            }
        }
    }

    fn on_provider_message(&self, call_id: CallId, payload: serde_json::Value) {
        if !self.state.lock().is_current(call_id) {
            return;
        }

        if payload.get("type").and_then(|t| t.as_str()) == Some("transcript") {
            if let Some(text) = payload.get("transcript").and_then(|t| t.as_str()) {
                let role = payload.get("role").and_then(|r| r.as_str()).unwrap_or("unknown");
                debug!("{}: {}", role, text);
            }
        }
        self.events.emit(ControllerEvent::ProviderMessage { call_id, payload });
    }
}

/// Lifecycle controller for a single voice call
///
/// Created idle. Dropping the controller tears it down: the clock and error
/// timer are cancelled and any live handle is detached and stopped.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use voicebuddy_client_core::{CallSessionController, CallStatus, ClientConfig, CredentialSource};
/// use voicebuddy_client_core::provider::{MockProvider, ProviderEvent};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Arc::new(MockProvider::new());
/// let config = ClientConfig::new()
///     .with_credentials(CredentialSource::fixed("pk_test", "assistant-1"));
/// let controller = CallSessionController::new(provider.clone(), config)?;
///
/// controller.start_call().await?;
/// assert_eq!(controller.status(), CallStatus::Connecting);
///
/// provider.latest_handle().unwrap().emit(ProviderEvent::CallStart);
/// assert_eq!(controller.status(), CallStatus::Active);
///
/// controller.end_call();
/// assert_eq!(controller.status(), CallStatus::Idle);
/// # Ok(())
/// # }
/// ```
pub struct CallSessionController {
    pub(crate) inner: Arc<SessionInner>,
}

impl CallSessionController {
    /// Create an idle controller
    ///
    /// Must be called from within a tokio runtime; timers are spawned on it.
    pub fn new(provider: Arc<dyn VoiceProvider>, config: ClientConfig) -> ClientResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| ClientError::internal(format!("no tokio runtime available: {}", e)))?;
        let events = EventEmitter::new(config.event_capacity);

        info!("Creating call session controller (provider: {})", provider.name());
        let inner = Arc::new_cyclic(|weak_self| SessionInner {
            provider,
            config,
            runtime,
            state: Mutex::new(SessionState::new()),
            events,
            weak_self: weak_self.clone(),
        });

        Ok(Self { inner })
    }

    /// Current session state
    pub fn snapshot(&self) -> CallSnapshot {
        let state = self.inner.state.lock();
        CallSnapshot {
            call_id: state.call_id,
            status: state.status,
            started_at: state.clock.started_at(),
            duration_seconds: state.duration_seconds,
            is_muted: state.is_muted,
            last_error: state.last_error.clone(),
        }
    }

    /// Current status
    pub fn status(&self) -> CallStatus {
        self.inner.state.lock().status
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ControllerEvent> {
        self.inner.events.subscribe()
    }

    /// Whether a provider handle is currently held
    pub fn has_handle(&self) -> bool {
        self.inner.state.lock().active.is_some()
    }

    /// Whether the duration clock is running
    pub fn is_clock_running(&self) -> bool {
        self.inner.state.lock().clock.is_running()
    }

    /// Configuration the controller was built with
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Release the call and all timers; later starts fail with `ShutDown`
    ///
    /// Cleanup errors are logged and swallowed. Runs automatically on drop.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl Drop for CallSessionController {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl std::fmt::Debug for CallSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSessionController")
            .field("provider", &self.inner.provider.name())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
