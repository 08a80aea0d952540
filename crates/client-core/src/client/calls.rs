//! Call operations for the call-session controller
//!
//! - **Start**: [`CallSessionController::start_call`]
//! - **End**: [`CallSessionController::end_call`]
//! - **Mute**: [`CallSessionController::toggle_mute`]
//!
//! # Start sequence
//!
//! ```text
//! Idle/Error ──start_call──▶ Connecting ──call-start──▶ Active
//!                               │                         │
//!                  config/start failure          call-end │ error
//!                               ▼                         ▼
//!                             Error ◀───────────────── Idle / Error
//! ```

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::controller::{ActiveCall, CallSessionController};
use super::listeners::ListenerSet;
use super::types::CallStatus;
use crate::error::{ClientError, ClientResult};
use crate::events::ControllerEvent;

impl CallSessionController {
    /// Begin a new call
    ///
    /// Returns once the provider accepted the initiation request. The call is
    /// not connected yet: status stays `Connecting` until the provider fires
    /// `call-start`.
    ///
    /// # Errors
    ///
    /// * `ClientError::CallInProgress` - a call is already connecting or active;
    ///   nothing is changed
    /// * `ClientError::Configuration` - API key or assistant id missing; status
    ///   moves straight to `Error` and no handle was constructed
    /// * `ClientError::Initiation` - the provider refused the call; its handle
    ///   was detached and released
    /// * `ClientError::ShutDown` - the controller was torn down
    ///
    /// If the call is ended while the provider is still processing the start
    /// request, the start outcome is ignored and `Ok(())` is returned.
    pub async fn start_call(&self) -> ClientResult<()> {
        let inner = &self.inner;

        let (call_id, credentials) = {
            let mut state = inner.state.lock();
            if state.shut_down {
                return Err(ClientError::ShutDown);
            }
            if state.status.is_in_progress() {
                warn!("Rejecting start: call already {}", state.status);
                return Err(ClientError::CallInProgress);
            }

            state.leave_active();
            inner.clear_error(&mut state);

            // Missing credentials never reach Connecting
            let credentials = match inner.config.credentials.resolve() {
                Ok(credentials) => credentials,
                Err(e) => {
                    state.call_id = None;
                    inner.transition(&mut state, CallStatus::Error);
                    inner.raise_error(&mut state, e.category(), e.to_string());
                    return Err(e);
                }
            };

            let call_id = Uuid::new_v4();
            state.call_id = Some(call_id);
            inner.transition(&mut state, CallStatus::Connecting);
            (call_id, credentials)
        };
        info!("Starting call {}", call_id);

        let handle = match inner.provider.connect(&credentials.api_key) {
            Ok(handle) => handle,
            Err(e) => {
                let err = ClientError::initiation(e.to_string());
                inner.fail_attempt(call_id, &err);
                return Err(err);
            }
        };

        let listeners = ListenerSet::bind(call_id, inner.sink());
        listeners.attach(handle.as_ref());

        {
            let mut state = inner.state.lock();
            let active = ActiveCall {
                call_id,
                handle: handle.clone(),
                listeners,
            };
            if !state.is_current(call_id) || state.shut_down {
                drop(state);
                debug!("Call {} superseded before the handle was stored", call_id);
                active.release();
                return Ok(());
            }
            state.active = Some(active);
        }

        match handle.start(&credentials.assistant_id).await {
            Ok(()) => {
                debug!("Provider accepted call {}", call_id);
                Ok(())
            }
            Err(e) => {
                let err = ClientError::initiation(e.to_string());
                if inner.fail_attempt(call_id, &err) {
                    Err(err)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// End the current call
    ///
    /// A no-op when no call is in progress. While the provider handle is
    /// still being constructed, the attempt is abandoned and status becomes
    /// `Idle`; the handle is released as soon as construction returns.
    /// Otherwise status becomes `Idle` and the clock stops before the
    /// provider is contacted; then every listener is removed, the call is
    /// stopped and the handle is released, in that order. Provider failures
    /// are logged and never returned.
    pub fn end_call(&self) {
        let active = {
            let mut state = self.inner.state.lock();
            let Some(active) = state.active.take() else {
                if state.status == CallStatus::Connecting {
                    // The pending start sees the attempt superseded and
                    // releases its handle once provider construction returns
                    if let Some(call_id) = state.call_id {
                        info!("Ending call {} before its handle was stored", call_id);
                    }
                    state.leave_active();
                    self.inner.transition(&mut state, CallStatus::Idle);
                    state.call_id = None;
                } else {
                    debug!("end_call with no active handle");
                }
                return;
            };
            state.leave_active();
            self.inner.transition(&mut state, CallStatus::Idle);
            state.call_id = None;
            active
        };

        let call_id = active.call_id;
        info!("Ending call {}", call_id);
        if let Err(e) = active.shutdown() {
            warn!("Error ending call {}: {}", call_id, e);
        }
    }

    /// Flip the microphone mute flag
    ///
    /// Only acts while the call is active; otherwise returns the current flag
    /// without contacting the provider. Returns the flag after the toggle.
    ///
    /// # Errors
    ///
    /// * `ClientError::Provider` - the provider rejected the new flag; the
    ///   local flag is left unchanged
    pub fn toggle_mute(&self) -> ClientResult<bool> {
        let (handle, call_id, muted) = {
            let state = self.inner.state.lock();
            match (&state.active, state.status) {
                (Some(active), CallStatus::Active) => {
                    (active.handle.clone(), active.call_id, !state.is_muted)
                }
                _ => {
                    debug!("Ignoring mute toggle while {}", state.status);
                    return Ok(state.is_muted);
                }
            }
        };

        handle.set_muted(muted)?;

        let mut state = self.inner.state.lock();
        if state.is_current(call_id) && state.status == CallStatus::Active {
            state.is_muted = muted;
            self.inner.events.emit(ControllerEvent::MuteChanged { muted });
            debug!("Call {} {}", call_id, if muted { "muted" } else { "unmuted" });
        }
        Ok(state.is_muted)
    }
}
