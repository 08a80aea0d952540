//! Per-attempt listener bookkeeping
//!
//! A [`ListenerSet`] owns the four closures registered on one provider
//! handle. Each closure keeps only a `Weak` reference to its sink, so a handle
//! that outlives the controller never keeps the controller alive.
//!
//! Every slot is taken exactly once on detach: detaching twice, or detaching
//! a set that was never attached, does not call `off` again.

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use crate::client::types::CallId;
use crate::error::ProviderError;
use crate::provider::{Listener, ProviderEvent, ProviderEventKind, ProviderHandle};

/// Receiver of provider events for one call attempt
pub(crate) trait SessionEventSink: Send + Sync {
    fn on_provider_call_start(&self, call_id: CallId);
    fn on_provider_call_end(&self, call_id: CallId);
    fn on_provider_error(&self, call_id: CallId, message: String);
    fn on_provider_message(&self, call_id: CallId, payload: serde_json::Value);
}

/// The four listeners of one call attempt
pub(crate) struct ListenerSet {
    call_id: CallId,
    call_start: Option<Listener>,
    call_end: Option<Listener>,
    error: Option<Listener>,
    message: Option<Listener>,
}

impl ListenerSet {
    /// Build fresh listeners forwarding to `sink`, tagged with `call_id`
    pub(crate) fn bind(call_id: CallId, sink: Weak<dyn SessionEventSink>) -> Self {
        Self {
            call_id,
            call_start: Some(forwarder(call_id, sink.clone(), ProviderEventKind::CallStart)),
            call_end: Some(forwarder(call_id, sink.clone(), ProviderEventKind::CallEnd)),
            error: Some(forwarder(call_id, sink.clone(), ProviderEventKind::Error)),
            message: Some(forwarder(call_id, sink, ProviderEventKind::Message)),
        }
    }

    /// Register every live listener on `handle`
    pub(crate) fn attach(&self, handle: &dyn ProviderHandle) {
        for kind in ProviderEventKind::ALL {
            if let Some(listener) = self.slot(kind) {
                handle.on(kind, listener.clone());
            }
        }
        debug!("Attached listeners for call {}", self.call_id);
    }

    /// Remove every live listener from `handle`, one at a time
    ///
    /// A failing `off` does not stop the remaining removals. Failures are
    /// returned so the caller can decide how loudly to report them.
    pub(crate) fn detach(&mut self, handle: &dyn ProviderHandle) -> Vec<ProviderError> {
        let mut failures = Vec::new();
        for kind in ProviderEventKind::ALL {
            if let Some(listener) = self.slot_mut(kind).take() {
                if let Err(e) = handle.off(kind, &listener) {
                    warn!("Failed to remove '{}' listener for call {}: {}", kind, self.call_id, e);
                    failures.push(e);
                }
            }
        }
        debug!("Detached listeners for call {}", self.call_id);
        failures
    }

    /// Number of listeners not yet detached
    pub(crate) fn live_count(&self) -> usize {
        ProviderEventKind::ALL
            .iter()
            .filter(|kind| self.slot(**kind).is_some())
            .count()
    }

    fn slot(&self, kind: ProviderEventKind) -> Option<&Listener> {
        match kind {
            ProviderEventKind::CallStart => self.call_start.as_ref(),
            ProviderEventKind::CallEnd => self.call_end.as_ref(),
            ProviderEventKind::Error => self.error.as_ref(),
            ProviderEventKind::Message => self.message.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: ProviderEventKind) -> &mut Option<Listener> {
        match kind {
            ProviderEventKind::CallStart => &mut self.call_start,
            ProviderEventKind::CallEnd => &mut self.call_end,
            ProviderEventKind::Error => &mut self.error,
            ProviderEventKind::Message => &mut self.message,
        }
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("call_id", &self.call_id)
            .field("live", &self.live_count())
            .finish()
    }
}

fn forwarder(
    call_id: CallId,
    sink: Weak<dyn SessionEventSink>,
    kind: ProviderEventKind,
) -> Listener {
    Arc::new(move |event: &ProviderEvent| {
        if event.kind() != kind {
            return;
        }
        let Some(sink) = sink.upgrade() else {
            debug!("Dropping '{}' for call {}: controller is gone", kind, call_id);
            return;
        };
        match event {
            ProviderEvent::CallStart => sink.on_provider_call_start(call_id),
            ProviderEvent::CallEnd => sink.on_provider_call_end(call_id),
            ProviderEvent::Error { message } => sink.on_provider_error(call_id, message.clone()),
            ProviderEvent::Message(payload) => sink.on_provider_message(call_id, payload.clone()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::{HandleCall, MockBehavior, MockProvider, VoiceProvider};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<String>>,
    }

    impl SessionEventSink for RecordingSink {
        fn on_provider_call_start(&self, _call_id: CallId) {
            self.seen.lock().push("start".into());
        }
        fn on_provider_call_end(&self, _call_id: CallId) {
            self.seen.lock().push("end".into());
        }
        fn on_provider_error(&self, _call_id: CallId, message: String) {
            self.seen.lock().push(format!("error:{}", message));
        }
        fn on_provider_message(&self, _call_id: CallId, _payload: serde_json::Value) {
            self.seen.lock().push("message".into());
        }
    }

    fn sink() -> (Arc<RecordingSink>, Weak<dyn SessionEventSink>) {
        let sink = Arc::new(RecordingSink::default());
        let as_dyn: Arc<dyn SessionEventSink> = sink.clone();
        let weak = Arc::downgrade(&as_dyn);
        (sink, weak)
    }

    #[test]
    fn test_attach_registers_all_four_and_routes_events() {
        let provider = MockProvider::new();
        let handle = provider.connect("key").unwrap();
        let mock = provider.latest_handle().unwrap();
        let (recorder, weak) = sink();

        let set = ListenerSet::bind(CallId::new_v4(), weak);
        set.attach(handle.as_ref());
        assert_eq!(mock.listener_count(), 4);

        mock.emit(ProviderEvent::CallStart);
        mock.emit(ProviderEvent::error("lost"));
        assert_eq!(*recorder.seen.lock(), vec!["start".to_string(), "error:lost".to_string()]);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let provider = MockProvider::new();
        let handle = provider.connect("key").unwrap();
        let mock = provider.latest_handle().unwrap();
        let (_recorder, weak) = sink();

        let mut set = ListenerSet::bind(CallId::new_v4(), weak);
        set.attach(handle.as_ref());
        assert!(set.detach(handle.as_ref()).is_empty());
        assert!(set.detach(handle.as_ref()).is_empty());

        assert_eq!(mock.listener_count(), 0);
        assert_eq!(set.live_count(), 0);
        let offs = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, HandleCall::Off(_)))
            .count();
        assert_eq!(offs, 4);
    }

    #[test]
    fn test_detach_continues_past_failures() {
        let provider = MockProvider::with_behavior(MockBehavior {
            off_error: Some(ProviderError::Transport("socket closed".into())),
            ..Default::default()
        });
        let handle = provider.connect("key").unwrap();
        let (_recorder, weak) = sink();

        let mut set = ListenerSet::bind(CallId::new_v4(), weak);
        set.attach(handle.as_ref());
        let failures = set.detach(handle.as_ref());
        assert_eq!(failures.len(), 4);
        assert_eq!(set.live_count(), 0);
    }

    #[test]
    fn test_listener_outliving_sink_is_inert() {
        let provider = MockProvider::new();
        let handle = provider.connect("key").unwrap();
        let mock = provider.latest_handle().unwrap();
        let (recorder, weak) = sink();

        let set = ListenerSet::bind(CallId::new_v4(), weak);
        set.attach(handle.as_ref());
        drop(recorder);

        // Must not panic
        assert_eq!(mock.emit(ProviderEvent::CallEnd), 1);
    }
}
