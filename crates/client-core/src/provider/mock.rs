//! In-memory voice provider
//!
//! `MockProvider` hands out [`MockHandle`]s that record every operation the
//! controller performs on them, in order. Failures can be injected per
//! operation through [`MockBehavior`], and events are fired with
//! [`MockHandle::emit`]. Used by the test suite and the `scripted_call` demo.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::{
    same_listener, Listener, ProviderEvent, ProviderEventKind, ProviderHandle, VoiceProvider,
};
use crate::error::{ProviderError, ProviderResult};

/// One operation performed on a [`MockHandle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleCall {
    /// Listener registered
    On(ProviderEventKind),
    /// Listener removed
    Off(ProviderEventKind),
    /// Call start requested for the assistant id
    Start(String),
    /// Call stop requested
    Stop,
    /// Mute flag forwarded
    SetMuted(bool),
}

/// Failure injection and timing knobs applied to new handles
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Fail handle construction
    pub connect_error: Option<ProviderError>,
    /// Fail `start`
    pub start_error: Option<ProviderError>,
    /// Delay before `start` resolves
    pub start_delay: Option<Duration>,
    /// Fail `stop`
    pub stop_error: Option<ProviderError>,
    /// Fail every `off`
    pub off_error: Option<ProviderError>,
    /// Fail `set_muted`
    pub mute_error: Option<ProviderError>,
    /// Fire `call-start` as soon as `start` resolves
    pub auto_connect: bool,
    /// Fire `call-end` to remaining listeners when `stop` is called
    pub emit_end_on_stop: bool,
}

/// Provider that constructs [`MockHandle`]s
#[derive(Default)]
pub struct MockProvider {
    behavior: Mutex<MockBehavior>,
    handles: Mutex<Vec<Arc<MockHandle>>>,
}

impl MockProvider {
    /// Provider with default behavior (everything succeeds)
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider applying `behavior` to every handle it constructs
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Replace the behavior used for handles constructed from now on
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Number of handles constructed so far
    pub fn connect_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// All handles constructed so far, oldest first
    pub fn handles(&self) -> Vec<Arc<MockHandle>> {
        self.handles.lock().clone()
    }

    /// Most recently constructed handle
    pub fn latest_handle(&self) -> Option<Arc<MockHandle>> {
        self.handles.lock().last().cloned()
    }
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("behavior", &*self.behavior.lock())
            .field("handles", &self.handles.lock().len())
            .finish()
    }
}

impl VoiceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&self, api_key: &str) -> ProviderResult<Arc<dyn ProviderHandle>> {
        let behavior = self.behavior.lock().clone();
        if let Some(err) = behavior.connect_error.clone() {
            return Err(err);
        }

        let handle = Arc::new(MockHandle::new(api_key, behavior));
        self.handles.lock().push(handle.clone());
        Ok(handle)
    }
}

/// Handle that records operations and dispatches injected events
pub struct MockHandle {
    api_key: String,
    behavior: MockBehavior,
    listeners: Mutex<Vec<(ProviderEventKind, Listener)>>,
    calls: Mutex<Vec<HandleCall>>,
    muted: AtomicBool,
    stopped: AtomicBool,
}

impl MockHandle {
    fn new(api_key: &str, behavior: MockBehavior) -> Self {
        Self {
            api_key: api_key.to_string(),
            behavior,
            listeners: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            muted: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// API key the handle was constructed with
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Deliver `event` to every listener registered for its kind
    ///
    /// Returns how many listeners were invoked. Listeners run without any
    /// internal lock held, so they may call back into the handle.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| l.clone())
            .collect();

        debug!("mock handle emitting '{}' to {} listener(s)", kind, targets.len());
        for listener in &targets {
            listener(&event);
        }
        targets.len()
    }

    /// Total number of live listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Number of live listeners for one event kind
    pub fn listener_count_for(&self, kind: ProviderEventKind) -> usize {
        self.listeners.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    /// Operations performed on this handle, in order
    pub fn calls(&self) -> Vec<HandleCall> {
        self.calls.lock().clone()
    }

    /// Last mute flag forwarded
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Whether `stop` was called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn record(&self, call: HandleCall) {
        self.calls.lock().push(call);
    }
}

impl fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandle")
            .field("api_key", &"[REDACTED]")
            .field("listeners", &self.listener_count())
            .field("calls", &*self.calls.lock())
            .field("muted", &self.is_muted())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[async_trait]
impl ProviderHandle for MockHandle {
    async fn start(&self, assistant_id: &str) -> ProviderResult<()> {
        self.record(HandleCall::Start(assistant_id.to_string()));

        if let Some(delay) = self.behavior.start_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.behavior.start_error.clone() {
            return Err(err);
        }
        if self.behavior.auto_connect {
            self.emit(ProviderEvent::CallStart);
        }
        Ok(())
    }

    fn stop(&self) -> ProviderResult<()> {
        self.record(HandleCall::Stop);
        self.stopped.store(true, Ordering::SeqCst);

        if let Some(err) = self.behavior.stop_error.clone() {
            return Err(err);
        }
        if self.behavior.emit_end_on_stop {
            self.emit(ProviderEvent::CallEnd);
        }
        Ok(())
    }

    fn set_muted(&self, muted: bool) -> ProviderResult<()> {
        self.record(HandleCall::SetMuted(muted));

        if let Some(err) = self.behavior.mute_error.clone() {
            return Err(err);
        }
        self.muted.store(muted, Ordering::SeqCst);
        Ok(())
    }

    fn on(&self, kind: ProviderEventKind, listener: Listener) {
        self.record(HandleCall::On(kind));
        self.listeners.lock().push((kind, listener));
    }

    fn off(&self, kind: ProviderEventKind, listener: &Listener) -> ProviderResult<()> {
        self.record(HandleCall::Off(kind));

        if let Some(err) = self.behavior.off_error.clone() {
            return Err(err);
        }

        let mut listeners = self.listeners.lock();
        match listeners
            .iter()
            .position(|(k, l)| *k == kind && same_listener(l, listener))
        {
            Some(index) => {
                listeners.remove(index);
                Ok(())
            }
            None => Err(ProviderError::UnknownListener {
                event: kind.to_string(),
            }),
        }
    }
}
