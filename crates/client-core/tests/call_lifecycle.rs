//! End-to-end call lifecycle scenarios through the public API

use std::sync::{Arc, Barrier};
use std::time::Duration;

use voicebuddy_client_core::provider::{HandleCall, MockBehavior, MockProvider};
use voicebuddy_client_core::view::{CallView, Controls};
use voicebuddy_client_core::{
    CallSessionController, CallStatus, ClientConfig, ClientError, ControllerEvent,
    CredentialSource, ProviderError, ProviderEvent, ProviderHandle, ProviderResult, VoiceProvider,
};

/// Provider whose handle construction blocks until the test lets it go
struct SlowConnectProvider {
    mock: MockProvider,
    gate: Arc<Barrier>,
}

impl VoiceProvider for SlowConnectProvider {
    fn name(&self) -> &str {
        "slow-connect"
    }

    fn connect(&self, api_key: &str) -> ProviderResult<Arc<dyn ProviderHandle>> {
        // Entered, then released
        self.gate.wait();
        self.gate.wait();
        self.mock.connect(api_key)
    }
}

fn controller(behavior: MockBehavior) -> (Arc<MockProvider>, CallSessionController) {
    let provider = Arc::new(MockProvider::with_behavior(behavior));
    let config = ClientConfig::new()
        .with_credentials(CredentialSource::fixed("pk_integration", "assistant-buddy"));
    let controller = CallSessionController::new(provider.clone(), config).unwrap();
    (provider, controller)
}

#[tokio::test(start_paused = true)]
async fn test_full_call_renders_each_stage() {
    let (provider, controller) = controller(MockBehavior::default());

    let view = CallView::from_snapshot(&controller.snapshot());
    assert_eq!(view.status_label, "Ready to connect");

    controller.start_call().await.unwrap();
    let view = CallView::from_snapshot(&controller.snapshot());
    assert_eq!(view.status_label, "Connecting...");
    assert!(matches!(view.controls, Controls::StartButton { enabled: false, .. }));

    let handle = provider.latest_handle().unwrap();
    handle.emit(ProviderEvent::CallStart);
    tokio::time::sleep(Duration::from_millis(65_500)).await;

    let view = CallView::from_snapshot(&controller.snapshot());
    assert_eq!(view.status_label, "Connected • 1:05");
    assert!(matches!(view.controls, Controls::InCall { muted: false, .. }));

    handle.emit(ProviderEvent::CallEnd);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, CallStatus::Idle);
    assert_eq!(snapshot.duration_seconds, 0);
    assert_eq!(handle.listener_count(), 0);
    assert!(!controller.is_clock_running());
}

#[tokio::test]
async fn test_repeated_calls_never_leak_listeners() {
    let (provider, controller) = controller(MockBehavior::default());

    for _ in 0..5 {
        controller.start_call().await.unwrap();
        let handle = provider.latest_handle().unwrap();
        handle.emit(ProviderEvent::CallStart);
        controller.end_call();
        assert_eq!(handle.listener_count(), 0);
        assert!(!controller.is_clock_running());
    }

    assert_eq!(provider.connect_count(), 5);
    for handle in provider.handles() {
        assert_eq!(handle.listener_count(), 0);
        let calls = handle.calls();
        let last_off = calls
            .iter()
            .rposition(|c| matches!(c, HandleCall::Off(_)))
            .unwrap();
        let stop = calls.iter().position(|c| *c == HandleCall::Stop).unwrap();
        assert!(last_off < stop, "listeners must be removed before stop");
    }
}

#[tokio::test]
async fn test_stop_failure_is_swallowed() {
    let (provider, controller) = controller(MockBehavior {
        stop_error: Some(ProviderError::Transport("peer connection closed".into())),
        ..Default::default()
    });
    controller.start_call().await.unwrap();
    provider.latest_handle().unwrap().emit(ProviderEvent::CallStart);

    controller.end_call();

    assert_eq!(controller.status(), CallStatus::Idle);
    assert!(!controller.is_clock_running());
    assert!(controller.snapshot().last_error.is_none());
}

#[tokio::test]
async fn test_missing_api_key_never_contacts_provider() {
    let provider = Arc::new(MockProvider::new());
    let config = ClientConfig::new().with_credentials(CredentialSource::Static {
        api_key: None,
        assistant_id: Some("assistant-buddy".into()),
    });
    let controller = CallSessionController::new(provider.clone(), config).unwrap();
    let mut events = controller.subscribe();

    let err = controller.start_call().await.unwrap_err();

    assert_eq!(err.to_string(), "voice API key is not configured");
    assert_eq!(provider.connect_count(), 0);

    let view = CallView::from_snapshot(&controller.snapshot());
    assert_eq!(view.status_label, "Ready to connect");
    assert_eq!(
        view.banner.map(|b| b.message),
        Some("voice API key is not configured".to_string())
    );

    let mut raised = false;
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::ErrorRaised { message, .. } = event {
            assert_eq!(message, "voice API key is not configured");
            raised = true;
        }
    }
    assert!(raised);
}

#[tokio::test]
async fn test_concurrent_start_is_rejected() {
    let (provider, controller) = controller(MockBehavior::default());
    controller.start_call().await.unwrap();
    provider.latest_handle().unwrap().emit(ProviderEvent::CallStart);

    assert!(matches!(
        controller.start_call().await,
        Err(ClientError::CallInProgress)
    ));
    assert_eq!(provider.connect_count(), 1);
    assert_eq!(controller.status(), CallStatus::Active);
}

#[tokio::test]
async fn test_provider_stop_emitting_end_is_harmless() {
    // Some SDKs fire call-end synchronously from stop(); listeners are gone by then
    let (provider, controller) = controller(MockBehavior {
        emit_end_on_stop: true,
        ..Default::default()
    });
    controller.start_call().await.unwrap();
    let handle = provider.latest_handle().unwrap();
    handle.emit(ProviderEvent::CallStart);

    controller.end_call();

    assert!(handle.is_stopped());
    assert_eq!(controller.status(), CallStatus::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_end_while_handle_is_being_constructed() {
    let gate = Arc::new(Barrier::new(2));
    let provider = Arc::new(SlowConnectProvider {
        mock: MockProvider::new(),
        gate: gate.clone(),
    });
    let config = ClientConfig::new()
        .with_credentials(CredentialSource::fixed("pk_integration", "assistant-buddy"));
    let controller = Arc::new(CallSessionController::new(provider.clone(), config).unwrap());

    let starter = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_call().await })
    };

    let entered = gate.clone();
    tokio::task::spawn_blocking(move || entered.wait()).await.unwrap();
    assert_eq!(controller.status(), CallStatus::Connecting);

    controller.end_call();
    assert_eq!(controller.status(), CallStatus::Idle);

    let released = gate.clone();
    tokio::task::spawn_blocking(move || released.wait()).await.unwrap();
    assert!(starter.await.unwrap().is_ok());

    assert_eq!(controller.status(), CallStatus::Idle);
    assert!(!controller.has_handle());
    assert!(controller.snapshot().last_error.is_none());

    let handle = provider.mock.latest_handle().unwrap();
    assert_eq!(handle.listener_count(), 0);
    assert!(!handle
        .calls()
        .iter()
        .any(|c| matches!(c, HandleCall::Start(_))));
}
