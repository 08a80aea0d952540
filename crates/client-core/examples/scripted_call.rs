//! Scripted Call Example
//!
//! Drives one call through the in-memory provider and prints what the call
//! screen would show at each stage.
//!
//! Run with: cargo run --example scripted_call

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use voicebuddy_client_core::provider::{MockBehavior, MockProvider};
use voicebuddy_client_core::view::{CallView, BRAND, HEADLINE, HEADLINE_SUBTITLE};
use voicebuddy_client_core::{
    CallSessionController, ClientConfig, ControllerEvent, CredentialSource, ProviderEvent,
};

fn render(controller: &CallSessionController) {
    let view = CallView::from_snapshot(&controller.snapshot());
    println!("[{}] {:?}", view.status_label, view.controls);
    if let Some(banner) = view.banner {
        println!("  {}: {}", banner.title, banner.message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("{}", BRAND);
    println!("{} {}", HEADLINE, HEADLINE_SUBTITLE);

    let provider = Arc::new(MockProvider::with_behavior(MockBehavior {
        start_delay: Some(Duration::from_millis(300)),
        ..Default::default()
    }));
    let config = ClientConfig::new()
        .with_credentials(CredentialSource::fixed("pk_demo", "assistant-demo"))
        .with_tick_interval(Duration::from_millis(250))
        .with_event_capacity(64);
    let controller = CallSessionController::new(provider.clone(), config)?;

    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ControllerEvent::StatusChanged { previous, current, .. } = event {
                println!("  status: {} -> {}", previous, current);
            }
        }
    });

    render(&controller);
    controller.start_call().await?;
    render(&controller);

    let handle = provider
        .latest_handle()
        .ok_or_else(|| anyhow::anyhow!("provider constructed no handle"))?;
    handle.emit(ProviderEvent::CallStart);
    handle.emit(ProviderEvent::Message(serde_json::json!({
        "type": "transcript",
        "role": "assistant",
        "transcript": "Hi! What would you like to talk about?"
    })));

    tokio::time::sleep(Duration::from_secs(2)).await;
    controller.toggle_mute()?;
    render(&controller);

    controller.end_call();
    render(&controller);

    // A provider-side failure on the next attempt
    controller.start_call().await?;
    if let Some(handle) = provider.latest_handle() {
        handle.emit(ProviderEvent::error("media negotiation failed"));
    }
    render(&controller);

    controller.teardown();
    Ok(())
}
