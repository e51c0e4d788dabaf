//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires a wiremock stand-in for the GitCode
//! content API to a connector backed by in-memory settings and a fresh
//! event bus.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use wiremock::MockServer;

use picbed_gitcode::config::SETTINGS_KEY;
use picbed_gitcode::{Event, EventBus, EventPayload, GitcodeUploader, MemorySettings, SettingsStore};

/// Test harness wrapping a connector pointed at a [`MockServer`].
pub struct TestHarness {
    pub server: MockServer,
    pub settings: Arc<MemorySettings>,
    pub events: Arc<EventBus>,
    pub connector: Arc<GitcodeUploader>,
}

impl TestHarness {
    /// Harness with the standard test settings already stored.
    pub async fn new() -> Self {
        let harness = Self::unconfigured().await;
        harness.configure(json!({
            "owner": "acme",
            "repo": "imgs",
            "path": "pics",
            "token": "secret-token",
        }));
        harness
    }

    /// Harness with an empty settings store.
    pub async fn unconfigured() -> Self {
        let server = MockServer::start().await;
        let settings = Arc::new(MemorySettings::default());
        let events = Arc::new(EventBus::default());
        let connector = GitcodeUploader::with_domain(
            settings.clone(),
            events.clone(),
            reqwest::Client::new(),
            server.uri(),
        );
        Self {
            server,
            settings,
            events,
            connector,
        }
    }

    /// Store `value` as the connector settings.
    pub fn configure(&self, value: serde_json::Value) {
        self.settings.set(SETTINGS_KEY, value);
    }

    /// Preview URL prefix matching the standard test settings.
    pub fn preview_prefix(&self) -> String {
        format!("{}/acme/imgs/raw/master/pics", self.server.uri())
    }
}

/// Drain all buffered notification events from `rx` as (title, body) pairs.
pub fn drain_notifications(rx: &mut Receiver<Event>) -> Vec<(String, String)> {
    let mut notifications = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => {
                if let EventPayload::Notification { title, body } = event.payload {
                    notifications.push((title, body));
                }
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
    notifications
}
