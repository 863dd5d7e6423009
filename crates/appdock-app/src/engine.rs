//! Engine wiring
//!
//! [`Engine::start`] connects the presence poller and the operation
//! coordinator with their channels and spawns both tasks. Front ends consume
//! [`AppEvent`]s from the engine and submit [`OperationRequest`]s through it;
//! nothing else crosses the boundary.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use appdock_core::events::AppEvent;
use appdock_core::prelude::*;
use appdock_core::types::{OperationRequest, PollState};
use appdock_device::{DeviceBridge, PresencePoller};

use crate::config::Settings;
use crate::coordinator::OperationCoordinator;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// The running core: one poller task, one coordinator task, one event stream.
pub struct Engine {
    event_rx: mpsc::Receiver<AppEvent>,
    request_tx: mpsc::Sender<OperationRequest>,
    poller_task: JoinHandle<()>,
    coordinator_task: JoinHandle<()>,
}

impl Engine {
    /// Wire up and start the core against the given native bridge.
    pub fn start<B: DeviceBridge>(bridge: Arc<B>, settings: &Settings) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(PollState::default());

        let poller = PresencePoller::new(
            bridge,
            settings.client_label.clone(),
            settings.poll_interval(),
            state_tx,
            event_tx.clone(),
            request_tx.clone(),
        );
        let coordinator = OperationCoordinator::new(
            settings.resolved_installer(),
            request_rx,
            state_rx,
            event_tx,
        );

        info!(
            "Engine starting (installer: {}, interval: {:?})",
            settings.resolved_installer().display(),
            settings.poll_interval()
        );

        Self {
            event_rx,
            request_tx,
            poller_task: tokio::spawn(poller.run()),
            coordinator_task: tokio::spawn(coordinator.run()),
        }
    }

    /// Sender for submitting operation requests.
    pub fn requests(&self) -> mpsc::Sender<OperationRequest> {
        self.request_tx.clone()
    }

    /// Receive the next event. `None` means both tasks are gone.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_rx.recv().await
    }

    /// Stop both tasks. In-flight installer children are killed on drop.
    pub fn shutdown(self) {
        info!("Engine shutting down");
        self.poller_task.abort();
        self.coordinator_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appdock_core::types::OperationKind;
    use appdock_device::test_utils::ScriptedBridge;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    const LISTING_SCRIPT: &str = r#"#!/bin/sh
case "$3" in
  -l)
    echo "CFBundleIdentifier, CFBundleVersion, CFBundleDisplayName"
    echo 'com.example.alpha, 1.0, "Alpha"'
    ;;
esac
"#;

    fn write_script(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-installer");
        std::fs::write(&path, LISTING_SCRIPT).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    async fn next_event(engine: &mut Engine) -> AppEvent {
        tokio::time::timeout(Duration::from_secs(5), engine.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("engine event channel closed")
    }

    async fn next_significant(engine: &mut Engine) -> AppEvent {
        loop {
            let event = next_event(engine).await;
            if !matches!(event, AppEvent::LogLine { .. }) {
                return event;
            }
        }
    }

    /// Connect, auto-list, disconnect, driven end to end through real tasks.
    #[tokio::test]
    async fn test_attach_list_detach_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            installer_path: write_script(dir.path()),
            poll_interval_ms: 10,
            client_label: "appdock".to_string(),
        };

        let bridge = Arc::new(ScriptedBridge::new());
        bridge.push_tick(Vec::<String>::new());
        bridge.push_tick(["UDID1"]);

        let mut engine = Engine::start(Arc::clone(&bridge), &settings);

        match next_significant(&mut engine).await {
            AppEvent::DeviceConnected { identity } => {
                assert_eq!(identity.udid, "UDID1");
                assert_eq!(identity.summary(), "Kitchen iPad, iPad13,4, iOS 17.2");
            }
            other => panic!("expected DeviceConnected, got {:?}", other),
        }

        // The connection-triggered listing refresh follows on its own.
        match next_significant(&mut engine).await {
            AppEvent::ListingUpdated { apps } => {
                assert_eq!(apps.len(), 1);
                assert_eq!(apps[0].bundle_id, "com.example.alpha");
            }
            other => panic!("expected ListingUpdated, got {:?}", other),
        }
        assert!(matches!(
            next_significant(&mut engine).await,
            AppEvent::OperationCompleted {
                kind: OperationKind::List,
                exit_code: Some(0),
            }
        ));

        // Unplug: the poller tears the session down and releases handles.
        bridge.push_tick(Vec::<String>::new());
        assert!(matches!(
            next_significant(&mut engine).await,
            AppEvent::DeviceDisconnected
        ));
        assert_eq!(bridge.outstanding(), (0, 0));

        engine.shutdown();
    }

    /// Requests submitted while no device is attached are rejected.
    #[tokio::test]
    async fn test_request_without_device_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            installer_path: write_script(dir.path()),
            poll_interval_ms: 10,
            client_label: "appdock".to_string(),
        };

        let bridge = Arc::new(ScriptedBridge::new());
        let mut engine = Engine::start(bridge, &settings);

        engine
            .requests()
            .send(OperationRequest::List)
            .await
            .unwrap();

        match next_event(&mut engine).await {
            AppEvent::LogLine { line } => assert!(line.contains("No device")),
            other => panic!("expected a no-device log line, got {:?}", other),
        }

        engine.shutdown();
    }
}
