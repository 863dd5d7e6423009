//! Device presence polling
//!
//! [`PresencePoller`] queries the native library for attached identifiers on
//! a fixed cadence and drives the session manager's open/close transitions
//! exactly once per physical transition. The poll loop never dies: bridge and
//! connection errors become events and state changes, and the next tick
//! re-evaluates from scratch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use appdock_core::events::AppEvent;
use appdock_core::prelude::*;
use appdock_core::types::{OperationRequest, PollState};

use crate::bridge::{BridgeError, DeviceBridge};
use crate::session::SessionManager;

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Periodically detects device appearance/disappearance and maintains the
/// single device session.
///
/// Sole writer of [`PollState`]; the coordinator reads it through the watch
/// channel to gate operations.
pub struct PresencePoller<B: DeviceBridge> {
    bridge: Arc<B>,
    session: SessionManager<B>,
    poll_interval: Duration,
    state_tx: watch::Sender<PollState>,
    events: mpsc::Sender<AppEvent>,
    requests: mpsc::Sender<OperationRequest>,
    epoch: u64,
}

impl<B: DeviceBridge> PresencePoller<B> {
    pub fn new(
        bridge: Arc<B>,
        client_label: impl Into<String>,
        poll_interval: Duration,
        state_tx: watch::Sender<PollState>,
        events: mpsc::Sender<AppEvent>,
        requests: mpsc::Sender<OperationRequest>,
    ) -> Self {
        let session = SessionManager::new(Arc::clone(&bridge), client_label);
        Self {
            bridge,
            session,
            poll_interval,
            state_tx,
            events,
            requests,
            epoch: 0,
        }
    }

    /// Run the poll loop until the event channel closes.
    ///
    /// The loop body is awaited in place, so a slow connection attempt
    /// delays the next tick rather than overlapping it; two sessions can
    /// never be opened concurrently.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if self.events.is_closed() {
                info!("Event channel closed, stopping presence poller");
                break;
            }
            self.tick().await;
        }
    }

    /// One poll tick: query identifiers and drive the open/close edges.
    pub async fn tick(&mut self) {
        let identifiers = match self.bridge.list_identifiers() {
            Ok(ids) => ids,
            Err(BridgeError::NoDevice) => Vec::new(),
            Err(e) => {
                warn!("Identifier query failed, treating as no device: {}", e);
                Vec::new()
            }
        };

        // Selection policy: always the first identifier. Multi-device
        // setups are unsupported and the rest of the set is ignored.
        match identifiers.first() {
            None => self.handle_absent().await,
            Some(udid) => {
                let udid = udid.clone();
                self.handle_present(&udid).await;
            }
        }
    }

    /// Device count dropped to zero: tear down the session on the edge.
    async fn handle_absent(&mut self) {
        if self.session.is_open() {
            self.session.close();
            self.publish(PollState::disconnected(self.epoch));
            self.emit(AppEvent::log("Device disconnected.")).await;
            self.emit(AppEvent::DeviceDisconnected).await;
        } else {
            // Repeated empty ticks are idempotent; availability stays false.
            self.publish(PollState::disconnected(self.epoch));
        }
    }

    /// A device is attached: establish a session on the false→true edge.
    async fn handle_present(&mut self, udid: &str) {
        if self.session.is_open() {
            return;
        }

        self.emit(AppEvent::log("Connecting to device...")).await;

        match self.session.open(udid) {
            Ok(identity) => {
                self.epoch += 1;
                self.publish(PollState::connected(udid, self.epoch));
                self.emit(AppEvent::DeviceConnected { identity }).await;

                // Listing refresh runs as part of every connection; the
                // coordinator sees the session as open by the time this
                // request arrives.
                if self.requests.send(OperationRequest::List).await.is_err() {
                    warn!("Coordinator gone; connection-triggered List dropped");
                }
            }
            Err(e) => {
                warn!("Could not connect to {}: {}", udid, e);
                self.publish(PollState::disconnected(self.epoch));
                self.emit(AppEvent::ConnectionFailed {
                    reason: e.to_string(),
                })
                .await;
                // No retry bookkeeping: the next tick attempts again for as
                // long as the identifier is present.
            }
        }
    }

    fn publish(&self, state: PollState) {
        self.state_tx.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }

    async fn emit(&self, event: AppEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event receiver gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailPoint, ScriptedBridge};

    struct Harness {
        poller: PresencePoller<ScriptedBridge>,
        bridge: Arc<ScriptedBridge>,
        state_rx: watch::Receiver<PollState>,
        event_rx: mpsc::Receiver<AppEvent>,
        request_rx: mpsc::Receiver<OperationRequest>,
    }

    fn harness() -> Harness {
        let bridge = Arc::new(ScriptedBridge::new());
        let (state_tx, state_rx) = watch::channel(PollState::default());
        let (event_tx, event_rx) = mpsc::channel(64);
        let (request_tx, request_rx) = mpsc::channel(8);

        let poller = PresencePoller::new(
            Arc::clone(&bridge),
            "appdock",
            DEFAULT_POLL_INTERVAL,
            state_tx,
            event_tx,
            request_tx,
        );

        Harness {
            poller,
            bridge,
            state_rx,
            event_rx,
            request_rx,
        }
    }

    fn drain_events(rx: &mut mpsc::Receiver<AppEvent>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Log lines are narrative; these tests assert on the state-bearing
    /// events only.
    fn significant(events: Vec<AppEvent>) -> Vec<AppEvent> {
        events
            .into_iter()
            .filter(|e| !matches!(e, AppEvent::LogLine { .. }))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_ticks_are_idempotent() {
        let mut h = harness();
        for _ in 0..3 {
            h.bridge.push_tick(Vec::<String>::new());
            h.poller.tick().await;
        }

        assert!(significant(drain_events(&mut h.event_rx)).is_empty());
        assert!(!h.state_rx.borrow().has_session);
        assert!(h.state_rx.borrow().udid.is_empty());
    }

    #[tokio::test]
    async fn test_connects_once_on_rising_edge() {
        let mut h = harness();
        for _ in 0..3 {
            h.bridge.push_tick(["UDID1"]);
            h.poller.tick().await;
        }

        // Session established exactly once even though the device stayed
        // present for three ticks.
        assert_eq!(h.bridge.open_device_calls(), 1);
        assert_eq!(h.bridge.open_session_calls(), 1);
        assert_eq!(h.bridge.last_client_label(), "appdock");

        let events = significant(drain_events(&mut h.event_rx));
        assert_eq!(events.len(), 1);
        match &events[0] {
            AppEvent::DeviceConnected { identity } => {
                assert_eq!(identity.udid, "UDID1");
                assert_eq!(identity.name, "Kitchen iPad");
            }
            other => panic!("expected DeviceConnected, got {:?}", other),
        }

        // Connection triggers exactly one List refresh.
        assert_eq!(h.request_rx.try_recv().unwrap(), OperationRequest::List);
        assert!(h.request_rx.try_recv().is_err());

        let state = h.state_rx.borrow().clone();
        assert!(state.has_session);
        assert_eq!(state.udid, "UDID1");
        assert_eq!(state.epoch, 1);
    }

    #[tokio::test]
    async fn test_disconnect_fires_once_and_releases_handles() {
        let mut h = harness();
        h.bridge.push_tick(["UDID1"]);
        h.poller.tick().await;
        drain_events(&mut h.event_rx);

        h.bridge.push_tick(Vec::<String>::new());
        h.poller.tick().await;
        h.bridge.push_tick(Vec::<String>::new());
        h.poller.tick().await;

        let events = significant(drain_events(&mut h.event_rx));
        assert_eq!(events, vec![AppEvent::DeviceDisconnected]);

        assert_eq!(h.bridge.outstanding(), (0, 0));
        assert!(!h.state_rx.borrow().has_session);
        assert!(h.state_rx.borrow().udid.is_empty());
    }

    #[tokio::test]
    async fn test_establishment_failure_cleans_up_and_retries() {
        let mut h = harness();
        h.bridge.set_fail(Some(FailPoint::OpenSession));

        h.bridge.push_tick(["UDID1"]);
        h.poller.tick().await;

        let events = significant(drain_events(&mut h.event_rx));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AppEvent::ConnectionFailed { .. }));
        assert_eq!(h.bridge.outstanding(), (0, 0));
        assert!(!h.state_rx.borrow().has_session);
        assert!(h.request_rx.try_recv().is_err());

        // Device still present next tick: establishment is re-attempted.
        h.bridge.push_tick(["UDID1"]);
        h.poller.tick().await;
        assert_eq!(h.bridge.open_device_calls(), 2);

        // Once the failure clears, the session opens.
        h.bridge.set_fail(None);
        h.bridge.push_tick(["UDID1"]);
        h.poller.tick().await;
        let events = significant(drain_events(&mut h.event_rx));
        assert!(matches!(events[0], AppEvent::DeviceConnected { .. }));
    }

    #[tokio::test]
    async fn test_property_failure_releases_partial_acquisition() {
        let mut h = harness();
        h.bridge.set_fail(Some(FailPoint::ProductType));

        h.bridge.push_tick(["UDID1"]);
        h.poller.tick().await;

        let events = significant(drain_events(&mut h.event_rx));
        match &events[0] {
            AppEvent::ConnectionFailed { reason } => assert!(reason.contains("ProductType")),
            other => panic!("expected ConnectionFailed, got {:?}", other),
        }
        assert_eq!(h.bridge.outstanding(), (0, 0));
    }

    #[tokio::test]
    async fn test_first_identifier_selected() {
        let mut h = harness();
        h.bridge.push_tick(["UDID1", "UDID2"]);
        h.poller.tick().await;

        let events = significant(drain_events(&mut h.event_rx));
        match &events[0] {
            AppEvent::DeviceConnected { identity } => assert_eq!(identity.udid, "UDID1"),
            other => panic!("expected DeviceConnected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_presence_scenario() {
        let mut h = harness();

        // No device yet.
        h.bridge.push_tick(Vec::<String>::new());
        h.poller.tick().await;
        assert!(significant(drain_events(&mut h.event_rx)).is_empty());

        // Device appears.
        h.bridge.push_tick(["UDID1"]);
        h.poller.tick().await;
        let events = significant(drain_events(&mut h.event_rx));
        assert!(matches!(events[0], AppEvent::DeviceConnected { .. }));
        assert_eq!(h.request_rx.try_recv().unwrap(), OperationRequest::List);

        // Device vanishes.
        h.bridge.push_tick(Vec::<String>::new());
        h.poller.tick().await;
        let events = significant(drain_events(&mut h.event_rx));
        assert_eq!(events, vec![AppEvent::DeviceDisconnected]);
        assert_eq!(h.bridge.outstanding(), (0, 0));

        // Device re-appears: a fresh session with a new epoch.
        h.bridge.push_tick(["UDID1"]);
        h.poller.tick().await;
        let events = significant(drain_events(&mut h.event_rx));
        assert!(matches!(events[0], AppEvent::DeviceConnected { .. }));
        assert_eq!(h.state_rx.borrow().epoch, 2);
    }
}
