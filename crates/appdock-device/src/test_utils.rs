//! Scripted bridge fake for poller and engine tests
//!
//! [`ScriptedBridge`] plays back a scripted sequence of identifier sets, one
//! per `list_identifiers` call, and tracks every handle it hands out so tests
//! can assert that sessions release everything they acquire.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::bridge::{property_keys, BridgeError, DeviceBridge, DeviceHandle, SessionHandle};

/// Establishment step at which the scripted bridge should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    OpenDevice,
    OpenSession,
    DeviceName,
    ProductVersion,
    ProductType,
}

/// Test double for the native library.
pub struct ScriptedBridge {
    /// One identifier set per `list_identifiers` call; the last set repeats
    /// once the script is exhausted.
    ticks: Mutex<VecDeque<Vec<String>>>,
    repeat: Mutex<Vec<String>>,

    fail: Mutex<Option<FailPoint>>,

    name: String,
    product_type: String,
    product_version: String,

    next_handle: AtomicU64,
    open_devices: Mutex<HashSet<u64>>,
    open_sessions: Mutex<HashSet<u64>>,

    open_device_calls: AtomicUsize,
    open_session_calls: AtomicUsize,
    last_client_label: Mutex<String>,
}

impl Default for ScriptedBridge {
    fn default() -> Self {
        Self {
            ticks: Mutex::new(VecDeque::new()),
            repeat: Mutex::new(Vec::new()),
            fail: Mutex::new(None),
            name: "Kitchen iPad".to_string(),
            product_type: "iPad13,4".to_string(),
            product_version: "17.2".to_string(),
            next_handle: AtomicU64::new(1),
            open_devices: Mutex::new(HashSet::new()),
            open_sessions: Mutex::new(HashSet::new()),
            open_device_calls: AtomicUsize::new(0),
            open_session_calls: AtomicUsize::new(0),
            last_client_label: Mutex::new(String::new()),
        }
    }
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one identifier set for the next `list_identifiers` call.
    pub fn push_tick<I, S>(&self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ticks
            .lock()
            .unwrap()
            .push_back(identifiers.into_iter().map(Into::into).collect());
    }

    /// Make the next establishment attempts fail at `point` (until cleared).
    pub fn set_fail(&self, point: Option<FailPoint>) {
        *self.fail.lock().unwrap() = point;
    }

    /// Outstanding (device, session) handle counts.
    pub fn outstanding(&self) -> (usize, usize) {
        (
            self.open_devices.lock().unwrap().len(),
            self.open_sessions.lock().unwrap().len(),
        )
    }

    pub fn open_device_calls(&self) -> usize {
        self.open_device_calls.load(Ordering::SeqCst)
    }

    pub fn open_session_calls(&self) -> usize {
        self.open_session_calls.load(Ordering::SeqCst)
    }

    pub fn last_client_label(&self) -> String {
        self.last_client_label.lock().unwrap().clone()
    }

    fn failing_at(&self, point: FailPoint) -> bool {
        *self.fail.lock().unwrap() == Some(point)
    }
}

impl DeviceBridge for ScriptedBridge {
    fn list_identifiers(&self) -> Result<Vec<String>, BridgeError> {
        let mut ticks = self.ticks.lock().unwrap();
        if let Some(set) = ticks.pop_front() {
            *self.repeat.lock().unwrap() = set.clone();
            Ok(set)
        } else {
            Ok(self.repeat.lock().unwrap().clone())
        }
    }

    fn open_device(&self, _udid: &str) -> Result<DeviceHandle, BridgeError> {
        self.open_device_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_at(FailPoint::OpenDevice) {
            return Err(BridgeError::ConnectionRefused);
        }
        let raw = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.open_devices.lock().unwrap().insert(raw);
        Ok(DeviceHandle(raw))
    }

    fn open_session(
        &self,
        device: DeviceHandle,
        client_label: &str,
    ) -> Result<SessionHandle, BridgeError> {
        self.open_session_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_client_label.lock().unwrap() = client_label.to_string();
        if self.failing_at(FailPoint::OpenSession) {
            return Err(BridgeError::Handshake);
        }
        assert!(
            self.open_devices.lock().unwrap().contains(&device.0),
            "open_session on unknown device handle"
        );
        let raw = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.open_sessions.lock().unwrap().insert(raw);
        Ok(SessionHandle(raw))
    }

    fn device_name(&self, session: SessionHandle) -> Result<String, BridgeError> {
        assert!(
            self.open_sessions.lock().unwrap().contains(&session.0),
            "device_name on unknown session handle"
        );
        if self.failing_at(FailPoint::DeviceName) {
            return Err(BridgeError::Other(-1));
        }
        Ok(self.name.clone())
    }

    fn string_property(&self, session: SessionHandle, key: &str) -> Result<String, BridgeError> {
        assert!(
            self.open_sessions.lock().unwrap().contains(&session.0),
            "string_property on unknown session handle"
        );
        match key {
            property_keys::PRODUCT_VERSION => {
                if self.failing_at(FailPoint::ProductVersion) {
                    Err(BridgeError::PropertyNotFound(key.to_string()))
                } else {
                    Ok(self.product_version.clone())
                }
            }
            property_keys::PRODUCT_TYPE => {
                if self.failing_at(FailPoint::ProductType) {
                    Err(BridgeError::PropertyNotFound(key.to_string()))
                } else {
                    Ok(self.product_type.clone())
                }
            }
            other => Err(BridgeError::PropertyNotFound(other.to_string())),
        }
    }

    fn release_session(&self, session: SessionHandle) {
        self.open_sessions.lock().unwrap().remove(&session.0);
    }

    fn release_device(&self, device: DeviceHandle) {
        self.open_devices.lock().unwrap().remove(&device.0);
    }
}
