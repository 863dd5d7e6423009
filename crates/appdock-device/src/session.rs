//! Device session lifecycle
//!
//! [`SessionManager`] owns the single open [`DeviceSession`]: it runs the
//! establishment sequence (device handle, handshake, identity queries) and
//! guarantees that partially-acquired handles are released on every failure
//! path. Handles never outlive the session.

use std::sync::Arc;

use appdock_core::prelude::*;
use appdock_core::types::DeviceIdentity;

use crate::bridge::{property_keys, DeviceBridge, DeviceHandle, SessionHandle};

/// An open logical connection to one physical device.
struct DeviceSession {
    device: DeviceHandle,
    session: SessionHandle,
    identity: DeviceIdentity,
}

/// Owns the lifecycle of the connection to one physical device.
///
/// At most one session exists at any time; `close` is idempotent.
pub struct SessionManager<B: DeviceBridge> {
    bridge: Arc<B>,
    client_label: String,
    current: Option<DeviceSession>,
}

/// Releases handles acquired mid-establishment unless disarmed.
struct Acquisition<'a, B: DeviceBridge> {
    bridge: &'a B,
    device: Option<DeviceHandle>,
    session: Option<SessionHandle>,
}

impl<B: DeviceBridge> Acquisition<'_, B> {
    /// Success: the caller takes ownership of the handles.
    fn disarm(mut self) {
        self.device = None;
        self.session = None;
    }
}

impl<B: DeviceBridge> Drop for Acquisition<'_, B> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.bridge.release_session(session);
        }
        if let Some(device) = self.device.take() {
            self.bridge.release_device(device);
        }
    }
}

impl<B: DeviceBridge> SessionManager<B> {
    pub fn new(bridge: Arc<B>, client_label: impl Into<String>) -> Self {
        Self {
            bridge,
            client_label: client_label.into(),
            current: None,
        }
    }

    /// Open a session to the device with the given identifier and capture
    /// its identity.
    ///
    /// Establishment order: device handle, protocol session with the client
    /// label, device name, `ProductVersion`, `ProductType`. Failure at any
    /// step releases everything acquired so far and leaves no session open.
    pub fn open(&mut self, udid: &str) -> Result<DeviceIdentity> {
        if self.current.is_some() {
            return Err(Error::SessionOpen);
        }

        let bridge = Arc::clone(&self.bridge);
        let mut guard = Acquisition {
            bridge: bridge.as_ref(),
            device: None,
            session: None,
        };

        let device = bridge
            .open_device(udid)
            .map_err(|e| Error::connection("open device", e.to_string()))?;
        guard.device = Some(device);

        let session = bridge
            .open_session(device, &self.client_label)
            .map_err(|e| Error::connection("session handshake", e.to_string()))?;
        guard.session = Some(session);

        let name = bridge
            .device_name(session)
            .map_err(|e| Error::connection("device name", e.to_string()))?;
        let product_version = bridge
            .string_property(session, property_keys::PRODUCT_VERSION)
            .map_err(|e| Error::connection("ProductVersion", e.to_string()))?;
        let product_type = bridge
            .string_property(session, property_keys::PRODUCT_TYPE)
            .map_err(|e| Error::connection("ProductType", e.to_string()))?;

        guard.disarm();

        let identity = DeviceIdentity {
            udid: udid.to_string(),
            name,
            product_type,
            product_version,
        };
        info!("Session open: {}", identity.summary());

        self.current = Some(DeviceSession {
            device,
            session,
            identity: identity.clone(),
        });

        Ok(identity)
    }

    /// Close the current session, releasing its handles.
    ///
    /// Safe to call with no open session.
    pub fn close(&mut self) {
        if let Some(open) = self.current.take() {
            self.bridge.release_session(open.session);
            self.bridge.release_device(open.device);
            info!("Session closed for {}", open.identity.udid);
        }
    }

    /// Identity of the connected device, if a session is open.
    pub fn current_identity(&self) -> Option<&DeviceIdentity> {
        self.current.as_ref().map(|open| &open.identity)
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }
}

impl<B: DeviceBridge> Drop for SessionManager<B> {
    fn drop(&mut self) {
        self.close();
    }
}
