//! Native device library boundary
//!
//! The real device-communication library is an external collaborator; only
//! its interface lives here. [`DeviceBridge`] exposes identifier enumeration,
//! handle acquisition with a lockdown-style handshake, and named property
//! reads. Every handle handed out must be released explicitly; transient
//! property handles are acquired and released inside
//! [`string_property`](DeviceBridge::string_property) so they never escape.

use thiserror::Error;

/// Error signals surfaced by the native library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("no device attached")]
    NoDevice,

    #[error("connection to device refused")]
    ConnectionRefused,

    #[error("session handshake failed")]
    Handshake,

    #[error("property not found: {0}")]
    PropertyNotFound(String),

    #[error("native error code {0}")]
    Other(i32),
}

/// Opaque handle to an opened device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u64);

/// Opaque handle to an authenticated control channel on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// Interface to the native device-communication library.
///
/// Implementations wrap the actual bindings; everything above this trait is
/// binding-agnostic. Handles are plain tokens: the implementation owns the
/// underlying resources and frees them in `release_*`.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceBridge: Send + Sync + 'static {
    /// Identifiers of all currently attached devices, in native order.
    fn list_identifiers(&self) -> Result<Vec<String>, BridgeError>;

    /// Open a device handle for the given identifier.
    fn open_device(&self, udid: &str) -> Result<DeviceHandle, BridgeError>;

    /// Perform the handshake and open a protocol session.
    fn open_session(
        &self,
        device: DeviceHandle,
        client_label: &str,
    ) -> Result<SessionHandle, BridgeError>;

    /// The device's human-readable name.
    fn device_name(&self, session: SessionHandle) -> Result<String, BridgeError>;

    /// Read a named string property (null domain). The transient property
    /// handle is released before returning.
    fn string_property(&self, session: SessionHandle, key: &str) -> Result<String, BridgeError>;

    /// Release a protocol session handle.
    fn release_session(&self, session: SessionHandle);

    /// Release a device handle.
    fn release_device(&self, device: DeviceHandle);
}

/// Property keys read during session establishment.
pub mod property_keys {
    pub const PRODUCT_VERSION: &str = "ProductVersion";
    pub const PRODUCT_TYPE: &str = "ProductType";
}

/// A [`DeviceBridge`] for builds without native bindings linked.
///
/// Reports no attached devices on every query. The binary uses this as its
/// default bridge; real bindings implement [`DeviceBridge`] and plug in at
/// engine construction.
#[derive(Debug, Default)]
pub struct NullBridge;

impl DeviceBridge for NullBridge {
    fn list_identifiers(&self) -> Result<Vec<String>, BridgeError> {
        Ok(Vec::new())
    }

    fn open_device(&self, _udid: &str) -> Result<DeviceHandle, BridgeError> {
        Err(BridgeError::NoDevice)
    }

    fn open_session(
        &self,
        _device: DeviceHandle,
        _client_label: &str,
    ) -> Result<SessionHandle, BridgeError> {
        Err(BridgeError::NoDevice)
    }

    fn device_name(&self, _session: SessionHandle) -> Result<String, BridgeError> {
        Err(BridgeError::NoDevice)
    }

    fn string_property(&self, _session: SessionHandle, _key: &str) -> Result<String, BridgeError> {
        Err(BridgeError::NoDevice)
    }

    fn release_session(&self, _session: SessionHandle) {}

    fn release_device(&self, _device: DeviceHandle) {}
}
