//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Device/Session Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No device attached")]
    NoDevice,

    #[error("Connection failed during {step}: {message}")]
    Connection { step: String, message: String },

    #[error("A device session is already open")]
    SessionOpen,

    // ─────────────────────────────────────────────────────────────
    // Installer Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Installer executable not found: {path}")]
    InstallerNotFound { path: String },

    #[error("Failed to spawn installer process: {reason}")]
    ProcessSpawn { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn connection(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn installer_not_found(path: impl Into<String>) -> Self {
        Self::InstallerNotFound { path: path.into() }
    }

    pub fn process_spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error.
    ///
    /// Recoverable errors become state transitions or log lines; the poll
    /// loop and coordinator keep running after them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoDevice
                | Error::Connection { .. }
                | Error::SessionOpen
                | Error::InstallerNotFound { .. }
                | Error::ProcessSpawn { .. }
                | Error::ChannelSend { .. }
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::ConfigInvalid { .. } | Error::ChannelClosed
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::connection("handshake", "refused by device");
        assert_eq!(
            err.to_string(),
            "Connection failed during handshake: refused by device"
        );

        let err = Error::NoDevice;
        assert!(err.to_string().contains("No device"));

        let err = Error::installer_not_found("/opt/bin/ideviceinstaller");
        assert!(err.to_string().contains("/opt/bin/ideviceinstaller"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::NoDevice.is_recoverable());
        assert!(Error::connection("open device", "timeout").is_recoverable());
        assert!(Error::installer_not_found("missing").is_recoverable());
        assert!(Error::process_spawn("permission denied").is_recoverable());
        assert!(!Error::config_invalid("bad interval").is_recoverable());
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::config("unreadable file").is_fatal());
        assert!(Error::ChannelClosed.is_fatal());
        assert!(!Error::NoDevice.is_fatal());
        assert!(!Error::connection("device name", "n/a").is_fatal());
    }

    #[test]
    fn test_error_constructors() {
        let _ = Error::connection("step", "msg");
        let _ = Error::installer_not_found("path");
        let _ = Error::process_spawn("reason");
        let _ = Error::config("msg");
        let _ = Error::config_invalid("msg");
        let _ = Error::channel_send("msg");
    }
}
