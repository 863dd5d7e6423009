//! Argument grammar for the external installer executable
//!
//! The installer CLI contract is fixed:
//! `-u <udid> -l` lists apps as CSV, `-u <udid> --install <path>` installs,
//! `-u <udid> --uninstall <bundle-id>` removes. Arguments are passed as
//! separate argv entries, so payloads need no shell quoting.

use appdock_core::types::OperationRequest;

/// A fully built installer command line for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerInvocation {
    /// Arguments passed to the installer executable
    pub args: Vec<String>,

    /// Whether stderr should be captured and interleaved into the line
    /// stream. Listing reads stdout only; install/uninstall want both.
    pub capture_stderr: bool,
}

/// Build the installer command line for `request` against device `udid`.
pub fn build_invocation(udid: &str, request: &OperationRequest) -> InstallerInvocation {
    let mut args = vec!["-u".to_string(), udid.to_string()];

    match request {
        OperationRequest::List => {
            args.push("-l".to_string());
            InstallerInvocation {
                args,
                capture_stderr: false,
            }
        }
        OperationRequest::Install { path } => {
            args.push("--install".to_string());
            args.push(path.to_string_lossy().into_owned());
            InstallerInvocation {
                args,
                capture_stderr: true,
            }
        }
        OperationRequest::Uninstall { bundle_id } => {
            args.push("--uninstall".to_string());
            args.push(bundle_id.clone());
            InstallerInvocation {
                args,
                capture_stderr: true,
            }
        }
    }
}
