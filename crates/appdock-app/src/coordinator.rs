//! Operation coordination
//!
//! One task owns the installer-operation queue. Requests arrive over a
//! channel and execute strictly one at a time; while an operation runs, at
//! most one request waits in the pending slot, with repeated List requests
//! coalesced into it. Every mutating operation is followed by a listing
//! refresh. An operation whose session was torn down mid-flight is drained
//! to completion and its output discarded.

use std::path::PathBuf;

use tokio::sync::{mpsc, watch};

use appdock_core::events::AppEvent;
use appdock_core::prelude::*;
use appdock_core::types::{OperationKind, OperationRequest, PollState};
use appdock_installer::{build_invocation, InstallerEvent, InstallerProcess, ListingParser};

/// Serializes the three installer operations against the current session.
pub struct OperationCoordinator {
    installer_path: PathBuf,
    requests: mpsc::Receiver<OperationRequest>,
    poll_state: watch::Receiver<PollState>,
    events: mpsc::Sender<AppEvent>,
    /// The single queued request, if any
    pending: Option<OperationRequest>,
    /// False once the request channel has closed
    intake_open: bool,
    /// Running total of malformed listing lines across refreshes
    parse_warnings: u64,
}

impl OperationCoordinator {
    pub fn new(
        installer_path: PathBuf,
        requests: mpsc::Receiver<OperationRequest>,
        poll_state: watch::Receiver<PollState>,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            installer_path,
            requests,
            poll_state,
            events,
            pending: None,
            intake_open: true,
            parse_warnings: 0,
        }
    }

    /// Run until the request channel closes and no work is pending.
    pub async fn run(mut self) {
        loop {
            let request = match self.pending.take() {
                Some(request) => request,
                None if self.intake_open => match self.requests.recv().await {
                    Some(request) => request,
                    None => break,
                },
                None => break,
            };
            self.execute(request).await;
        }
        info!("Request intake closed, stopping operation coordinator");
    }

    /// Execute one operation end to end.
    async fn execute(&mut self, request: OperationRequest) {
        let kind = request.kind();
        let state = self.poll_state.borrow().clone();

        if !state.has_session {
            warn!("No device attached; {} request rejected", kind);
            self.emit(AppEvent::log(format!(
                "No device attached; cannot {}.",
                kind
            )))
            .await;
            return;
        }
        let epoch = state.epoch;

        let invocation = build_invocation(&state.udid, &request);
        let mut operation = match InstallerProcess::run(
            &self.installer_path,
            &invocation.args,
            invocation.capture_stderr,
        ) {
            Ok(operation) => operation,
            Err(e) => {
                // Launch failure is not an exit code: the operation aborts
                // and the session stays open for a retry.
                error!("Installer launch failed: {}", e);
                self.emit(AppEvent::log(format!("Could not start installer: {}", e)))
                    .await;
                return;
            }
        };

        let mut parser = request.is_list().then(ListingParser::new);

        // Pump output lines while keeping the request intake responsive so
        // arrivals land in the pending slot instead of blocking senders.
        let exit_code = loop {
            tokio::select! {
                event = operation.next_event() => {
                    match event {
                        Some(InstallerEvent::Line(line)) => {
                            if self.session_current(epoch) {
                                match parser.as_mut() {
                                    Some(parser) => parser.feed_line(&line),
                                    None => self.emit(AppEvent::log(line)).await,
                                }
                            }
                        }
                        Some(InstallerEvent::Exited { code }) => break code,
                        None => break None,
                    }
                }
                request = self.requests.recv(), if self.intake_open => {
                    match request {
                        Some(request) => self.queue_request(request),
                        None => self.intake_open = false,
                    }
                }
            }
        };

        if !self.session_current(epoch) {
            info!("Session changed during {}; result discarded", kind);
            return;
        }

        match parser.take() {
            Some(parser) => {
                // Listing replacement is best-effort: a non-zero exit still
                // publishes whatever rows parsed.
                if let Some(code) = exit_code.filter(|&code| code != 0) {
                    warn!("Listing exited with code {}", code);
                    self.emit(AppEvent::log(format!(
                        "Warning: listing exited with code {}.",
                        code
                    )))
                    .await;
                }
                let (apps, stats) = parser.finish();
                if stats.dropped > 0 {
                    self.parse_warnings += stats.dropped as u64;
                    debug!(
                        "{} malformed listing lines dropped ({} total)",
                        stats.dropped, self.parse_warnings
                    );
                    self.emit(AppEvent::log(format!(
                        "Warning: {} malformed listing line(s) dropped.",
                        stats.dropped
                    )))
                    .await;
                }
                self.emit(AppEvent::ListingUpdated { apps }).await;
            }
            None => {
                self.emit(AppEvent::log(exit_line(exit_code))).await;
            }
        }

        self.emit(AppEvent::OperationCompleted { kind, exit_code })
            .await;

        if kind != OperationKind::List {
            // A listing refresh follows every mutating operation.
            self.queue_request(OperationRequest::List);
        }
    }

    /// Put a request into the single pending slot.
    fn queue_request(&mut self, request: OperationRequest) {
        match &self.pending {
            None => {
                debug!("Queued {} request", request.kind());
                self.pending = Some(request);
            }
            Some(pending) if pending.is_list() && request.is_list() => {
                debug!("Coalesced repeated List request");
            }
            Some(pending) => {
                warn!(
                    "Pending slot holds {}; dropping {} request",
                    pending.kind(),
                    request.kind()
                );
            }
        }
    }

    /// Whether the session an operation started under is still the open one.
    fn session_current(&self, epoch: u64) -> bool {
        let state = self.poll_state.borrow();
        state.has_session && state.epoch == epoch
    }

    async fn emit(&self, event: AppEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event receiver gone");
        }
    }
}

/// The completion log line, in the installer front end's traditional format.
fn exit_line(code: Option<i32>) -> String {
    match code {
        Some(0) => "Process ended with code 0 (Success)".to_string(),
        Some(code) => format!("Process ended with code {}", code),
        None => "Process ended without an exit code (terminated by signal)".to_string(),
    }
}
