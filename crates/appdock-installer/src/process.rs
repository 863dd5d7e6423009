//! Installer process management
//!
//! One [`InstallerProcess::run`] call spawns the external installer
//! executable for a single operation and yields a [`RunningOperation`]: a
//! stream of non-blank output lines followed by exactly one terminal
//! [`InstallerEvent::Exited`]. Stdout and stderr keep their own ordering but
//! interleave by arrival; the exit code is delivered only after both streams
//! have reached end-of-stream and the child has been reaped.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use appdock_core::prelude::*;

/// Channel capacity for output lines. Installer output is modest; a small
/// buffer keeps memory bounded while the consumer applies backpressure.
const LINE_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by a running installer invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerEvent {
    /// One non-blank line of output, in per-stream order
    Line(String),

    /// The process terminated and both streams are drained.
    /// `code` is `None` when the child was killed by a signal.
    Exited { code: Option<i32> },
}

/// A single in-flight installer invocation.
///
/// Consume events with [`next_event`](Self::next_event) until
/// [`InstallerEvent::Exited`] arrives; the channel closes after that.
pub struct RunningOperation {
    events: mpsc::Receiver<InstallerEvent>,
    pid: Option<u32>,
}

impl RunningOperation {
    /// Receive the next event. `None` means the event channel closed, which
    /// only happens after `Exited` was delivered (or the tasks panicked).
    pub async fn next_event(&mut self) -> Option<InstallerEvent> {
        self.events.recv().await
    }

    /// Process ID of the child, for logging
    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

/// Spawns installer subprocesses and wires up their output plumbing.
pub struct InstallerProcess;

impl InstallerProcess {
    /// Launch the installer executable with the given arguments.
    ///
    /// Failure to launch (executable missing, permission denied) is returned
    /// immediately as an error and never conflated with a non-zero exit
    /// code, which is a normal completion reported via `Exited`.
    pub fn run(
        executable: &Path,
        args: &[String],
        capture_stderr: bool,
    ) -> Result<RunningOperation> {
        info!(
            "Spawning installer: {} {}",
            executable.display(),
            args.join(" ")
        );

        let mut child = Command::new(executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if capture_stderr {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::installer_not_found(executable.display().to_string())
                } else {
                    Error::process_spawn(e.to_string())
                }
            })?;

        let pid = child.id();
        debug!("Installer process started with PID: {:?}", pid);

        let (tx, rx) = mpsc::channel::<InstallerEvent>(LINE_CHANNEL_CAPACITY);

        let stdout = child.stdout.take().expect("stdout was configured");
        let mut readers: Vec<JoinHandle<()>> =
            vec![tokio::spawn(Self::line_reader(stdout, tx.clone(), "stdout"))];

        if capture_stderr {
            let stderr = child.stderr.take().expect("stderr was configured");
            readers.push(tokio::spawn(Self::line_reader(stderr, tx.clone(), "stderr")));
        }

        tokio::spawn(Self::wait_for_exit(child, readers, tx));

        Ok(RunningOperation { events: rx, pid })
    }

    /// Read lines from one stream and forward non-blank ones.
    ///
    /// Blank lines are suppressed here, at the source, so consumers never
    /// see them.
    async fn line_reader(
        stream: impl AsyncRead + Unpin,
        tx: mpsc::Sender<InstallerEvent>,
        label: &'static str,
    ) {
        let mut reader = BufReader::new(stream).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            trace!("{}: {}", label, line);

            if tx.send(InstallerEvent::Line(line)).await.is_err() {
                debug!("{} consumer gone, stopping reader", label);
                break;
            }
        }

        debug!("{} reader finished", label);
    }

    /// Background task: owns `child`, waits for the readers to drain both
    /// streams, then reaps the process and emits the terminal `Exited`.
    async fn wait_for_exit(
        mut child: Child,
        readers: Vec<JoinHandle<()>>,
        tx: mpsc::Sender<InstallerEvent>,
    ) {
        for reader in readers {
            let _ = reader.await;
        }

        let code = match child.wait().await {
            Ok(status) => {
                info!("Installer process exited with status: {:?}", status);
                status.code()
            }
            Err(e) => {
                error!("Error waiting for installer process: {}", e);
                None
            }
        };

        let _ = tx.send(InstallerEvent::Exited { code }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Run `sh -c <script>` through the real machinery and collect all events.
    async fn run_script(script: &str, capture_stderr: bool) -> Vec<InstallerEvent> {
        let mut op = InstallerProcess::run(
            Path::new("sh"),
            &["-c".to_string(), script.to_string()],
            capture_stderr,
        )
        .expect("sh must be available in test environment");

        let mut events = Vec::new();
        while let Some(event) = op.next_event().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_lines_then_exit_code() {
        let events = run_script("echo alpha; echo beta; exit 3", false).await;

        assert_eq!(
            events,
            vec![
                InstallerEvent::Line("alpha".to_string()),
                InstallerEvent::Line("beta".to_string()),
                InstallerEvent::Exited { code: Some(3) },
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_lines_suppressed() {
        let events = run_script("echo one; echo; echo '   '; echo two", false).await;

        let lines: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                InstallerEvent::Line(l) => Some(l.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_stderr_captured_when_requested() {
        let events = run_script("echo out; echo err >&2", true).await;

        let lines: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                InstallerEvent::Line(l) => Some(l.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&"out"));
        assert!(lines.contains(&"err"));
    }

    #[tokio::test]
    async fn test_stderr_ignored_when_not_requested() {
        let events = run_script("echo out; echo err >&2", false).await;

        let lines: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                InstallerEvent::Line(l) => Some(l.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec!["out"]);
    }

    #[tokio::test]
    async fn test_exited_is_last_and_unique() {
        let events = run_script("echo a; echo b; echo c", false).await;

        let exited: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, InstallerEvent::Exited { .. }))
            .collect();
        assert_eq!(exited.len(), 1);
        assert!(matches!(
            events.last(),
            Some(InstallerEvent::Exited { code: Some(0) })
        ));
    }

    #[tokio::test]
    async fn test_launch_failure_is_not_an_exit_code() {
        let missing = PathBuf::from("/nonexistent/ideviceinstaller");
        let result = InstallerProcess::run(&missing, &[], false);

        assert!(matches!(result, Err(Error::InstallerNotFound { .. })));
    }
}
