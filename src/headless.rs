//! Headless front end - NDJSON event output plus a stdin command loop
//!
//! This stands in for a graphical presentation layer: it subscribes to the
//! core's event stream and prints each event as one NDJSON line on stdout,
//! with an added millisecond timestamp. Operation requests are typed on
//! stdin, one command per line:
//!
//! ```text
//! l | list              refresh the app listing
//! install <path>        install the package at <path>
//! uninstall <bundle-id> remove an app
//! status                print the availability/title line
//! apps                  print the current listing
//! q | quit              exit
//! ```

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use appdock_app::{AppState, Engine, NullBridge, Settings};
use appdock_core::events::AppEvent;
use appdock_core::types::OperationRequest;
use appdock_core::Result;

/// Commands typed on stdin
#[derive(Debug, PartialEq)]
enum Command {
    Request(OperationRequest),
    Status,
    Apps,
    Quit,
}

/// Run the headless event loop until quit or channel teardown.
pub async fn run(settings: Settings) -> Result<()> {
    info!("appdock starting in headless mode");

    // Native bindings implement DeviceBridge and plug in here; without them
    // the bridge reports no attached devices.
    let bridge = Arc::new(NullBridge);
    let mut engine = Engine::start(bridge, &settings);
    let requests = engine.requests();

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(16);
    std::thread::spawn(move || stdin_reader_blocking(cmd_tx));

    let mut state = AppState::new();

    loop {
        tokio::select! {
            event = engine.next_event() => match event {
                Some(event) => {
                    state.apply_event(&event);
                    emit(&event);
                }
                None => {
                    info!("Event channel closed");
                    break;
                }
            },
            command = cmd_rx.recv() => match command {
                Some(Command::Request(request)) => {
                    if requests.send(request).await.is_err() {
                        error!("Coordinator gone; exiting");
                        break;
                    }
                }
                Some(Command::Status) => println!("{}", state.title()),
                Some(Command::Apps) => {
                    for app in &state.apps {
                        println!("{}  {}  {}", app.bundle_id, app.version, app.display_name);
                    }
                }
                Some(Command::Quit) | None => {
                    info!("Quit requested");
                    break;
                }
            },
        }
    }

    engine.shutdown();
    info!("appdock headless mode exiting");
    Ok(())
}

/// Print one event as an NDJSON line with a timestamp.
fn emit(event: &AppEvent) {
    match serde_json::to_value(event) {
        Ok(serde_json::Value::Object(mut map)) => {
            map.insert(
                "timestamp".to_string(),
                Utc::now().timestamp_millis().into(),
            );
            let line = serde_json::Value::Object(map).to_string();
            let mut stdout = io::stdout().lock();
            if writeln!(stdout, "{}", line)
                .and_then(|_| stdout.flush())
                .is_err()
            {
                error!("Failed to write event to stdout");
            }
        }
        Ok(_) | Err(_) => error!("Failed to serialize event"),
    }
}

/// Blocking stdin reader; runs on its own thread and feeds the event loop.
fn stdin_reader_blocking(cmd_tx: mpsc::Sender<Command>) {
    let stdin = io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        match parse_command(&line) {
            Some(command) => {
                let quit = command == Command::Quit;
                if cmd_tx.blocking_send(command).is_err() {
                    break;
                }
                if quit {
                    break;
                }
            }
            None => {
                if !line.trim().is_empty() {
                    warn!("Unknown stdin command: {}", line.trim());
                }
            }
        }
    }

    info!("Stdin reader exiting");
}

/// Parse one stdin line into a command. Blank and unknown lines yield `None`.
fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();

    match trimmed {
        "l" | "list" => return Some(Command::Request(OperationRequest::List)),
        "status" => return Some(Command::Status),
        "apps" => return Some(Command::Apps),
        "q" | "quit" => return Some(Command::Quit),
        _ => {}
    }

    if let Some(path) = trimmed.strip_prefix("install ") {
        let path = path.trim();
        if !path.is_empty() {
            return Some(Command::Request(OperationRequest::Install {
                path: path.into(),
            }));
        }
    }
    if let Some(bundle_id) = trimmed.strip_prefix("uninstall ") {
        let bundle_id = bundle_id.trim();
        if !bundle_id.is_empty() {
            return Some(Command::Request(OperationRequest::Uninstall {
                bundle_id: bundle_id.to_string(),
            }));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(
            parse_command("l"),
            Some(Command::Request(OperationRequest::List))
        );
        assert_eq!(
            parse_command("list"),
            Some(Command::Request(OperationRequest::List))
        );
        assert_eq!(parse_command("status"), Some(Command::Status));
        assert_eq!(parse_command("apps"), Some(Command::Apps));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
    }

    #[test]
    fn test_parse_install_keeps_path_verbatim() {
        assert_eq!(
            parse_command("install /tmp/My App.ipa"),
            Some(Command::Request(OperationRequest::Install {
                path: PathBuf::from("/tmp/My App.ipa"),
            }))
        );
    }

    #[test]
    fn test_parse_uninstall() {
        assert_eq!(
            parse_command("uninstall com.example.app"),
            Some(Command::Request(OperationRequest::Uninstall {
                bundle_id: "com.example.app".to_string(),
            }))
        );
    }

    #[test]
    fn test_blank_and_unknown_lines_ignored() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("frobnicate"), None);
        assert_eq!(parse_command("install "), None);
        assert_eq!(parse_command("uninstall "), None);
    }
}
