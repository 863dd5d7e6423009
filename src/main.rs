//! appdock - Headless manager for apps on a single attached iOS device
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::path::PathBuf;

use clap::Parser;

mod headless;

/// Manage apps on a single attached iOS device
#[derive(Parser, Debug)]
#[command(name = "appdock")]
#[command(about = "Manage apps on a single attached iOS device", long_about = None)]
struct Args {
    /// Installer executable (bare name or path); overrides the config file
    #[arg(long, value_name = "PATH")]
    installer: Option<PathBuf>,

    /// Presence polling interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Config file location (default: <config dir>/appdock/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    appdock_core::logging::init()?;

    let mut settings = appdock_app::Settings::load(args.config.as_deref())?;
    if let Some(installer) = args.installer {
        settings.installer_path = installer;
    }
    if let Some(interval_ms) = args.interval_ms {
        settings.poll_interval_ms = interval_ms;
    }
    settings.validate()?;

    headless::run(settings).await?;
    Ok(())
}
