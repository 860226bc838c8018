//! `pepfob-tui`: the pepfob device, simulated in a terminal.
//!
//! Runs the real orchestrator against a live router with a virtual
//! board: the left panel is the device display, keys stand in for the
//! three buttons, and the Wi-Fi radio joins networks after a delay.
//!
//! Logs go to a file so they never corrupt the display. A restart
//! (from the Reboot or Factory Reset countdowns) re-reads the settings
//! and boots the device again.

mod app;
mod board;
mod event;
mod theme;
mod tui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use secrecy::SecretString;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pepfob_config::{ConfigError, FileSettingsStore};
use pepfob_core::{CredentialStore, DeviceConfig, FileStore, MemoryStore, SessionManager};

use crate::app::{App, Exit};
use crate::board::{Halt, SimBoard, SimOptions};

/// Terminal simulator for the pepfob Peplink companion device.
#[derive(Parser, Debug)]
#[command(name = "pepfob-tui", version, about)]
struct Cli {
    /// Settings file (defaults to the platform config dir)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Router URL, overriding the settings file (e.g. http://192.168.50.1:88)
    #[arg(long, short = 'r')]
    router: Option<url::Url>,

    /// Seconds a simulated Wi-Fi join takes
    #[arg(long, default_value_t = 2)]
    join_delay: u64,

    /// SSID whose join always fails (repeatable)
    #[arg(long = "fail-ssid")]
    fail_ssids: Vec<String>,

    /// Keep the router cookie and token in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Log file (defaults to pepfob-tui.log in the data dir)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing. Holding the guard keeps the writer flushing.
fn setup_tracing(cli: &Cli) -> Result<WorkerGuard> {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pepfob_tui={level},pepfob_core={level},pepfob_api={level}"))
    });

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| pepfob_config::log_dir().join("pepfob-tui.log"));
    let dir = log_file.parent().map_or_else(|| PathBuf::from("."), PathBuf::from);
    std::fs::create_dir_all(&dir).wrap_err_with(|| format!("creating {}", dir.display()))?;
    let name = log_file.file_name().map_or_else(|| "pepfob-tui.log".into(), PathBuf::from);

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .init();
    Ok(guard)
}

/// Settings file to runtime config. A missing password still boots the
/// device; the router login then fails on screen.
fn load_config(cli: &Cli, path: &std::path::Path) -> Result<DeviceConfig> {
    let settings = pepfob_config::load_settings_from(path)
        .wrap_err_with(|| format!("loading {}", path.display()))?;
    let mut config = match settings.to_device_config() {
        Err(ConfigError::NoCredentials) => {
            warn!("no router password configured");
            settings.device_config_with(SecretString::from(String::new()))?
        }
        other => other?,
    };
    if let Some(url) = &cli.router {
        config.router.url = url.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli)?;

    let settings_path = cli.settings.clone().unwrap_or_else(pepfob_config::settings_path);
    let store: Arc<dyn CredentialStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(pepfob_config::data_dir()))
    };
    let board = SimBoard::new(SimOptions {
        join_delay: Duration::from_secs(cli.join_delay),
        failing_ssids: cli.fail_ssids.clone(),
        ..SimOptions::default()
    });

    loop {
        let config = load_config(&cli, &settings_path)?;
        info!(url = %config.router.url, device = %config.device_name, "booting");

        let session = Arc::new(SessionManager::new(&config.router, Arc::clone(&store))?);
        let settings = Arc::new(FileSettingsStore::new(settings_path.clone()));
        let app = App::new(config, board.clone(), session, settings);

        match app.run().await? {
            Exit::Quit => break,
            Exit::Halted(Halt::PowerOff) => {
                println!("pepfob powered off");
                break;
            }
            Exit::Halted(Halt::Restart) => {
                info!("restarting");
                board.reset();
            }
        }
    }
    Ok(())
}
