//! Command-line front end

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use midi_binder::midi::format_monitor;
use midi_binder::{Actions, AppPaths, Engine, MidirBackend, ProfileStore};

/// How often queued MIDI input is drained while running
const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// MIDI Binder - Drive volume, mute and commands from a MIDI controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding profiles.yaml
    #[arg(short, long, env = "MIDI_BINDER_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List connected MIDI devices
    List,

    /// Activate a device and dispatch its bindings until Ctrl+C
    Run {
        /// Device name as shown by `list`. Without it, the first connected
        /// device with a stored profile is used.
        device: Option<String>,

        /// Log actions instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print messages received from a device
    Monitor {
        /// Device name as shown by `list`
        device: String,
    },

    /// List stored profiles
    Profiles,

    /// Delete a stored profile
    Remove {
        /// Profile (device) name
        device: String,
    },
}

pub async fn execute(args: Args) -> Result<()> {
    let paths = AppPaths::detect(args.config_dir.as_deref());
    let store = ProfileStore::open(&paths)
        .with_context(|| format!("Failed to open {}", paths.profiles.display()))?;

    match args.command {
        Command::List => list_devices(store),
        Command::Run { device, dry_run } => {
            let actions = if dry_run {
                Actions::dry_run()
            } else {
                Actions::host()
            };
            run(
                Engine::new(Box::new(MidirBackend::default()), store, actions),
                device.as_deref(),
            )
            .await
        }
        Command::Monitor { device } => {
            monitor(
                Engine::new(Box::new(MidirBackend::default()), store, Actions::none()),
                &device,
            )
            .await
        }
        Command::Profiles => list_profiles(&store),
        Command::Remove { device } => remove_profile(&store, &device),
    }
}

fn list_devices(store: ProfileStore) -> Result<()> {
    let engine = Engine::new(Box::new(MidirBackend::default()), store, Actions::none());
    let devices = engine
        .list_available_devices()
        .context("Failed to enumerate MIDI ports")?;

    println!("\n{}", "=== MIDI Devices ===".bold().cyan());
    if devices.is_empty() {
        println!("  {}", "No MIDI input devices found".yellow());
    }
    for device in &devices {
        let marker = if engine.has_profile(device) {
            "profile".green()
        } else {
            "new".dimmed()
        };
        println!("  {} [{}]", device.bold(), marker);
    }
    println!();
    Ok(())
}

fn list_profiles(store: &ProfileStore) -> Result<()> {
    let names = store.profile_names()?;

    println!("\n{}", "=== Stored Profiles ===".bold().cyan());
    println!("  {}", store.path().display().to_string().dimmed());
    if names.is_empty() {
        println!("  {}", "No profiles saved yet".yellow());
    }
    for name in &names {
        println!("  {}", name.bold());
    }
    println!();
    Ok(())
}

fn remove_profile(store: &ProfileStore, device: &str) -> Result<()> {
    if !store.has(device) {
        println!("{} No profile named '{}'", "⚠".yellow(), device);
        return Ok(());
    }
    store.remove(&midi_binder::DeviceProfile::detached(device))?;
    println!("{} Removed profile '{}'", "✓".green(), device);
    Ok(())
}

async fn run(mut engine: Engine, device: Option<&str>) -> Result<()> {
    let device = match device {
        Some(device) => {
            engine
                .activate(device)
                .with_context(|| format!("Failed to activate '{}'", device))?;
            device.to_string()
        }
        None => engine
            .activate_stored()
            .context("No device given and none could be activated from stored profiles")?,
    };
    info!("Listening on '{}'. Press Ctrl+C to exit", device);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.process_pending();
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
        }
    }

    engine.deactivate();
    Ok(())
}

async fn monitor(mut engine: Engine, device: &str) -> Result<()> {
    engine
        .activate(device)
        .with_context(|| format!("Failed to activate '{}'", device))?;

    println!("{}", format!("=== Monitoring {} ===", device).bold().cyan());
    println!("Press Ctrl+C to exit\n");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let timestamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
                engine.process_pending_with(|message, _| {
                    println!("{}", format_monitor(&timestamp, message));
                });
            }
            _ = &mut shutdown => break,
        }
    }

    engine.deactivate();
    Ok(())
}
