//! shroud - Main entry point.
//!
//! Locks the X display until the invoking user's password is accepted by
//! PAM.
//!
//! # Startup
//!
//! Everything that can fail is set up before the process forks, so errors
//! still reach the terminal that started it:
//! - configuration and command-line flags
//! - the PAM transaction for `$USER`
//! - the display connection, cursor and backdrop image
//!
//! The lock itself (grabs, window, event loop) runs in the child.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use shroud::{daemonize, PamService, X11Display};
use shroud_core::{Config, LockError, LockSession, Overrides, PointerCursor, Rgb, VerifierService};

use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Simple screen locker for X11.
#[derive(Parser)]
#[command(name = "shroud")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Don't fork after locking
    #[arg(short, long)]
    nofork: bool,

    /// Beep on a failed attempt
    #[arg(short, long)]
    beep: bool,

    /// Turn the screen off via DPMS once locked
    #[arg(short, long)]
    dpms: bool,

    /// Display the given XPM image
    #[arg(short, long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Background color as rrggbb (default: ffffff)
    #[arg(short, long, value_name = "RRGGBB")]
    color: Option<Rgb>,

    /// Tile the image over the whole screen
    #[arg(short, long)]
    tiling: bool,

    /// Pointer while locked: default, win or a cursor theme name
    #[arg(short, long, value_name = "POINTER")]
    pointer: Option<String>,

    /// Path to config file [default: ~/.config/shroud/config.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            nofork: self.nofork,
            beep: self.beep,
            dpms: self.dpms,
            image: self.image.clone(),
            color: self.color,
            tiling: self.tiling,
            pointer: self.pointer.as_deref().map(PointerCursor::from),
        }
    }
}

fn setup_logging(level: &str) {
    // RUST_LOG overrides the command-line level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // JOURNAL_STREAM is set when stderr goes to the journal
    if std::env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(journald_layer)
                .with(filter)
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration from specified path");
            Config::load_from(path)
                .map_err(LockError::from)
                .context("Failed to load configuration")
        }
        None => {
            let config = Config::load()
                .map_err(LockError::from)
                .context("Failed to load configuration")?;
            match Config::default_path() {
                Some(path) if path.exists() => {
                    info!(path = %path.display(), "Loaded configuration")
                }
                _ => debug!("No config file found, using defaults"),
            }
            Ok(config)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    setup_logging(log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting shroud");

    let config = load_config(cli.config.as_ref())?.resolve(&cli.overrides());
    debug!(?config, "Effective configuration");

    let user = std::env::var("USER").map_err(|_| LockError::NoIdentity)?;

    let verifier = PamService::new(config.service.as_str())
        .start_session(&user)
        .map_err(LockError::from)
        .context("Failed to start PAM")?;

    let mut display = X11Display::open()
        .map_err(LockError::from)
        .context("Failed to open display")?;
    display
        .prepare(&config.appearance)
        .map_err(LockError::from)
        .context("Failed to prepare lock surface")?;

    if config.daemonize {
        daemonize().context("Failed to fork")?;
    }

    let mut session = LockSession::new(config, verifier);
    session.run(&mut display)?;

    Ok(())
}
