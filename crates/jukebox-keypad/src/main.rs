mod input;
mod logging;

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use jukebox_keypad::Jukebox;
use jukebox_proto::config::Config;
use jukebox_proto::mpd::{Connector, TcpConnector};
use tracing::info;

use input::{KeySource, StreamKeys, TerminalKeys};

const QUIT_KEY: char = 'q';

#[derive(Parser, Debug)]
#[command(name = "jukebox", about = "Numeric keypad remote for an MPD jukebox")]
struct Args {
    /// Daemon host, overrides the config file
    host: Option<String>,

    /// Daemon port, overrides the config file
    #[arg(long)]
    port: Option<u16>,

    /// Config file to use instead of ~/.config/jukebox/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(long)]
    log_stderr: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };
    if let Some(host) = args.host {
        config.daemon.host = host;
    }
    if let Some(port) = args.port {
        config.daemon.port = port;
    }
    config.validate()?;

    // ── Logging ──────────────────────────────────────────────────────────────
    if let Some(log_path) = logging::init(&config.log, args.log_stderr)? {
        // Print log path to stderr so the operator can tail it immediately.
        eprintln!("jukebox log: {}", log_path.display());
    }
    info!("jukebox starting");

    // ── Connect ──────────────────────────────────────────────────────────────
    let mut jukebox = Jukebox::new(&config, TcpConnector)?;
    if !jukebox.initialize() {
        anyhow::bail!(
            "could not connect to {}:{}",
            config.daemon.host,
            config.daemon.port
        );
    }

    // ── Key loop ─────────────────────────────────────────────────────────────
    let result = if io::stdin().is_terminal() {
        run(&mut jukebox, TerminalKeys::new()?)
    } else {
        run(&mut jukebox, StreamKeys::new(io::stdin().lock()))
    };

    jukebox.shutdown();
    result
}

fn run<C: Connector>(jukebox: &mut Jukebox<C>, mut keys: impl KeySource) -> anyhow::Result<()> {
    while let Some(key) = keys.next_key()? {
        if key == QUIT_KEY {
            info!("Quit key pressed");
            break;
        }
        jukebox.handle_key(key);
    }
    info!("Input closed");
    Ok(())
}
