use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info, warn};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use signage_player::player::{dispatch_line, EngineEvent, EngineEventHandler, PlaybackEngine};
use signage_player::utils::{self, Config};
use signage_player::SignagePlayerBuilder;

/// signage-player - An unattended video signage player
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (replaces the system and user config files)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the video files
    #[arg(long, value_name = "DIR")]
    video_dir: Option<PathBuf>,

    /// Persisted playlist file
    #[arg(long, value_name = "FILE")]
    playlist_file: Option<PathBuf>,

    /// Startup volume (0-150)
    #[arg(short, long, value_name = "VOLUME")]
    volume: Option<u32>,

    /// Simulated media length in seconds for the headless backend
    #[arg(long, value_name = "SECS")]
    media_duration: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;

    let log_level = if args.debug { "debug" } else { config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting signage-player v{}", env!("CARGO_PKG_VERSION"));
    info!("Video directory: {}", config.library.video_dir.display());

    let mut player = SignagePlayerBuilder::new()
        .with_config(config)
        .with_event_handler(Box::new(LoggingEventHandler))
        .build()?;

    info!("{}", player.engine().status().summary());
    spawn_command_reader(Arc::clone(player.engine()))?;

    wait_for_shutdown().await;

    player.shutdown();
    info!("signage-player stopped");
    Ok(())
}

/// Load configuration and apply command line overrides
fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => utils::load_config()?,
    };

    if let Some(dir) = &args.video_dir {
        config.library.video_dir = dir.clone();
    }
    if let Some(file) = &args.playlist_file {
        config.library.playlist_file = file.clone();
    }
    if let Some(volume) = args.volume {
        config.playback.default_volume = volume;
    }
    if let Some(secs) = args.media_duration {
        config.playback.headless_media_duration_secs = Some(secs);
    }

    config.validate()?;
    Ok(config)
}

/// Read newline-delimited JSON commands from stdin and answer each on stdout.
/// EOF ends the reader only; the player keeps running.
fn spawn_command_reader(engine: Arc<PlaybackEngine>) -> Result<()> {
    thread::Builder::new()
        .name("command-input".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to read command: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let reply = dispatch_line(&engine, line.trim());
                let mut stdout = io::stdout().lock();
                if writeln!(stdout, "{}", reply).and_then(|_| stdout.flush()).is_err() {
                    warn!("stdout closed, no longer answering commands");
                    break;
                }
            }
            debug!("Command input closed");
        })?;
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
                    _ = terminate.recv() => info!("Terminate signal received"),
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
    }
    info!("Interrupt received");
}

/// Event handler that logs events
struct LoggingEventHandler;

impl EngineEventHandler for LoggingEventHandler {
    fn handle_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::ItemStarted { index, filename } => debug!("Now showing #{} {}", index, filename),
            EngineEvent::ScheduleExpired { filename } => info!("{} left its schedule window", filename),
            EngineEvent::PlaylistExhausted => warn!("Nothing in the playlist is eligible to play"),
            EngineEvent::PlaylistChanged { count } => debug!("Playlist now has {} items", count),
            EngineEvent::BackendFailed { message } => error!("Playback failed: {}", message),
            EngineEvent::Paused | EngineEvent::Resumed | EngineEvent::Stopped => {
                debug!("Engine event: {:?}", event)
            }
        }
    }
}
