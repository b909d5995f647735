//! Headless media backend
//!
//! Implements the full backend contract without decoding or displaying
//! anything. Time advances with the wall clock while "playing", and an
//! optional nominal media length makes the backend report end-of-media on
//! its own. Useful for dry runs on machines without a display and for
//! exercising the engine in tests.

use crate::backend::{BackendState, EndReachedCallback, MediaBackend};
use crate::utils::config::MAX_VOLUME;
use crate::utils::error::{IntoSignageError, Result, SignageError};
use crossbeam::channel::{bounded, select, tick, Sender};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often the monitor thread checks for the end of the media
const MONITOR_INTERVAL: Duration = Duration::from_millis(100);

/// Headless backend
pub struct HeadlessBackend {
    shared: Arc<Shared>,

    /// End-of-media monitor (only with a nominal media length)
    monitor: Mutex<Option<Monitor>>,
}

struct Monitor {
    shutdown_tx: Sender<()>,
    handle: thread::JoinHandle<()>,
}

struct Shared {
    playback: Mutex<Playback>,
    callbacks: RwLock<Vec<EndReachedCallback>>,
    media_duration: Option<Duration>,
    failing: AtomicBool,
    renders: AtomicU64,
}

#[derive(Debug)]
struct Playback {
    media: Option<PathBuf>,
    state: BackendState,
    volume: u32,

    /// Play time accumulated before the last resume
    played: Duration,

    /// Set while playing
    resumed_at: Option<Instant>,
}

impl Playback {
    fn elapsed(&self) -> Duration {
        self.played + self.resumed_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}

impl Shared {
    /// Mark the media as ended and notify listeners. Returns false when
    /// nothing was playing or `reached` declined.
    fn finish_when(&self, reached: impl FnOnce(&Playback) -> bool) -> bool {
        {
            let mut playback = self.playback.lock();
            if playback.state != BackendState::Playing || !reached(&playback) {
                return false;
            }
            playback.played = playback.elapsed();
            playback.resumed_at = None;
            playback.state = BackendState::Ended;
        }

        // Callbacks run without the state lock held
        let callbacks = self.callbacks.read().clone();
        for callback in callbacks {
            callback();
        }
        true
    }

    fn check_failing(&self, operation: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SignageError::backend_error(format!("{} failed (simulated)", operation)));
        }
        Ok(())
    }
}

impl HeadlessBackend {
    /// Backend whose media never ends by itself
    pub fn new() -> Self {
        Self::with_duration(None)
    }

    /// Backend that reports end-of-media after `duration` of play time
    pub fn with_media_duration(duration: Duration) -> Result<Self> {
        let backend = Self::with_duration(Some(duration));

        let (shutdown_tx, shutdown_rx) = bounded(1);
        let shared = Arc::clone(&backend.shared);
        let handle = thread::Builder::new()
            .name("headless-media-clock".to_string())
            .spawn(move || {
                let ticker = tick(MONITOR_INTERVAL);
                loop {
                    select! {
                        recv(shutdown_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            // Checked under the same lock that ends it, so a
                            // freshly loaded item is never ended by mistake
                            if shared.finish_when(|playback| playback.elapsed() >= duration) {
                                debug!("Headless media reached its end");
                            }
                        }
                    }
                }
            })
            .internal_err("Failed to start headless media clock")?;

        *backend.monitor.lock() = Some(Monitor { shutdown_tx, handle });
        info!("Headless backend simulating {:?} per media item", duration);
        Ok(backend)
    }

    fn with_duration(media_duration: Option<Duration>) -> Self {
        Self {
            shared: Arc::new(Shared {
                playback: Mutex::new(Playback {
                    media: None,
                    state: BackendState::NothingSpecial,
                    volume: 100,
                    played: Duration::ZERO,
                    resumed_at: None,
                }),
                callbacks: RwLock::new(Vec::new()),
                media_duration,
                failing: AtomicBool::new(false),
                renders: AtomicU64::new(0),
            }),
            monitor: Mutex::new(None),
        }
    }

    /// Report end-of-media now, as if the current item had played out.
    /// Returns false when nothing was playing.
    pub fn finish(&self) -> bool {
        self.shared.finish_when(|_| true)
    }

    /// Make every subsequent load/play fail until cleared
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::SeqCst);
    }

    /// Currently loaded media
    pub fn loaded_media(&self) -> Option<PathBuf> {
        self.shared.playback.lock().media.clone()
    }

    /// Name of the currently loaded file
    pub fn loaded_file_name(&self) -> Option<String> {
        self.loaded_media()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    }

    /// Number of successful set_media calls so far
    pub fn render_count(&self) -> u64 {
        self.shared.renders.load(Ordering::SeqCst)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for HeadlessBackend {
    fn set_media(&self, path: &Path) -> Result<()> {
        self.shared.check_failing("set_media")?;
        if !path.is_file() {
            return Err(SignageError::backend_error(format!("Cannot open media {}", path.display())));
        }

        let mut playback = self.shared.playback.lock();
        playback.media = Some(path.to_path_buf());
        playback.state = BackendState::Opening;
        playback.played = Duration::ZERO;
        playback.resumed_at = None;
        self.shared.renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn play(&self) -> Result<()> {
        self.shared.check_failing("play")?;

        let mut playback = self.shared.playback.lock();
        if playback.media.is_none() {
            return Err(SignageError::backend_error("No media loaded"));
        }
        if playback.state == BackendState::Ended || playback.state == BackendState::Stopped {
            playback.played = Duration::ZERO;
        }
        if playback.resumed_at.is_none() {
            playback.resumed_at = Some(Instant::now());
        }
        playback.state = BackendState::Playing;
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        let mut playback = self.shared.playback.lock();
        if playback.state == BackendState::Playing {
            playback.played = playback.elapsed();
            playback.resumed_at = None;
            playback.state = BackendState::Paused;
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut playback = self.shared.playback.lock();
        playback.played = Duration::ZERO;
        playback.resumed_at = None;
        if playback.media.is_some() {
            playback.state = BackendState::Stopped;
        }
        Ok(())
    }

    fn seek(&self, position: f32) -> Result<()> {
        let Some(duration) = self.shared.media_duration else {
            return Ok(());
        };

        let mut playback = self.shared.playback.lock();
        playback.played = duration.mul_f32(position.clamp(0.0, 1.0));
        if playback.resumed_at.is_some() {
            playback.resumed_at = Some(Instant::now());
        }
        Ok(())
    }

    fn set_volume(&self, volume: u32) -> Result<()> {
        self.shared.playback.lock().volume = volume.min(MAX_VOLUME);
        Ok(())
    }

    fn state(&self) -> BackendState {
        self.shared.playback.lock().state
    }

    fn length_ms(&self) -> i64 {
        let playback = self.shared.playback.lock();
        match (&playback.media, self.shared.media_duration) {
            (Some(_), Some(duration)) => duration.as_millis() as i64,
            _ => -1,
        }
    }

    fn position(&self) -> f32 {
        let playback = self.shared.playback.lock();
        match (&playback.media, self.shared.media_duration) {
            (Some(_), Some(duration)) if !duration.is_zero() => {
                (playback.elapsed().as_secs_f32() / duration.as_secs_f32()).min(1.0)
            }
            _ => -1.0,
        }
    }

    fn time_ms(&self) -> i64 {
        let playback = self.shared.playback.lock();
        if playback.media.is_none() {
            return -1;
        }
        let elapsed = playback.elapsed();
        let elapsed = match self.shared.media_duration {
            Some(duration) => elapsed.min(duration),
            None => elapsed,
        };
        elapsed.as_millis() as i64
    }

    fn volume(&self) -> i32 {
        self.shared.playback.lock().volume as i32
    }

    fn on_end_reached(&self, callback: EndReachedCallback) {
        self.shared.callbacks.write().push(callback);
    }

    fn release(&self) {
        if let Some(monitor) = self.monitor.lock().take() {
            let _ = monitor.shutdown_tx.send(());
            let _ = monitor.handle.join();
        }
    }
}

impl Drop for HeadlessBackend {
    fn drop(&mut self) {
        self.release();
    }
}
