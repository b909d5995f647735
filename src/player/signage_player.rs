//! High-level signage player API
//!
//! [`SignagePlayer`] assembles the playlist store, a media backend, the
//! playback engine and its worker threads from a [`Config`], and tears them
//! down again in order at shutdown.

use crate::backend::{HeadlessBackend, MediaBackend};
use crate::player::{EngineEventHandler, PlaybackEngine, PlayerWorkers};
use crate::playlist::PlaylistStore;
use crate::schedule::{Clock, SystemClock};
use crate::utils::config::Config;
use crate::utils::error::Result;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Signage player builder for customized assembly
pub struct SignagePlayerBuilder {
    config: Config,
    backend: Option<Arc<dyn MediaBackend>>,
    clock: Arc<dyn Clock>,
    event_handlers: Vec<Box<dyn EngineEventHandler>>,
    autoplay: bool,
}

impl SignagePlayerBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            backend: None,
            clock: Arc::new(SystemClock),
            event_handlers: Vec::new(),
            autoplay: true,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use a specific media backend instead of the headless one
    pub fn with_backend(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_handler(mut self, handler: Box<dyn EngineEventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    /// Honour the persisted auto-play flag at startup (on by default)
    pub fn with_autoplay(mut self, enabled: bool) -> Self {
        self.autoplay = enabled;
        self
    }

    /// Build the player and start its workers
    pub fn build(self) -> Result<SignagePlayer> {
        SignagePlayer::new_with_builder(self)
    }
}

impl Default for SignagePlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Running signage player
pub struct SignagePlayer {
    engine: Arc<PlaybackEngine>,
    workers: Option<PlayerWorkers>,
}

impl SignagePlayer {
    /// Create a player from configuration with the default backend and clock
    pub fn new(config: Config) -> Result<Self> {
        SignagePlayerBuilder::new().with_config(config).build()
    }

    fn new_with_builder(builder: SignagePlayerBuilder) -> Result<Self> {
        info!("Initializing signage player");
        let config = builder.config;
        config.validate()?;

        let store = PlaylistStore::open(config.library.clone())?;
        let auto_play = store.auto_play();

        let backend = match builder.backend {
            Some(backend) => backend,
            None => default_backend(&config)?,
        };

        let engine = Arc::new(PlaybackEngine::new(store, backend, builder.clock));
        for handler in builder.event_handlers {
            engine.add_event_handler(handler);
        }
        if let Err(e) = engine.set_volume(i64::from(config.playback.default_volume)) {
            warn!("Could not apply default volume: {}", e);
        }

        let interval = Duration::from_secs(config.playback.schedule_check_interval_secs);
        let mut workers = PlayerWorkers::spawn(&engine, interval)?;

        if builder.autoplay && auto_play && !engine.is_empty() {
            let delay = Duration::from_secs(config.playback.autoplay_delay_secs);
            info!("Auto-play in {:?}", delay);
            workers.schedule_autoplay(delay)?;
        }

        Ok(Self {
            engine,
            workers: Some(workers),
        })
    }

    /// The engine, for issuing commands
    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    /// Stop the workers, then stop and release the backend
    pub fn shutdown(&mut self) {
        let Some(mut workers) = self.workers.take() else {
            return;
        };
        info!("Shutting down signage player");
        workers.shutdown();
        self.engine.release();
    }
}

impl Drop for SignagePlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn default_backend(config: &Config) -> Result<Arc<dyn MediaBackend>> {
    let backend = match config.playback.headless_media_duration_secs {
        Some(secs) => HeadlessBackend::with_media_duration(Duration::from_secs(secs))?,
        None => HeadlessBackend::new(),
    };
    Ok(Arc::new(backend))
}
