//! Shared fixtures for the signage player integration tests

#![allow(dead_code)]

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use signage_player::backend::HeadlessBackend;
use signage_player::playlist::{PlaylistItem, PlaylistStore};
use signage_player::schedule::ManualClock;
use signage_player::utils::Config;
use signage_player::{SignagePlayer, SignagePlayerBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Temporary library with a video directory and a playlist file
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub config: Config,
    pub backend: Arc<HeadlessBackend>,
    pub clock: Arc<ManualClock>,
}

impl TestFixture {
    /// Library holding one placeholder file per item, persisted in this
    /// order with looping on and auto-play off
    pub fn new(items: &[PlaylistItem]) -> Result<Self> {
        let temp_dir = TempDir::new()?;

        let mut config = Config::default();
        config.library.video_dir = temp_dir.path().join("videos");
        config.library.playlist_file = temp_dir.path().join("playlist.json");
        config.playback.schedule_check_interval_secs = 1;
        config.playback.autoplay_delay_secs = 0;
        fs::create_dir_all(&config.library.video_dir)?;

        let fixture = Self {
            temp_dir,
            config,
            backend: Arc::new(HeadlessBackend::new()),
            clock: Arc::new(ManualClock::new(noon())),
        };
        for item in items {
            fixture.add_file(&item.filename)?;
        }
        fixture.write_playlist(items, true, false)?;
        Ok(fixture)
    }

    pub fn with_names(names: &[&str]) -> Result<Self> {
        let items: Vec<PlaylistItem> = names.iter().map(|name| PlaylistItem::new(*name)).collect();
        Self::new(&items)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn video_path(&self, name: &str) -> PathBuf {
        self.config.library.video_dir.join(name)
    }

    /// Create a placeholder video file
    pub fn add_file(&self, name: &str) -> Result<()> {
        fs::write(self.video_path(name), b"not really a video")?;
        Ok(())
    }

    pub fn write_playlist(&self, items: &[PlaylistItem], is_looping: bool, auto_play: bool) -> Result<()> {
        PlaylistStore::save_to(&self.config.library.playlist_file, items, is_looping, auto_play)?;
        Ok(())
    }

    /// Player over this fixture's backend and clock, without startup auto-play
    pub fn player(&self) -> Result<SignagePlayer> {
        Ok(self.builder().with_autoplay(false).build()?)
    }

    pub fn builder(&self) -> SignagePlayerBuilder {
        SignagePlayerBuilder::new()
            .with_config(self.config.clone())
            .with_backend(self.backend.clone())
            .with_clock(self.clock.clone())
    }
}

pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid test date")
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
}
