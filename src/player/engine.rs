//! Playback engine
//!
//! Owns the playlist store and the playback state behind one mutex and
//! drives the media backend. Every state transition, whether it comes from a
//! command, an end-of-media notification or the schedule checker, happens
//! while that mutex is held, so exactly one transition is in flight at a time.
//!
//! Autonomous advancement is requested through the [`AdvanceSignal`] and
//! performed by [`PlaybackEngine::advance`] on the advance worker.

use crate::backend::{BackendState, EndReachedCallback, MediaBackend};
use crate::player::signal::AdvanceSignal;
use crate::player::state::{circular_step, index_after_removal, PlaybackState, StatusSnapshot};
use crate::player::{EngineEvent, EngineEventHandler, EngineState};
use crate::playlist::{validate_filename, PlaylistEntry, PlaylistItem, PlaylistStore, VideoFile};
use crate::schedule::{self, Clock, Schedule};
use crate::utils::config::MAX_VOLUME;
use crate::utils::error::{Result, SignageError};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// State guarded by the engine lock
struct EngineInner {
    store: PlaylistStore,
    current_index: usize,
    is_playing: bool,
    state: EngineState,
    /// Set by play() when it hands the first render to the advance worker
    restart_pending: bool,
    /// Set when the rendering item was removed from the playlist:
    /// `current_index` already names its successor, and the flag tells
    /// whether reaching that successor wraps around the end
    successor_pending: Option<bool>,
}

impl EngineInner {
    fn idle_state(&self) -> EngineState {
        if self.store.is_empty() {
            EngineState::Empty
        } else {
            EngineState::Stopped
        }
    }
}

/// Playlist playback engine
pub struct PlaybackEngine {
    inner: Mutex<EngineInner>,
    backend: Arc<dyn MediaBackend>,
    signal: Arc<AdvanceSignal>,
    clock: Arc<dyn Clock>,
    handlers: RwLock<Vec<Box<dyn EngineEventHandler>>>,
}

impl PlaybackEngine {
    /// Create an engine over a loaded store and hook the backend's
    /// end-of-media notification to the advance signal.
    pub fn new(store: PlaylistStore, backend: Arc<dyn MediaBackend>, clock: Arc<dyn Clock>) -> Self {
        let signal = Arc::new(AdvanceSignal::new());

        let on_end: EndReachedCallback = {
            let signal = Arc::clone(&signal);
            Arc::new(move || signal.raise())
        };
        backend.on_end_reached(on_end);

        let state = if store.is_empty() {
            EngineState::Empty
        } else {
            EngineState::Stopped
        };

        Self {
            inner: Mutex::new(EngineInner {
                store,
                current_index: 0,
                is_playing: false,
                state,
                restart_pending: false,
                successor_pending: None,
            }),
            backend,
            signal,
            clock,
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler. Handlers run under the engine lock and must
    /// not call back into the engine.
    pub fn add_event_handler(&self, handler: Box<dyn EngineEventHandler>) {
        self.handlers.write().push(handler);
    }

    pub(crate) fn signal(&self) -> &Arc<AdvanceSignal> {
        &self.signal
    }

    // -- Transport ---------------------------------------------------------

    /// Start playback.
    ///
    /// With an index, that item is rendered; a negative or too large index is
    /// `IndexOutOfRange`. Without one, a paused item is
    /// resumed; otherwise the current item is rendered if it is eligible, and
    /// if not, the advance worker is asked to pick the next eligible one.
    pub fn play(&self, index: Option<i64>) -> Result<()> {
        let mut inner = self.inner.lock();
        let len = inner.store.len();
        if len == 0 {
            inner.state = EngineState::Empty;
            return Err(SignageError::EmptyPlaylist);
        }

        if let Some(index) = index {
            let Some(index) = usize::try_from(index).ok().filter(|&i| i < len) else {
                return Err(SignageError::IndexOutOfRange { index, len });
            };
            self.signal.clear();
            return self.render(&mut inner, index);
        }

        if inner.state == EngineState::Paused {
            if let Err(e) = self.backend.play() {
                self.degrade(&mut inner, &e);
                return Err(e);
            }
            inner.is_playing = true;
            inner.state = EngineState::Playing;
            info!("Playback resumed");
            self.emit(EngineEvent::Resumed);
            return Ok(());
        }

        let current = inner.current_index.min(len - 1);
        inner.current_index = current;
        if !self.is_eligible(&inner, current) {
            debug!("Current item is not eligible, requesting an advance");
            inner.is_playing = true;
            inner.restart_pending = true;
            self.signal.raise();
            return Ok(());
        }

        self.signal.clear();
        self.render(&mut inner, current)
    }

    /// Pause the current item; a no-op unless playing
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != EngineState::Playing {
            return Ok(());
        }

        if let Err(e) = self.backend.pause() {
            self.degrade(&mut inner, &e);
            return Err(e);
        }
        inner.is_playing = false;
        inner.state = EngineState::Paused;
        info!("Playback paused");
        self.emit(EngineEvent::Paused);
        Ok(())
    }

    /// Stop playback
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let result = self.backend.stop();
        inner.is_playing = false;
        inner.restart_pending = false;
        inner.successor_pending = None;
        inner.state = inner.idle_state();
        self.signal.clear();
        info!("Playback stopped");
        self.emit(EngineEvent::Stopped);

        if let Err(e) = &result {
            error!("Backend failed to stop: {}", e);
        }
        result
    }

    /// Render the next eligible item. Returns its index, or `None` when
    /// nothing is eligible (the engine is then `Empty`).
    pub fn next(&self) -> Result<Option<usize>> {
        self.step(true)
    }

    /// Render the previous eligible item. Returns its index, or `None` when
    /// nothing is eligible (the engine is then `Empty`).
    pub fn previous(&self) -> Result<Option<usize>> {
        self.step(false)
    }

    fn step(&self, forward: bool) -> Result<Option<usize>> {
        let mut inner = self.inner.lock();
        let len = inner.store.len();
        if len == 0 {
            inner.is_playing = false;
            inner.state = EngineState::Empty;
            return Err(SignageError::EmptyPlaylist);
        }

        if let Err(e) = self.backend.stop() {
            warn!("Backend failed to stop before skipping: {}", e);
        }
        self.signal.clear();
        inner.restart_pending = false;
        let successor = inner.successor_pending.take();

        let from = inner.current_index.min(len - 1);
        match self.find_eligible(&inner, from, forward, forward && successor.is_some()) {
            Some(index) => {
                self.render(&mut inner, index)?;
                Ok(Some(index))
            }
            None => {
                self.exhaust(&mut inner);
                Ok(None)
            }
        }
    }

    /// Set the output volume, clamped to 0..=150. Returns the applied value.
    pub fn set_volume(&self, volume: i64) -> Result<u32> {
        let _inner = self.inner.lock();
        let volume = volume.clamp(0, i64::from(MAX_VOLUME)) as u32;
        self.backend.set_volume(volume)?;
        debug!("Volume set to {}", volume);
        Ok(volume)
    }

    /// Seek within the current item, clamped to 0.0..=1.0. Returns the applied position.
    pub fn seek(&self, position: f64) -> Result<f32> {
        let _inner = self.inner.lock();
        let position = if position.is_nan() { 0.0 } else { position.clamp(0.0, 1.0) as f32 };
        self.backend.seek(position)?;
        debug!("Seeked to {:.3}", position);
        Ok(position)
    }

    pub fn set_loop(&self, is_looping: bool) -> Result<bool> {
        self.inner.lock().store.set_looping(is_looping)?;
        info!("Looping {}", if is_looping { "enabled" } else { "disabled" });
        Ok(is_looping)
    }

    pub fn set_auto_play(&self, auto_play: bool) -> Result<bool> {
        self.inner.lock().store.set_auto_play(auto_play)?;
        info!("Auto-play {}", if auto_play { "enabled" } else { "disabled" });
        Ok(auto_play)
    }

    // -- Autonomous transitions -------------------------------------------

    /// Consume a pending advance request and move to the next eligible item.
    ///
    /// Runs on the advance worker. Requests cancelled by a command in the
    /// meantime, or arriving while playback is not requested, are ignored.
    /// Errors are logged, never returned.
    pub fn advance(&self) {
        let mut inner = self.inner.lock();
        if !self.signal.take() {
            debug!("Advance request already handled");
            return;
        }
        if !inner.is_playing {
            debug!("Ignoring advance: playback not requested");
            return;
        }
        // An end-of-media from an item a command already replaced
        if inner.state == EngineState::Playing
            && !inner.restart_pending
            && matches!(
                self.backend.state(),
                BackendState::Opening | BackendState::Buffering | BackendState::Playing
            )
        {
            debug!("Ignoring stale end-of-media, the current item is still playing");
            return;
        }

        let len = inner.store.len();
        if len == 0 {
            inner.is_playing = false;
            inner.state = EngineState::Empty;
            return;
        }

        let successor = inner.successor_pending.take();
        let from = inner.current_index.min(len - 1);
        let Some(index) = self.find_eligible(&inner, from, true, successor.is_some()) else {
            self.exhaust(&mut inner);
            return;
        };

        // Wrapping past the end needs looping, unless play() asked for this advance
        let restart = std::mem::take(&mut inner.restart_pending);
        let wraps = match successor {
            Some(wrapped) => wrapped || index < from,
            None => index <= from,
        };
        if wraps && !restart && !inner.store.is_looping() {
            info!("End of playlist reached and looping is disabled");
            if let Err(e) = self.backend.stop() {
                warn!("Backend failed to stop: {}", e);
            }
            inner.current_index = index;
            inner.is_playing = false;
            inner.state = EngineState::Stopped;
            self.emit(EngineEvent::Stopped);
            return;
        }

        if let Err(e) = self.render(&mut inner, index) {
            error!("Advance failed: {}", e);
        }
    }

    /// Re-check the item being rendered; if its schedule no longer allows it,
    /// stop it and request an advance.
    pub fn check_schedule(&self) {
        let mut inner = self.inner.lock();
        if !inner.is_playing || inner.state != EngineState::Playing {
            return;
        }
        if inner.successor_pending.is_some() {
            // The rendering item is no longer in the playlist
            return;
        }
        let Some(item) = inner.store.get(inner.current_index) else {
            return;
        };
        if schedule::is_valid(item, self.clock.now()) {
            return;
        }

        let filename = item.filename.clone();
        info!("Schedule window closed for {}, skipping", filename);
        if let Err(e) = self.backend.stop() {
            warn!("Backend failed to stop expired item: {}", e);
        }
        // Still requested, so the advance goes ahead; the backend is idle now
        inner.state = EngineState::Stopped;
        self.emit(EngineEvent::ScheduleExpired { filename });
        self.signal.raise();
    }

    // -- Playlist ----------------------------------------------------------

    pub fn get_playlist(&self) -> Vec<PlaylistItem> {
        self.inner.lock().store.items().to_vec()
    }

    /// Append a video from the library; already present names are left alone
    pub fn add_video(&self, filename: &str) -> Result<Vec<PlaylistItem>> {
        let mut inner = self.inner.lock();
        if inner.store.add(filename)? {
            info!("Added {} to the playlist", filename);
            if inner.state == EngineState::Empty && !inner.is_playing {
                inner.state = EngineState::Stopped;
            }
            self.emit(EngineEvent::PlaylistChanged { count: inner.store.len() });
        }
        Ok(inner.store.items().to_vec())
    }

    /// Remove a video from the playlist; unknown names are a no-op
    pub fn remove_video(&self, filename: &str) -> Result<Vec<PlaylistItem>> {
        let mut inner = self.inner.lock();
        self.remove_locked(&mut inner, filename)?;
        Ok(inner.store.items().to_vec())
    }

    /// Replace the playlist order; the current index restarts at zero
    pub fn reorder_playlist(&self, order: Vec<PlaylistEntry>) -> Result<Vec<PlaylistItem>> {
        let mut inner = self.inner.lock();
        inner.store.reorder(order)?;
        inner.current_index = 0;
        inner.successor_pending = None;

        if inner.store.is_empty() {
            self.clear_playback(&mut inner);
        } else if inner.state == EngineState::Empty && !inner.is_playing {
            inner.state = EngineState::Stopped;
        }
        info!("Playlist reordered ({} items)", inner.store.len());
        self.emit(EngineEvent::PlaylistChanged { count: inner.store.len() });
        Ok(inner.store.items().to_vec())
    }

    /// Update an item's active flag and/or schedule; unknown names are a no-op
    pub fn update_item(
        &self,
        filename: &str,
        active: Option<bool>,
        schedule: Option<Schedule>,
    ) -> Result<Vec<PlaylistItem>> {
        let mut inner = self.inner.lock();
        if inner.store.update_item(filename, active, schedule)? {
            debug!("Updated playlist item {}", filename);
        }
        Ok(inner.store.items().to_vec())
    }

    /// Remove a video from the playlist and delete its file.
    ///
    /// A file that is not on disk yields `FileMissing` (a stale playlist
    /// entry is still dropped); a name known to neither yields `NotInPlaylist`.
    pub fn delete_video_file(&self, filename: &str) -> Result<String> {
        validate_filename(filename)?;
        let mut inner = self.inner.lock();

        let in_playlist = self.remove_locked(&mut inner, filename)?;
        if inner.store.delete_file(filename)? {
            info!("Deleted video file {}", filename);
            return Ok(filename.to_string());
        }

        if in_playlist {
            Err(SignageError::FileMissing(filename.to_string()))
        } else {
            Err(SignageError::NotInPlaylist(filename.to_string()))
        }
    }

    /// Every video in the library directory
    pub fn list_videos(&self) -> Vec<VideoFile> {
        self.inner.lock().store.list_videos()
    }

    // -- Status ------------------------------------------------------------

    /// Consistent snapshot of engine and backend state
    pub fn status(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        let current_file = inner
            .store
            .get(inner.current_index)
            .map(|item| item.filename.clone())
            .unwrap_or_default();

        StatusSnapshot {
            state: self.backend.state().name().to_string(),
            engine_state: inner.state,
            current_file,
            current_index: inner.current_index,
            length: self.backend.length_ms().max(0),
            time: self.backend.time_ms().max(0),
            position: self.backend.position().max(0.0),
            volume: self.backend.volume().max(0),
            is_looping: inner.store.is_looping(),
            auto_play: inner.store.auto_play(),
            playlist_count: inner.store.len(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    pub fn playback_state(&self) -> PlaybackState {
        let inner = self.inner.lock();
        PlaybackState {
            current_index: inner.current_index,
            is_playing: inner.is_playing,
            is_looping: inner.store.is_looping(),
            auto_play: inner.store.auto_play(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    /// Stop the backend for good. Called once at shutdown.
    pub fn release(&self) {
        let mut inner = self.inner.lock();
        inner.is_playing = false;
        inner.state = inner.idle_state();
        if let Err(e) = self.backend.stop() {
            warn!("Backend failed to stop during release: {}", e);
        }
        self.backend.release();
        info!("Media backend released");
    }

    // -- Internals (engine lock held) --------------------------------------

    fn is_eligible(&self, inner: &EngineInner, index: usize) -> bool {
        inner
            .store
            .get(index)
            .is_some_and(|item| schedule::is_valid(item, self.clock.now()))
    }

    /// First eligible index walking one full circle from `from`. Unless
    /// `include_from` is set, `from` itself is only tried on the last step.
    fn find_eligible(&self, inner: &EngineInner, from: usize, forward: bool, include_from: bool) -> Option<usize> {
        let len = inner.store.len();
        let now = self.clock.now();
        let first = if include_from { 0 } else { 1 };
        (first..first + len)
            .map(|step| circular_step(from, step, len, forward))
            .find(|&index| {
                let item = &inner.store.items()[index];
                let eligible = schedule::is_valid(item, now);
                if !eligible {
                    debug!("Skipping {}: not eligible now", item.filename);
                }
                eligible
            })
    }

    /// Load and start the item at `index`
    fn render(&self, inner: &mut EngineInner, index: usize) -> Result<()> {
        let Some(item) = inner.store.get(index) else {
            return Err(SignageError::IndexOutOfRange { index: index as i64, len: inner.store.len() });
        };
        let filename = item.filename.clone();
        let path = inner.store.video_path(&filename);
        inner.current_index = index;
        inner.restart_pending = false;
        inner.successor_pending = None;

        let started = self.backend.set_media(&path).and_then(|_| self.backend.play());
        if let Err(e) = started {
            self.degrade(inner, &e);
            return Err(e);
        }

        inner.is_playing = true;
        inner.state = EngineState::Playing;
        info!("Playing [{}] {}", index, filename);
        self.emit(EngineEvent::ItemStarted { index, filename });
        Ok(())
    }

    /// A backend failure leaves the engine stopped
    fn degrade(&self, inner: &mut EngineInner, err: &SignageError) {
        error!("Backend failure: {}", err);
        if let Err(e) = self.backend.stop() {
            warn!("Backend failed to stop after error: {}", e);
        }
        inner.is_playing = false;
        inner.state = EngineState::Stopped;
        self.emit(EngineEvent::BackendFailed { message: err.to_string() });
    }

    /// Nothing is eligible: stop and report `Empty`
    fn exhaust(&self, inner: &mut EngineInner) {
        info!("No eligible item to play");
        if let Err(e) = self.backend.stop() {
            warn!("Backend failed to stop: {}", e);
        }
        inner.is_playing = false;
        inner.state = EngineState::Empty;
        self.emit(EngineEvent::PlaylistExhausted);
    }

    /// Playlist became empty
    fn clear_playback(&self, inner: &mut EngineInner) {
        if let Err(e) = self.backend.stop() {
            warn!("Backend failed to stop: {}", e);
        }
        self.signal.clear();
        inner.current_index = 0;
        inner.successor_pending = None;
        inner.is_playing = false;
        inner.state = EngineState::Empty;
    }

    /// Returns whether the name was in the playlist
    fn remove_locked(&self, inner: &mut EngineInner, filename: &str) -> Result<bool> {
        let Some(removed) = inner.store.remove(filename)? else {
            debug!("remove: {} is not in the playlist", filename);
            return Ok(false);
        };

        let len = inner.store.len();
        if len == 0 {
            self.clear_playback(inner);
        } else {
            let current = inner.current_index;
            inner.current_index = index_after_removal(current, removed, len);
            if removed == current {
                // The removed file may still be rendering; its successor plays next
                let wrapped = inner.successor_pending.unwrap_or(false) || removed >= len;
                inner.successor_pending = Some(wrapped);
            }
        }
        info!("Removed {} from the playlist", filename);
        self.emit(EngineEvent::PlaylistChanged { count: len });
        Ok(true)
    }

    fn emit(&self, event: EngineEvent) {
        for handler in self.handlers.read().iter() {
            handler.handle_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::schedule::ManualClock;
    use crate::utils::config::LibraryConfig;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::fs;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        backend: Arc<HeadlessBackend>,
        clock: Arc<ManualClock>,
        engine: PlaybackEngine,
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn harness(items: &[PlaylistItem]) -> Harness {
        let dir = TempDir::new().unwrap();
        let library = LibraryConfig {
            video_dir: dir.path().join("videos"),
            playlist_file: dir.path().join("playlist.json"),
            ..LibraryConfig::default()
        };
        fs::create_dir_all(&library.video_dir).unwrap();
        for item in items {
            fs::write(library.video_dir.join(&item.filename), b"video").unwrap();
        }
        PlaylistStore::save_to(&library.playlist_file, items, true, false).unwrap();

        let store = PlaylistStore::open(library).unwrap();
        let backend = Arc::new(HeadlessBackend::new());
        let clock = Arc::new(ManualClock::new(noon()));
        let engine = PlaybackEngine::new(store, backend.clone(), clock.clone());
        Harness {
            _dir: dir,
            backend,
            clock,
            engine,
        }
    }

    fn items(names: &[&str]) -> Vec<PlaylistItem> {
        names.iter().map(|n| PlaylistItem::new(*n)).collect()
    }

    fn morning_only(name: &str) -> PlaylistItem {
        PlaylistItem {
            schedule: Schedule {
                start_time: Some("06:00".into()),
                end_time: Some("11:00".into()),
                ..Schedule::default()
            },
            ..PlaylistItem::new(name)
        }
    }

    fn current(h: &Harness) -> String {
        h.engine.status().current_file
    }

    /// End-of-media followed by the worker's advance
    fn end_of_media(h: &Harness) {
        assert!(h.backend.finish());
        h.engine.advance();
    }

    #[test]
    fn test_empty_playlist_rejects_transport() {
        let h = harness(&[]);
        assert_eq!(h.engine.state(), EngineState::Empty);
        assert!(matches!(h.engine.play(None), Err(SignageError::EmptyPlaylist)));
        assert!(matches!(h.engine.next(), Err(SignageError::EmptyPlaylist)));
        assert!(matches!(h.engine.previous(), Err(SignageError::EmptyPlaylist)));
        assert_eq!(h.engine.state(), EngineState::Empty);
        assert!(h.engine.stop().is_ok());
    }

    #[test]
    fn test_play_index() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4"]));
        h.engine.play(Some(2)).unwrap();
        assert_eq!(current(&h), "c.mp4");
        assert_eq!(h.engine.state(), EngineState::Playing);
        assert_eq!(h.backend.loaded_file_name().as_deref(), Some("c.mp4"));

        let err = h.engine.play(Some(3)).unwrap_err();
        assert!(matches!(err, SignageError::IndexOutOfRange { index: 3, len: 3 }));
        let err = h.engine.play(Some(-1)).unwrap_err();
        assert!(matches!(err, SignageError::IndexOutOfRange { index: -1, len: 3 }));
        assert_eq!(current(&h), "c.mp4");
    }

    #[test]
    fn test_pause_and_resume() {
        let h = harness(&items(&["a.mp4", "b.mp4"]));
        h.engine.pause().unwrap();
        assert_eq!(h.engine.state(), EngineState::Stopped);

        h.engine.play(None).unwrap();
        h.engine.pause().unwrap();
        assert_eq!(h.engine.state(), EngineState::Paused);
        assert_eq!(h.backend.state(), BackendState::Paused);
        assert!(!h.engine.playback_state().is_playing);

        h.engine.play(None).unwrap();
        assert_eq!(h.engine.state(), EngineState::Playing);
        assert_eq!(h.backend.render_count(), 1);
    }

    #[test]
    fn test_stop() {
        let h = harness(&items(&["a.mp4"]));
        h.engine.play(None).unwrap();
        h.engine.stop().unwrap();
        assert_eq!(h.engine.state(), EngineState::Stopped);
        assert_eq!(h.backend.state(), BackendState::Stopped);

        // A late end-of-media after stop changes nothing
        h.engine.signal().raise();
        h.engine.advance();
        assert_eq!(h.engine.state(), EngineState::Stopped);
        assert_eq!(h.backend.render_count(), 1);
    }

    #[test]
    fn test_next_cycles_through_playlist() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4", "d.mp4"]));
        let start = h.engine.playback_state().current_index;
        for _ in 0..4 {
            assert!(h.engine.next().unwrap().is_some());
        }
        assert_eq!(h.engine.playback_state().current_index, start);
    }

    #[test]
    fn test_previous_wraps_and_skips_ineligible() {
        let mut list = items(&["a.mp4", "b.mp4", "c.mp4"]);
        list[2] = morning_only("c.mp4");
        let h = harness(&list);

        assert_eq!(h.engine.previous().unwrap(), Some(1));
        assert_eq!(current(&h), "b.mp4");
        assert_eq!(h.engine.previous().unwrap(), Some(0));
        assert_eq!(h.engine.previous().unwrap(), Some(1));
    }

    #[test]
    fn test_all_ineligible_transitions_to_empty() {
        let h = harness(&[morning_only("a.mp4"), morning_only("b.mp4")]);
        assert_eq!(h.engine.next().unwrap(), None);
        assert_eq!(h.engine.state(), EngineState::Empty);
        assert_eq!(h.engine.previous().unwrap(), None);
        assert_eq!(h.engine.state(), EngineState::Empty);
        assert!(!h.engine.playback_state().is_playing);
    }

    #[test]
    fn test_end_of_media_skips_ineligible_item() {
        let h = harness(&[PlaylistItem::new("a.mp4"), morning_only("b.mp4"), PlaylistItem::new("c.mp4")]);
        h.engine.play(None).unwrap();
        assert_eq!(current(&h), "a.mp4");

        end_of_media(&h);
        assert_eq!(current(&h), "c.mp4");

        end_of_media(&h);
        assert_eq!(current(&h), "a.mp4");
    }

    #[test]
    fn test_play_with_ineligible_current_defers_to_advance() {
        let h = harness(&[morning_only("a.mp4"), PlaylistItem::new("b.mp4")]);
        h.engine.play(None).unwrap();
        assert_eq!(h.backend.render_count(), 0);
        assert!(h.engine.signal().is_raised());

        h.engine.advance();
        assert_eq!(current(&h), "b.mp4");
        assert_eq!(h.engine.state(), EngineState::Playing);
    }

    #[test]
    fn test_schedule_expiry_mid_play_empties_engine() {
        let mut a = PlaylistItem::new("a.mp4");
        a.schedule.end_time = Some("12:30".into());
        let h = harness(&[a]);

        h.engine.play(None).unwrap();
        h.engine.check_schedule();
        assert!(!h.engine.signal().is_raised());

        h.clock.advance(Duration::minutes(31));
        h.engine.check_schedule();
        assert!(h.engine.signal().is_raised());
        assert_eq!(h.backend.state(), BackendState::Stopped);

        // Repeated ticks before the worker runs coalesce
        h.engine.check_schedule();
        h.engine.advance();
        assert_eq!(h.engine.state(), EngineState::Empty);
        assert!(!h.engine.signal().is_raised());
        h.engine.advance();
        assert_eq!(h.engine.state(), EngineState::Empty);
    }

    #[test]
    fn test_loop_disabled_stops_at_end() {
        let h = harness(&items(&["a.mp4", "b.mp4"]));
        h.engine.set_loop(false).unwrap();
        h.engine.play(Some(1)).unwrap();

        end_of_media(&h);
        assert_eq!(h.engine.state(), EngineState::Stopped);
        assert_eq!(h.engine.playback_state().current_index, 0);

        // Manual skipping still wraps
        h.engine.play(Some(1)).unwrap();
        assert_eq!(h.engine.next().unwrap(), Some(0));
    }

    #[test]
    fn test_restart_from_ineligible_item_ignores_loop_flag() {
        let h = harness(&[PlaylistItem::new("a.mp4"), morning_only("b.mp4")]);
        h.engine.set_loop(false).unwrap();
        h.engine.play(Some(1)).unwrap();
        h.engine.stop().unwrap();

        h.engine.play(None).unwrap();
        h.engine.advance();
        assert_eq!(current(&h), "a.mp4");
        assert_eq!(h.engine.state(), EngineState::Playing);
    }

    #[test]
    fn test_command_cancels_pending_advance() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4"]));
        h.engine.play(None).unwrap();
        assert!(h.backend.finish());

        // The user skips before the worker gets to the end-of-media request
        assert_eq!(h.engine.next().unwrap(), Some(1));
        h.engine.advance();
        assert_eq!(current(&h), "b.mp4");
    }

    #[test]
    fn test_late_end_of_media_keeps_user_pick() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4"]));
        h.engine.play(None).unwrap();
        assert_eq!(h.engine.next().unwrap(), Some(1));

        // The end-of-media callback for a.mp4 lands after the skip
        h.engine.signal.raise();
        h.engine.advance();
        assert_eq!(current(&h), "b.mp4");
        assert_eq!(h.backend.render_count(), 2);

        end_of_media(&h);
        assert_eq!(current(&h), "c.mp4");
    }

    #[test]
    fn test_removing_playing_item_plays_its_successor() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4"]));
        h.engine.play(Some(1)).unwrap();
        h.engine.remove_video("b.mp4").unwrap();
        assert_eq!(h.engine.playback_state().current_index, 1);
        assert_eq!(h.backend.loaded_file_name().as_deref(), Some("b.mp4"));

        end_of_media(&h);
        assert_eq!(current(&h), "c.mp4");
        assert_eq!(h.backend.render_count(), 2);

        // Same for a skip while the removed item is still on screen
        h.engine.remove_video("c.mp4").unwrap();
        assert_eq!(h.engine.next().unwrap(), Some(0));
        assert_eq!(current(&h), "a.mp4");
    }

    #[test]
    fn test_removing_last_playing_item_wraps_only_when_looping() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4"]));
        h.engine.set_loop(false).unwrap();
        h.engine.play(Some(2)).unwrap();
        h.engine.remove_video("c.mp4").unwrap();
        end_of_media(&h);
        assert_eq!(h.engine.state(), EngineState::Stopped);
        assert_eq!(h.backend.render_count(), 1);

        h.engine.set_loop(true).unwrap();
        h.engine.play(Some(1)).unwrap();
        h.engine.delete_video_file("b.mp4").unwrap();
        end_of_media(&h);
        assert_eq!(current(&h), "a.mp4");
        assert_eq!(h.engine.state(), EngineState::Playing);
    }

    #[test]
    fn test_backend_failure_degrades_to_stopped() {
        let h = harness(&items(&["a.mp4", "b.mp4"]));
        h.backend.set_failing(true);
        assert!(matches!(h.engine.play(None), Err(SignageError::Backend(_))));
        assert_eq!(h.engine.state(), EngineState::Stopped);

        h.backend.set_failing(false);
        h.engine.play(None).unwrap();
        h.backend.set_failing(true);
        assert!(h.backend.finish());
        h.engine.advance();
        assert_eq!(h.engine.state(), EngineState::Stopped);
        assert!(!h.engine.playback_state().is_playing);
    }

    #[test]
    fn test_volume_and_seek_clamp() {
        let h = harness(&items(&["a.mp4"]));
        assert_eq!(h.engine.set_volume(-5).unwrap(), 0);
        assert_eq!(h.engine.set_volume(500).unwrap(), 150);
        assert_eq!(h.engine.set_volume(80).unwrap(), 80);
        assert_eq!(h.engine.status().volume, 80);

        assert_eq!(h.engine.seek(-1.0).unwrap(), 0.0);
        assert_eq!(h.engine.seek(2.5).unwrap(), 1.0);
        assert_eq!(h.engine.seek(f64::NAN).unwrap(), 0.0);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

        #[test]
        fn prop_volume_always_in_range(volume in proptest::prelude::any::<i64>()) {
            let h = harness(&items(&["a.mp4"]));
            let applied = h.engine.set_volume(volume).unwrap();
            proptest::prop_assert!(applied <= MAX_VOLUME);
            proptest::prop_assert_eq!(i64::from(applied), volume.clamp(0, MAX_VOLUME as i64));
            proptest::prop_assert_eq!(h.engine.status().volume, applied as i32);
        }
    }

    #[test]
    fn test_remove_current_last_item_clamps_index() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4"]));
        h.engine.play(Some(2)).unwrap();
        h.engine.remove_video("c.mp4").unwrap();
        assert_eq!(h.engine.playback_state().current_index, 0);

        h.engine.play(Some(1)).unwrap();
        h.engine.remove_video("a.mp4").unwrap();
        assert_eq!(current(&h), "b.mp4");

        h.engine.remove_video("b.mp4").unwrap();
        assert_eq!(h.engine.state(), EngineState::Empty);
        assert!(!h.engine.playback_state().is_playing);
        assert_eq!(h.engine.status().playlist_count, 0);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let h = harness(&items(&["a.mp4"]));
        assert_eq!(h.engine.remove_video("zzz.mp4").unwrap(), items(&["a.mp4"]));
    }

    #[test]
    fn test_add_revives_empty_engine() {
        let h = harness(&[]);
        fs::write(h.engine.inner.lock().store.video_path("new.mp4"), b"video").unwrap();
        let playlist = h.engine.add_video("new.mp4").unwrap();
        assert_eq!(playlist, items(&["new.mp4"]));
        assert_eq!(h.engine.state(), EngineState::Stopped);
        h.engine.play(None).unwrap();
        assert_eq!(current(&h), "new.mp4");
    }

    #[test]
    fn test_reorder_resets_index() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4"]));
        h.engine.play(Some(2)).unwrap();
        let playlist = h
            .engine
            .reorder_playlist(vec![
                PlaylistEntry::Name("c.mp4".into()),
                PlaylistEntry::Name("missing.mp4".into()),
                PlaylistEntry::Name("a.mp4".into()),
            ])
            .unwrap();
        assert_eq!(playlist, items(&["c.mp4", "a.mp4"]));
        assert_eq!(h.engine.playback_state().current_index, 0);
    }

    #[test]
    fn test_delete_video_file_errors() {
        let h = harness(&items(&["a.mp4", "b.mp4"]));
        let video_dir = h.engine.inner.lock().store.library().video_dir.clone();

        assert_eq!(h.engine.delete_video_file("a.mp4").unwrap(), "a.mp4");
        assert!(!video_dir.join("a.mp4").exists());
        assert_eq!(h.engine.get_playlist(), items(&["b.mp4"]));

        fs::remove_file(video_dir.join("b.mp4")).unwrap();
        assert!(matches!(h.engine.delete_video_file("b.mp4"), Err(SignageError::FileMissing(_))));
        assert!(h.engine.get_playlist().is_empty());

        assert!(matches!(h.engine.delete_video_file("b.mp4"), Err(SignageError::NotInPlaylist(_))));
        assert!(matches!(h.engine.delete_video_file("../x"), Err(SignageError::InvalidInput(_))));
    }

    #[test]
    fn test_status_normalizes_negative_readings() {
        let h = harness(&items(&["a.mp4"]));
        let status = h.engine.status();
        assert_eq!(status.length, 0);
        assert_eq!(status.time, 0);
        assert_eq!(status.position, 0.0);
        assert_eq!(status.state, "NothingSpecial");
        assert_eq!(status.current_file, "a.mp4");
        assert!(status.is_looping);
        assert!(!status.auto_play);
    }

    #[test]
    fn test_update_item_takes_effect_on_next_advance() {
        let h = harness(&items(&["a.mp4", "b.mp4", "c.mp4"]));
        h.engine.play(None).unwrap();
        h.engine.update_item("b.mp4", Some(false), None).unwrap();

        end_of_media(&h);
        assert_eq!(current(&h), "c.mp4");

        let playlist = h.engine.update_item("ghost.mp4", Some(false), None).unwrap();
        assert_eq!(playlist.len(), 3);
    }
}
