//! Durable playlist store
//!
//! Owns the ordered item list and the loop/auto-play flags, and keeps them in
//! sync with the persisted JSON file. Every mutation is written to disk before
//! it becomes visible in memory, so a failed write leaves the store unchanged.

use crate::playlist::{validate_filename, PlaylistEntry, PlaylistItem};
use crate::schedule::Schedule;
use crate::utils::config::LibraryConfig;
use crate::utils::error::{Result, SignageError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Playlist contents read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlaylist {
    pub items: Vec<PlaylistItem>,
    pub is_looping: bool,
    pub auto_play: bool,
}

/// A video file found in the library directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoFile {
    pub name: String,
    pub size_mb: f64,
}

/// On-disk layout, current format
#[derive(Deserialize)]
struct StoredDocument {
    #[serde(default)]
    playlist: Vec<Value>,
    #[serde(rename = "loop", default = "default_true")]
    is_looping: bool,
    #[serde(default = "default_true")]
    auto_play: bool,
}

/// Accepted shapes on read
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredFile {
    Document(StoredDocument),
    Legacy(Vec<Value>),
}

/// On-disk layout as written
#[derive(Serialize)]
struct PersistedPlaylist<'a> {
    playlist: &'a [PlaylistItem],
    #[serde(rename = "loop")]
    is_looping: bool,
    auto_play: bool,
}

fn default_true() -> bool {
    true
}

/// Ordered, persisted playlist
#[derive(Debug)]
pub struct PlaylistStore {
    library: LibraryConfig,
    items: Vec<PlaylistItem>,
    is_looping: bool,
    auto_play: bool,
}

impl PlaylistStore {
    /// Open the store: load the persisted file (or scan the directory) and
    /// write the reconciled result back.
    pub fn open(library: LibraryConfig) -> Result<Self> {
        fs::create_dir_all(&library.video_dir)?;

        let loaded = Self::load(&library);
        let store = Self {
            library,
            items: loaded.items,
            is_looping: loaded.is_looping,
            auto_play: loaded.auto_play,
        };
        store.save()?;

        info!(
            "Playlist ready: {} items (loop: {}, auto_play: {})",
            store.items.len(),
            store.is_looping,
            store.auto_play
        );
        Ok(store)
    }

    /// Read the persisted playlist.
    ///
    /// Entries whose file is missing are dropped. When nothing playable
    /// remains the playlist falls back to a sorted directory scan. An
    /// unreadable or unparsable file is treated like an empty one.
    pub fn load(library: &LibraryConfig) -> LoadedPlaylist {
        let mut loaded = LoadedPlaylist {
            items: Vec::new(),
            is_looping: true,
            auto_play: true,
        };

        match fs::read_to_string(&library.playlist_file) {
            Ok(contents) => match serde_json::from_str::<StoredFile>(&contents) {
                Ok(StoredFile::Document(doc)) => {
                    loaded.items = parse_entries(doc.playlist);
                    loaded.is_looping = doc.is_looping;
                    loaded.auto_play = doc.auto_play;
                }
                Ok(StoredFile::Legacy(entries)) => {
                    info!("Upgrading legacy playlist file {}", library.playlist_file.display());
                    loaded.items = parse_entries(entries);
                }
                Err(e) => {
                    warn!("Ignoring unparsable playlist file {}: {}", library.playlist_file.display(), e);
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No playlist file at {}", library.playlist_file.display());
            }
            Err(e) => {
                warn!("Failed to read playlist file {}: {}", library.playlist_file.display(), e);
            }
        }

        let mut seen = HashSet::new();
        loaded.items.retain(|item| {
            let keep = validate_filename(&item.filename).is_ok()
                && library.video_dir.join(&item.filename).is_file()
                && seen.insert(item.filename.clone());
            if !keep {
                warn!("Dropping playlist entry without a video file: {}", item.filename);
            }
            keep
        });

        if loaded.items.is_empty() {
            loaded.items = Self::scan(library);
            debug!("Playlist built from directory scan: {} items", loaded.items.len());
        }

        loaded
    }

    /// Atomically overwrite the persisted playlist file
    pub fn save_to(path: &Path, items: &[PlaylistItem], is_looping: bool, auto_play: bool) -> Result<()> {
        let document = PersistedPlaylist {
            playlist: items,
            is_looping,
            auto_play,
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| SignageError::Internal(format!("Failed to serialize playlist: {}", e)))?;

        let persistence = |source| SignageError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persistence)?;
        }

        let tmp = tmp_path(path);
        fs::write(&tmp, json).map_err(persistence)?;
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            persistence(e)
        })
    }

    /// Sorted list of every allowed video in the library directory
    pub fn scan(library: &LibraryConfig) -> Vec<PlaylistItem> {
        video_names(library)
            .into_iter()
            .map(PlaylistItem::new)
            .collect()
    }

    fn save(&self) -> Result<()> {
        Self::save_to(&self.library.playlist_file, &self.items, self.is_looping, self.auto_play)
    }

    /// Persist a new item list, then adopt it
    fn commit_items(&mut self, items: Vec<PlaylistItem>) -> Result<()> {
        Self::save_to(&self.library.playlist_file, &items, self.is_looping, self.auto_play)?;
        self.items = items;
        Ok(())
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, filename: &str) -> Option<usize> {
        self.items.iter().position(|item| item.filename == filename)
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn auto_play(&self) -> bool {
        self.auto_play
    }

    pub fn library(&self) -> &LibraryConfig {
        &self.library
    }

    /// Absolute path of a library file
    pub fn video_path(&self, filename: &str) -> PathBuf {
        self.library.video_dir.join(filename)
    }

    pub fn file_exists(&self, filename: &str) -> bool {
        self.video_path(filename).is_file()
    }

    pub fn set_looping(&mut self, is_looping: bool) -> Result<()> {
        Self::save_to(&self.library.playlist_file, &self.items, is_looping, self.auto_play)?;
        self.is_looping = is_looping;
        Ok(())
    }

    pub fn set_auto_play(&mut self, auto_play: bool) -> Result<()> {
        Self::save_to(&self.library.playlist_file, &self.items, self.is_looping, auto_play)?;
        self.auto_play = auto_play;
        Ok(())
    }

    /// Append a file; returns false when it was already present
    pub fn add(&mut self, filename: &str) -> Result<bool> {
        validate_filename(filename)?;
        if self.position(filename).is_some() {
            return Ok(false);
        }
        if !self.file_exists(filename) {
            return Err(SignageError::FileMissing(filename.to_string()));
        }

        let mut items = self.items.clone();
        items.push(PlaylistItem::new(filename));
        self.commit_items(items)?;
        Ok(true)
    }

    /// Drop an item by name; returns its former position
    pub fn remove(&mut self, filename: &str) -> Result<Option<usize>> {
        let Some(index) = self.position(filename) else {
            return Ok(None);
        };

        let mut items = self.items.clone();
        items.remove(index);
        self.commit_items(items)?;
        Ok(Some(index))
    }

    /// Replace the playlist with the valid, de-duplicated part of `order`.
    ///
    /// Names that are unsafe, missing on disk or repeated are dropped. A bare
    /// name keeps the settings of the existing item with that name.
    pub fn reorder(&mut self, order: Vec<PlaylistEntry>) -> Result<()> {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(order.len());

        for entry in order {
            let name = entry.filename();
            if validate_filename(name).is_err() || !self.file_exists(name) || seen.contains(name) {
                debug!("Reorder dropped entry {:?}", name);
                continue;
            }
            seen.insert(name.to_string());

            let item = match entry {
                PlaylistEntry::Name(name) => self
                    .position(&name)
                    .map(|i| self.items[i].clone())
                    .unwrap_or_else(|| PlaylistItem::new(name)),
                PlaylistEntry::Item(item) => item,
            };
            items.push(item);
        }

        self.commit_items(items)
    }

    /// Partially update one item; unknown names are a silent no-op.
    /// Returns whether an item was updated.
    pub fn update_item(&mut self, filename: &str, active: Option<bool>, schedule: Option<Schedule>) -> Result<bool> {
        let Some(index) = self.position(filename) else {
            debug!("update_item: {} is not in the playlist", filename);
            return Ok(false);
        };

        let mut items = self.items.clone();
        let item = &mut items[index];
        if let Some(active) = active {
            item.active = active;
        }
        if let Some(schedule) = schedule {
            item.schedule = schedule;
        }
        self.commit_items(items)?;
        Ok(true)
    }

    /// Every allowed video on disk, with its size
    pub fn list_videos(&self) -> Vec<VideoFile> {
        video_names(&self.library)
            .into_iter()
            .map(|name| {
                let bytes = fs::metadata(self.video_path(&name)).map(|m| m.len()).unwrap_or(0);
                let size_mb = (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;
                VideoFile { name, size_mb }
            })
            .collect()
    }

    /// Delete a library file; returns false when it did not exist
    pub fn delete_file(&self, filename: &str) -> Result<bool> {
        validate_filename(filename)?;
        match fs::remove_file(self.video_path(filename)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_entries(raw: Vec<Value>) -> Vec<PlaylistItem> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<PlaylistEntry>(value) {
            Ok(entry) => Some(entry.into_item()),
            Err(e) => {
                warn!("Skipping malformed playlist entry: {}", e);
                None
            }
        })
        .collect()
}

fn video_names(library: &LibraryConfig) -> Vec<String> {
    let entries = match fs::read_dir(&library.video_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot scan video directory {}: {}", library.video_dir.display(), e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && library.is_allowed(path))
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect();
    names.sort();
    names
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
