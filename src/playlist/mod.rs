//! Playlist model and persistence
//!
//! The playlist is an ordered list of signage items keyed by filename. It is
//! persisted as a JSON document together with the loop and auto-play flags:
//!
//! ```json
//! {"playlist": [{"filename": "a.mp4", "active": true, "schedule": {}}],
//!  "loop": true, "auto_play": true}
//! ```
//!
//! Older files stored plain filenames, either inside `playlist` or as a bare
//! top-level array; both are still accepted on read.

mod store;

pub use store::{LoadedPlaylist, PlaylistStore, VideoFile};

use crate::schedule::Schedule;
use crate::utils::error::{Result, SignageError};
use serde::{Deserialize, Deserializer, Serialize};

/// One signage item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// File name inside the video directory; unique within a playlist
    pub filename: String,

    /// Inactive items are never rendered
    #[serde(default = "default_true")]
    pub active: bool,

    /// Optional eligibility window
    #[serde(default, deserialize_with = "null_as_default")]
    pub schedule: Schedule,
}

impl PlaylistItem {
    /// Active item with no schedule
    pub fn new<S: Into<String>>(filename: S) -> Self {
        Self {
            filename: filename.into(),
            active: true,
            schedule: Schedule::default(),
        }
    }
}

/// A playlist entry as accepted on input: a bare filename or a full record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaylistEntry {
    Name(String),
    Item(PlaylistItem),
}

impl PlaylistEntry {
    pub fn filename(&self) -> &str {
        match self {
            PlaylistEntry::Name(name) => name,
            PlaylistEntry::Item(item) => &item.filename,
        }
    }

    /// Promote to a full item; bare names become active and unscheduled
    pub fn into_item(self) -> PlaylistItem {
        match self {
            PlaylistEntry::Name(name) => PlaylistItem::new(name),
            PlaylistEntry::Item(item) => item,
        }
    }
}

impl From<PlaylistItem> for PlaylistEntry {
    fn from(item: PlaylistItem) -> Self {
        PlaylistEntry::Item(item)
    }
}

/// Reject anything that is not a plain file name inside the video directory
pub fn validate_filename(filename: &str) -> Result<()> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);

    if invalid {
        return Err(SignageError::InvalidInput(format!("Invalid filename: {:?}", filename)));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
