//! Playback state and status snapshots
//!
//! Plain data shared between the engine and its callers, plus the index
//! arithmetic the engine uses to walk the playlist.

use crate::player::EngineState;
use crate::utils::format_millis;
use serde::Serialize;

/// Engine-owned playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    /// Offset of the current item; valid whenever the playlist is non-empty
    pub current_index: usize,

    /// Playback is requested (an autonomous advance is honoured)
    pub is_playing: bool,

    /// Wrap around after the last item
    pub is_looping: bool,

    /// Start playing shortly after startup
    pub auto_play: bool,
}

/// Point-in-time status of the engine and backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Backend state name
    pub state: String,

    /// Engine state machine position
    pub engine_state: EngineState,

    /// Current item's file name, empty when there is none
    pub current_file: String,

    pub current_index: usize,

    /// Media length in milliseconds
    pub length: i64,

    /// Elapsed time in milliseconds
    pub time: i64,

    /// Relative position (0.0 to 1.0)
    pub position: f32,

    pub volume: i32,

    #[serde(rename = "loop")]
    pub is_looping: bool,

    pub auto_play: bool,

    pub playlist_count: usize,
}

impl StatusSnapshot {
    /// One-line human readable summary
    pub fn summary(&self) -> String {
        if self.current_file.is_empty() {
            return format!("{:?} ({} items)", self.engine_state, self.playlist_count);
        }
        format!(
            "{:?} {} [{}/{}] {} / {} vol {}",
            self.engine_state,
            self.current_file,
            self.current_index + 1,
            self.playlist_count,
            format_millis(self.time),
            format_millis(self.length),
            self.volume
        )
    }
}

/// Index reached after `step` moves from `from` around a playlist of `len`
/// items. `step == len` lands back on `from`.
pub(crate) fn circular_step(from: usize, step: usize, len: usize, forward: bool) -> usize {
    debug_assert!(len > 0);
    let step = step % len;
    if forward {
        (from + step) % len
    } else {
        (from + len - step) % len
    }
}

/// Current index after the item at `removed` is dropped, leaving `new_len` items.
///
/// Items before the current one shift it down; otherwise it is clamped into
/// range, restarting at zero.
pub(crate) fn index_after_removal(current: usize, removed: usize, new_len: usize) -> usize {
    if new_len == 0 {
        return 0;
    }
    let index = if removed < current { current - 1 } else { current };
    if index >= new_len {
        0
    } else {
        index
    }
}
