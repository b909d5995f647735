//! Playback module for the signage player
//!
//! This module owns the playlist state machine: the [`PlaybackEngine`] that
//! walks the playlist and drives the media backend, the worker threads that
//! advance it autonomously, the JSON command surface, and the
//! [`SignagePlayer`] facade that wires everything together.

mod command;
mod engine;
mod scheduler;
mod signal;
mod signage_player;
mod state;

pub use command::{dispatch, dispatch_line, Command};
pub use engine::PlaybackEngine;
pub use scheduler::PlayerWorkers;
pub use signal::AdvanceSignal;
pub use signage_player::{SignagePlayer, SignagePlayerBuilder};
pub use state::{PlaybackState, StatusSnapshot};

use serde::Serialize;

/// Position of the engine's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No item can be played: the playlist is empty or nothing is eligible
    Empty,

    /// Playlist has items, nothing is rendering
    Stopped,

    /// An item is rendering
    Playing,

    /// The current item is paused
    Paused,
}

/// Engine event for external event handling
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// An item was loaded and started
    ItemStarted { index: usize, filename: String },

    /// Playback paused
    Paused,

    /// Paused playback resumed
    Resumed,

    /// Playback stopped, by command or at the end of a non-looping playlist
    Stopped,

    /// No item in the playlist is eligible to play
    PlaylistExhausted,

    /// The rendering item's schedule window closed
    ScheduleExpired { filename: String },

    /// Playlist contents changed
    PlaylistChanged { count: usize },

    /// The backend failed to load or start an item
    BackendFailed { message: String },
}

/// Engine event handler trait
pub trait EngineEventHandler: Send + Sync {
    /// Handle engine event
    ///
    /// # Arguments
    ///
    /// * `event` - Engine event
    fn handle_event(&self, event: &EngineEvent);
}
