//! Signage player library
//!
//! An unattended video signage engine: an ordered, persisted playlist whose
//! items may carry date and time-of-day windows, played in a loop through a
//! pluggable media backend.

pub mod backend;
pub mod player;
pub mod playlist;
pub mod schedule;
pub mod utils;

pub use player::{EngineEvent, EngineEventHandler, EngineState, PlaybackEngine, SignagePlayer, SignagePlayerBuilder};
pub use utils::error::{Result, SignageError};
