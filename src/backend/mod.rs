//! Media backend module for the signage player
//!
//! The playback engine never decodes or renders media itself. It drives an
//! opaque player through the [`MediaBackend`] trait and learns about the end
//! of the current media through a registered callback.

mod headless;

pub use headless::HeadlessBackend;

use crate::utils::error::Result;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Callback invoked by the backend when the current media has played to its end.
///
/// It may run on any thread, including a backend-internal one, and must not
/// block.
pub type EndReachedCallback = Arc<dyn Fn() + Send + Sync>;

/// Media backend trait defining the primitives the engine relies on
pub trait MediaBackend: Send + Sync {
    /// Load a media file, replacing the current one
    ///
    /// # Arguments
    ///
    /// * `path` - Absolute path of the file to load
    fn set_media(&self, path: &Path) -> Result<()>;

    /// Start or resume rendering the loaded media
    fn play(&self) -> Result<()>;

    /// Pause rendering
    fn pause(&self) -> Result<()>;

    /// Stop rendering
    fn stop(&self) -> Result<()>;

    /// Seek to a relative position
    ///
    /// # Arguments
    ///
    /// * `position` - Fraction of the media length (0.0 to 1.0)
    fn seek(&self, position: f32) -> Result<()>;

    /// Set output volume
    ///
    /// # Arguments
    ///
    /// * `volume` - Volume level (0 to 150)
    fn set_volume(&self, volume: u32) -> Result<()>;

    /// Current backend state
    fn state(&self) -> BackendState;

    /// Length of the loaded media in milliseconds, negative when unknown
    fn length_ms(&self) -> i64;

    /// Relative position (0.0 to 1.0), negative when unknown
    fn position(&self) -> f32;

    /// Elapsed time in milliseconds, negative when unknown
    fn time_ms(&self) -> i64;

    /// Current volume, negative when unknown
    fn volume(&self) -> i32;

    /// Register an end-of-media callback; callbacks fire on every end reached
    fn on_end_reached(&self, callback: EndReachedCallback);

    /// Release backend resources at shutdown
    fn release(&self) {}
}

/// Backend state, named after the states a libvlc-style player reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    NothingSpecial,
    Opening,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

impl BackendState {
    pub fn name(&self) -> &'static str {
        match self {
            BackendState::NothingSpecial => "NothingSpecial",
            BackendState::Opening => "Opening",
            BackendState::Buffering => "Buffering",
            BackendState::Playing => "Playing",
            BackendState::Paused => "Paused",
            BackendState::Stopped => "Stopped",
            BackendState::Ended => "Ended",
            BackendState::Error => "Error",
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_state_names() {
        assert_eq!(BackendState::Playing.to_string(), "Playing");
        assert_eq!(BackendState::NothingSpecial.name(), "NothingSpecial");
        assert_ne!(BackendState::Paused, BackendState::Stopped);
    }
}
