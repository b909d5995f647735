//! JSON command records
//!
//! Every engine operation can be expressed as a [`Command`] deserialized from
//! a JSON object such as `{"command": "play", "index": 2}`. [`dispatch`] runs
//! it against the engine and turns the outcome into a JSON reply; failures
//! become `{"error": message, "code": code}` and never escape as panics.

use crate::player::PlaybackEngine;
use crate::playlist::PlaylistEntry;
use crate::schedule::Schedule;
use crate::utils::error::{IntoSignageError, Result, SignageError};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};

/// Operation request accepted by the player
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Play {
        #[serde(default)]
        index: Option<i64>,
    },
    Pause,
    Stop,
    Next,
    Previous,
    SetVolume {
        volume: i64,
    },
    Seek {
        position: f64,
    },
    SetLoop {
        #[serde(rename = "loop")]
        enabled: bool,
    },
    SetAutoPlay {
        auto_play: bool,
    },
    UpdateItem {
        filename: String,
        #[serde(default)]
        active: Option<bool>,
        #[serde(default)]
        schedule: Option<Schedule>,
    },
    Status,
    GetPlaylist,
    ListVideos,
    AddVideo {
        filename: String,
    },
    RemoveVideo {
        filename: String,
    },
    ReorderPlaylist {
        playlist: Vec<PlaylistEntry>,
    },
    DeleteVideoFile {
        filename: String,
    },
}

/// Run a command and build its reply
pub fn dispatch(engine: &PlaybackEngine, command: Command) -> Value {
    debug!("Dispatching {:?}", command);
    match execute(engine, command) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Command failed: {}", e);
            error_reply(&e)
        }
    }
}

/// Parse one JSON command line and dispatch it
pub fn dispatch_line(engine: &PlaybackEngine, line: &str) -> Value {
    match serde_json::from_str::<Command>(line) {
        Ok(command) => dispatch(engine, command),
        Err(e) => error_reply(&SignageError::InvalidInput(format!("Malformed command: {}", e))),
    }
}

fn error_reply(err: &SignageError) -> Value {
    json!({ "error": err.to_string(), "code": err.code() })
}

fn execute(engine: &PlaybackEngine, command: Command) -> Result<Value> {
    let reply = match command {
        Command::Play { index } => {
            engine.play(index)?;
            json!({ "status": "playing" })
        }
        Command::Pause => {
            engine.pause()?;
            json!({ "status": "paused" })
        }
        Command::Stop => {
            engine.stop()?;
            json!({ "status": "stopped" })
        }
        Command::Next => skip_reply(engine, engine.next()?),
        Command::Previous => skip_reply(engine, engine.previous()?),
        Command::SetVolume { volume } => json!({ "volume": engine.set_volume(volume)? }),
        Command::Seek { position } => json!({ "position": engine.seek(position)? }),
        Command::SetLoop { enabled } => json!({ "loop": engine.set_loop(enabled)? }),
        Command::SetAutoPlay { auto_play } => json!({ "auto_play": engine.set_auto_play(auto_play)? }),
        Command::UpdateItem {
            filename,
            active,
            schedule,
        } => json!({ "playlist": engine.update_item(&filename, active, schedule)? }),
        Command::Status => serde_json::to_value(engine.status()).internal_err("Encoding status")?,
        Command::GetPlaylist => json!({ "playlist": engine.get_playlist() }),
        Command::ListVideos => json!({ "videos": engine.list_videos() }),
        Command::AddVideo { filename } => json!({ "playlist": engine.add_video(&filename)? }),
        Command::RemoveVideo { filename } => json!({ "playlist": engine.remove_video(&filename)? }),
        Command::ReorderPlaylist { playlist } => {
            json!({ "playlist": engine.reorder_playlist(playlist)? })
        }
        Command::DeleteVideoFile { filename } => {
            json!({ "deleted": engine.delete_video_file(&filename)? })
        }
    };
    Ok(reply)
}

fn skip_reply(engine: &PlaybackEngine, selected: Option<usize>) -> Value {
    match selected {
        Some(index) => json!({
            "status": "playing",
            "index": index,
            "current": engine.status().current_file,
        }),
        None => json!({ "status": "empty" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let command: Command = serde_json::from_str(r#"{"command":"play","index":2}"#).unwrap();
        assert_eq!(command, Command::Play { index: Some(2) });

        let command: Command = serde_json::from_str(r#"{"command":"play"}"#).unwrap();
        assert_eq!(command, Command::Play { index: None });

        let command: Command = serde_json::from_str(r#"{"command":"set_loop","loop":false}"#).unwrap();
        assert_eq!(command, Command::SetLoop { enabled: false });

        let command: Command =
            serde_json::from_str(r#"{"command":"reorder_playlist","playlist":["b.mp4",{"filename":"a.mp4","active":false}]}"#)
                .unwrap();
        match command {
            Command::ReorderPlaylist { playlist } => {
                assert_eq!(playlist.len(), 2);
                assert_eq!(playlist[0].filename(), "b.mp4");
                assert_eq!(playlist[1].filename(), "a.mp4");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_item() {
        let command: Command = serde_json::from_str(
            r#"{"command":"update_item","filename":"a.mp4","schedule":{"start_time":"09:00"}}"#,
        )
        .unwrap();
        match command {
            Command::UpdateItem { filename, active, schedule } => {
                assert_eq!(filename, "a.mp4");
                assert_eq!(active, None);
                assert_eq!(schedule.unwrap().start_time.as_deref(), Some("09:00"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_negative_play_index_parses() {
        let command: Command = serde_json::from_str(r#"{"command":"play","index":-1}"#).unwrap();
        assert_eq!(command, Command::Play { index: Some(-1) });
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<Command>(r#"{"command":"explode"}"#).is_err());
        assert!(serde_json::from_str::<Command>(r#"{"command":"set_volume"}"#).is_err());
    }

    #[test]
    fn test_error_reply_shape() {
        let reply = error_reply(&SignageError::EmptyPlaylist);
        assert_eq!(reply["code"], "empty_playlist");
        assert_eq!(reply["error"], "Playlist is empty");
    }
}
