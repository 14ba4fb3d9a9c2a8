//! Headless controller for the toneplayer buzzer player.
//!
//! Ties the scheduler to a note library, a display and an event log, and
//! provides the offline renderer that both the CLI and the tests share.

mod config;
mod display;
mod error;
mod event_log;
mod player;
mod render;

// Re-export common types so callers don't need tp-ir/tp-engine directly.
pub use tp_engine::{Frame, SquareVoices, VoiceBank};
pub use tp_formats::{FileSource, FormatError, MemoryLibrary};
pub use tp_ir::{PlaybackStatus, PlayerMode, TrackList};

pub use config::PlayerConfig;
pub use display::{clock_text, status_line, transpose_text, StatusDisplay};
pub use error::PlayerError;
pub use event_log::{format_record, EventLog, LogFacade, MemoryLog, LOG_MAX_ENTRIES, LOG_RECORD_SIZE};
pub use player::{Command, Player, PlayerOptions};
pub use render::{frames_to_wav, render_frames, render_to_wav, write_wav, RenderOptions};
