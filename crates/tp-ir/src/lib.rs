//! Core types for the toneplayer buzzer player.
//!
//! This crate defines the note records read from note files, the transport
//! state (tempo and transpose) applied during playback, and the small value
//! types shared between the scheduler and the control loop.
//!
//! Designed to be `no_std` compatible.

#![cfg_attr(not(feature = "std"), no_std)]

mod library;
mod note;
mod status;
mod time;
mod transport;

pub use library::{TrackList, TrackName, MAX_FILES, MAX_FILE_NAME_LEN};
pub use note::NoteRecord;
pub use status::{PlaybackStatus, PlayerMode};
pub use time::{offset_clamped, Millis};
pub use transport::{TransportState, MAX_TEMPO, MIN_TEMPO};

/// Maximum number of notes the scheduler tracks as sounding at once.
pub const MAX_ACTIVE_EVENTS: usize = 10;

/// Number of physical buzzers on the reference board.
pub const NUM_BUZZERS: usize = 5;
