//! Playback engine for the toneplayer buzzer player.
//!
//! Pulls note records from an event source, starts and stops voices on a
//! voice bank as virtual time advances, and rebuilds its state on seek.

#![cfg_attr(not(feature = "std"), no_std)]

mod active_set;
mod frame;
mod seek;
mod source;
mod tone;
mod voice_bank;
pub mod scheduler;

pub use active_set::ActiveVoiceSet;
pub use frame::Frame;
pub use scheduler::Scheduler;
pub use source::{EventSource, SliceSource};
pub use tone::{frequency_to_increment, SquareVoices, ToneCommand, DEFAULT_AMPLITUDE};
pub use voice_bank::{VoiceBank, MAX_VOICE_SLOTS};
