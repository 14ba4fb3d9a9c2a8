//! Host audio output for the toneplayer buzzer player.
//!
//! The buzzers are emulated by square-wave voices rendered inside the audio
//! callback; the control thread drives them through a lock-free command queue.

mod cpal_buzzers;
mod error;

pub use cpal_buzzers::{CommandQueue, CpalBuzzers, COMMAND_QUEUE_LEN};
pub use error::AudioError;
