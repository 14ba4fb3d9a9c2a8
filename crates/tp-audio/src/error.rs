//! Audio backend errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("device init error: {0}")]
    DeviceInit(String),

    #[error("stream create error: {0}")]
    StreamCreate(String),

    #[error("playback error: {0}")]
    Playback(String),
}
