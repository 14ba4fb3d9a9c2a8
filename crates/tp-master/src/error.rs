//! Controller errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tp_audio::AudioError;
use tp_formats::FormatError;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config {origin}: {source}")]
    ConfigParse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("no note files to play")]
    NoTracks,
}
