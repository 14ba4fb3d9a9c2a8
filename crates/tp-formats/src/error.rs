//! Error type for format handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no note file named {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("unsupported MIDI timing format")]
    MidiUnsupportedTiming,
}

impl From<midly::Error> for FormatError {
    fn from(e: midly::Error) -> Self {
        FormatError::MidiParse(e.to_string())
    }
}
