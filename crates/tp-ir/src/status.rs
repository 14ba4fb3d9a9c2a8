//! Observable player state handed to the display.

use crate::library::TrackName;

/// Control-loop mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerMode {
    /// Browsing the file list
    #[default]
    Menu,
    Playing,
    Paused,
}

/// Snapshot of playback state for presentation.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackStatus {
    /// File being played
    pub track: TrackName,
    /// Song position in milliseconds (including any pending seek)
    pub elapsed_ms: u64,
    pub paused: bool,
    /// Tempo multiplier
    pub tempo: f64,
    /// Transpose offset in semitones
    pub transpose: i32,
}

impl PlaybackStatus {
    /// Track name without a trailing `.csv` extension.
    pub fn title(&self) -> &str {
        let name = self.track.as_str();
        match name.len().checked_sub(4) {
            Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".csv") => {
                &name[..cut]
            }
            _ => name,
        }
    }
}
