//! Presentation seam for the control loop.

use tp_ir::{PlaybackStatus, TrackList};

/// Clock times beyond this are shown as 0:00.
const MAX_SHOWN_MS: u64 = 6_000_000;

/// Where the player shows what it is doing.
///
/// Only the control loop calls these; the scheduler never does.
pub trait StatusDisplay {
    /// The file menu with `selected` highlighted.
    fn show_file_list(&mut self, tracks: &TrackList, selected: usize);

    /// The playback screen.
    fn show_playback(&mut self, status: &PlaybackStatus);

    fn show_loading(&mut self) {}

    fn show_error(&mut self, message: &str);
}

impl<D: StatusDisplay + ?Sized> StatusDisplay for &mut D {
    fn show_file_list(&mut self, tracks: &TrackList, selected: usize) {
        (**self).show_file_list(tracks, selected)
    }

    fn show_playback(&mut self, status: &PlaybackStatus) {
        (**self).show_playback(status)
    }

    fn show_loading(&mut self) {
        (**self).show_loading()
    }

    fn show_error(&mut self, message: &str) {
        (**self).show_error(message)
    }
}

/// `m:ss` for a song position.
pub fn clock_text(elapsed_ms: u64) -> String {
    let elapsed_ms = if elapsed_ms > MAX_SHOWN_MS { 0 } else { elapsed_ms };
    let seconds = elapsed_ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Signed semitone offset, `+0` for none.
pub fn transpose_text(semitones: i32) -> String {
    format!("{:+}", semitones)
}

/// One-line rendering of the playback screen.
pub fn status_line(status: &PlaybackStatus) -> String {
    format!(
        "{} {}  {}  S: {:.2}  T: {}",
        if status.paused { "||" } else { "> " },
        status.title(),
        clock_text(status.elapsed_ms),
        status.tempo,
        transpose_text(status.transpose)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_ir::TrackName;

    #[test]
    fn clock_formats_minutes_and_seconds() {
        assert_eq!(clock_text(0), "0:00");
        assert_eq!(clock_text(9_999), "0:09");
        assert_eq!(clock_text(61_000), "1:01");
        assert_eq!(clock_text(6_000_000), "100:00");
        assert_eq!(clock_text(6_000_001), "0:00");
    }

    #[test]
    fn transpose_is_signed() {
        assert_eq!(transpose_text(0), "+0");
        assert_eq!(transpose_text(3), "+3");
        assert_eq!(transpose_text(-2), "-2");
    }

    #[test]
    fn status_line_shows_every_field() {
        let status = PlaybackStatus {
            track: TrackName::from("tetris.csv").unwrap(),
            elapsed_ms: 75_500,
            paused: true,
            tempo: 1.5,
            transpose: -1,
        };
        assert_eq!(status_line(&status), "|| tetris  1:15  S: 1.50  T: -1");
    }
}
