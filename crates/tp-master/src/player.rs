//! The control loop: file menu, transport commands and the playback clock.
//!
//! The player keeps a virtual clock of unscaled wall time while playing. The
//! song position is that clock times the tempo; changing tempo rescales the
//! clock so the position does not jump. Forward and Rewind only accumulate a
//! pending offset; the seek itself runs once no further request has arrived
//! for `seek_debounce_ms`.

use log::{debug, info, warn};
use tp_engine::{EventSource, Scheduler, VoiceBank};
use tp_formats::FormatError;
use tp_ir::{offset_clamped, Millis, PlaybackStatus, PlayerMode, TrackList, TrackName};

use crate::display::StatusDisplay;
use crate::error::PlayerError;
use crate::event_log::EventLog;

/// A user action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    SelectNext,
    SelectPrevious,
    Open,
    TogglePause,
    Stop,
    Forward,
    Rewind,
    TempoUp,
    TempoDown,
    TransposeUp,
    TransposeDown,
}

/// Control-loop timing and the transport applied when a file opens.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerOptions {
    pub seek_step_ms: u64,
    pub seek_debounce_ms: u64,
    pub tempo_step: f64,
    pub refresh_interval_ms: u64,
    pub start_tempo: f64,
    pub start_transpose: i32,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            seek_step_ms: 5000,
            seek_debounce_ms: 1000,
            tempo_step: 0.1,
            refresh_interval_ms: 9000,
            start_tempo: 1.0,
            start_transpose: 0,
        }
    }
}

fn step_text(ms: u64) -> String {
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{}ms", ms)
    }
}

/// Menu and playback state machine around a [`Scheduler`].
pub struct Player<V, S, D, L> {
    scheduler: Scheduler<V>,
    source: S,
    display: D,
    log: L,
    options: PlayerOptions,
    tracks: TrackList,
    selected: usize,
    mode: PlayerMode,
    /// File being played
    current: Option<TrackName>,
    /// Unscaled milliseconds played
    virtual_ms: f64,
    last_tick_ms: u64,
    pending_seek_ms: i64,
    last_seek_request_ms: u64,
    since_refresh_ms: u64,
}

impl<V, S, D, L> Player<V, S, D, L>
where
    V: VoiceBank,
    S: EventSource<Error = FormatError>,
    D: StatusDisplay,
    L: EventLog,
{
    pub fn new(voices: V, source: S, tracks: TrackList, display: D, log: L, options: PlayerOptions) -> Self {
        Self {
            scheduler: Scheduler::new(voices),
            source,
            display,
            log,
            options,
            tracks,
            selected: 0,
            mode: PlayerMode::Menu,
            current: None,
            virtual_ms: 0.0,
            last_tick_ms: 0,
            pending_seek_ms: 0,
            last_seek_request_ms: 0,
            since_refresh_ms: 0,
        }
    }

    /// Show the file menu and record the start of the session.
    pub fn start(&mut self, now_ms: u64) {
        self.show_menu();
        self.log.record(now_ms, "APP START");
    }

    /// Apply one user command.
    pub fn handle(&mut self, command: Command, now_ms: u64) -> Result<(), PlayerError> {
        match (self.mode, command) {
            (PlayerMode::Menu, Command::SelectNext) => {
                self.select_next(now_ms);
            }
            (PlayerMode::Menu, Command::SelectPrevious) => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.show_menu();
                    self.log.record(now_ms, "Menu UP");
                }
            }
            (PlayerMode::Menu, Command::Open) => return self.open_selected(now_ms),
            (PlayerMode::Menu, _) => debug!("{:?} ignored in the menu", command),

            (PlayerMode::Playing, Command::TogglePause) => {
                self.scheduler.stop_all();
                self.mode = PlayerMode::Paused;
                self.refresh();
                self.log.record(now_ms, "Paused");
            }
            (PlayerMode::Paused, Command::TogglePause) => return self.resume(now_ms),
            (_, Command::Stop) => {
                self.scheduler.stop_all();
                self.mode = PlayerMode::Menu;
                self.pending_seek_ms = 0;
                self.show_menu();
                self.log.record(now_ms, "Stopped");
            }
            (_, Command::Forward) => {
                self.request_seek(self.options.seek_step_ms as i64, now_ms);
                let text = format!("Forward {}", step_text(self.options.seek_step_ms));
                self.log.record(now_ms, &text);
            }
            (_, Command::Rewind) => {
                self.request_seek(-(self.options.seek_step_ms as i64), now_ms);
                let text = format!("Rewind {}", step_text(self.options.seek_step_ms));
                self.log.record(now_ms, &text);
            }
            (_, Command::TempoUp) => self.change_tempo(self.options.tempo_step, now_ms),
            (_, Command::TempoDown) => self.change_tempo(-self.options.tempo_step, now_ms),
            (_, Command::TransposeUp) => self.transpose(1, now_ms),
            (_, Command::TransposeDown) => self.transpose(-1, now_ms),
            (_, Command::SelectNext | Command::SelectPrevious | Command::Open) => {
                debug!("{:?} ignored during playback", command)
            }
        }
        Ok(())
    }

    /// Advance the control loop to `now_ms` of wall time.
    ///
    /// While playing this moves the virtual clock, runs a debounced seek once
    /// its window has passed, drives the scheduler, refreshes the display
    /// periodically and returns to the menu when the song is over.
    pub fn tick(&mut self, now_ms: u64) -> Result<(), PlayerError> {
        if self.mode != PlayerMode::Playing {
            return Ok(());
        }

        let delta = now_ms.saturating_sub(self.last_tick_ms);
        self.virtual_ms += delta as f64;
        self.since_refresh_ms += delta;
        self.last_tick_ms = now_ms;

        if self.pending_seek_ms != 0
            && now_ms.saturating_sub(self.last_seek_request_ms) >= self.options.seek_debounce_ms
        {
            let target = offset_clamped(self.position_ms(), self.pending_seek_ms);
            self.seek_now(target, now_ms)?;
            self.log.record(now_ms, "Executed seek");
            self.refresh();
        }

        self.scheduler.advance(self.virtual_ms as Millis, &mut self.source);

        if self.since_refresh_ms > self.options.refresh_interval_ms {
            self.refresh();
        }

        if self.scheduler.is_idle() && self.source.at_end() {
            info!("end of song");
            self.mode = PlayerMode::Menu;
            self.current = None;
            self.show_menu();
            self.log.record(now_ms, "End of song");
        }
        Ok(())
    }

    /// Jump straight to `target_ms` of song time, bypassing the debounce.
    pub fn seek_to(&mut self, target_ms: Millis, now_ms: u64) -> Result<(), PlayerError> {
        if self.mode == PlayerMode::Menu {
            return Ok(());
        }
        self.seek_now(target_ms, now_ms)?;
        if self.mode == PlayerMode::Paused {
            self.scheduler.stop_all();
        }
        self.refresh();
        Ok(())
    }

    /// Open the selected track, moving down the list past tracks that fail
    /// to open. Returns whether something is playing afterwards.
    ///
    /// Each failure is shown and logged as for [`Command::Open`].
    pub fn open_playable(&mut self, now_ms: u64) -> bool {
        while self.mode == PlayerMode::Menu {
            if let Err(e) = self.open_selected(now_ms) {
                warn!("{}", e);
                if !self.select_next(now_ms) {
                    return false;
                }
            }
        }
        true
    }

    fn select_next(&mut self, now_ms: u64) -> bool {
        if self.selected + 1 >= self.tracks.len() {
            return false;
        }
        self.selected += 1;
        self.show_menu();
        self.log.record(now_ms, "Menu DOWN");
        true
    }

    fn open_selected(&mut self, now_ms: u64) -> Result<(), PlayerError> {
        let Some(name) = self.tracks.get(self.selected).and_then(|n| TrackName::from(n).ok()) else {
            self.display.show_error("No files");
            return Err(PlayerError::NoTracks);
        };

        self.log.record(now_ms, &format!("Playing -> {}", name));
        self.display.show_loading();
        if let Err(e) = self.source.open(&name) {
            warn!("cannot open {}: {}", name, e);
            self.display.show_error("Open failed");
            self.log.record(now_ms, "Playback FAIL");
            return Err(e.into());
        }

        self.scheduler.initialize(&mut self.source);
        self.scheduler.set_tempo(self.options.start_tempo);
        self.scheduler.modify_transpose(self.options.start_transpose);

        self.current = Some(name);
        self.mode = PlayerMode::Playing;
        self.virtual_ms = 0.0;
        self.last_tick_ms = now_ms;
        self.pending_seek_ms = 0;
        self.refresh();
        self.log.record(now_ms, "Playback START");
        info!("playing {}", name);
        Ok(())
    }

    fn resume(&mut self, now_ms: u64) -> Result<(), PlayerError> {
        // Pausing dropped the sounding notes; a seek to the current position
        // (plus any offset requested while paused) brings them back.
        let target = offset_clamped(self.position_ms(), self.pending_seek_ms);
        self.mode = PlayerMode::Playing;
        self.seek_now(target, now_ms)?;
        self.refresh();
        self.log.record(now_ms, "Resumed");
        Ok(())
    }

    /// Rebuild playback at `target_ms` and restart the clock from there.
    fn seek_now(&mut self, target_ms: Millis, now_ms: u64) -> Result<(), PlayerError> {
        let Some(name) = self.current else {
            return Ok(());
        };
        self.pending_seek_ms = 0;

        if let Err(e) = self.scheduler.seek(target_ms, &name, &mut self.source) {
            warn!("seek in {} failed: {}", name, e);
            self.mode = PlayerMode::Menu;
            self.current = None;
            self.display.show_error("Open failed");
            self.log.record(now_ms, "Seek FAIL");
            return Err(e.into());
        }

        self.virtual_ms = target_ms as f64 / self.scheduler.transport().tempo();
        self.last_tick_ms = now_ms;
        Ok(())
    }

    fn request_seek(&mut self, delta_ms: i64, now_ms: u64) {
        self.pending_seek_ms = self.pending_seek_ms.saturating_add(delta_ms);
        self.last_seek_request_ms = now_ms;
        self.refresh();
    }

    fn change_tempo(&mut self, delta: f64, now_ms: u64) {
        let position = self.virtual_ms * self.scheduler.transport().tempo();
        let tempo = self.scheduler.adjust_tempo(delta);
        self.virtual_ms = position / tempo;
        self.refresh();
        self.log.record(now_ms, &format!("Tempo {:+}", delta));
        info!("tempo x{:.2}", tempo);
    }

    fn transpose(&mut self, semitones: i32, now_ms: u64) {
        self.scheduler.modify_transpose(semitones);
        self.refresh();
        self.log.record(now_ms, &format!("Transpose {:+}", semitones));
    }

    fn show_menu(&mut self) {
        self.display.show_file_list(&self.tracks, self.selected);
    }

    fn refresh(&mut self) {
        if let Some(status) = self.status() {
            self.display.show_playback(&status);
        }
        self.since_refresh_ms = 0;
    }

    /// Current song position in milliseconds, excluding any pending seek.
    pub fn position_ms(&self) -> Millis {
        (self.virtual_ms * self.scheduler.transport().tempo()) as Millis
    }

    /// What the playback screen shows, or `None` in the menu.
    pub fn status(&self) -> Option<PlaybackStatus> {
        if self.mode == PlayerMode::Menu {
            return None;
        }
        let transport = self.scheduler.transport();
        Some(PlaybackStatus {
            track: self.current?,
            elapsed_ms: offset_clamped(self.position_ms(), self.pending_seek_ms),
            paused: self.mode == PlayerMode::Paused,
            tempo: transport.tempo(),
            transpose: transport.transpose_semitones(),
        })
    }

    pub fn mode(&self) -> PlayerMode {
        self.mode
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn tracks(&self) -> &TrackList {
        &self.tracks
    }

    /// Offset accumulated by Forward/Rewind and not yet applied.
    pub fn pending_seek_ms(&self) -> i64 {
        self.pending_seek_ms
    }

    pub fn scheduler(&self) -> &Scheduler<V> {
        &self.scheduler
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn event_log(&self) -> &L {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::MemoryLog;
    use approx::assert_relative_eq;
    use tp_formats::MemoryLibrary;

    const SONG: &str = "note,frequency,start,end,voice\nA4,440,0,1000,1\nA5,880,500,1500,2\n";

    /// Frequencies currently sounding per slot.
    #[derive(Default)]
    struct Buzzers {
        slots: [Option<u32>; 5],
    }

    impl VoiceBank for Buzzers {
        fn voice_count(&self) -> usize {
            5
        }

        fn play(&mut self, slot: usize, frequency: u32) {
            self.slots[slot] = Some(frequency);
        }

        fn stop(&mut self, slot: usize) {
            self.slots[slot] = None;
        }
    }

    #[derive(Default)]
    struct Screens {
        shown: Vec<String>,
    }

    impl StatusDisplay for Screens {
        fn show_file_list(&mut self, tracks: &TrackList, selected: usize) {
            self.shown.push(format!("menu {}/{}", selected, tracks.len()));
        }

        fn show_playback(&mut self, status: &PlaybackStatus) {
            self.shown.push(format!(
                "play {} {} {}",
                status.title(),
                status.elapsed_ms,
                if status.paused { "paused" } else { "playing" }
            ));
        }

        fn show_error(&mut self, message: &str) {
            self.shown.push(format!("error {}", message));
        }
    }

    type TestPlayer = Player<Buzzers, MemoryLibrary, Screens, MemoryLog>;

    fn player() -> TestPlayer {
        let library = MemoryLibrary::new()
            .with_file("song.csv", SONG)
            .with_file("tune.csv", "h\nC4,262,0,100,1\n");
        let tracks = library.track_list();
        let mut p = Player::new(
            Buzzers::default(),
            library,
            tracks,
            Screens::default(),
            MemoryLog::new(),
            PlayerOptions::default(),
        );
        p.start(0);
        p
    }

    fn sounding(p: &TestPlayer) -> [Option<u32>; 5] {
        p.scheduler().voices().slots
    }

    fn messages(p: &TestPlayer) -> Vec<&str> {
        p.event_log().messages().collect()
    }

    #[test]
    fn starts_in_the_menu() {
        let p = player();
        assert_eq!(p.mode(), PlayerMode::Menu);
        assert_eq!(p.display().shown, ["menu 0/2"]);
        assert_eq!(messages(&p), ["APP START"]);
        assert_eq!(p.status(), None);
    }

    #[test]
    fn menu_selection_is_bounded() {
        let mut p = player();
        p.handle(Command::SelectPrevious, 1).unwrap();
        assert_eq!(p.selected(), 0);
        p.handle(Command::SelectNext, 2).unwrap();
        p.handle(Command::SelectNext, 3).unwrap();
        assert_eq!(p.selected(), 1);
        p.handle(Command::SelectPrevious, 4).unwrap();
        assert_eq!(p.selected(), 0);
        assert_eq!(messages(&p), ["APP START", "Menu DOWN", "Menu UP"]);
    }

    #[test]
    fn plays_a_song_to_the_end() {
        let mut p = player();
        p.handle(Command::Open, 1000).unwrap();
        assert_eq!(p.mode(), PlayerMode::Playing);

        p.tick(1000).unwrap();
        assert_eq!(sounding(&p), [Some(440), None, None, None, None]);
        p.tick(1500).unwrap();
        assert_eq!(sounding(&p), [Some(440), Some(880), None, None, None]);
        p.tick(2000).unwrap();
        assert_eq!(sounding(&p), [None, Some(880), None, None, None]);
        p.tick(2500).unwrap();
        assert_eq!(sounding(&p), [None; 5]);

        assert_eq!(p.mode(), PlayerMode::Menu);
        assert_eq!(
            messages(&p),
            ["APP START", "Playing -> song.csv", "Playback START", "End of song"]
        );
    }

    #[test]
    fn pause_silences_and_freezes_the_clock() {
        let mut p = player();
        p.handle(Command::Open, 0).unwrap();
        p.tick(700).unwrap();
        p.handle(Command::TogglePause, 700).unwrap();
        assert_eq!(p.mode(), PlayerMode::Paused);
        assert_eq!(sounding(&p), [None; 5]);

        // Time passes while paused without moving the song.
        p.tick(5000).unwrap();
        assert_eq!(p.position_ms(), 700);
        assert!(p.status().unwrap().paused);

        // Resuming brings back both notes sounding at 700 ms.
        p.handle(Command::TogglePause, 5000).unwrap();
        assert_eq!(sounding(&p), [Some(440), Some(880), None, None, None]);
        p.tick(5300).unwrap();
        assert_eq!(p.position_ms(), 1000);
        assert_eq!(sounding(&p), [None, Some(880), None, None, None]);
        assert!(messages(&p).ends_with(&["Paused", "Resumed"]));
    }

    #[test]
    fn rewind_is_debounced_and_clamped() {
        let mut p = player();
        p.handle(Command::Open, 0).unwrap();
        p.tick(300).unwrap();

        p.handle(Command::Rewind, 300).unwrap();
        p.handle(Command::Rewind, 400).unwrap();
        assert_eq!(p.pending_seek_ms(), -10_000);
        assert_eq!(p.status().unwrap().elapsed_ms, 0);

        // Still inside the window: the clock runs, no seek yet.
        p.tick(1300).unwrap();
        assert_eq!(p.pending_seek_ms(), -10_000);
        assert_eq!(p.position_ms(), 1300);
        assert_eq!(sounding(&p), [None, Some(880), None, None, None]);

        p.tick(1400).unwrap();
        assert_eq!(p.pending_seek_ms(), 0);
        assert_eq!(p.position_ms(), 0);
        assert_eq!(sounding(&p), [Some(440), None, None, None, None]);
        assert!(messages(&p).contains(&"Executed seek"));
    }

    #[test]
    fn forward_past_the_end_finishes_the_song() {
        let mut p = player();
        p.handle(Command::Open, 0).unwrap();
        p.tick(100).unwrap();
        p.handle(Command::Forward, 100).unwrap();
        assert_eq!(messages(&p).last(), Some(&"Forward 5s"));
        assert_eq!(p.status().unwrap().elapsed_ms, 5100);

        p.tick(1100).unwrap();
        assert_eq!(p.mode(), PlayerMode::Menu);
        assert_eq!(sounding(&p), [None; 5]);
    }

    #[test]
    fn tempo_change_keeps_the_position() {
        let mut p = player();
        p.handle(Command::Open, 0).unwrap();
        p.tick(400).unwrap();
        for _ in 0..10 {
            p.handle(Command::TempoUp, 400).unwrap();
        }
        assert_relative_eq!(p.scheduler().transport().tempo(), 2.0, epsilon = 1e-9);
        assert!(p.position_ms().abs_diff(400) <= 1);
        assert_eq!(sounding(&p)[1], None);

        // 60 ms of wall time at double tempo crosses the 500 ms boundary.
        p.tick(460).unwrap();
        assert_eq!(sounding(&p)[1], Some(880));
    }

    #[test]
    fn transpose_applies_to_new_notes() {
        let mut p = player();
        p.handle(Command::Open, 0).unwrap();
        p.tick(0).unwrap();
        for _ in 0..12 {
            p.handle(Command::TransposeUp, 0).unwrap();
        }
        assert_eq!(sounding(&p)[0], Some(440));
        p.tick(500).unwrap();
        assert_eq!(sounding(&p)[1], Some(1760));
        assert_eq!(p.status().unwrap().transpose, 12);
        assert_eq!(messages(&p).last(), Some(&"Transpose +1"));
    }

    #[test]
    fn stop_returns_to_the_menu() {
        let mut p = player();
        p.handle(Command::Open, 0).unwrap();
        p.tick(600).unwrap();
        p.handle(Command::Stop, 600).unwrap();
        assert_eq!(p.mode(), PlayerMode::Menu);
        assert_eq!(sounding(&p), [None; 5]);
        assert_eq!(p.display().shown.last().unwrap(), "menu 0/2");
    }

    #[test]
    fn display_refreshes_periodically() {
        let library = MemoryLibrary::new().with_file("long.csv", "h\nA4,440,0,60000,1\n");
        let tracks = library.track_list();
        let mut p = Player::new(
            Buzzers::default(),
            library,
            tracks,
            Screens::default(),
            MemoryLog::new(),
            PlayerOptions::default(),
        );
        p.handle(Command::Open, 0).unwrap();
        let before = p.display().shown.len();
        p.tick(9000).unwrap();
        assert_eq!(p.display().shown.len(), before);
        p.tick(9001).unwrap();
        assert_eq!(p.display().shown.len(), before + 1);
        assert_eq!(p.display().shown.last().unwrap(), "play long 9001 playing");
    }

    #[test]
    fn open_failure_shows_an_error() {
        let library = MemoryLibrary::new();
        let tracks: TrackList = ["gone.csv"].into_iter().collect();
        let mut p = Player::new(
            Buzzers::default(),
            library,
            tracks,
            Screens::default(),
            MemoryLog::new(),
            PlayerOptions::default(),
        );
        let err = p.handle(Command::Open, 0).unwrap_err();
        assert!(matches!(err, PlayerError::Format(FormatError::NotFound(_))));
        assert_eq!(p.mode(), PlayerMode::Menu);
        assert_eq!(p.display().shown.last().unwrap(), "error Open failed");
        assert_eq!(messages(&p).last(), Some(&"Playback FAIL"));
    }

    #[test]
    fn empty_library_cannot_open() {
        let mut p = Player::new(
            Buzzers::default(),
            MemoryLibrary::new(),
            TrackList::new(),
            Screens::default(),
            MemoryLog::new(),
            PlayerOptions::default(),
        );
        assert!(matches!(p.handle(Command::Open, 0), Err(PlayerError::NoTracks)));
    }

    #[test]
    fn start_options_apply_on_open() {
        let library = MemoryLibrary::new().with_file("song.csv", SONG);
        let tracks = library.track_list();
        let options = PlayerOptions {
            start_tempo: 0.5,
            start_transpose: -12,
            ..PlayerOptions::default()
        };
        let mut p = Player::new(Buzzers::default(), library, tracks, Screens::default(), MemoryLog::new(), options);
        p.handle(Command::Open, 0).unwrap();
        p.tick(0).unwrap();
        assert_eq!(sounding(&p)[0], Some(220));
        p.tick(999).unwrap();
        assert_eq!(sounding(&p)[1], None);
        p.tick(1000).unwrap();
        assert_eq!(sounding(&p)[1], Some(440));
    }

    #[test]
    fn open_playable_skips_broken_tracks() {
        let library = MemoryLibrary::new().with_file("song.csv", SONG);
        let tracks: TrackList = ["gone.csv", "lost.csv", "song.csv"].into_iter().collect();
        let mut p = Player::new(
            Buzzers::default(),
            library,
            tracks,
            Screens::default(),
            MemoryLog::new(),
            PlayerOptions::default(),
        );
        assert!(p.open_playable(0));
        assert_eq!(p.mode(), PlayerMode::Playing);
        assert_eq!(p.selected(), 2);
        assert_eq!(
            messages(&p),
            [
                "Playing -> gone.csv",
                "Playback FAIL",
                "Menu DOWN",
                "Playing -> lost.csv",
                "Playback FAIL",
                "Menu DOWN",
                "Playing -> song.csv",
                "Playback START"
            ]
        );
    }

    #[test]
    fn open_playable_gives_up_at_the_end_of_the_list() {
        let tracks: TrackList = ["gone.csv", "lost.csv"].into_iter().collect();
        let mut p = Player::new(
            Buzzers::default(),
            MemoryLibrary::new(),
            tracks,
            Screens::default(),
            MemoryLog::new(),
            PlayerOptions::default(),
        );
        assert!(!p.open_playable(0));
        assert_eq!(p.mode(), PlayerMode::Menu);
        assert_eq!(p.selected(), 1);
        assert_eq!(p.display().shown.last().unwrap(), "error Open failed");
    }
}
