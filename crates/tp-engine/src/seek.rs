//! Seek by rescanning the stream from the top.

use log::debug;
use tp_ir::Millis;

use crate::scheduler::Scheduler;
use crate::source::EventSource;
use crate::voice_bank::VoiceBank;

impl<V: VoiceBank> Scheduler<V> {
    /// Rebuild playback state at `target_ms` of file time.
    ///
    /// Reopens `id`, discards every record that ended at or before the target,
    /// starts every record sounding at the target, and leaves the first record
    /// starting after it pending. Tempo and transpose are kept.
    ///
    /// The target is in record units, not virtual time: callers playing at a
    /// tempo other than 1.0 must scale their position first. If the stream
    /// cannot be opened the error is returned and the scheduler is left
    /// silent and idle.
    pub fn seek<S: EventSource + ?Sized>(
        &mut self,
        target_ms: Millis,
        id: &str,
        source: &mut S,
    ) -> Result<(), S::Error> {
        self.stop_all();
        self.set_pending(None);
        source.open(id)?;

        self.active_mut().clear();
        let slots = self.voice_slots();
        let mut pending = source.next_record();
        let mut skipped = 0u32;

        while let Some(note) = pending {
            if note.start_ms as Millis > target_ms {
                break;
            }
            if note.is_sounding_at(target_ms) {
                self.start_note(note, slots);
            } else {
                skipped += 1;
            }
            pending = source.next_record();
        }

        self.set_pending(pending);
        self.voices_mut().restore_clock();
        debug!(
            "seek to {} ms: {} sounding, {} skipped",
            target_ms,
            self.active().len(),
            skipped
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::scheduler::tests::{Call, RecordingBank, TWO_NOTES};
    use crate::scheduler::Scheduler;
    use crate::source::{EventSource, SliceSource};
    use tp_ir::NoteRecord;

    /// Source whose streams can fail to open.
    struct Missing;

    impl EventSource for Missing {
        type Error = &'static str;

        fn open(&mut self, _id: &str) -> Result<(), Self::Error> {
            Err("no such file")
        }

        fn next_record(&mut self) -> Option<NoteRecord> {
            None
        }

        fn at_end(&self) -> bool {
            true
        }
    }

    #[test]
    fn seek_starts_notes_sounding_at_target() {
        let mut src = SliceSource::new(&TWO_NOTES);
        let mut s = Scheduler::new(RecordingBank::default());
        s.initialize(&mut src);

        s.seek(700, "song.csv", &mut src).unwrap();

        assert_eq!(s.active().as_slice(), &TWO_NOTES);
        assert!(s.pending().is_none());
        assert_eq!(s.voices_mut().take(), [Call::Play(0, 440), Call::Play(1, 880)]);
    }

    #[test]
    fn seek_skips_finished_notes_and_keeps_next_pending() {
        let notes = [
            NoteRecord::new(440, 0, 1000, 1),
            NoteRecord::new(880, 500, 1500, 2),
            NoteRecord::new(660, 2000, 2500, 3),
        ];
        let mut src = SliceSource::new(&notes);
        let mut s = Scheduler::new(RecordingBank::default());
        s.initialize(&mut src);

        s.seek(1000, "song.csv", &mut src).unwrap();

        assert_eq!(s.active().as_slice(), &notes[1..2]);
        assert_eq!(s.pending(), Some(&notes[2]));
    }

    #[test]
    fn seek_stops_what_was_sounding() {
        let mut src = SliceSource::new(&TWO_NOTES);
        let mut s = Scheduler::new(RecordingBank::default());
        s.initialize(&mut src);
        s.advance(600, &mut src);
        s.voices_mut().take();

        s.seek(1200, "song.csv", &mut src).unwrap();

        assert_eq!(
            s.voices_mut().take(),
            [Call::Stop(0), Call::Stop(1), Call::Play(1, 880)]
        );
    }

    #[test]
    fn repeated_seek_is_idempotent() {
        let mut src = SliceSource::new(&TWO_NOTES);
        let mut s = Scheduler::new(RecordingBank::default());
        s.initialize(&mut src);

        s.seek(700, "song.csv", &mut src).unwrap();
        let first: Vec<_> = s.active().iter().copied().collect();
        s.seek(700, "song.csv", &mut src).unwrap();
        s.seek(700, "song.csv", &mut src).unwrap();

        assert_eq!(s.active().as_slice(), first.as_slice());
        assert!(s.pending().is_none());
    }

    #[test]
    fn seek_applies_transpose_and_keeps_tempo() {
        let mut src = SliceSource::new(&TWO_NOTES);
        let mut s = Scheduler::new(RecordingBank::default());
        s.initialize(&mut src);
        s.modify_transpose(12);
        s.set_tempo(1.5);
        s.voices_mut().take();

        s.seek(0, "song.csv", &mut src).unwrap();

        assert_eq!(s.voices_mut().take(), [Call::Play(0, 880)]);
        assert_eq!(s.transport().tempo(), 1.5);
        assert_eq!(s.transport().transpose_semitones(), 12);
    }

    #[test]
    fn failed_open_leaves_scheduler_idle() {
        let mut src = SliceSource::new(&TWO_NOTES);
        let mut s = Scheduler::new(RecordingBank::default());
        s.initialize(&mut src);
        s.advance(0, &mut src);

        assert_eq!(s.seek(0, "gone.csv", &mut Missing), Err("no such file"));
        assert!(s.is_idle());
    }
}
