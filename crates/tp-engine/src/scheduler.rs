//! Real-time note scheduling.
//!
//! The scheduler holds one prefetched record and the set of sounding notes.
//! Each `advance` compares the caller's virtual time, scaled by tempo, against
//! record boundaries and turns voices on and off to match.

use log::{debug, warn};
use tp_ir::{Millis, NoteRecord, TransportState};

use crate::active_set::ActiveVoiceSet;
use crate::source::EventSource;
use crate::voice_bank::{VoiceBank, MAX_VOICE_SLOTS};

/// Read the next record. Stream I/O may allocate; the no-allocation check
/// covers only the scheduler's own bookkeeping.
#[inline]
fn pull<S: EventSource + ?Sized>(source: &mut S) -> Option<NoteRecord> {
    #[cfg(feature = "alloc_check")]
    return assert_no_alloc::permit_alloc(|| source.next_record());
    #[cfg(not(feature = "alloc_check"))]
    source.next_record()
}

/// Note scheduler driving a voice bank.
pub struct Scheduler<V> {
    /// Output channels
    voices: V,
    /// Next record to start
    pending: Option<NoteRecord>,
    /// Started notes awaiting their end boundary
    active: ActiveVoiceSet,
    /// Tempo and transpose
    transport: TransportState,
    /// Per-voice end time of notes started while the active set was full
    overflow: [Option<u32>; MAX_VOICE_SLOTS],
    /// Notes that could not be tracked since the last initialize
    overflowed: u32,
}

impl<V: VoiceBank> Scheduler<V> {
    /// Create an idle scheduler. Call `initialize` once a stream is open.
    pub fn new(voices: V) -> Self {
        Self {
            voices,
            pending: None,
            active: ActiveVoiceSet::new(),
            transport: TransportState::new(),
            overflow: [None; MAX_VOICE_SLOTS],
            overflowed: 0,
        }
    }

    /// Prepare for playback of a freshly opened stream.
    ///
    /// Silences anything still sounding, resets tempo and transpose, and
    /// preloads the first record.
    pub fn initialize<S: EventSource + ?Sized>(&mut self, source: &mut S) {
        self.stop_all();
        self.transport = TransportState::new();
        self.overflowed = 0;
        self.pending = source.next_record();
        debug!("scheduler initialized, first record {:?}", self.pending);
    }

    /// Advance playback to `now_ms` of virtual time.
    ///
    /// Starts every pending record whose start boundary has been crossed,
    /// then stops every tracked note whose end boundary has been crossed.
    /// `now_ms` must not decrease between calls.
    pub fn advance<S: EventSource + ?Sized>(&mut self, now_ms: Millis, source: &mut S) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.advance_inner(now_ms, source));
        #[cfg(not(feature = "alloc_check"))]
        self.advance_inner(now_ms, source);
    }

    fn advance_inner<S: EventSource + ?Sized>(&mut self, now_ms: Millis, source: &mut S) {
        self.voices.restore_clock();
        let scaled = self.transport.scale_time(now_ms);
        let slots = self.voice_slots();

        while let Some(note) = self.pending {
            if note.start_ms as f64 > scaled {
                break;
            }
            self.start_note(note, slots);
            self.pending = pull(source);
        }

        let voices = &mut self.voices;
        self.active.drain_ended(scaled, |note| {
            if let Some(slot) = note.voice_slot(slots) {
                voices.stop(slot);
            }
        });

        for (slot, deadline) in self.overflow.iter_mut().enumerate() {
            if deadline.is_some_and(|end| end as f64 <= scaled) {
                voices.stop(slot);
                *deadline = None;
            }
        }
    }

    /// Sound `note` on its voice and track it if there is room.
    pub(crate) fn start_note(&mut self, note: NoteRecord, slots: usize) {
        let Some(slot) = note.voice_slot(slots) else {
            debug!("ignoring note on out-of-range voice {}", note.voice);
            return;
        };

        let frequency = self.transport.transpose_frequency(note.frequency);
        self.voices.play(slot, frequency);

        if let Err(note) = self.active.try_push(note) {
            warn!(
                "active set full, voice {} sounding untracked until {} ms",
                note.voice, note.end_ms
            );
            let end = note.effective_end_ms();
            let deadline = &mut self.overflow[slot];
            *deadline = Some(deadline.map_or(end, |d| d.max(end)));
            self.overflowed = self.overflowed.saturating_add(1);
        }
    }

    /// True once the stream is exhausted and nothing is left sounding.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
            && self.active.is_empty()
            && self.overflow.iter().all(Option::is_none)
    }

    /// Silence every note this scheduler started and forget them.
    ///
    /// The prefetched record is kept, so playback can resume.
    pub fn stop_all(&mut self) {
        let slots = self.voice_slots();
        for note in self.active.iter() {
            if let Some(slot) = note.voice_slot(slots) {
                self.voices.stop(slot);
            }
        }
        self.active.clear();

        for (slot, deadline) in self.overflow.iter_mut().enumerate() {
            if deadline.take().is_some() {
                self.voices.stop(slot);
            }
        }
        self.voices.restore_clock();
    }

    /// Shift the transpose by `delta` semitones. Sounding notes keep their pitch.
    pub fn modify_transpose(&mut self, delta: i32) {
        self.transport.shift_transpose(delta);
        debug!(
            "transpose {} semitones (x{:.4})",
            self.transport.transpose_semitones(),
            self.transport.transpose_factor()
        );
    }

    /// Set the tempo factor. Returns the clamped value actually applied.
    pub fn set_tempo(&mut self, tempo: f64) -> f64 {
        self.transport.set_tempo(tempo)
    }

    /// Change the tempo factor by `delta`. Returns the clamped value applied.
    pub fn adjust_tempo(&mut self, delta: f64) -> f64 {
        self.transport.adjust_tempo(delta)
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    /// The prefetched record, if the stream is not exhausted.
    pub fn pending(&self) -> Option<&NoteRecord> {
        self.pending.as_ref()
    }

    pub(crate) fn set_pending(&mut self, note: Option<NoteRecord>) {
        self.pending = note;
    }

    /// Notes currently tracked as sounding, in start order.
    pub fn active(&self) -> &ActiveVoiceSet {
        &self.active
    }

    pub(crate) fn active_mut(&mut self) -> &mut ActiveVoiceSet {
        &mut self.active
    }

    /// Number of notes started without tracking since `initialize`.
    pub fn overflow_count(&self) -> u32 {
        self.overflowed
    }

    pub fn voices(&self) -> &V {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut V {
        &mut self.voices
    }

    pub(crate) fn voice_slots(&self) -> usize {
        self.voices.voice_count().min(MAX_VOICE_SLOTS)
    }
}
