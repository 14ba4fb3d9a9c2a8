//! Timed note records.

/// One note read from a note file.
///
/// Times are milliseconds from the start of the file. `voice` is the 1-based
/// buzzer index as written in the file; it keeps its sign so that bogus
/// indices can be recognised and ignored instead of wrapping onto a real voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoteRecord {
    /// Tone frequency in Hz
    pub frequency: u32,
    /// When the note starts sounding
    pub start_ms: u32,
    /// When the note stops sounding
    pub end_ms: u32,
    /// 1-based voice index
    pub voice: i32,
}

impl NoteRecord {
    /// Create a new note record.
    pub const fn new(frequency: u32, start_ms: u32, end_ms: u32, voice: i32) -> Self {
        Self {
            frequency,
            start_ms,
            end_ms,
            voice,
        }
    }

    /// End boundary with inverted records collapsed to zero duration.
    pub fn effective_end_ms(&self) -> u32 {
        self.end_ms.max(self.start_ms)
    }

    /// Sounding duration in milliseconds (zero for inverted records).
    pub fn duration_ms(&self) -> u32 {
        self.effective_end_ms() - self.start_ms
    }

    /// Is the note audible at `time_ms` (start inclusive, end exclusive)?
    pub fn is_sounding_at(&self, time_ms: u64) -> bool {
        self.start_ms as u64 <= time_ms && time_ms < self.effective_end_ms() as u64
    }

    /// Map the 1-based voice index to a 0-based slot, if it fits in `voices`.
    pub fn voice_slot(&self, voices: usize) -> Option<usize> {
        let slot = usize::try_from(self.voice.checked_sub(1)?).ok()?;
        (slot < voices).then_some(slot)
    }
}
