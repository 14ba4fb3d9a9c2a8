//! Bounded set of sounding notes.

use heapless::Vec;
use tp_ir::{NoteRecord, MAX_ACTIVE_EVENTS};

/// Notes currently sounding under scheduler control, in start order.
#[derive(Clone, Debug, Default)]
pub struct ActiveVoiceSet {
    records: Vec<NoteRecord, MAX_ACTIVE_EVENTS>,
}

impl ActiveVoiceSet {
    /// Create an empty set.
    pub const fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Track a started note. Hands the note back if the set is full.
    pub fn try_push(&mut self, note: NoteRecord) -> Result<(), NoteRecord> {
        self.records.push(note)
    }

    /// Remove every note whose end boundary is at or before `time`,
    /// calling `on_end` for each in start order. Survivors keep their order.
    pub fn drain_ended<F: FnMut(&NoteRecord)>(&mut self, time: f64, mut on_end: F) -> usize {
        let before = self.records.len();
        self.records.retain(|note| {
            if note.end_ms as f64 <= time {
                on_end(note);
                false
            } else {
                true
            }
        });
        before - self.records.len()
    }

    /// Drop all entries without touching the outputs.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[NoteRecord] {
        &self.records
    }

    pub fn iter(&self) -> core::slice::Iter<'_, NoteRecord> {
        self.records.iter()
    }
}
