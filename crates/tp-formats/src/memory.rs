//! Note files held in memory.

use std::collections::BTreeMap;
use std::io::Cursor;

use tp_engine::EventSource;
use tp_ir::{NoteRecord, TrackList};

use crate::error::FormatError;
use crate::note_csv::NoteReader;

/// A named set of in-memory note files, usable as an event source.
#[derive(Default)]
pub struct MemoryLibrary {
    files: BTreeMap<String, String>,
    reader: Option<NoteReader<Cursor<Vec<u8>>>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the file `name`.
    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(name.into(), contents.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(name, contents);
        self
    }

    /// File names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// The selectable track list (bounded and truncated like a card listing).
    pub fn track_list(&self) -> TrackList {
        self.names().collect()
    }
}

impl EventSource for MemoryLibrary {
    type Error = FormatError;

    fn open(&mut self, id: &str) -> Result<(), FormatError> {
        self.reader = None;
        let contents = self
            .files
            .get(id)
            .ok_or_else(|| FormatError::NotFound(id.to_string()))?;
        self.reader = Some(NoteReader::new(Cursor::new(contents.as_bytes().to_vec())));
        Ok(())
    }

    fn next_record(&mut self) -> Option<NoteRecord> {
        self.reader.as_mut()?.next_record()
    }

    fn at_end(&self) -> bool {
        self.reader.as_ref().map_or(true, NoteReader::at_end)
    }
}
