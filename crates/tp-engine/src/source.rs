//! Sequential note sources.

use core::convert::Infallible;
use tp_ir::NoteRecord;

/// A reader that yields note records in file order.
///
/// Malformed input is the source's problem: `next_record` skips it and only
/// returns `None` once the underlying stream is exhausted.
pub trait EventSource {
    /// Failure to open a stream.
    type Error;

    /// (Re)open the stream named `id`, positioned just past its header.
    fn open(&mut self, id: &str) -> Result<(), Self::Error>;

    /// Next record, or `None` at end of stream.
    fn next_record(&mut self) -> Option<NoteRecord>;

    /// Has the stream been exhausted (or failed to open)?
    fn at_end(&self) -> bool;
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    type Error = S::Error;

    fn open(&mut self, id: &str) -> Result<(), Self::Error> {
        (**self).open(id)
    }

    fn next_record(&mut self) -> Option<NoteRecord> {
        (**self).next_record()
    }

    fn at_end(&self) -> bool {
        (**self).at_end()
    }
}

/// A pre-parsed, in-memory note table.
///
/// Reading only advances a cursor, so it never allocates. Every stream id
/// refers to the same table; `open` rewinds.
#[derive(Clone, Debug)]
pub struct SliceSource<'a> {
    records: &'a [NoteRecord],
    cursor: usize,
    finished: bool,
}

impl<'a> SliceSource<'a> {
    /// Create a source positioned at the first record.
    pub fn new(records: &'a [NoteRecord]) -> Self {
        Self {
            records,
            cursor: 0,
            finished: false,
        }
    }

    /// Records not yet read.
    pub fn remaining(&self) -> &'a [NoteRecord] {
        &self.records[self.cursor..]
    }
}

impl EventSource for SliceSource<'_> {
    type Error = Infallible;

    fn open(&mut self, _id: &str) -> Result<(), Infallible> {
        self.cursor = 0;
        self.finished = false;
        Ok(())
    }

    fn next_record(&mut self) -> Option<NoteRecord> {
        match self.records.get(self.cursor) {
            Some(record) => {
                self.cursor += 1;
                Some(*record)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    fn at_end(&self) -> bool {
        self.finished
    }
}
