//! Note files read from a directory.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::debug;
use tp_engine::EventSource;
use tp_ir::NoteRecord;

use crate::error::FormatError;
use crate::note_csv::NoteReader;

/// An event source streaming note files from disk.
///
/// Stream ids are paths relative to `root`; an absolute id is used as is.
pub struct FileSource {
    root: PathBuf,
    reader: Option<NoteReader<BufReader<File>>>,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reader: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Malformed rows skipped in the open stream so far.
    pub fn skipped_lines(&self) -> u64 {
        self.reader.as_ref().map_or(0, NoteReader::skipped_lines)
    }
}

impl EventSource for FileSource {
    type Error = FormatError;

    fn open(&mut self, id: &str) -> Result<(), FormatError> {
        self.reader = None;
        let path = self.root.join(id);
        let file = File::open(&path).map_err(|source| FormatError::Open {
            path: path.clone(),
            source,
        })?;
        debug!("opened note file {}", path.display());
        self.reader = Some(NoteReader::new(BufReader::new(file)));
        Ok(())
    }

    fn next_record(&mut self) -> Option<NoteRecord> {
        self.reader.as_mut()?.next_record()
    }

    fn at_end(&self) -> bool {
        self.reader.as_ref().map_or(true, NoteReader::at_end)
    }
}
