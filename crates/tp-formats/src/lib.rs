//! Format support for the toneplayer buzzer player.
//!
//! Reads note files (one header line, then `label,frequency,start,end,voice`
//! rows), converts Standard MIDI Files into note files, and summarises them.

mod error;
mod file_source;
mod memory;
mod midi_import;
mod note_csv;
mod note_writer;
mod summary;

pub use error::FormatError;
pub use file_source::FileSource;
pub use memory::MemoryLibrary;
pub use midi_import::{import_midi, key_frequency, note_name, ImportOptions, ImportedNote};
pub use note_csv::{parse_leading_int, parse_line, NoteReader};
pub use note_writer::{write_notes, NOTE_FILE_HEADER};
pub use summary::{summarize, NoteSummary};
