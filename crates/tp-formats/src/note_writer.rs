//! Note-file output.

use std::io::{self, Write};

use crate::midi_import::ImportedNote;

/// Header row written at the top of every generated note file.
pub const NOTE_FILE_HEADER: &str = "note,frequency,start_ms,end_ms,voice";

/// Write `notes` as a note file, labelling each row with its pitch name.
pub fn write_notes<W: Write>(mut out: W, notes: &[ImportedNote]) -> io::Result<()> {
    writeln!(out, "{}", NOTE_FILE_HEADER)?;
    for note in notes {
        let r = &note.record;
        writeln!(
            out,
            "{},{},{},{},{}",
            note.name(),
            r.frequency,
            r.start_ms,
            r.end_ms,
            r.voice
        )?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note_csv::NoteReader;
    use std::io::Cursor;
    use tp_ir::NoteRecord;

    fn imported(key: u8, record: NoteRecord) -> ImportedNote {
        ImportedNote {
            key,
            velocity: 100,
            channel: 0,
            record,
        }
    }

    #[test]
    fn writes_header_and_labelled_rows() {
        let notes = [
            imported(69, NoteRecord::new(440, 0, 500, 1)),
            imported(61, NoteRecord::new(277, 250, 750, 2)),
        ];
        let mut out = Vec::new();
        write_notes(&mut out, &notes).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "note,frequency,start_ms,end_ms,voice\nA4,440,0,500,1\nC#4,277,250,750,2\n"
        );
    }

    #[test]
    fn output_reads_back_as_the_same_records() {
        let notes = [
            imported(60, NoteRecord::new(262, 0, 100, 1)),
            imported(64, NoteRecord::new(330, 100, 200, 3)),
        ];
        let mut out = Vec::new();
        write_notes(&mut out, &notes).unwrap();
        let read: Vec<_> = NoteReader::new(Cursor::new(out)).collect();
        assert_eq!(read, [notes[0].record, notes[1].record]);
    }
}
