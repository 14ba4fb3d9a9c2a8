//! Note-file line parsing.
//!
//! Parsing is deliberately forgiving: a row needs five comma-separated
//! fields, and each numeric field is read like C `atol`: optional sign, then
//! digits up to the first non-digit, 0 if there are none. Rows with too few
//! fields are skipped; rows with junk numbers play as zeros.

use std::io::BufRead;

use log::warn;
use tp_ir::NoteRecord;

/// Read the leading integer of `field`, `atol` style.
///
/// Leading whitespace is skipped; anything after the digits is ignored;
/// no digits yields 0. Out-of-range values saturate.
pub fn parse_leading_int(field: &str) -> i64 {
    let s = field.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    if negative {
        -value
    } else {
        value
    }
}

fn to_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

/// Parse one trimmed row. Returns `None` if it has fewer than five fields.
///
/// The first field is a free-form label and is ignored.
pub fn parse_line(line: &str) -> Option<NoteRecord> {
    let mut fields = line.splitn(5, ',');
    let _label = fields.next()?;
    let frequency = fields.next()?;
    let start = fields.next()?;
    let end = fields.next()?;
    let voice = fields.next()?;

    Some(NoteRecord {
        frequency: to_u32(parse_leading_int(frequency)),
        start_ms: to_u32(parse_leading_int(start)),
        end_ms: to_u32(parse_leading_int(end)),
        voice: parse_leading_int(voice).clamp(i32::MIN as i64, i32::MAX as i64) as i32,
    })
}

/// Streaming reader over a note file.
///
/// The first line is a header and is discarded on construction.
pub struct NoteReader<R> {
    reader: R,
    line: Vec<u8>,
    line_number: u64,
    skipped: u64,
    finished: bool,
}

impl<R: BufRead> NoteReader<R> {
    /// Wrap `reader` and consume its header line.
    pub fn new(reader: R) -> Self {
        let mut this = Self {
            reader,
            line: Vec::new(),
            line_number: 0,
            skipped: 0,
            finished: false,
        };
        if !this.read_line() {
            this.finished = true;
        }
        this
    }

    /// Fill `self.line` with the next raw line. False at end of input.
    fn read_line(&mut self) -> bool {
        self.line.clear();
        match self.reader.read_until(b'\n', &mut self.line) {
            Ok(0) => false,
            Ok(_) => {
                self.line_number += 1;
                true
            }
            Err(e) => {
                warn!("note file read failed after line {}: {}", self.line_number, e);
                false
            }
        }
    }

    /// Next well-formed record, or `None` once the input is exhausted.
    pub fn next_record(&mut self) -> Option<NoteRecord> {
        while !self.finished {
            if !self.read_line() {
                self.finished = true;
                break;
            }
            let text = String::from_utf8_lossy(&self.line);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match parse_line(text) {
                Some(record) => return Some(record),
                None => {
                    self.skipped += 1;
                    warn!("skipping malformed note line {}: {}", self.line_number, text);
                }
            }
        }
        None
    }

    /// Has the input been exhausted?
    pub fn at_end(&self) -> bool {
        self.finished
    }

    /// Number of non-blank rows skipped as malformed.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead> Iterator for NoteReader<R> {
    type Item = NoteRecord;

    fn next(&mut self) -> Option<NoteRecord> {
        self.next_record()
    }
}
