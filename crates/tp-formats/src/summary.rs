//! Note-file summary: scans a stream and reports what it asks of the player.

use std::fmt;

use tp_engine::EventSource;
use tp_ir::{NoteRecord, MAX_ACTIVE_EVENTS};

/// What a note stream contains.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteSummary {
    pub records: usize,
    /// Malformed rows skipped while reading, if the source tracks them.
    pub skipped_lines: u64,
    pub first_start_ms: Option<u32>,
    pub last_end_ms: u32,
    /// Notes per voice, index 0 being voice 1.
    pub voice_usage: Vec<usize>,
    /// Notes whose voice index is outside `1..=voices`; these never sound.
    pub out_of_range: usize,
    /// Notes starting before their predecessor.
    pub out_of_order: usize,
    /// Most notes sounding at once.
    pub peak_overlap: usize,
    pub frequency_range: Option<(u32, u32)>,
}

impl NoteSummary {
    /// Would playback ever exceed the scheduler's tracked-note capacity?
    pub fn exceeds_capacity(&self) -> bool {
        self.peak_overlap > MAX_ACTIVE_EVENTS
    }
}

/// Read `source` to the end and summarise it against a `voices`-voice player.
pub fn summarize<S: EventSource + ?Sized>(source: &mut S, voices: usize) -> NoteSummary {
    let mut summary = NoteSummary {
        voice_usage: vec![0; voices],
        ..NoteSummary::default()
    };
    let mut edges: Vec<(u32, i32)> = Vec::new();
    let mut previous_start = 0;

    while let Some(record) = source.next_record() {
        add_record(&mut summary, &record, voices, previous_start);
        previous_start = record.start_ms;
        if record.effective_end_ms() > record.start_ms {
            edges.push((record.start_ms, 1));
            edges.push((record.effective_end_ms(), -1));
        }
    }

    // Ends sort before starts at the same instant: a note ending at t frees
    // its slot before one starting at t takes it.
    edges.sort_unstable();
    let mut sounding = 0i32;
    for (_, step) in edges {
        sounding += step;
        summary.peak_overlap = summary.peak_overlap.max(sounding as usize);
    }

    summary
}

fn add_record(summary: &mut NoteSummary, record: &NoteRecord, voices: usize, previous_start: u32) {
    if summary.records > 0 && record.start_ms < previous_start {
        summary.out_of_order += 1;
    }
    summary.records += 1;
    summary.first_start_ms = Some(match summary.first_start_ms {
        Some(first) => first.min(record.start_ms),
        None => record.start_ms,
    });
    summary.last_end_ms = summary.last_end_ms.max(record.effective_end_ms());

    match record.voice_slot(voices) {
        Some(slot) => summary.voice_usage[slot] += 1,
        None => summary.out_of_range += 1,
    }

    let f = record.frequency;
    summary.frequency_range = Some(match summary.frequency_range {
        Some((lo, hi)) => (lo.min(f), hi.max(f)),
        None => (f, f),
    });
}

impl fmt::Display for NoteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Notes:     {}", self.records)?;
        if self.skipped_lines > 0 {
            writeln!(f, "Skipped:   {} malformed lines", self.skipped_lines)?;
        }
        if let Some(first) = self.first_start_ms {
            writeln!(
                f,
                "Span:      {} - {} ms ({:.1} s)",
                first,
                self.last_end_ms,
                self.last_end_ms as f64 / 1000.0
            )?;
        }
        if let Some((lo, hi)) = self.frequency_range {
            writeln!(f, "Range:     {} - {} Hz", lo, hi)?;
        }
        write!(f, "Voices:   ")?;
        for (i, count) in self.voice_usage.iter().enumerate() {
            write!(f, " {}:{}", i + 1, count)?;
        }
        writeln!(f)?;
        if self.out_of_range > 0 {
            writeln!(f, "Unplayable: {} notes on unknown voices", self.out_of_range)?;
        }
        if self.out_of_order > 0 {
            writeln!(f, "Unordered: {} notes start before the previous one", self.out_of_order)?;
        }
        write!(f, "Overlap:   peak {}", self.peak_overlap)?;
        if self.exceeds_capacity() {
            write!(f, " (over the limit of {})", MAX_ACTIVE_EVENTS)?;
        }
        writeln!(f)
    }
}
