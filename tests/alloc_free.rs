//! Allocation-free playback path tests.
//!
//! These tests verify that `Scheduler::advance()`, `Scheduler::seek()` and
//! tone synthesis do not allocate once the notes are in memory. Fixture files
//! are read up front; the timed loop runs inside `assert_no_alloc`.
//!
//! Just run `cargo test`, no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use std::path::PathBuf;

use tp_engine::{EventSource, Scheduler, SliceSource, SquareVoices};
use tp_formats::FileSource;
use tp_ir::NoteRecord;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_notes(name: &str) -> Vec<NoteRecord> {
    let mut source = FileSource::new(fixtures_dir());
    source.open(name).unwrap();
    std::iter::from_fn(|| source.next_record()).collect()
}

/// Play `notes` for `duration_ms`, rendering 8 frames per millisecond.
fn assert_playback_alloc_free(notes: &[NoteRecord], duration_ms: u64) {
    let mut source = SliceSource::new(notes);
    let mut scheduler = Scheduler::new(SquareVoices::new(5, 8000));
    scheduler.initialize(&mut source);

    assert_no_alloc(|| {
        for now in 0..duration_ms {
            scheduler.advance(now, &mut source);
            for _ in 0..8 {
                scheduler.voices_mut().render_frame();
            }
        }
    });
    assert!(scheduler.is_idle());
}

#[test]
fn scale_alloc_free() {
    let notes = load_notes("scale.csv");
    assert_playback_alloc_free(&notes, 4000);
}

#[test]
fn crowded_alloc_free() {
    // Overflows the active set, exercising the deadline path.
    let notes = load_notes("crowded.csv");
    assert_playback_alloc_free(&notes, 2200);
}

#[test]
fn seek_alloc_free() {
    let notes = load_notes("crowded.csv");
    let mut source = SliceSource::new(&notes);
    let mut scheduler = Scheduler::new(SquareVoices::new(5, 8000));

    assert_no_alloc(|| {
        for target in [0, 50, 1000, 2050, 1500, 3000] {
            scheduler.seek(target, "", &mut source).unwrap();
            scheduler.advance(100, &mut source);
        }
    });
}

#[test]
fn tempo_and_transpose_alloc_free() {
    let notes = load_notes("scale.csv");
    let mut source = SliceSource::new(&notes);
    let mut scheduler = Scheduler::new(SquareVoices::new(5, 8000));
    scheduler.initialize(&mut source);

    assert_no_alloc(|| {
        for now in 0..1000 {
            if now % 100 == 0 {
                scheduler.adjust_tempo(0.1);
                scheduler.modify_transpose(1);
            }
            scheduler.advance(now, &mut source);
            scheduler.voices_mut().render_frame();
        }
    });
}
