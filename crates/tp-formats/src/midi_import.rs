//! Standard MIDI File to note-table conversion.
//!
//! Notes are paired per key (first on, first off), timed through the file's
//! tempo map and assigned to a fixed number of voices. When every voice is
//! busy the sounding note with the lowest keep score is cut short to make room.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use log::{debug, warn};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tp_ir::{NoteRecord, NUM_BUZZERS};

use crate::error::FormatError;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const KEEP_WEIGHT_LENGTH: f64 = 0.4;
const KEEP_WEIGHT_VELOCITY: f64 = 0.3;
const KEEP_WEIGHT_ROLE: f64 = 0.2;
const KEEP_WEIGHT_PITCH: f64 = 0.1;
const MID_PITCH: f64 = 66.0;

/// Conversion settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportOptions {
    /// Number of voices to allocate (at least 1).
    pub voices: usize,
    /// Gap left between a cut note and the note replacing it.
    pub margin_ms: u32,
    /// Tempo used until the first tempo event.
    pub default_bpm: f64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            voices: NUM_BUZZERS,
            margin_ms: 5,
            default_bpm: 120.0,
        }
    }
}

/// A converted note, with the MIDI detail that went into its voice choice.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedNote {
    pub key: u8,
    pub velocity: u8,
    pub channel: u8,
    pub record: NoteRecord,
}

impl ImportedNote {
    /// Scientific pitch name of the key, e.g. `C4`.
    pub fn name(&self) -> String {
        note_name(self.key)
    }
}

/// Scientific pitch name of a MIDI key (60 is `C4`).
pub fn note_name(key: u8) -> String {
    let octave = (key / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(key % 12) as usize], octave)
}

/// Equal-tempered frequency of a MIDI key, A4 = 440 Hz, rounded to whole Hz.
pub fn key_frequency(key: u8) -> u32 {
    let hz = 440.0 * 2f64.powf((key as f64 - 69.0) / 12.0);
    hz.round() as u32
}

fn role_weight(channel: u8) -> f64 {
    match channel {
        0 => 1.0,
        1 => 0.7,
        _ => 0.5,
    }
}

/// A paired note in microseconds, before voice assignment.
#[derive(Clone, Copy, Debug)]
struct RawNote {
    key: u8,
    velocity: u8,
    channel: u8,
    start_us: u64,
    end_us: u64,
}

#[derive(Clone, Copy, Debug)]
struct OpenNote {
    velocity: u8,
    channel: u8,
    start_us: u64,
}

#[derive(Clone, Copy, Debug)]
enum Event {
    Tempo(u32),
    On { key: u8, velocity: u8, channel: u8 },
    Off { key: u8 },
}

/// Merge every track into one tick-ordered list. Ties keep track order.
fn collect_events(smf: &Smf) -> Vec<(u64, Event)> {
    let mut events = Vec::new();
    for track in smf.tracks.iter() {
        let mut tick = 0u64;
        for event in track.iter() {
            tick += event.delta.as_int() as u64;
            let converted = match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => Event::Tempo(tempo.as_int()),
                TrackEventKind::Midi { channel, message } => match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Event::On {
                        key: key.as_int(),
                        velocity: vel.as_int(),
                        channel: channel.as_int(),
                    },
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        Event::Off { key: key.as_int() }
                    }
                    _ => continue,
                },
                _ => continue,
            };
            events.push((tick, converted));
        }
    }
    events.sort_by_key(|(tick, _)| *tick);
    events
}

/// Pair note-ons with note-offs and time them through the tempo map.
fn pair_notes(events: &[(u64, Event)], ticks_per_beat: u16, default_bpm: f64) -> Vec<RawNote> {
    let default_tempo = if default_bpm > 0.0 {
        (60_000_000.0 / default_bpm).round() as u64
    } else {
        500_000
    };
    let ticks_per_beat = ticks_per_beat.max(1) as u128;

    let mut open: Vec<VecDeque<OpenNote>> = vec![VecDeque::new(); 128];
    let mut notes = Vec::new();

    let mut tempo = default_tempo;
    let mut anchor_tick = 0u64;
    let mut anchor_us = 0u64;

    for &(tick, event) in events {
        let elapsed = (tick - anchor_tick) as u128 * tempo as u128 / ticks_per_beat;
        let now_us = anchor_us.saturating_add(elapsed.min(u64::MAX as u128) as u64);

        match event {
            Event::Tempo(us_per_beat) => {
                anchor_tick = tick;
                anchor_us = now_us;
                tempo = us_per_beat as u64;
                debug!("tempo {} us/beat at tick {}", us_per_beat, tick);
            }
            Event::On {
                key,
                velocity,
                channel,
            } => open[key as usize].push_back(OpenNote {
                velocity,
                channel,
                start_us: now_us,
            }),
            Event::Off { key } => match open[key as usize].pop_front() {
                Some(on) => notes.push(RawNote {
                    key,
                    velocity: on.velocity,
                    channel: on.channel,
                    start_us: on.start_us,
                    end_us: now_us,
                }),
                None => warn!(
                    "note off for key {} at {} ms without a matching note on",
                    key,
                    now_us / 1000
                ),
            },
        }
    }

    let unterminated: usize = open.iter().map(VecDeque::len).sum();
    if unterminated > 0 {
        warn!("dropping {} notes that never end", unterminated);
    }

    notes.sort_by_key(|n| n.start_us);
    notes
}

/// A voice-assigned note, still in microseconds.
#[derive(Clone, Copy, Debug)]
struct Assigned {
    raw: RawNote,
    end_us: u64,
    voice: usize,
}

fn keep_score(note: &Assigned, max_length: u64) -> f64 {
    let length = note.end_us - note.raw.start_us;
    let relative_length = if max_length > 0 {
        length as f64 / max_length as f64
    } else {
        0.0
    };
    let pitch = 1.0 - (note.raw.key as f64 - MID_PITCH).abs() / MID_PITCH;

    KEEP_WEIGHT_LENGTH * (1.0 - relative_length)
        + KEEP_WEIGHT_VELOCITY * note.raw.velocity as f64 / 127.0
        + KEEP_WEIGHT_ROLE * role_weight(note.raw.channel)
        + KEEP_WEIGHT_PITCH * pitch
}

/// Assign voices `1..=voices` to start-ordered notes.
fn assign_voices(notes: &[RawNote], voices: usize, margin_us: u64) -> Vec<Assigned> {
    let mut free: BinaryHeap<Reverse<usize>> = (1..=voices.max(1)).map(Reverse).collect();
    // Indices into `assigned` of notes still holding a voice.
    let mut sounding: Vec<usize> = Vec::new();
    let mut assigned: Vec<Assigned> = Vec::with_capacity(notes.len());
    let mut cuts = 0usize;

    for raw in notes {
        let start = raw.start_us;

        sounding.retain(|&i| {
            if assigned[i].end_us <= start {
                free.push(Reverse(assigned[i].voice));
                false
            } else {
                true
            }
        });

        let voice = match free.pop() {
            Some(Reverse(voice)) => voice,
            None => {
                let max_length = sounding
                    .iter()
                    .map(|&i| assigned[i].end_us - assigned[i].raw.start_us)
                    .max()
                    .unwrap_or(0);

                let mut victim = 0;
                let mut lowest = f64::INFINITY;
                for (pos, &i) in sounding.iter().enumerate() {
                    let score = keep_score(&assigned[i], max_length);
                    if score < lowest {
                        lowest = score;
                        victim = pos;
                    }
                }

                let cut = sounding.remove(victim);
                let note = &mut assigned[cut];
                note.end_us = start.saturating_sub(margin_us).max(note.raw.start_us);
                cuts += 1;
                note.voice
            }
        };

        sounding.push(assigned.len());
        assigned.push(Assigned {
            raw: *raw,
            end_us: raw.end_us,
            voice,
        });
    }

    if cuts > 0 {
        debug!("cut {} notes short to fit {} voices", cuts, voices);
    }
    assigned
}

fn to_ms(us: u64) -> u32 {
    (us / 1000).min(u32::MAX as u64) as u32
}

/// Convert a Standard MIDI File into start-ordered, voice-assigned notes.
pub fn import_midi(data: &[u8], options: &ImportOptions) -> Result<Vec<ImportedNote>, FormatError> {
    let smf = Smf::parse(data)?;
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(..) => return Err(FormatError::MidiUnsupportedTiming),
    };

    debug!(
        "importing MIDI: {} tracks, {} ticks per beat",
        smf.tracks.len(),
        ticks_per_beat
    );

    let events = collect_events(&smf);
    let notes = pair_notes(&events, ticks_per_beat, options.default_bpm);
    let margin_us = options.margin_ms as u64 * 1000;

    Ok(assign_voices(&notes, options.voices, margin_us)
        .into_iter()
        .map(|note| ImportedNote {
            key: note.raw.key,
            velocity: note.raw.velocity,
            channel: note.raw.channel,
            record: NoteRecord::new(
                key_frequency(note.raw.key),
                to_ms(note.raw.start_us),
                to_ms(note.end_us),
                note.voice as i32,
            ),
        })
        .collect())
}
