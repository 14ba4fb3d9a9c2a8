//! Square-wave buzzer emulation.
//!
//! Each voice is a phase accumulator stepping through one period in 16.16
//! fixed point; the output is high for the first half of the period and low
//! for the second, like a piezo driven from a timer pin.

use heapless::Vec;

use crate::frame::Frame;
use crate::voice_bank::{VoiceBank, MAX_VOICE_SLOTS};

/// Per-voice output level. Five voices at this level stay well inside 16 bits.
pub const DEFAULT_AMPLITUDE: i16 = 4096;

/// One period of the phase accumulator.
const PHASE_ONE: u32 = 1 << 16;

/// A voice command, for handing tone changes to another thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToneCommand {
    Play { slot: usize, frequency: u32 },
    Stop { slot: usize },
    /// Silence every voice
    Silence,
}

/// Convert a tone frequency to a 16.16 fixed-point phase increment.
///
/// Returns 0 (silent) for frequencies at or above Nyquist, where a square
/// wave would alias into noise.
pub fn frequency_to_increment(frequency: u32, sample_rate: u32) -> u32 {
    if sample_rate == 0 || frequency == 0 || frequency as u64 * 2 >= sample_rate as u64 {
        return 0;
    }
    ((frequency as u64 * PHASE_ONE as u64) / sample_rate as u64) as u32
}

#[derive(Clone, Copy, Debug, Default)]
struct Oscillator {
    frequency: u32,
    increment: u32,
    phase: u32,
}

/// A bank of square-wave voices rendering 16-bit frames.
#[derive(Clone, Debug)]
pub struct SquareVoices {
    oscillators: Vec<Oscillator, MAX_VOICE_SLOTS>,
    sample_rate: u32,
    amplitude: i16,
}

impl SquareVoices {
    /// Create `voices` silent voices (at most `MAX_VOICE_SLOTS`).
    pub fn new(voices: usize, sample_rate: u32) -> Self {
        let mut oscillators = Vec::new();
        for _ in 0..voices.min(MAX_VOICE_SLOTS) {
            let _ = oscillators.push(Oscillator::default());
        }
        Self {
            oscillators,
            sample_rate,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }

    /// Set the per-voice output level.
    pub fn with_amplitude(mut self, amplitude: i16) -> Self {
        self.amplitude = amplitude.saturating_abs();
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frequency sounding on `slot`, if any.
    pub fn frequency(&self, slot: usize) -> Option<u32> {
        self.oscillators
            .get(slot)
            .filter(|osc| osc.frequency != 0)
            .map(|osc| osc.frequency)
    }

    /// Number of voices currently sounding.
    pub fn sounding(&self) -> usize {
        self.oscillators.iter().filter(|osc| osc.frequency != 0).count()
    }

    /// Apply a queued command.
    pub fn apply(&mut self, command: ToneCommand) {
        match command {
            ToneCommand::Play { slot, frequency } => self.play(slot, frequency),
            ToneCommand::Stop { slot } => self.stop(slot),
            ToneCommand::Silence => {
                for osc in self.oscillators.iter_mut() {
                    *osc = Oscillator::default();
                }
            }
        }
    }

    /// Render one frame and advance every voice by one sample.
    pub fn render_frame(&mut self) -> Frame {
        let mut level: i32 = 0;
        for osc in self.oscillators.iter_mut() {
            if osc.increment == 0 {
                continue;
            }
            level += if osc.phase < PHASE_ONE / 2 {
                self.amplitude as i32
            } else {
                -(self.amplitude as i32)
            };
            osc.phase = (osc.phase + osc.increment) % PHASE_ONE;
        }
        Frame::mono(level)
    }

    /// Render `frames` frames into `out`.
    pub fn render_into(&mut self, out: &mut [Frame]) {
        for frame in out.iter_mut() {
            *frame = self.render_frame();
        }
    }
}

impl VoiceBank for SquareVoices {
    fn voice_count(&self) -> usize {
        self.oscillators.len()
    }

    fn play(&mut self, slot: usize, frequency: u32) {
        let sample_rate = self.sample_rate;
        if let Some(osc) = self.oscillators.get_mut(slot) {
            // Retriggering restarts the period, as re-arming the timer does.
            osc.frequency = frequency;
            osc.increment = frequency_to_increment(frequency, sample_rate);
            osc.phase = 0;
        }
    }

    fn stop(&mut self, slot: usize) {
        if let Some(osc) = self.oscillators.get_mut(slot) {
            *osc = Oscillator::default();
        }
    }
}
