//! Tempo and transpose factors applied during playback.

/// Slowest allowed tempo factor. Keeps scaled time strictly increasing.
pub const MIN_TEMPO: f64 = 0.1;

/// Fastest allowed tempo factor.
pub const MAX_TEMPO: f64 = 8.0;

/// Tempo and transpose state consumed by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransportState {
    tempo: f64,
    transpose_semitones: i32,
    transpose_factor: f64,
}

impl TransportState {
    /// Normal speed, no transpose.
    pub const fn new() -> Self {
        Self {
            tempo: 1.0,
            transpose_semitones: 0,
            transpose_factor: 1.0,
        }
    }

    /// Current tempo multiplier.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Accumulated transpose in semitones.
    pub fn transpose_semitones(&self) -> i32 {
        self.transpose_semitones
    }

    /// Frequency multiplier derived from the semitone offset.
    pub fn transpose_factor(&self) -> f64 {
        self.transpose_factor
    }

    /// Set the tempo factor, clamped to `[MIN_TEMPO, MAX_TEMPO]`.
    ///
    /// NaN falls back to normal speed. Returns the applied value.
    pub fn set_tempo(&mut self, tempo: f64) -> f64 {
        self.tempo = if tempo.is_nan() {
            1.0
        } else {
            tempo.clamp(MIN_TEMPO, MAX_TEMPO)
        };
        self.tempo
    }

    /// Add `delta` to the tempo factor (clamped). Returns the applied value.
    pub fn adjust_tempo(&mut self, delta: f64) -> f64 {
        self.set_tempo(self.tempo + delta)
    }

    /// Shift the transpose by `delta` semitones and recompute the factor.
    pub fn shift_transpose(&mut self, delta: i32) {
        self.transpose_semitones = self.transpose_semitones.saturating_add(delta);
        self.transpose_factor = libm::pow(2.0, self.transpose_semitones as f64 / 12.0);
    }

    /// Convert a virtual time to file time.
    pub fn scale_time(&self, virtual_ms: u64) -> f64 {
        virtual_ms as f64 * self.tempo
    }

    /// Apply the transpose factor to a frequency, rounding to the nearest Hz.
    pub fn transpose_frequency(&self, frequency: u32) -> u32 {
        let shifted = libm::round(frequency as f64 * self.transpose_factor);
        if shifted >= u32::MAX as f64 {
            u32::MAX
        } else {
            shifted as u32
        }
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new()
    }
}
