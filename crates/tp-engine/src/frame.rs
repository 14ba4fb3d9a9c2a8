//! Audio frame type.

/// A stereo 16-bit output frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Same level on both channels, saturated to 16 bits.
    pub fn mono(level: i32) -> Self {
        let level = level.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        Self {
            left: level,
            right: level,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.left == 0 && self.right == 0
    }

    /// Normalised `[-1.0, 1.0)` samples for float output devices.
    pub fn to_f32(self) -> (f32, f32) {
        (self.left as f32 / 32768.0, self.right as f32 / 32768.0)
    }
}
