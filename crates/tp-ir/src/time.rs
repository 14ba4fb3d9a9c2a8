//! Playback time helpers.

/// Playback position in milliseconds.
pub type Millis = u64;

/// Offset a position by a signed delta, clamping at zero.
///
/// Seek requests accumulate signed deltas; doing the arithmetic in `i128`
/// keeps a large rewind from wrapping around to the end of the song.
pub fn offset_clamped(position: Millis, delta: i64) -> Millis {
    let target = position as i128 + delta as i128;
    target.clamp(0, Millis::MAX as i128) as Millis
}
