//! Output-channel capability used by the scheduler.

/// Upper bound on the number of voices the scheduler will address.
pub const MAX_VOICE_SLOTS: usize = 16;

/// A fixed set of tone outputs, addressed by 0-based slot.
///
/// Commands are fire-and-forget. Playing on a slot that is already sounding
/// retunes it (last write wins).
pub trait VoiceBank {
    /// Number of physical voices.
    fn voice_count(&self) -> usize;

    /// Sound `frequency` Hz on `slot`.
    fn play(&mut self, slot: usize, frequency: u32);

    /// Silence `slot`.
    fn stop(&mut self, slot: usize);

    /// Make sure the shared tone clock is running.
    ///
    /// Called at the end of every operation that touches the outputs.
    fn restore_clock(&mut self) {}
}

impl<V: VoiceBank + ?Sized> VoiceBank for &mut V {
    fn voice_count(&self) -> usize {
        (**self).voice_count()
    }

    fn play(&mut self, slot: usize, frequency: u32) {
        (**self).play(slot, frequency)
    }

    fn stop(&mut self, slot: usize) {
        (**self).stop(slot)
    }

    fn restore_clock(&mut self) {
        (**self).restore_clock()
    }
}
