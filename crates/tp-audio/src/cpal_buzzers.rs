//! Buzzers on the default cpal output device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use log::{error, info, warn};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use tp_engine::{SquareVoices, ToneCommand, VoiceBank};

use crate::error::AudioError;

/// Capacity of the control-to-callback command queue.
pub const COMMAND_QUEUE_LEN: usize = 256;

/// Producer end of the tone command queue.
///
/// Commands pushed while the queue is full are dropped and counted.
pub struct CommandQueue<P> {
    producer: P,
    dropped: u64,
}

impl<P: Producer<Item = ToneCommand>> CommandQueue<P> {
    pub fn new(producer: P) -> Self {
        Self { producer, dropped: 0 }
    }

    /// Enqueue `command`. Returns false if it was dropped.
    pub fn send(&mut self, command: ToneCommand) -> bool {
        if self.producer.try_push(command).is_err() {
            self.dropped += 1;
            warn!("tone command queue full, dropped {:?}", command);
            return false;
        }
        true
    }

    /// Commands lost because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// A voice bank whose tones come out of the host's speakers.
///
/// `play` and `stop` enqueue commands; the audio callback applies them to its
/// own [`SquareVoices`] before rendering each buffer. The device stream runs
/// for the bank's whole lifetime, so the output clock is always available.
pub struct CpalBuzzers {
    _stream: Stream,
    commands: CommandQueue<HeapProd<ToneCommand>>,
    voices: usize,
    sample_rate: u32,
}

impl CpalBuzzers {
    /// Open the default output device with `voices` buzzers at `amplitude`.
    pub fn new(voices: usize, amplitude: i16) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let mut config: StreamConfig = config.into();
        // The callback writes interleaved stereo.
        config.channels = 2;
        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;

        let (producer, mut consumer) = HeapRb::<ToneCommand>::new(COMMAND_QUEUE_LEN).split();
        let mut synth = SquareVoices::new(voices, sample_rate).with_amplitude(amplitude);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fill_buffer(&mut synth, &mut consumer, data, channels);
                },
                |err| error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;
        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;

        info!(
            "audio output: {} Hz, {} voices",
            sample_rate,
            voices
        );

        Ok(Self {
            _stream: stream,
            commands: CommandQueue::new(producer),
            voices: voices.min(tp_engine::MAX_VOICE_SLOTS),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Commands lost because the queue was full.
    pub fn dropped_commands(&self) -> u64 {
        self.commands.dropped()
    }
}

impl VoiceBank for CpalBuzzers {
    fn voice_count(&self) -> usize {
        self.voices
    }

    fn play(&mut self, slot: usize, frequency: u32) {
        self.commands.send(ToneCommand::Play { slot, frequency });
    }

    fn stop(&mut self, slot: usize) {
        self.commands.send(ToneCommand::Stop { slot });
    }
}

/// Apply queued commands, then render interleaved samples into `data`.
///
/// Channels past the second are zero-filled.
fn fill_buffer<C>(synth: &mut SquareVoices, commands: &mut C, data: &mut [f32], channels: usize)
where
    C: Consumer<Item = ToneCommand>,
{
    while let Some(command) = commands.try_pop() {
        synth.apply(command);
    }

    for chunk in data.chunks_mut(channels.max(1)) {
        let (left, right) = synth.render_frame().to_f32();
        for (i, sample) in chunk.iter_mut().enumerate() {
            *sample = match i {
                0 => left,
                1 => right,
                _ => 0.0,
            };
        }
    }
}
