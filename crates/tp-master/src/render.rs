//! Offline rendering of a note stream to 16-bit stereo PCM.

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use log::debug;
use tp_engine::{EventSource, Frame, Scheduler, SquareVoices};
use tp_ir::Millis;

use crate::config::PlayerConfig;
use crate::error::PlayerError;

/// How to render.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub sample_rate: u32,
    pub voices: usize,
    pub amplitude: i16,
    pub max_seconds: u32,
    pub tempo: f64,
    pub transpose: i32,
}

impl RenderOptions {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            sample_rate: config.sample_rate(),
            voices: config.voices(),
            amplitude: config.amplitude(),
            max_seconds: config.max_render_seconds(),
            tempo: 1.0,
            transpose: 0,
        }
    }
}

/// Play an opened `source` through a scheduler at 1 ms steps of virtual time,
/// synthesising each millisecond's frames after its boundaries are applied.
///
/// Stops once the scheduler is idle or `max_seconds` of output exist.
pub fn render_frames<S: EventSource + ?Sized>(source: &mut S, options: &RenderOptions) -> Vec<Frame> {
    let voices = SquareVoices::new(options.voices, options.sample_rate).with_amplitude(options.amplitude);
    let mut scheduler = Scheduler::new(voices);
    scheduler.initialize(source);
    scheduler.set_tempo(options.tempo);
    scheduler.modify_transpose(options.transpose);

    let rate = options.sample_rate as u64;
    let max_frames = rate * options.max_seconds as u64;
    let mut frames = Vec::new();
    let mut now: Millis = 0;

    while !scheduler.is_idle() && (frames.len() as u64) < max_frames {
        scheduler.advance(now, source);
        now += 1;
        let target = (now * rate / 1000).min(max_frames);
        while (frames.len() as u64) < target {
            frames.push(scheduler.voices_mut().render_frame());
        }
    }

    debug!(
        "rendered {} frames ({} ms of virtual time)",
        frames.len(),
        now
    );
    frames
}

fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Encode `frames` as a WAV stream.
pub fn write_wav<W: Write + Seek>(out: W, frames: &[Frame], sample_rate: u32) -> Result<(), hound::Error> {
    let mut writer = WavWriter::new(out, wav_spec(sample_rate))?;
    for frame in frames {
        writer.write_sample(frame.left)?;
        writer.write_sample(frame.right)?;
    }
    writer.finalize()
}

/// Encode `frames` as an in-memory WAV file.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut buf = Cursor::new(Vec::new());
    write_wav(&mut buf, frames, sample_rate)?;
    Ok(buf.into_inner())
}

/// Render an opened `source` into a WAV file at `path`. Returns the frame count.
pub fn render_to_wav<S: EventSource + ?Sized>(
    source: &mut S,
    options: &RenderOptions,
    path: &Path,
) -> Result<usize, PlayerError> {
    let frames = render_frames(source, options);
    let file = File::create(path).map_err(hound::Error::from)?;
    write_wav(BufWriter::new(file), &frames, options.sample_rate)?;
    Ok(frames.len())
}
