//! Player settings: built-in TOML defaults overlaid with an optional user file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tp_engine::{DEFAULT_AMPLITUDE, MAX_VOICE_SLOTS};
use tp_ir::NUM_BUZZERS;

use crate::error::PlayerError;
use crate::player::PlayerOptions;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default, Debug, Clone)]
struct ConfigFile {
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    library: LibraryConfig,
    #[serde(default)]
    audio: AudioConfig,
}

#[derive(Deserialize, Default, Debug, Clone)]
struct PlaybackConfig {
    voices: Option<usize>,
    seek_step_ms: Option<u64>,
    seek_debounce_ms: Option<u64>,
    tempo_step: Option<f64>,
    refresh_interval_ms: Option<u64>,
}

#[derive(Deserialize, Default, Debug, Clone)]
struct LibraryConfig {
    dir: Option<PathBuf>,
}

#[derive(Deserialize, Default, Debug, Clone)]
struct AudioConfig {
    sample_rate: Option<u32>,
    amplitude: Option<i16>,
    max_render_seconds: Option<u32>,
}

/// Player settings: built-in defaults overlaid with an optional user file.
#[derive(Default, Debug, Clone)]
pub struct PlayerConfig {
    file: ConfigFile,
}

impl PlayerConfig {
    /// Load the built-in defaults, then apply `user` if given.
    ///
    /// A user file that cannot be read or parsed is an error; it was asked for
    /// explicitly.
    pub fn load(user: Option<&Path>) -> Result<Self, PlayerError> {
        let mut config = Self::parse(DEFAULT_CONFIG, "built-in defaults")?;

        if let Some(path) = user {
            let contents =
                std::fs::read_to_string(path).map_err(|source| PlayerError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            let overrides = Self::parse(&contents, &path.display().to_string())?;
            config.merge(overrides);
            log::info!(target: "config", "loaded {}", path.display());
        }

        Ok(config)
    }

    /// Parse one TOML document without applying defaults.
    pub fn parse(text: &str, origin: &str) -> Result<Self, PlayerError> {
        let file = toml::from_str::<ConfigFile>(text).map_err(|source| PlayerError::ConfigParse {
            origin: origin.to_string(),
            source,
        })?;
        Ok(Self { file })
    }

    /// Overlay every key `other` sets.
    pub fn merge(&mut self, other: PlayerConfig) {
        let base = &mut self.file;
        let user = other.file;

        if user.playback.voices.is_some() {
            base.playback.voices = user.playback.voices;
        }
        if user.playback.seek_step_ms.is_some() {
            base.playback.seek_step_ms = user.playback.seek_step_ms;
        }
        if user.playback.seek_debounce_ms.is_some() {
            base.playback.seek_debounce_ms = user.playback.seek_debounce_ms;
        }
        if user.playback.tempo_step.is_some() {
            base.playback.tempo_step = user.playback.tempo_step;
        }
        if user.playback.refresh_interval_ms.is_some() {
            base.playback.refresh_interval_ms = user.playback.refresh_interval_ms;
        }
        if user.library.dir.is_some() {
            base.library.dir = user.library.dir;
        }
        if user.audio.sample_rate.is_some() {
            base.audio.sample_rate = user.audio.sample_rate;
        }
        if user.audio.amplitude.is_some() {
            base.audio.amplitude = user.audio.amplitude;
        }
        if user.audio.max_render_seconds.is_some() {
            base.audio.max_render_seconds = user.audio.max_render_seconds;
        }
    }

    /// Number of buzzers (1..=16).
    pub fn voices(&self) -> usize {
        self.file
            .playback
            .voices
            .unwrap_or(NUM_BUZZERS)
            .clamp(1, MAX_VOICE_SLOTS)
    }

    /// Distance one Forward or Rewind press moves.
    pub fn seek_step_ms(&self) -> u64 {
        self.file.playback.seek_step_ms.unwrap_or(5000)
    }

    /// Quiet period after the last Forward/Rewind before the seek runs.
    pub fn seek_debounce_ms(&self) -> u64 {
        self.file.playback.seek_debounce_ms.unwrap_or(1000)
    }

    /// Tempo change per TempoUp/TempoDown (0.01..=1.0).
    pub fn tempo_step(&self) -> f64 {
        let step = self.file.playback.tempo_step.unwrap_or(0.1);
        if step.is_finite() {
            step.clamp(0.01, 1.0)
        } else {
            0.1
        }
    }

    pub fn refresh_interval_ms(&self) -> u64 {
        self.file.playback.refresh_interval_ms.unwrap_or(9000).max(1)
    }

    /// Directory note files are read from.
    pub fn library_dir(&self) -> PathBuf {
        self.file
            .library
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Offline render sample rate (8 kHz..=192 kHz).
    pub fn sample_rate(&self) -> u32 {
        self.file
            .audio
            .sample_rate
            .unwrap_or(44100)
            .clamp(8000, 192_000)
    }

    /// Per-voice output level.
    pub fn amplitude(&self) -> i16 {
        self.file
            .audio
            .amplitude
            .unwrap_or(DEFAULT_AMPLITUDE)
            .saturating_abs()
    }

    /// Longest offline render.
    pub fn max_render_seconds(&self) -> u32 {
        self.file.audio.max_render_seconds.unwrap_or(600).max(1)
    }

    /// Control-loop timing derived from these settings.
    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            seek_step_ms: self.seek_step_ms(),
            seek_debounce_ms: self.seek_debounce_ms(),
            tempo_step: self.tempo_step(),
            refresh_interval_ms: self.refresh_interval_ms(),
            ..PlayerOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_defaults_parse() {
        let config = PlayerConfig::load(None).unwrap();
        assert_eq!(config.voices(), 5);
        assert_eq!(config.seek_step_ms(), 5000);
        assert_eq!(config.seek_debounce_ms(), 1000);
        assert_eq!(config.refresh_interval_ms(), 9000);
        assert_eq!(config.sample_rate(), 44100);
        assert_eq!(config.amplitude(), 4096);
        assert_eq!(config.library_dir(), PathBuf::from("."));
    }

    #[test]
    fn missing_keys_fall_back_to_built_in_values() {
        let config = PlayerConfig::default();
        assert_eq!(config.voices(), NUM_BUZZERS);
        assert_eq!(config.max_render_seconds(), 600);
        approx::assert_relative_eq!(config.tempo_step(), 0.1);
    }

    #[test]
    fn user_file_overrides_only_its_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[playback]\nvoices = 3\n\n[library]\ndir = \"/music\"").unwrap();

        let config = PlayerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.voices(), 3);
        assert_eq!(config.library_dir(), PathBuf::from("/music"));
        assert_eq!(config.seek_step_ms(), 5000);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = PlayerConfig::parse(
            "[playback]\nvoices = 40\ntempo_step = 9.0\n[audio]\nsample_rate = 10\namplitude = -300",
            "test",
        )
        .unwrap();
        assert_eq!(config.voices(), MAX_VOICE_SLOTS);
        approx::assert_relative_eq!(config.tempo_step(), 1.0);
        assert_eq!(config.sample_rate(), 8000);
        assert_eq!(config.amplitude(), 300);
    }

    #[test]
    fn malformed_user_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[playback\nvoices = ").unwrap();
        assert!(matches!(
            PlayerConfig::load(Some(file.path())),
            Err(PlayerError::ConfigParse { .. })
        ));
    }

    #[test]
    fn unreadable_user_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            PlayerConfig::load(Some(&missing)),
            Err(PlayerError::ConfigRead { .. })
        ));
    }
}
