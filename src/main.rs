//! toneplayer: play, render, convert and inspect buzzer note files.
//!
//! Usage:
//!   toneplayer play song.csv other.csv
//!   toneplayer render song.csv --wav song.wav
//!   toneplayer convert song.mid -o song.csv --voices 5
//!   toneplayer info song.csv

mod terminal;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::TryRecvError;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use log::{info, warn};
use tp_audio::CpalBuzzers;
use tp_engine::EventSource;
use tp_formats::{import_midi, summarize, write_notes, ImportOptions};
use tp_master::{
    render_to_wav, Command, FileSource, LogFacade, Player, PlayerConfig, PlayerError, PlayerMode,
    RenderOptions, TrackList,
};

use crate::terminal::{spawn_key_reader, Input, TerminalDisplay, HELP};

#[derive(Parser)]
#[command(name = "toneplayer")]
#[command(about = "Polyphonic buzzer note-file player", long_about = None)]
struct Cli {
    /// Settings file overriding the built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play note files through the sound card
    Play {
        /// Note files, relative to the library directory
        #[arg(required = true)]
        files: Vec<String>,

        /// Library directory (overrides the config file)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Initial tempo multiplier
        #[arg(short, long, default_value = "1.0")]
        tempo: f64,

        /// Initial transpose in semitones
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        transpose: i32,

        /// Start position of the first file in milliseconds
        #[arg(long, default_value = "0")]
        start: u64,
    },

    /// Render a note file to a WAV file
    Render {
        /// Note file
        input: PathBuf,

        /// Output WAV path
        #[arg(long)]
        wav: PathBuf,

        /// Tempo multiplier
        #[arg(short, long, default_value = "1.0")]
        tempo: f64,

        /// Transpose in semitones
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        transpose: i32,
    },

    /// Convert a Standard MIDI File to a note file
    Convert {
        /// MIDI file
        input: PathBuf,

        /// Output note file (defaults to the input with a .csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of voices to allocate
        #[arg(long)]
        voices: Option<usize>,
    },

    /// Summarise a note file
    Info {
        /// Note file
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = PlayerConfig::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Play {
            files,
            dir,
            tempo,
            transpose,
            start,
        } => play(&config, &files, dir, tempo, transpose, start),
        Commands::Render {
            input,
            wav,
            tempo,
            transpose,
        } => render(&config, &input, &wav, tempo, transpose),
        Commands::Convert {
            input,
            output,
            voices,
        } => convert(&config, &input, output, voices),
        Commands::Info { input } => show_info(&config, &input),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn play(
    config: &PlayerConfig,
    files: &[String],
    dir: Option<PathBuf>,
    tempo: f64,
    transpose: i32,
    start: u64,
) -> Result<(), PlayerError> {
    let mut tracks = TrackList::new();
    for name in files {
        if !tracks.push(name) {
            warn!("playlist full, skipping {}", name);
        }
    }

    let root = dir.unwrap_or_else(|| config.library_dir());
    let source = FileSource::new(root);
    let voices = CpalBuzzers::new(config.voices(), config.amplitude())?;
    let mut options = config.player_options();
    options.start_tempo = tempo;
    options.start_transpose = transpose;

    let mut player = Player::new(voices, source, tracks, TerminalDisplay::default(), LogFacade, options);
    let keys = spawn_key_reader();
    let clock = Instant::now();
    let now = || clock.elapsed().as_millis() as u64;

    println!("{}", HELP);
    player.start(now());
    if !player.open_playable(now()) {
        warn!("nothing in the playlist could be opened");
        return Ok(());
    }
    if start > 0 {
        if let Err(e) = player.seek_to(start, now()) {
            warn!("{}", e);
        }
    }

    loop {
        match keys.try_recv() {
            Ok(Input::Quit) => break,
            Ok(Input::Command(command)) => {
                if let Err(e) = player.handle(command, now()) {
                    warn!("{}", e);
                }
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
        }

        let was_playing = player.mode() != PlayerMode::Menu;
        if let Err(e) = player.tick(now()) {
            warn!("{}", e);
        }

        // Move through the playlist on its own when a song finishes, skipping
        // files that cannot be opened.
        if was_playing && player.mode() == PlayerMode::Menu {
            if player.selected() + 1 >= player.tracks().len() {
                break;
            }
            player.handle(Command::SelectNext, now())?;
            if !player.open_playable(now()) {
                break;
            }
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    let dropped = player.scheduler().voices().dropped_commands();
    if dropped > 0 {
        warn!("{} tone commands were dropped", dropped);
    }
    println!();
    Ok(())
}

fn render(config: &PlayerConfig, input: &Path, wav: &Path, tempo: f64, transpose: i32) -> Result<(), PlayerError> {
    let mut source = FileSource::new(".");
    source.open(&input.to_string_lossy())?;

    let mut options = RenderOptions::from_config(config);
    options.tempo = tempo;
    options.transpose = transpose;

    println!("Rendering {} to {} at {} Hz...", input.display(), wav.display(), options.sample_rate);
    let frames = render_to_wav(&mut source, &options, wav)?;
    println!(
        "Wrote {} frames ({:.1}s)",
        frames,
        frames as f64 / options.sample_rate as f64
    );
    if source.skipped_lines() > 0 {
        println!("Skipped {} malformed lines", source.skipped_lines());
    }
    Ok(())
}

fn convert(
    config: &PlayerConfig,
    input: &Path,
    output: Option<PathBuf>,
    voices: Option<usize>,
) -> Result<(), PlayerError> {
    if !input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
    {
        warn!("{} does not have a .mid extension; converting anyway", input.display());
    }

    let data = fs::read(input)?;
    let options = ImportOptions {
        voices: voices.unwrap_or_else(|| config.voices()),
        ..ImportOptions::default()
    };
    let notes = import_midi(&data, &options)?;

    let output = output.unwrap_or_else(|| input.with_extension("csv"));
    write_notes(BufWriter::new(File::create(&output)?), &notes)?;
    info!("{} notes on {} voices", notes.len(), options.voices);
    println!("Conversion complete; notes saved to {}", output.display());
    Ok(())
}

fn show_info(config: &PlayerConfig, input: &Path) -> Result<(), PlayerError> {
    let mut source = FileSource::new(".");
    source.open(&input.to_string_lossy())?;
    let mut summary = summarize(&mut source, config.voices());
    summary.skipped_lines = source.skipped_lines();

    println!("File:      {}", input.display());
    print!("{}", summary);
    Ok(())
}
