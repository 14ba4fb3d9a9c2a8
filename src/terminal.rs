//! Terminal front end: a status line on stdout and single-key commands on stdin.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use tp_master::{status_line, Command, PlaybackStatus, StatusDisplay, TrackList};

/// Key bindings, printed at startup.
pub const HELP: &str = "\
keys (then Enter): n/b = next/previous file, o = open
                   p = play/pause, s = stop, x/z = forward/rewind
                   w/q = tempo +/-, ]/[ = transpose +/-, Q = quit";

/// What a line of keyboard input asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Quit,
}

/// Map one key to an input.
pub fn input_for_key(key: char) -> Option<Input> {
    let command = match key {
        'n' => Command::SelectNext,
        'b' => Command::SelectPrevious,
        'o' => Command::Open,
        'p' => Command::TogglePause,
        's' => Command::Stop,
        'x' => Command::Forward,
        'z' => Command::Rewind,
        'w' => Command::TempoUp,
        'q' => Command::TempoDown,
        ']' => Command::TransposeUp,
        '[' => Command::TransposeDown,
        'Q' => return Some(Input::Quit),
        _ => return None,
    };
    Some(Input::Command(command))
}

/// Read stdin on a helper thread, one input per recognised key.
pub fn spawn_key_reader() -> Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            for input in line.chars().filter_map(input_for_key) {
                if tx.send(input).is_err() {
                    return;
                }
            }
        }
    });
    rx
}

/// Draws the menu as a list and playback as a rewritten status line.
#[derive(Default)]
pub struct TerminalDisplay {
    on_status_line: bool,
}

impl TerminalDisplay {
    fn end_status_line(&mut self) {
        if self.on_status_line {
            println!();
            self.on_status_line = false;
        }
    }
}

impl StatusDisplay for TerminalDisplay {
    fn show_file_list(&mut self, tracks: &TrackList, selected: usize) {
        self.end_status_line();
        println!("PLAYLIST");
        for (i, name) in tracks.iter().enumerate() {
            let marker = if i == selected { '>' } else { ' ' };
            println!(" {} {}", marker, name);
        }
    }

    fn show_playback(&mut self, status: &PlaybackStatus) {
        print!("\r{:<60}", status_line(status));
        let _ = io::stdout().flush();
        self.on_status_line = true;
    }

    fn show_loading(&mut self) {
        self.end_status_line();
        println!("Loading...");
    }

    fn show_error(&mut self, message: &str) {
        self.end_status_line();
        println!("ERROR: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(input_for_key('p'), Some(Input::Command(Command::TogglePause)));
        assert_eq!(input_for_key('z'), Some(Input::Command(Command::Rewind)));
        assert_eq!(input_for_key(']'), Some(Input::Command(Command::TransposeUp)));
        assert_eq!(input_for_key('Q'), Some(Input::Quit));
        assert_eq!(input_for_key('?'), None);
    }
}
