//! Player event log.
//!
//! Events are short human-readable lines ("Paused", "Forward 5s") stamped
//! with the control loop's clock. They are an observability side channel;
//! nothing reads them back to make decisions.

use std::collections::VecDeque;

use log::info;

/// Number of records a [`MemoryLog`] keeps before overwriting the oldest.
pub const LOG_MAX_ENTRIES: usize = 1000;

/// Width of one formatted record, including the trailing newline.
pub const LOG_RECORD_SIZE: usize = 64;

/// Sink for player events.
pub trait EventLog {
    fn record(&mut self, now_ms: u64, message: &str);
}

impl<L: EventLog + ?Sized> EventLog for &mut L {
    fn record(&mut self, now_ms: u64, message: &str) {
        (**self).record(now_ms, message)
    }
}

/// Format one fixed-width record: zero-padded timestamp, a space, the
/// message, space padding and a newline, `LOG_RECORD_SIZE` bytes in all.
///
/// Over-long messages are cut on a character boundary.
pub fn format_record(now_ms: u64, message: &str) -> String {
    let mut line = format!("{:010} ", now_ms);
    for ch in message.chars() {
        if line.len() + ch.len_utf8() > LOG_RECORD_SIZE - 1 {
            break;
        }
        line.push(ch);
    }
    while line.len() < LOG_RECORD_SIZE - 1 {
        line.push(' ');
    }
    line.push('\n');
    line
}

/// Forwards events to the `log` facade under the `event` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogFacade;

impl EventLog for LogFacade {
    fn record(&mut self, now_ms: u64, message: &str) {
        info!(target: "event", "{:010} {}", now_ms, message);
    }
}

/// Bounded in-memory ring of formatted records.
#[derive(Clone, Debug)]
pub struct MemoryLog {
    records: VecDeque<String>,
    capacity: usize,
    written: u64,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::with_capacity(LOG_MAX_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            written: 0,
        }
    }

    /// Total records ever written, including overwritten ones.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Formatted records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(String::as_str)
    }

    /// Messages without their timestamp and padding, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .map(|r| r.get(11..).unwrap_or("").trim_end())
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for MemoryLog {
    fn record(&mut self, now_ms: u64, message: &str) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(format_record(now_ms, message));
        self.written += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_fixed_width() {
        let line = format_record(1234, "Paused");
        assert_eq!(line.len(), LOG_RECORD_SIZE);
        assert!(line.starts_with("0000001234 Paused   "));
        assert!(line.ends_with(" \n"));
    }

    #[test]
    fn long_messages_are_truncated() {
        let line = format_record(0, &"x".repeat(200));
        assert_eq!(line.len(), LOG_RECORD_SIZE);
        assert!(line.ends_with("x\n"));

        let wide = format_record(0, &"é".repeat(100));
        assert!(wide.len() <= LOG_RECORD_SIZE);
        assert!(wide.ends_with('\n'));
    }

    #[test]
    fn ring_overwrites_oldest() {
        let mut log = MemoryLog::with_capacity(3);
        for i in 0..5 {
            log.record(i, &format!("event {}", i));
        }
        assert_eq!(log.written(), 5);
        assert_eq!(log.messages().collect::<Vec<_>>(), ["event 2", "event 3", "event 4"]);
        assert!(log.records().all(|r| r.len() == LOG_RECORD_SIZE));
    }

    #[test]
    fn default_capacity_is_a_thousand_records() {
        let mut log = MemoryLog::new();
        for i in 0..1500 {
            log.record(i, "tick");
        }
        assert_eq!(log.records().count(), LOG_MAX_ENTRIES);
        assert!(log.records().next().unwrap().starts_with("0000000500"));
    }
}
