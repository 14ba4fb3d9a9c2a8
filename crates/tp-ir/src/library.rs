//! Bounded list of playable note files.

use arrayvec::{ArrayString, ArrayVec};

/// Maximum number of note files offered for selection.
pub const MAX_FILES: usize = 12;

/// Maximum stored file-name length in bytes, including room for a
/// terminator. Longer names are truncated to one less.
pub const MAX_FILE_NAME_LEN: usize = 32;

/// A stored (possibly truncated) file name.
pub type TrackName = ArrayString<MAX_FILE_NAME_LEN>;

/// The files available for playback, in listing order.
///
/// Entries past `MAX_FILES` are dropped and names are cut to
/// `MAX_FILE_NAME_LEN - 1` bytes on a character boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackList {
    names: ArrayVec<TrackName, MAX_FILES>,
}

impl TrackList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            names: ArrayVec::new(),
        }
    }

    /// Append a name. Returns false if the list is full.
    pub fn push(&mut self, name: &str) -> bool {
        if self.names.is_full() {
            return false;
        }
        let mut stored = TrackName::new();
        for ch in name.chars() {
            if stored.len() + ch.len_utf8() > MAX_FILE_NAME_LEN - 1 {
                break;
            }
            stored.push(ch);
        }
        self.names.push(stored);
        true
    }

    /// Number of stored names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no files are available.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|n| n.as_str())
    }

    /// Iterate over the stored names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_str())
    }
}

impl<'a> FromIterator<&'a str> for TrackList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut list = TrackList::new();
        for name in iter {
            if !list.push(name) {
                break;
            }
        }
        list
    }
}
