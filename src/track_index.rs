use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::library::Track;

lazy_static! {
    // `[]`, `[1, 2]`, `[21, ]`: non-negative integers only, trailing comma allowed.
    static ref GENRE_LIST: Regex =
        Regex::new(r"^\s*\[\s*(?:\d+\s*(?:,\s*\d+\s*)*,?\s*)?\]\s*$").unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("not a bracketed list of integers: {0:?}")]
    Malformed(String),
    #[error("genre id out of range: {0}")]
    OutOfRange(String),
}

/// Parses the textual genre list of a track, e.g. `"[21, 76, 1235]"`.
pub fn parse_genre_membership(raw: &str) -> Result<BTreeSet<u32>, ParseError> {
    if !GENRE_LIST.is_match(raw) {
        return Err(ParseError::Malformed(raw.to_string()));
    }

    let trimmed = raw.trim();
    let inner = &trimmed[1..trimmed.len() - 1];
    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u32>()
                .map_err(|_| ParseError::OutOfRange(item.to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GenreTotals {
    count: u64,
    bpm_sum: f64,
}

/// Per-genre track counts and tempo sums over every indexed track.
///
/// Totals are accumulated in insertion order, so feeding the same tracks in
/// the same order always gives bit-identical sums.
#[derive(Debug, Default)]
pub struct TrackIndex {
    track_count: usize,
    by_genre: HashMap<u32, GenreTotals>,
}

impl TrackIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track: &Track) {
        for genre_id in &track.genre_ids {
            let totals = self.by_genre.entry(*genre_id).or_default();
            totals.count += 1;
            totals.bpm_sum += track.tempo;
        }
        self.track_count += 1;
    }

    /// Number of tracks tagged with `genre_id` and the sum of their tempos.
    /// Descendant genres are not included.
    pub fn aggregate_direct(&self, genre_id: u32) -> (u64, f64) {
        self.by_genre
            .get(&genre_id)
            .map(|totals| (totals.count, totals.bpm_sum))
            .unwrap_or((0, 0.0))
    }

    pub fn len(&self) -> usize {
        self.track_count
    }

    pub fn is_empty(&self) -> bool {
        self.track_count == 0
    }

    /// Number of distinct genre ids seen across all tracks.
    pub fn genre_count(&self) -> usize {
        self.by_genre.len()
    }
}

impl<'a> FromIterator<&'a Track> for TrackIndex {
    fn from_iter<I: IntoIterator<Item = &'a Track>>(iter: I) -> Self {
        let mut index = TrackIndex::new();
        for track in iter {
            index.insert(track);
        }
        index
    }
}
