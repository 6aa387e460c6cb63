use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// A track that has both a tempo and a genre list.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub tempo: f64,
    pub genre_ids: BTreeSet<u32>,
}

/// One row of the genre taxonomy. `parent_id == 0` marks a top-level genre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
    pub parent_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The synthetic `all_genres` root.
    Root,
    /// A genre from the taxonomy.
    Genre,
    /// Tracks tagged with a parent genre directly, shown next to its sub-genres.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreNode {
    pub name: String,
    pub id: u32,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u32>,
    pub kind: NodeKind,
    pub children: Vec<GenreNode>,
    pub track_count: u64,
    pub track_count_agg: u64,
    pub bpm_sum: f64,
    pub bpm_sum_agg: f64,
}

impl GenreNode {
    pub const ROOT_NAME: &'static str = "all_genres";

    pub fn leaf(genre: &Genre, parent_id: u32, track_count: u64, bpm_sum: f64) -> Self {
        Self {
            name: genre.name.clone(),
            id: genre.id,
            parent_id: Some(parent_id),
            kind: NodeKind::Genre,
            children: Vec::new(),
            track_count,
            track_count_agg: track_count,
            bpm_sum,
            bpm_sum_agg: bpm_sum,
        }
    }

    pub fn direct(genre: &Genre, id: u32, track_count: u64, bpm_sum: f64) -> Self {
        Self {
            name: genre.name.clone(),
            id,
            parent_id: Some(genre.id),
            kind: NodeKind::Direct,
            children: Vec::new(),
            track_count,
            track_count_agg: track_count,
            bpm_sum,
            bpm_sum_agg: bpm_sum,
        }
    }

    /// Only carries the sums of its children; its own direct tracks, if any,
    /// are expected to be among them as a `Direct` node.
    pub fn aggregate(genre: &Genre, parent_id: u32, children: Vec<GenreNode>) -> Self {
        let (track_count_agg, bpm_sum_agg) = sum_children(&children);
        Self {
            name: genre.name.clone(),
            id: genre.id,
            parent_id: Some(parent_id),
            kind: NodeKind::Genre,
            children,
            track_count: 0,
            track_count_agg,
            bpm_sum: 0.0,
            bpm_sum_agg,
        }
    }

    pub fn root(children: Vec<GenreNode>) -> Self {
        let (track_count_agg, bpm_sum_agg) = sum_children(&children);
        Self {
            name: Self::ROOT_NAME.to_string(),
            id: 0,
            parent_id: None,
            kind: NodeKind::Root,
            children,
            track_count: 0,
            track_count_agg,
            bpm_sum: 0.0,
            bpm_sum_agg,
        }
    }
}

fn sum_children(children: &[GenreNode]) -> (u64, f64) {
    children.iter().fold((0, 0.0), |(count, bpm), child| {
        (count + child.track_count_agg, bpm + child.bpm_sum_agg)
    })
}
