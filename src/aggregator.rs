use indicatif::ProgressBar;
use log::debug;

use crate::library::{Genre, GenreNode};
use crate::taxonomy::{Children, Taxonomy, DIRECT_ID_FACTOR, ROOT_ID};
use crate::track_index::TrackIndex;

/// Walks the taxonomy bottom-up, summing track counts and tempos per genre.
pub struct GenreAggregator<'a> {
    taxonomy: &'a Taxonomy,
    index: &'a TrackIndex,
    progress: &'a ProgressBar,
}

/// A genre whose children are still being processed.
struct Frame<'a> {
    genre: &'a Genre,
    parent_id: u32,
    pending: Children<'a>,
    children: Vec<GenreNode>,
}

impl<'a> GenreAggregator<'a> {
    pub fn new(taxonomy: &'a Taxonomy, index: &'a TrackIndex, progress: &'a ProgressBar) -> Self {
        Self {
            taxonomy,
            index,
            progress,
        }
    }

    /// Builds the `all_genres` tree over every top-level genre.
    pub fn aggregate(&self) -> GenreNode {
        let children = self
            .taxonomy
            .roots()
            .filter_map(|genre| self.process_node(genre.id, ROOT_ID))
            .collect();
        GenreNode::root(children)
    }

    /// Builds the subtree of `genre_id`, or `None` when neither the genre nor
    /// any of its descendants has tracks. Genres without a path to a top-level
    /// genre (orphans, parent cycles) are `None` as well.
    pub fn process_node(&self, genre_id: u32, parent_id: u32) -> Option<GenreNode> {
        if !self.taxonomy.is_reachable(genre_id) {
            return None;
        }
        let genre = self.taxonomy.get(genre_id)?;
        let mut stack = vec![self.frame(genre, parent_id)];

        // Post-order: a frame is finished once all of its children are.
        loop {
            let next_child = match stack.last_mut() {
                Some(frame) => frame.pending.next(),
                None => return None,
            };

            if let Some(child) = next_child {
                let frame = self.frame(child, child.parent_id);
                stack.push(frame);
                continue;
            }

            let node = match stack.pop() {
                Some(frame) => self.finish(frame),
                None => return None,
            };
            match stack.last_mut() {
                Some(parent) => parent.children.extend(node),
                None => return node,
            }
        }
    }

    fn frame(&self, genre: &'a Genre, parent_id: u32) -> Frame<'a> {
        Frame {
            genre,
            parent_id,
            pending: self.taxonomy.children_of(genre.id),
            children: Vec::new(),
        }
    }

    fn finish(&self, frame: Frame<'a>) -> Option<GenreNode> {
        let Frame {
            genre,
            parent_id,
            mut children,
            ..
        } = frame;

        let (track_count, bpm_sum) = self.index.aggregate_direct(genre.id);
        debug!("genre data for {}: count={}; bpm={}", genre.name, track_count, bpm_sum);
        self.progress.inc(1);

        if track_count > 0 && !children.is_empty() {
            // Taxonomy::new rejects ids where this would overflow or collide.
            let direct_id = genre.id * DIRECT_ID_FACTOR;
            children.push(GenreNode::direct(genre, direct_id, track_count, bpm_sum));
        }

        if !children.is_empty() {
            Some(GenreNode::aggregate(genre, parent_id, children))
        } else if track_count > 0 {
            Some(GenreNode::leaf(genre, parent_id, track_count, bpm_sum))
        } else {
            None
        }
    }
}
