use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::library::Genre;

/// Parent id of top-level genres.
pub const ROOT_ID: u32 = 0;

/// Direct-data nodes are numbered `genre_id * DIRECT_ID_FACTOR`.
pub const DIRECT_ID_FACTOR: u32 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("genre {name:?} uses the reserved id 0")]
    ReservedId { name: String },
    #[error("genre id {0} appears more than once")]
    DuplicateId(u32),
    #[error("genre id {0} is too large to number its direct-data node")]
    DirectIdOverflow(u32),
    #[error("direct-data node of genre {genre_id} would reuse the id of genre {colliding_id}")]
    DirectIdCollision { genre_id: u32, colliding_id: u32 },
}

/// Genre rows with child lookups.
///
/// Rows are stably sorted by parent id, so siblings keep the order they had
/// in the source table.
#[derive(Debug)]
pub struct Taxonomy {
    genres: Vec<Genre>,
    by_id: HashMap<u32, usize>,
    children: HashMap<u32, Vec<usize>>,
    reachable: HashSet<u32>,
}

impl Taxonomy {
    pub fn new(mut genres: Vec<Genre>) -> Result<Self, TaxonomyError> {
        genres.sort_by_key(|genre| genre.parent_id);

        let mut by_id = HashMap::with_capacity(genres.len());
        for (position, genre) in genres.iter().enumerate() {
            if genre.id == ROOT_ID {
                return Err(TaxonomyError::ReservedId {
                    name: genre.name.clone(),
                });
            }
            if by_id.insert(genre.id, position).is_some() {
                return Err(TaxonomyError::DuplicateId(genre.id));
            }
        }

        for genre in &genres {
            let direct_id = direct_node_id(genre.id)
                .ok_or(TaxonomyError::DirectIdOverflow(genre.id))?;
            if by_id.contains_key(&direct_id) {
                return Err(TaxonomyError::DirectIdCollision {
                    genre_id: genre.id,
                    colliding_id: direct_id,
                });
            }
        }

        let mut children: HashMap<u32, Vec<usize>> = HashMap::new();
        for (position, genre) in genres.iter().enumerate() {
            children.entry(genre.parent_id).or_default().push(position);
        }

        let mut taxonomy = Self {
            genres,
            by_id,
            children,
            reachable: HashSet::new(),
        };
        taxonomy.reachable = taxonomy.collect_reachable();
        Ok(taxonomy)
    }

    // Everything below the virtual root. A genre on a parent cycle never has
    // a path to the root, so walking down from here always terminates.
    fn collect_reachable(&self) -> HashSet<u32> {
        let mut reached = HashSet::with_capacity(self.genres.len());
        let mut pending = vec![ROOT_ID];
        while let Some(id) = pending.pop() {
            for child in self.children_of(id) {
                if reached.insert(child.id) {
                    pending.push(child.id);
                }
            }
        }
        reached
    }

    pub fn get(&self, id: u32) -> Option<&Genre> {
        self.by_id.get(&id).map(|&position| &self.genres[position])
    }

    pub fn children_of(&self, id: u32) -> Children<'_> {
        let positions = self.children.get(&id).map(Vec::as_slice).unwrap_or_default();
        Children {
            genres: &self.genres,
            positions: positions.iter(),
        }
    }

    pub fn roots(&self) -> Children<'_> {
        self.children_of(ROOT_ID)
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    /// Whether the genre hangs below a top-level genre.
    pub fn is_reachable(&self, id: u32) -> bool {
        self.reachable.contains(&id)
    }

    /// Genres that cannot be reached from the root, either because their
    /// parent does not exist or because they sit on a parent cycle.
    pub fn unreachable(&self) -> Vec<&Genre> {
        self.genres
            .iter()
            .filter(|genre| !self.is_reachable(genre.id))
            .collect()
    }
}

/// Child genres of one parent, in row order.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    genres: &'a [Genre],
    positions: std::slice::Iter<'a, usize>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a Genre;

    fn next(&mut self) -> Option<Self::Item> {
        self.positions.next().map(|&position| &self.genres[position])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.positions.size_hint()
    }
}

pub fn direct_node_id(genre_id: u32) -> Option<u32> {
    genre_id.checked_mul(DIRECT_ID_FACTOR)
}
