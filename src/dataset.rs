use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::config::ParsePolicy;
use crate::library::{Genre, Track};
use crate::track_index::{parse_genre_membership, ParseError, TrackIndex};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: expected {expected} header rows", path.display())]
    MissingHeader { path: PathBuf, expected: usize },
    #[error("{}: no column {column}", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{}, line {line}: invalid track id {value:?}", path.display())]
    InvalidTrackId { path: PathBuf, line: u64, value: String },
    #[error("track {track_id}: invalid tempo {value:?}")]
    InvalidTempo { track_id: u64, value: String },
    #[error("track {track_id}: {source}")]
    GenreList {
        track_id: u64,
        #[source]
        source: ParseError,
    },
}

/// Locates one column in a CSV file with stacked header rows.
///
/// The FMA files spell every header level out on its own row, followed by a
/// row holding only the index name (`track_id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub path: Vec<String>,
}

impl ColumnSpec {
    pub fn new(path: &[&str]) -> Self {
        Self {
            path: path.iter().map(|level| level.to_string()).collect(),
        }
    }

    /// `tracks.csv`: the genre ids of each track.
    pub fn track_genres() -> Self {
        Self::new(&["track", "genres"])
    }

    /// `echonest.csv`: the tempo of each track.
    pub fn echonest_tempo() -> Self {
        Self::new(&["echonest", "audio_features", "tempo"])
    }

    fn header_rows(&self) -> usize {
        self.path.len()
    }

    fn position(&self, headers: &[StringRecord]) -> Option<usize> {
        let width = headers.iter().map(StringRecord::len).min()?;
        (1..width).find(|&column| {
            headers
                .iter()
                .zip(&self.path)
                .all(|(row, level)| row.get(column).map(str::trim) == Some(level.as_str()))
        })
    }
}

/// Reads the non-empty values of one column, keyed by track id.
pub fn read_column(
    path: &Path,
    column: &ColumnSpec,
) -> Result<BTreeMap<u64, String>, DatasetError> {
    let csv_error = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let mut records = reader.records();
    let mut headers = Vec::with_capacity(column.header_rows());
    for _ in 0..column.header_rows() {
        match records.next() {
            Some(record) => headers.push(record.map_err(csv_error)?),
            None => {
                return Err(DatasetError::MissingHeader {
                    path: path.to_path_buf(),
                    expected: column.header_rows(),
                })
            }
        }
    }
    let position = column
        .position(&headers)
        .ok_or_else(|| DatasetError::MissingColumn {
            path: path.to_path_buf(),
            column: column.path.join("/"),
        })?;

    let mut values = BTreeMap::new();
    let mut first_row = true;
    for record in records {
        let record = record.map_err(csv_error)?;
        if std::mem::take(&mut first_row) && is_index_name_row(&record) {
            continue;
        }

        let raw_id = record.get(0).unwrap_or_default().trim();
        let track_id = raw_id
            .parse::<u64>()
            .map_err(|_| DatasetError::InvalidTrackId {
                path: path.to_path_buf(),
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                value: raw_id.to_string(),
            })?;

        match record.get(position).map(str::trim) {
            Some(value) if !value.is_empty() => {
                values.insert(track_id, value.to_string());
            }
            _ => debug!("track {} has no {}", track_id, column.path.join("/")),
        }
    }

    Ok(values)
}

fn is_index_name_row(record: &StringRecord) -> bool {
    record.iter().skip(1).all(|field| field.trim().is_empty())
        && record.get(0).is_some_and(|name| name.trim().parse::<u64>().is_err())
}

pub fn load_tempos(path: &Path, column: &ColumnSpec) -> Result<BTreeMap<u64, f64>, DatasetError> {
    read_column(path, column)?
        .into_iter()
        .map(|(track_id, raw)| match raw.parse::<f64>() {
            Ok(tempo) if tempo.is_finite() && tempo >= 0.0 => Ok((track_id, tempo)),
            _ => Err(DatasetError::InvalidTempo {
                track_id,
                value: raw,
            }),
        })
        .collect()
}

pub fn load_genre_lists(
    path: &Path,
    column: &ColumnSpec,
) -> Result<BTreeMap<u64, String>, DatasetError> {
    read_column(path, column)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinStats {
    pub indexed: usize,
    pub missing_tempo: usize,
    pub missing_genres: usize,
    pub skipped_unparsable: usize,
}

/// Joins tempos and genre lists on track id. Tracks missing either value are
/// left out; tracks are indexed in ascending id order.
pub fn build_track_index(
    tempos: &BTreeMap<u64, f64>,
    genre_lists: &BTreeMap<u64, String>,
    policy: ParsePolicy,
) -> Result<(TrackIndex, JoinStats), DatasetError> {
    let mut index = TrackIndex::new();
    let mut stats = JoinStats {
        missing_genres: tempos.keys().filter(|id| !genre_lists.contains_key(id)).count(),
        ..JoinStats::default()
    };

    for (&track_id, raw) in genre_lists {
        let Some(&tempo) = tempos.get(&track_id) else {
            stats.missing_tempo += 1;
            continue;
        };

        let genre_ids = match parse_genre_membership(raw) {
            Ok(genre_ids) => genre_ids,
            Err(source) if policy == ParsePolicy::Skip => {
                warn!("Skipping track {}: {}", track_id, source);
                stats.skipped_unparsable += 1;
                continue;
            }
            Err(source) => return Err(DatasetError::GenreList { track_id, source }),
        };

        index.insert(&Track {
            tempo,
            genre_ids,
        });
        stats.indexed += 1;
    }

    info!(
        "Indexed {} tracks ({} without tempo, {} without genres, {} unparsable)",
        stats.indexed, stats.missing_tempo, stats.missing_genres, stats.skipped_unparsable
    );
    Ok((index, stats))
}

#[derive(Debug, Deserialize)]
struct GenreRecord {
    genre_id: u32,
    parent: u32,
    title: String,
}

/// Reads `genres.csv` in row order.
pub fn load_genres(path: &Path) -> Result<Vec<Genre>, DatasetError> {
    let csv_error = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    reader
        .deserialize::<GenreRecord>()
        .map(|record| {
            record.map_err(csv_error).map(|record| Genre {
                id: record.genre_id,
                name: record.title,
                parent_id: record.parent,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {

    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TRACKS_CSV: &str = "\
,album,track,track
,title,genres,title
track_id,,,
2,AWOL,[21],Food
3,AWOL,\"[21, 76]\",Electric Ave
5,AWOL,,This World
10,Constant Hitmaker,[10],Freeway
20,Niris,\"[76, 103]\",Spiritual Level
";

    const ECHONEST_CSV: &str = "\
,echonest,echonest,echonest
,audio_features,audio_features,metadata
,danceability,tempo,album_date
track_id,,,
2,0.67,165.922,
3,0.57,126.957,
5,0.26,100.26,
10,0.65,111.562,
";

    const GENRES_CSV: &str = "\
genre_id,#tracks,parent,title,top_level
1,8693,38,Avant-Garde,38
2,5271,0,International,2
3,1752,0,Blues,3
21,2735,3,Hip-Hop,21
";

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reads_a_column_below_stacked_headers() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "tracks.csv", TRACKS_CSV);

        let genres = read_column(&path, &ColumnSpec::track_genres()).unwrap();
        assert_eq!(
            genres.into_iter().collect::<Vec<_>>(),
            vec![
                (2, "[21]".to_string()),
                (3, "[21, 76]".to_string()),
                (10, "[10]".to_string()),
                (20, "[76, 103]".to_string()),
            ]
        );
    }

    #[test]
    fn loads_tempos() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "echonest.csv", ECHONEST_CSV);

        let tempos = load_tempos(&path, &ColumnSpec::echonest_tempo()).unwrap();
        assert_eq!(tempos.len(), 4);
        assert_eq!(tempos[&2], 165.922);
        assert_eq!(tempos[&10], 111.562);
    }

    #[test]
    fn missing_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "tracks.csv", TRACKS_CSV);

        let err = read_column(&path, &ColumnSpec::new(&["track", "tempo"])).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }));
        let err = read_column(&path, &ColumnSpec::echonest_tempo()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }));
    }

    #[test]
    fn bad_values_are_errors() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad_id.csv", ",track\n,genres\ntrack_id,\n7,[1]\nabc,[2]\n");
        let err = read_column(&path, &ColumnSpec::track_genres()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InvalidTrackId { line: 5, ref value, .. } if value == "abc"
        ));

        let path = write(&dir, "bad_tempo.csv", ",a\n,b\n,tempo\ntrack_id,\n7,fast\n");
        let err = load_tempos(&path, &ColumnSpec::new(&["a", "b", "tempo"])).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidTempo { track_id: 7, .. }));
    }

    #[test]
    fn joins_tracks_with_both_fields() {
        let tempos = BTreeMap::from([(2, 160.0), (3, 120.0), (5, 100.0), (10, 110.0)]);
        let genre_lists = BTreeMap::from([
            (2, "[21]".to_string()),
            (3, "[21, 76]".to_string()),
            (10, "[]".to_string()),
            (20, "[76]".to_string()),
        ]);

        let (index, stats) = build_track_index(&tempos, &genre_lists, ParsePolicy::Fail).unwrap();
        assert_eq!(
            stats,
            JoinStats {
                indexed: 3,
                missing_tempo: 1,
                missing_genres: 1,
                skipped_unparsable: 0,
            }
        );
        assert_eq!(index.len(), 3);
        assert_eq!(index.aggregate_direct(21), (2, 280.0));
        assert_eq!(index.aggregate_direct(76), (1, 120.0));
    }

    #[test]
    fn unparsable_genre_list_fails_or_skips_by_policy() {
        let tempos = BTreeMap::from([(1, 90.0), (2, 100.0)]);
        let genre_lists = BTreeMap::from([(1, "[4]".to_string()), (2, "4; 5".to_string())]);

        let err = build_track_index(&tempos, &genre_lists, ParsePolicy::Fail).unwrap_err();
        assert!(matches!(err, DatasetError::GenreList { track_id: 2, .. }));

        let (index, stats) = build_track_index(&tempos, &genre_lists, ParsePolicy::Skip).unwrap();
        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.skipped_unparsable, 1);
        assert_eq!(index.aggregate_direct(4), (1, 90.0));
        assert_eq!(index.aggregate_direct(5), (0, 0.0));
    }

    #[test]
    fn loads_genres_in_row_order() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "genres.csv", GENRES_CSV);

        let genres = load_genres(&path).unwrap();
        assert_eq!(genres.len(), 4);
        assert_eq!(
            genres[0],
            Genre {
                id: 1,
                name: "Avant-Garde".to_string(),
                parent_id: 38
            }
        );
        assert_eq!(
            genres.iter().map(|g| g.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 21]
        );
    }

    #[test]
    fn unreadable_genres_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_genres(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::Csv { .. }));

        let path = write(&dir, "genres.csv", "genre_id,parent,title\nx,0,Rock\n");
        assert!(load_genres(&path).is_err());
    }
}
