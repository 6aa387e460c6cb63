use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use thiserror::Error;

/// What to do with a track whose genre list cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Abort the run.
    #[default]
    Fail,
    /// Drop the track and keep going.
    Skip,
}

impl FromStr for ParsePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ParsePolicy::Fail),
            "skip" => Ok(ParsePolicy::Skip),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tracks_csv: PathBuf,
    pub echonest_csv: PathBuf,
    pub genres_csv: PathBuf,
    pub output_path: PathBuf,
    pub log_level: LevelFilter,
    pub show_progress: bool,
    pub pretty_json: bool,
    pub parse_policy: ParsePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, default: &str| {
            PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
        };

        Ok(Self {
            tracks_csv: path("TRACKS_CSV", "data/tracks.csv"),
            echonest_csv: path("ECHONEST_CSV", "data/echonest.csv"),
            genres_csv: path("GENRES_CSV", "data/genres.csv"),
            output_path: path("OUTPUT_PATH", "genre_data.json"),
            log_level: parse_var(&lookup, "LOG_LEVEL", LevelFilter::Info, |v| v.parse().ok())?,
            show_progress: parse_var(&lookup, "SHOW_PROGRESS", true, parse_bool)?,
            pretty_json: parse_var(&lookup, "PRETTY_JSON", false, parse_bool)?,
            parse_policy: parse_var(&lookup, "GENRE_PARSE_POLICY", ParsePolicy::Fail, |v| {
                v.parse().ok()
            })?,
        })
    }
}

fn parse_var<F, T, P>(lookup: &F, key: &'static str, default: T, parse: P) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => parse(&value).ok_or(ConfigError::Invalid { key, value }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
