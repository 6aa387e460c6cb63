use anyhow::Context;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{info, warn};

use aggregator::GenreAggregator;
use config::Config;
use dataset::ColumnSpec;
use taxonomy::Taxonomy;

mod aggregator;
mod config;
mod dataset;
mod export;
mod library;
mod logger;
mod taxonomy;
mod track_index;

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    let progress = if config.show_progress {
        MultiProgress::new()
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    };
    logger::init(config.log_level, progress.clone())?;

    let tempos = dataset::load_tempos(&config.echonest_csv, &ColumnSpec::echonest_tempo())
        .context("loading tempos")?;
    let genre_lists = dataset::load_genre_lists(&config.tracks_csv, &ColumnSpec::track_genres())
        .context("loading track genres")?;
    let (index, _) = dataset::build_track_index(&tempos, &genre_lists, config.parse_policy)
        .context("indexing tracks")?;
    if index.is_empty() {
        warn!("No track has both a tempo and a genre list");
    }
    info!("{} tracks use {} distinct genres", index.len(), index.genre_count());

    let genres = dataset::load_genres(&config.genres_csv).context("loading genres")?;
    let taxonomy = Taxonomy::new(genres).context("building genre taxonomy")?;
    if taxonomy.is_empty() {
        warn!("{} holds no genres", config.genres_csv.display());
    }
    let unreachable = taxonomy.unreachable();
    for genre in &unreachable {
        warn!(
            "Genre {} ({}) has no path to a top-level genre, leaving it out",
            genre.id, genre.name
        );
    }

    let bar = progress.add(ProgressBar::new((taxonomy.len() - unreachable.len()) as u64));
    bar.set_style(ProgressStyle::with_template(
        "[{percent}%] {pos}/{len} genres {wide_bar} ({eta})",
    )?);
    let root = GenreAggregator::new(&taxonomy, &index, &bar).aggregate();
    bar.finish_and_clear();

    info!("tracks = {}", root.track_count_agg);
    info!("bpm = {}", root.bpm_sum_agg);

    export::write_tree(&root, &config.output_path, config.pretty_json)
        .context("saving genre tree")?;
    info!("Genre tree written to {}", config.output_path.display());
    Ok(())
}
