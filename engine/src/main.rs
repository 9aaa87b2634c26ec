use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use championship::{parse_race_results, PointsTable, SeasonConfig};
use titlefight_engine::importer::ImportOptions;
use titlefight_engine::races::SeasonSheet;
use titlefight_engine::stats::StatsOutcome;
use titlefight_engine::store::{
    ChampionshipRepository, Database, PositionRepository, StatsRepository,
};
use titlefight_engine::{config, importer, stats};

/// Hard ceiling on round numbers accepted by `add-race`.
const MAX_ROUND: u32 = 24;

/// Batch engine for exhaustive championship scenarios.
#[derive(Parser)]
#[command(name = "titlefight-engine", about = "Exhaustive F1 championship scenario engine")]
struct Cli {
    /// Data directory override; defaults to TITLEFIGHT_DATA_DIR or
    /// ~/.config/titlefight/data.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate, score, and persist every race subset of a season.
    Process {
        /// Season year, e.g. 2025.
        #[arg(long)]
        season: i64,

        /// Championship rows per write batch.
        #[arg(long, default_value_t = importer::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Recompute the derived statistics for a season.
    Stats {
        #[arg(long)]
        season: i64,
    },

    /// Record one race's results and rebuild the season from scratch.
    AddRace {
        #[arg(long)]
        season: i64,

        /// Round number (1-based).
        #[arg(long)]
        race: u32,

        /// Race results as "DRIVER:POINTS,..." e.g. "VER:25,NOR:18,LEC:15".
        #[arg(long)]
        results: String,

        /// Update the CSV only; skip the clear/reprocess/stats cycle.
        #[arg(long)]
        skip_reprocess: bool,
    },

    /// Merge a whole CSV of races into a season and rebuild it.
    ImportRaces {
        #[arg(long)]
        season: i64,

        /// CSV in the standard `Driver,1,2,...` format.
        #[arg(long)]
        csv: PathBuf,

        #[arg(long)]
        skip_reprocess: bool,
    },

    /// Delete every persisted row for a season.
    ClearSeason {
        #[arg(long)]
        season: i64,

        /// Required; there is no undo.
        #[arg(long)]
        confirm: bool,
    },

    /// Report data and statistics state per season.
    Status {
        /// Restrict to one season; default is every configured season.
        #[arg(long)]
        season: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(config::data_dir);

    match cli.command {
        Commands::Process { season, batch_size } => {
            handle_process(&data_dir, season, batch_size).await
        }
        Commands::Stats { season } => handle_stats(&data_dir, season).await,
        Commands::AddRace {
            season,
            race,
            results,
            skip_reprocess,
        } => handle_add_race(&data_dir, season, race, &results, skip_reprocess).await,
        Commands::ImportRaces {
            season,
            csv,
            skip_reprocess,
        } => handle_import_races(&data_dir, season, &csv, skip_reprocess).await,
        Commands::ClearSeason { season, confirm } => {
            handle_clear_season(&data_dir, season, confirm).await
        }
        Commands::Status { season } => handle_status(&data_dir, season).await,
    }
}

async fn open_database(data_dir: &Path) -> anyhow::Result<Database> {
    let path = config::database_path(data_dir);
    Database::open(&path)
        .await
        .with_context(|| format!("opening database at {}", path.display()))
}

async fn handle_process(data_dir: &Path, season: i64, batch_size: usize) -> anyhow::Result<()> {
    let csv = config::resolve_season_csv(data_dir, season).with_context(|| {
        format!(
            "no points CSV for season {season} in {}; run add-race or import-races first",
            data_dir.display()
        )
    })?;

    let table = PointsTable::load(&csv)?;
    tracing::info!(csv = %csv.display(), drivers = table.num_drivers(), races = table.num_races(), "loaded points table");

    let db = open_database(data_dir).await?;
    let options = ImportOptions::new(season).with_batch_size(batch_size);
    let summary = importer::process_table(&db, &table, &options)
        .await
        .context("bulk import failed; clear the season and re-run")?;

    println!(
        "Processed {} combinations for season {season} (last championship id {}).",
        summary.combinations, summary.last_championship_id
    );
    Ok(())
}

async fn handle_stats(data_dir: &Path, season: i64) -> anyhow::Result<()> {
    let db = open_database(data_dir).await?;
    match stats::compute_season_stats(&db, season).await? {
        StatsOutcome::Computed { drivers } => {
            println!("Computed statistics for {drivers} drivers in season {season}.");
        }
        StatsOutcome::NoData => {
            println!("No championship data for season {season}; nothing computed.");
        }
    }
    Ok(())
}

async fn handle_add_race(
    data_dir: &Path,
    season: i64,
    race: u32,
    results: &str,
    skip_reprocess: bool,
) -> anyhow::Result<()> {
    if !(1..=MAX_ROUND).contains(&race) {
        bail!("invalid race number {race}: must be 1-{MAX_ROUND}");
    }

    let results = parse_race_results(results)?;
    if results.is_empty() {
        bail!("no race results provided");
    }

    let config_path = config::season_config_path(data_dir, season);
    let season_config = SeasonConfig::load(&config_path)
        .with_context(|| format!("create {} first", config_path.display()))?;

    let csv_path = config::season_csv_path(data_dir, season);
    let mut sheet = SeasonSheet::load(&csv_path)?;
    if sheet.is_empty() {
        sheet = SeasonSheet::with_roster(&season_config.driver_codes());
        tracing::info!(season, drivers = sheet.drivers().len(), "starting new season sheet");
    }

    sheet.apply_race(race, &results);
    sheet
        .save(&csv_path)
        .with_context(|| format!("writing {}", csv_path.display()))?;
    println!("Recorded race {race} for season {season} in {}.", csv_path.display());

    if skip_reprocess {
        println!("Skipping reprocess as requested.");
        return Ok(());
    }

    rebuild_season(data_dir, season).await
}

async fn handle_import_races(
    data_dir: &Path,
    season: i64,
    csv: &Path,
    skip_reprocess: bool,
) -> anyhow::Result<()> {
    let config_path = config::season_config_path(data_dir, season);
    let season_config = SeasonConfig::load(&config_path)
        .with_context(|| format!("create {} first", config_path.display()))?;

    let update = PointsTable::load(csv)?;
    println!(
        "Importing {} races for {} drivers into season {season}.",
        update.num_races(),
        update.num_drivers()
    );

    let csv_path = config::season_csv_path(data_dir, season);
    let mut sheet = SeasonSheet::load(&csv_path)?;
    if sheet.is_empty() {
        sheet = SeasonSheet::with_roster(&season_config.driver_codes());
    }

    sheet.merge_table(&update);
    if sheet.max_round() == 0 {
        bail!("no race data found in {}", csv.display());
    }

    sheet
        .save(&csv_path)
        .with_context(|| format!("writing {}", csv_path.display()))?;

    if skip_reprocess {
        println!("CSV imported. Skipping reprocess as requested.");
        return Ok(());
    }

    rebuild_season(data_dir, season).await
}

/// Clear, reprocess, and recompute one season end to end.
async fn rebuild_season(data_dir: &Path, season: i64) -> anyhow::Result<()> {
    let db = open_database(data_dir).await?;

    let removed = clear_season_data(&db, season).await?;
    tracing::info!(season, removed, "cleared previous season data");

    let csv = config::resolve_season_csv(data_dir, season)
        .with_context(|| format!("season {season} CSV disappeared mid-rebuild"))?;
    let table = PointsTable::load(&csv)?;

    let summary = importer::process_table(&db, &table, &ImportOptions::new(season))
        .await
        .context("bulk import failed; clear the season and re-run")?;
    println!("Processed {} combinations.", summary.combinations);

    match stats::compute_season_stats(&db, season).await? {
        StatsOutcome::Computed { drivers } => println!("Computed statistics for {drivers} drivers."),
        StatsOutcome::NoData => println!("No data to compute statistics from."),
    }
    Ok(())
}

async fn clear_season_data(db: &Database, season: i64) -> anyhow::Result<u64> {
    let championships = ChampionshipRepository::new(db.pool().clone());
    let positions = PositionRepository::new(db.pool().clone());
    let stats_repo = StatsRepository::new(db.pool().clone());

    let removed = championships.clear_season(season).await?;
    positions.clear_season(season).await?;
    stats_repo.clear_season(season).await?;
    Ok(removed)
}

async fn handle_clear_season(data_dir: &Path, season: i64, confirm: bool) -> anyhow::Result<()> {
    if !confirm {
        bail!("this deletes all data for season {season}; pass --confirm to proceed");
    }

    let db = open_database(data_dir).await?;
    let removed = clear_season_data(&db, season).await?;
    println!("Cleared {removed} championships for season {season}.");
    Ok(())
}

async fn handle_status(data_dir: &Path, season: Option<i64>) -> anyhow::Result<()> {
    let seasons = match season {
        Some(season) => vec![season],
        None => configured_seasons(data_dir),
    };
    if seasons.is_empty() {
        println!("No season configurations found in {}.", data_dir.join("seasons").display());
        return Ok(());
    }

    let db = open_database(data_dir).await?;
    let championships = ChampionshipRepository::new(db.pool().clone());
    let stats_repo = StatsRepository::new(db.pool().clone());

    for season in seasons {
        println!("Season {season}");

        match config::resolve_season_csv(data_dir, season) {
            Some(csv) => match PointsTable::load(&csv) {
                Ok(table) => println!(
                    "  csv: {} ({} drivers, {} races)",
                    csv.display(),
                    table.num_drivers(),
                    table.num_races()
                ),
                Err(err) => println!("  csv: {} (unreadable: {err})", csv.display()),
            },
            None => println!("  csv: none"),
        }

        let count = championships.count_for_season(season).await?;
        if count > 0 {
            if let Some((min, max)) = championships.length_range(season).await? {
                println!("  database: {count} championships across {min}-{max} races");
            }
            let freshness = if stats_repo.is_fresh(season).await? {
                "fresh"
            } else {
                "stale"
            };
            println!(
                "  statistics: {} drivers, {}",
                stats_repo.driver_statistics(season).await?.len(),
                freshness
            );
        } else {
            println!("  database: no processed data");
        }
    }
    Ok(())
}

/// Seasons with a configuration file under `<data_dir>/seasons/`.
fn configured_seasons(data_dir: &Path) -> Vec<i64> {
    let Ok(entries) = std::fs::read_dir(data_dir.join("seasons")) else {
        return Vec::new();
    };

    let mut seasons: Vec<i64> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension()? != "json" {
                return None;
            }
            path.file_stem()?.to_str()?.parse().ok()
        })
        .collect();
    seasons.sort_unstable();
    seasons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_seasons_lists_json_years_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let seasons_dir = dir.path().join("seasons");
        std::fs::create_dir_all(&seasons_dir).unwrap();
        std::fs::write(seasons_dir.join("2026.json"), "{}").unwrap();
        std::fs::write(seasons_dir.join("2025.json"), "{}").unwrap();
        std::fs::write(seasons_dir.join("notes.txt"), "").unwrap();

        assert_eq!(configured_seasons(dir.path()), vec![2025, 2026]);
    }

    #[test]
    fn configured_seasons_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(configured_seasons(dir.path()).is_empty());
    }
}
