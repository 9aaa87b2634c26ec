//! The derived-statistics pass.
//!
//! Runs after an import completes and fully replaces the season's
//! `driver_statistics` and `win_probability_cache` rows. Best positions are
//! found by scanning the longest seasons first: a scenario over more races
//! can only help a driver's best position, and ties are deliberately
//! resolved toward the longer season to surface the stronger example.

use std::collections::{HashMap, HashSet};

use championship::{decode_points, decode_standings};

use crate::store::{
    ChampionshipRepository, Database, DriverStatistics, StatsRepository, StorageError,
    WinProbabilityEntry,
};

/// Result of a statistics pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsOutcome {
    Computed { drivers: usize },
    /// The season has no championship records yet; nothing was written.
    NoData,
}

#[derive(Debug, Clone, Copy)]
struct BestPosition {
    position: i64,
    num_races: i64,
    championship_id: i64,
}

/// Recompute every derived statistic for `season`, replacing prior rows and
/// marking the season's statistics fresh.
pub async fn compute_season_stats(
    db: &Database,
    season: i64,
) -> Result<StatsOutcome, StorageError> {
    let championships = ChampionshipRepository::new(db.pool().clone());
    let stats_repo = StatsRepository::new(db.pool().clone());

    // Every scenario lists the complete roster, so one row names everyone.
    let Some(sample) = championships.sample_standings(season).await? else {
        tracing::warn!(season, "no championship records; skipping statistics pass");
        return Ok(StatsOutcome::NoData);
    };
    let roster = decode_standings(&sample);

    let Some((_, max_races)) = championships.length_range(season).await? else {
        tracing::warn!(season, "no championship records; skipping statistics pass");
        return Ok(StatsOutcome::NoData);
    };

    let best = best_positions(&championships, season, &roster, max_races).await?;
    let wins: HashMap<String, i64> = championships
        .win_counts(season)
        .await?
        .into_iter()
        .collect();
    let margins = best_margins(&championships, season).await?;

    let mut rows = Vec::with_capacity(roster.len());
    for code in &roster {
        let Some(found) = best.get(code) else {
            continue;
        };
        let margin = margins.get(code);
        rows.push(DriverStatistics {
            driver_code: code.clone(),
            season,
            highest_position: found.position,
            highest_position_num_races: found.num_races,
            highest_position_championship_id: found.championship_id,
            best_margin: margin.map(|&(value, _)| value),
            best_margin_championship_id: margin.map(|&(_, id)| id),
            win_count: wins.get(code).copied().unwrap_or(0),
        });
    }

    let probability = win_probability_entries(&championships, season, &roster).await?;

    stats_repo.replace_driver_statistics(season, &rows).await?;
    stats_repo.replace_win_probability(season, &probability).await?;
    stats_repo.set_fresh(season, true).await?;

    tracing::info!(
        season,
        drivers = rows.len(),
        probability_rows = probability.len(),
        "statistics pass complete"
    );

    Ok(StatsOutcome::Computed {
        drivers: rows.len(),
    })
}

/// Scan scenarios longest-first, tracking each driver's best position.
///
/// A driver's record only improves on a strictly better position, so an
/// equal position seen later (at a shorter length) never replaces the
/// longer-season exemplar. Once everyone has reached position 1 the
/// remaining lengths cannot change anything and the scan stops.
async fn best_positions(
    championships: &ChampionshipRepository,
    season: i64,
    roster: &[String],
    max_races: i64,
) -> Result<HashMap<String, BestPosition>, StorageError> {
    let mut best: HashMap<String, BestPosition> = HashMap::new();
    let mut unresolved: HashSet<&str> = roster.iter().map(String::as_str).collect();

    for num_races in (1..=max_races).rev() {
        if unresolved.is_empty() {
            break;
        }

        for (championship_id, standings) in championships
            .standings_for_length(season, num_races)
            .await?
        {
            for (index, code) in decode_standings(&standings).into_iter().enumerate() {
                let position = index as i64 + 1;
                let improved = match best.get(&code) {
                    Some(current) => position < current.position,
                    None => true,
                };
                if improved {
                    if position == 1 {
                        unresolved.remove(code.as_str());
                    }
                    best.insert(
                        code,
                        BestPosition {
                            position,
                            num_races,
                            championship_id,
                        },
                    );
                }
            }
        }
    }

    Ok(best)
}

/// Largest winning margin per driver: `points[0] - points[1]` over the
/// scenarios that driver won, with the earliest scenario as the exemplar.
async fn best_margins(
    championships: &ChampionshipRepository,
    season: i64,
) -> Result<HashMap<String, (i64, i64)>, StorageError> {
    let mut margins: HashMap<String, (i64, i64)> = HashMap::new();

    for (winner, points, championship_id) in championships.winner_rows(season).await? {
        let Ok(points) = decode_points(&points) else {
            continue;
        };
        let [first, second, ..] = points.as_slice() else {
            continue;
        };
        let margin = first - second;
        match margins.get_mut(&winner) {
            Some(entry) if margin <= entry.0 => {}
            Some(entry) => *entry = (margin, championship_id),
            None => {
                margins.insert(winner, (margin, championship_id));
            }
        }
    }

    Ok(margins)
}

/// Wins and totals per (driver, season length), with explicit zero rows so
/// the serving layer can compute percentages without rescanning.
async fn win_probability_entries(
    championships: &ChampionshipRepository,
    season: i64,
    roster: &[String],
) -> Result<Vec<WinProbabilityEntry>, StorageError> {
    let wins: HashMap<(String, i64), i64> = championships
        .win_counts_by_length(season)
        .await?
        .into_iter()
        .map(|(code, num_races, count)| ((code, num_races), count))
        .collect();
    let totals = championships.totals_by_length(season).await?;

    let mut entries = Vec::with_capacity(roster.len() * totals.len());
    for code in roster {
        for &(num_races, total) in &totals {
            entries.push(WinProbabilityEntry {
                driver_code: code.clone(),
                season,
                num_races,
                win_count: wins
                    .get(&(code.clone(), num_races))
                    .copied()
                    .unwrap_or(0),
                total_at_length: total,
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{process_table, ImportOptions};
    use championship::PointsTable;

    #[tokio::test]
    async fn no_data_writes_nothing() {
        let db = Database::new_in_memory().await.unwrap();

        let outcome = compute_season_stats(&db, 2025).await.unwrap();
        assert_eq!(outcome, StatsOutcome::NoData);

        let stats = StatsRepository::new(db.pool().clone());
        assert!(stats.driver_statistics(2025).await.unwrap().is_empty());
        assert!(stats.win_probability(2025).await.unwrap().is_empty());
        assert!(!stats.is_fresh(2025).await.unwrap());
    }

    #[tokio::test]
    async fn ties_prefer_the_longer_season() {
        // NOR's only win is the one-race season 2, but VER ties the
        // two-race season and takes it on source order, so VER's best
        // position must point at the longer scenario.
        let table =
            PointsTable::parse("Driver,1,2\nVER,25,18\nNOR,18,25\nLEC,15,15\n").unwrap();
        let db = Database::new_in_memory().await.unwrap();
        process_table(&db, &table, &ImportOptions::new(2025))
            .await
            .unwrap();

        compute_season_stats(&db, 2025).await.unwrap();

        let stats = StatsRepository::new(db.pool().clone());
        let rows = stats.driver_statistics(2025).await.unwrap();

        let ver = rows.iter().find(|r| r.driver_code == "VER").unwrap();
        assert_eq!(ver.highest_position, 1);
        assert_eq!(ver.highest_position_num_races, 2);
        assert_eq!(ver.highest_position_championship_id, 3);

        let nor = rows.iter().find(|r| r.driver_code == "NOR").unwrap();
        assert_eq!(nor.highest_position, 1);
        assert_eq!(nor.highest_position_num_races, 1);
        assert_eq!(nor.highest_position_championship_id, 2);
    }

    #[tokio::test]
    async fn margins_track_the_widest_win() {
        let table =
            PointsTable::parse("Driver,1,2\nVER,25,18\nNOR,18,25\nLEC,15,15\n").unwrap();
        let db = Database::new_in_memory().await.unwrap();
        process_table(&db, &table, &ImportOptions::new(2025))
            .await
            .unwrap();

        compute_season_stats(&db, 2025).await.unwrap();

        let stats = StatsRepository::new(db.pool().clone());
        let rows = stats.driver_statistics(2025).await.unwrap();

        // VER wins race-1-only by 7 and the tied full season by 0.
        let ver = rows.iter().find(|r| r.driver_code == "VER").unwrap();
        assert_eq!(ver.best_margin, Some(7));
        assert_eq!(ver.best_margin_championship_id, Some(1));

        let lec = rows.iter().find(|r| r.driver_code == "LEC").unwrap();
        assert_eq!(lec.best_margin, None);
        assert_eq!(lec.best_margin_championship_id, None);
    }

    #[tokio::test]
    async fn recomputing_replaces_prior_statistics() {
        let table = PointsTable::parse("Driver,1\nVER,25\nNOR,18\n").unwrap();
        let db = Database::new_in_memory().await.unwrap();
        process_table(&db, &table, &ImportOptions::new(2025))
            .await
            .unwrap();

        compute_season_stats(&db, 2025).await.unwrap();
        let stats = StatsRepository::new(db.pool().clone());
        assert!(stats.is_fresh(2025).await.unwrap());

        // A second import makes the stats stale again until recomputed.
        process_table(&db, &table, &ImportOptions::new(2025))
            .await
            .unwrap();
        assert!(!stats.is_fresh(2025).await.unwrap());

        compute_season_stats(&db, 2025).await.unwrap();
        assert!(stats.is_fresh(2025).await.unwrap());
        let rows = stats.driver_statistics(2025).await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
