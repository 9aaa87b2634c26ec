//! Bulk import of championship scenarios.
//!
//! This is the hot path: every non-empty race subset is scored and written,
//! so a 24-race season produces ~16.7M championship rows plus one position
//! row per driver per championship. Rows are buffered into fixed-size
//! batches and the whole run shares one transaction on one dedicated
//! connection with `synchronous=OFF`; durability is restored after the
//! final commit. A crash mid-run loses only the uncommitted tail.

use championship::{score_subset, PointsTable, RaceCombinations};
use sqlx::sqlite::SqliteConnection;
use sqlx::Acquire;

use crate::store::{
    ChampionshipRecord, ChampionshipRepository, Database, PositionRecord, PositionRepository,
    StorageError,
};

/// Default championship rows per flush. Positions flush alongside, one row
/// per driver per championship.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub season: i64,
    pub batch_size: usize,
}

impl ImportOptions {
    pub fn new(season: i64) -> Self {
        Self {
            season,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Number of scenarios written by this run.
    pub combinations: u64,
    /// Last championship id written; unchanged from the prior maximum when
    /// the table had no races.
    pub last_championship_id: i64,
}

/// Enumerate, score, and persist every scenario of `table`.
///
/// Championship ids continue from the stored maximum, assigned here in
/// enumeration order, so re-running on identical input after a clear
/// reproduces identical rows and appends never collide with prior seasons.
pub async fn process_table(
    db: &Database,
    table: &PointsTable,
    options: &ImportOptions,
) -> Result<ImportSummary, StorageError> {
    let num_races = table.num_races();
    let total = RaceCombinations::total(num_races);
    let batch_size = options.batch_size.max(1);

    tracing::info!(
        drivers = table.num_drivers(),
        races = num_races,
        combinations = total,
        season = options.season,
        "starting import"
    );

    let mut conn = db.pool().acquire().await?;

    // Relax durability for the bulk load; restored after the commit below.
    // This is connection-scoped, which is why the whole run stays on this
    // one connection.
    sqlx::query("PRAGMA synchronous = OFF")
        .execute(&mut *conn)
        .await?;

    let mut tx = conn.begin().await?;

    let start: (i64,) =
        sqlx::query_as("SELECT COALESCE(MAX(championship_id), 0) FROM championship_results")
            .fetch_one(&mut *tx)
            .await?;
    let mut next_id = start.0 + 1;

    // Any new championship data invalidates previously computed statistics.
    sqlx::query(
        r#"
        INSERT INTO stats_state (season, fresh) VALUES (?, 0)
        ON CONFLICT (season) DO UPDATE SET fresh = 0
        "#,
    )
    .bind(options.season)
    .execute(&mut *tx)
    .await?;

    let mut championships: Vec<ChampionshipRecord> = Vec::with_capacity(batch_size);
    let mut positions: Vec<PositionRecord> =
        Vec::with_capacity(batch_size.saturating_mul(table.num_drivers()));
    let mut processed: u64 = 0;

    for subset in RaceCombinations::new(num_races) {
        let scored = score_subset(table, &subset);
        let championship_id = next_id;
        next_id += 1;
        processed += 1;

        for (rank, (code, points)) in scored.standings.iter().zip(&scored.points).enumerate() {
            positions.push(PositionRecord {
                championship_id,
                season: options.season,
                driver_code: code.clone(),
                position: rank as i64 + 1,
                points: *points,
            });
        }

        championships.push(ChampionshipRecord {
            championship_id,
            season: options.season,
            num_races: scored.num_races() as i64,
            rounds: scored.rounds_csv(),
            standings: scored.standings_csv(),
            winner: scored.winner().to_string(),
            points: scored.points_csv(),
        });

        if championships.len() == batch_size {
            flush(&mut tx, &mut championships, &mut positions).await?;
            tracing::info!(processed, total, "flushed batch");
        }
    }

    if !championships.is_empty() {
        flush(&mut tx, &mut championships, &mut positions).await?;
        tracing::info!(processed, total, "flushed final batch");
    }

    tx.commit().await?;

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    tracing::info!(combinations = processed, "import committed");

    Ok(ImportSummary {
        combinations: processed,
        last_championship_id: next_id - 1,
    })
}

async fn flush(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    championships: &mut Vec<ChampionshipRecord>,
    positions: &mut Vec<PositionRecord>,
) -> Result<(), StorageError> {
    let conn: &mut SqliteConnection = &mut *tx;
    ChampionshipRepository::insert_batch(&mut *conn, championships).await?;
    PositionRepository::insert_batch(&mut *conn, positions).await?;
    championships.clear();
    positions.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChampionshipRepository, StatsRepository};

    fn three_race_table() -> PointsTable {
        PointsTable::parse("Driver,1,2,3\nVER,25,18,25\nNOR,18,25,18\nLEC,15,15,15\n").unwrap()
    }

    #[tokio::test]
    async fn writes_every_combination_with_contiguous_ids() {
        let db = Database::new_in_memory().await.unwrap();
        let table = three_race_table();

        // A batch size below the subset count forces mid-run flushes.
        let summary = process_table(&db, &table, &ImportOptions::new(2025).with_batch_size(2))
            .await
            .unwrap();

        assert_eq!(summary.combinations, 7);
        assert_eq!(summary.last_championship_id, 7);

        let repo = ChampionshipRepository::new(db.pool().clone());
        assert_eq!(repo.count_for_season(2025).await.unwrap(), 7);
        assert_eq!(repo.max_championship_id().await.unwrap(), 7);

        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT championship_id FROM championship_results ORDER BY championship_id",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        assert_eq!(ids, (1..=7).map(|id| (id,)).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn appending_a_second_run_continues_ids() {
        let db = Database::new_in_memory().await.unwrap();
        let table = three_race_table();

        process_table(&db, &table, &ImportOptions::new(2025))
            .await
            .unwrap();
        let second = process_table(&db, &table, &ImportOptions::new(2026))
            .await
            .unwrap();

        assert_eq!(second.combinations, 7);
        assert_eq!(second.last_championship_id, 14);
    }

    #[tokio::test]
    async fn import_resets_the_freshness_flag() {
        let db = Database::new_in_memory().await.unwrap();
        let stats = StatsRepository::new(db.pool().clone());
        stats.set_fresh(2025, true).await.unwrap();

        process_table(&db, &three_race_table(), &ImportOptions::new(2025))
            .await
            .unwrap();

        assert!(!stats.is_fresh(2025).await.unwrap());
    }

    #[tokio::test]
    async fn zero_race_table_writes_nothing() {
        let db = Database::new_in_memory().await.unwrap();
        let table = PointsTable::parse("Driver\nVER\nNOR\n").unwrap();

        let summary = process_table(&db, &table, &ImportOptions::new(2025))
            .await
            .unwrap();

        assert_eq!(summary.combinations, 0);
        assert_eq!(summary.last_championship_id, 0);

        let repo = ChampionshipRepository::new(db.pool().clone());
        assert_eq!(repo.count_for_season(2025).await.unwrap(), 0);
    }
}
