//! Repository for the primary `championship_results` table.

use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;

use crate::store::StorageError;

/// One persisted championship scenario.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ChampionshipRecord {
    pub championship_id: i64,
    pub season: i64,
    pub num_races: i64,
    pub rounds: String,
    pub standings: String,
    pub winner: String,
    pub points: String,
}

/// Pool-backed queries over `championship_results`.
pub struct ChampionshipRepository {
    pool: SqlitePool,
}

impl ChampionshipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a batch of records on an already-open connection.
    ///
    /// Ids are assigned by the caller (the importer), not by SQLite, so
    /// that the matching position rows can be built without a read-back.
    /// The caller owns the surrounding transaction.
    pub async fn insert_batch(
        conn: &mut SqliteConnection,
        records: &[ChampionshipRecord],
    ) -> Result<(), StorageError> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO championship_results
                    (championship_id, season, num_races, rounds, standings, winner, points)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.championship_id)
            .bind(record.season)
            .bind(record.num_races)
            .bind(&record.rounds)
            .bind(&record.standings)
            .bind(&record.winner)
            .bind(&record.points)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Highest championship id currently in storage, 0 when empty.
    /// New runs continue from here so appends never collide.
    pub async fn max_championship_id(&self) -> Result<i64, StorageError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(championship_id), 0) FROM championship_results")
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    pub async fn count_for_season(&self, season: i64) -> Result<i64, StorageError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM championship_results WHERE season = ?")
                .bind(season)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    pub async fn load(&self, id: i64) -> Result<Option<ChampionshipRecord>, StorageError> {
        let record = sqlx::query_as(
            r#"
            SELECT championship_id, season, num_races, rounds, standings, winner, points
            FROM championship_results
            WHERE championship_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Look up a scenario by its canonical (ascending, 1-based) rounds string.
    pub async fn find_by_rounds(
        &self,
        season: i64,
        rounds: &str,
    ) -> Result<Option<i64>, StorageError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT championship_id FROM championship_results WHERE season = ? AND rounds = ?",
        )
        .bind(season)
        .bind(rounds)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Title counts per driver, most successful first.
    pub async fn win_counts(&self, season: i64) -> Result<Vec<(String, i64)>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT winner, COUNT(*) AS wins
            FROM championship_results
            WHERE season = ?
            GROUP BY winner
            ORDER BY wins DESC, winner
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Title counts per (driver, season length).
    pub async fn win_counts_by_length(
        &self,
        season: i64,
    ) -> Result<Vec<(String, i64, i64)>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT winner, num_races, COUNT(*) AS wins
            FROM championship_results
            WHERE season = ?
            GROUP BY winner, num_races
            ORDER BY winner, num_races
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Total scenario count per season length.
    pub async fn totals_by_length(&self, season: i64) -> Result<Vec<(i64, i64)>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT num_races, COUNT(*) AS total
            FROM championship_results
            WHERE season = ?
            GROUP BY num_races
            ORDER BY num_races
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Shortest season each driver has won, shortest first.
    pub async fn min_winning_length(
        &self,
        season: i64,
    ) -> Result<Vec<(String, i64)>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT winner, MIN(num_races) AS min_races
            FROM championship_results
            WHERE season = ?
            GROUP BY winner
            ORDER BY min_races, winner
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// `(min, max)` season length present, `None` when the season is empty.
    pub async fn length_range(&self, season: i64) -> Result<Option<(i64, i64)>, StorageError> {
        let row: (Option<i64>, Option<i64>) = sqlx::query_as(
            "SELECT MIN(num_races), MAX(num_races) FROM championship_results WHERE season = ?",
        )
        .bind(season)
        .fetch_one(&self.pool)
        .await?;
        Ok(match row {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        })
    }

    /// Standings string of one arbitrary-but-deterministic scenario; every
    /// scenario lists the full driver roster, so one row names everyone.
    pub async fn sample_standings(&self, season: i64) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT standings FROM championship_results
            WHERE season = ?
            ORDER BY championship_id
            LIMIT 1
            "#,
        )
        .bind(season)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// `(championship_id, standings)` for every scenario of one length,
    /// newest scenarios first, matching the scan order of the stats pass.
    pub async fn standings_for_length(
        &self,
        season: i64,
        num_races: i64,
    ) -> Result<Vec<(i64, String)>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT championship_id, standings
            FROM championship_results
            WHERE season = ? AND num_races = ?
            ORDER BY championship_id DESC
            "#,
        )
        .bind(season)
        .bind(num_races)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// `(winner, points, championship_id)` for every scenario, in id order;
    /// used to derive best winning margins.
    pub async fn winner_rows(
        &self,
        season: i64,
    ) -> Result<Vec<(String, String, i64)>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT winner, points, championship_id
            FROM championship_results
            WHERE season = ?
            ORDER BY championship_id
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete every scenario of a season. Returns the number of rows removed.
    pub async fn clear_season(&self, season: i64) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM championship_results WHERE season = ?")
            .bind(season)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
