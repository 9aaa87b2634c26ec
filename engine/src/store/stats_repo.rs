//! Repository for derived statistics: `driver_statistics`,
//! `win_probability_cache`, and the per-season freshness flag.

use sqlx::SqlitePool;

use crate::store::StorageError;

/// Per-driver derived statistics for one season.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DriverStatistics {
    pub driver_code: String,
    pub season: i64,
    /// Best (lowest) finishing position across every scenario.
    pub highest_position: i64,
    /// Longest season length at which that best position occurred.
    pub highest_position_num_races: i64,
    /// Exemplar scenario for the best position.
    pub highest_position_championship_id: i64,
    /// Largest winning margin; `None` for drivers who never won.
    pub best_margin: Option<i64>,
    pub best_margin_championship_id: Option<i64>,
    pub win_count: i64,
}

/// Wins and totals for one (driver, season length) pair.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WinProbabilityEntry {
    pub driver_code: String,
    pub season: i64,
    pub num_races: i64,
    pub win_count: i64,
    pub total_at_length: i64,
}

/// Pool-backed access to the derived-statistics tables.
///
/// Statistics are only ever replaced wholesale: the stats pass deletes the
/// season's rows and inserts the recomputed set in one transaction.
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the season's driver statistics (delete-then-insert).
    pub async fn replace_driver_statistics(
        &self,
        season: i64,
        stats: &[DriverStatistics],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM driver_statistics WHERE season = ?")
            .bind(season)
            .execute(&mut *tx)
            .await?;

        for stat in stats {
            sqlx::query(
                r#"
                INSERT INTO driver_statistics
                    (driver_code, season, highest_position, highest_position_num_races,
                     highest_position_championship_id, best_margin,
                     best_margin_championship_id, win_count)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&stat.driver_code)
            .bind(stat.season)
            .bind(stat.highest_position)
            .bind(stat.highest_position_num_races)
            .bind(stat.highest_position_championship_id)
            .bind(stat.best_margin)
            .bind(stat.best_margin_championship_id)
            .bind(stat.win_count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replace the season's win-probability cache (delete-then-insert).
    pub async fn replace_win_probability(
        &self,
        season: i64,
        entries: &[WinProbabilityEntry],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM win_probability_cache WHERE season = ?")
            .bind(season)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO win_probability_cache
                    (driver_code, season, num_races, win_count, total_at_length)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.driver_code)
            .bind(entry.season)
            .bind(entry.num_races)
            .bind(entry.win_count)
            .bind(entry.total_at_length)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Driver statistics for a season, best position first.
    pub async fn driver_statistics(
        &self,
        season: i64,
    ) -> Result<Vec<DriverStatistics>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT driver_code, season, highest_position, highest_position_num_races,
                   highest_position_championship_id, best_margin,
                   best_margin_championship_id, win_count
            FROM driver_statistics
            WHERE season = ?
            ORDER BY highest_position, driver_code
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Win-probability rows for a season, by driver then length.
    pub async fn win_probability(
        &self,
        season: i64,
    ) -> Result<Vec<WinProbabilityEntry>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT driver_code, season, num_races, win_count, total_at_length
            FROM win_probability_cache
            WHERE season = ?
            ORDER BY driver_code, num_races
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Whether the season's derived statistics reflect its current
    /// championship data.
    pub async fn is_fresh(&self, season: i64) -> Result<bool, StorageError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT fresh FROM stats_state WHERE season = ?")
                .bind(season)
                .fetch_optional(&self.pool)
                .await?;
        Ok(matches!(row, Some((1,))))
    }

    /// Record the season's statistics as fresh or stale. The importer
    /// resets this flag on every write; the stats pass sets it.
    pub async fn set_fresh(&self, season: i64, fresh: bool) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO stats_state (season, fresh) VALUES (?, ?)
            ON CONFLICT (season) DO UPDATE SET fresh = excluded.fresh
            "#,
        )
        .bind(season)
        .bind(fresh as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete the season's derived statistics and freshness marker.
    pub async fn clear_season(&self, season: i64) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM driver_statistics WHERE season = ?")
            .bind(season)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM win_probability_cache WHERE season = ?")
            .bind(season)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM stats_state WHERE season = ?")
            .bind(season)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn sample_stats() -> Vec<DriverStatistics> {
        vec![
            DriverStatistics {
                driver_code: "VER".to_string(),
                season: 2025,
                highest_position: 1,
                highest_position_num_races: 2,
                highest_position_championship_id: 3,
                best_margin: Some(7),
                best_margin_championship_id: Some(1),
                win_count: 2,
            },
            DriverStatistics {
                driver_code: "LEC".to_string(),
                season: 2025,
                highest_position: 3,
                highest_position_num_races: 2,
                highest_position_championship_id: 3,
                best_margin: None,
                best_margin_championship_id: None,
                win_count: 0,
            },
        ]
    }

    #[tokio::test]
    async fn replace_and_read_back_driver_statistics() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = StatsRepository::new(db.pool().clone());

        repo.replace_driver_statistics(2025, &sample_stats())
            .await
            .unwrap();

        let loaded = repo.driver_statistics(2025).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].driver_code, "VER");
        assert_eq!(loaded[0].best_margin, Some(7));
        assert_eq!(loaded[1].driver_code, "LEC");
        assert_eq!(loaded[1].best_margin, None);
    }

    #[tokio::test]
    async fn replace_discards_previous_rows() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = StatsRepository::new(db.pool().clone());

        repo.replace_driver_statistics(2025, &sample_stats())
            .await
            .unwrap();
        let only_ver = &sample_stats()[..1];
        repo.replace_driver_statistics(2025, only_ver).await.unwrap();

        let loaded = repo.driver_statistics(2025).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].driver_code, "VER");
    }

    #[tokio::test]
    async fn win_probability_round_trip() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = StatsRepository::new(db.pool().clone());

        let entries = vec![
            WinProbabilityEntry {
                driver_code: "VER".to_string(),
                season: 2025,
                num_races: 1,
                win_count: 1,
                total_at_length: 2,
            },
            WinProbabilityEntry {
                driver_code: "VER".to_string(),
                season: 2025,
                num_races: 2,
                win_count: 1,
                total_at_length: 1,
            },
        ];
        repo.replace_win_probability(2025, &entries).await.unwrap();
        assert_eq!(repo.win_probability(2025).await.unwrap(), entries);
    }

    #[tokio::test]
    async fn freshness_defaults_to_stale() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = StatsRepository::new(db.pool().clone());

        assert!(!repo.is_fresh(2025).await.unwrap());
        repo.set_fresh(2025, true).await.unwrap();
        assert!(repo.is_fresh(2025).await.unwrap());
        repo.set_fresh(2025, false).await.unwrap();
        assert!(!repo.is_fresh(2025).await.unwrap());
    }

    #[tokio::test]
    async fn clear_season_removes_stats_and_flag() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = StatsRepository::new(db.pool().clone());

        repo.replace_driver_statistics(2025, &sample_stats())
            .await
            .unwrap();
        repo.set_fresh(2025, true).await.unwrap();

        repo.clear_season(2025).await.unwrap();
        assert!(repo.driver_statistics(2025).await.unwrap().is_empty());
        assert!(!repo.is_fresh(2025).await.unwrap());
    }
}
