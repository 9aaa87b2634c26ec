//! Repository for the denormalized `position_results` table.

use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;

use crate::store::StorageError;

/// One driver's finishing position in one championship scenario.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PositionRecord {
    pub championship_id: i64,
    pub season: i64,
    pub driver_code: String,
    /// 1-based rank within the scenario's standings.
    pub position: i64,
    pub points: i64,
}

/// Pool-backed queries over `position_results`.
pub struct PositionRepository {
    pool: SqlitePool,
}

impl PositionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a batch of position rows on an already-open connection.
    /// The caller owns the surrounding transaction.
    pub async fn insert_batch(
        conn: &mut SqliteConnection,
        records: &[PositionRecord],
    ) -> Result<(), StorageError> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO position_results
                    (championship_id, season, driver_code, position, points)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.championship_id)
            .bind(record.season)
            .bind(&record.driver_code)
            .bind(record.position)
            .bind(record.points)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Every position row of one scenario, ordered by rank.
    pub async fn for_championship(
        &self,
        championship_id: i64,
    ) -> Result<Vec<PositionRecord>, StorageError> {
        let rows = sqlx::query_as(
            r#"
            SELECT championship_id, season, driver_code, position, points
            FROM position_results
            WHERE championship_id = ?
            ORDER BY position
            "#,
        )
        .bind(championship_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Championships where `driver` finished exactly `position`th, newest
    /// first. This is the query the `(driver_code, position)` index exists
    /// for.
    pub async fn championships_at_position(
        &self,
        season: i64,
        driver: &str,
        position: i64,
        limit: i64,
    ) -> Result<Vec<i64>, StorageError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT championship_id
            FROM position_results
            WHERE season = ? AND driver_code = ? AND position = ?
            ORDER BY championship_id DESC
            LIMIT ?
            "#,
        )
        .bind(season)
        .bind(driver)
        .bind(position)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// How often each driver finished ahead of the other across every
    /// scenario of the season: `(first_ahead, second_ahead)`.
    pub async fn head_to_head(
        &self,
        season: i64,
        first: &str,
        second: &str,
    ) -> Result<(i64, i64), StorageError> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN a.position < b.position THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN a.position > b.position THEN 1 ELSE 0 END), 0)
            FROM position_results a
            JOIN position_results b ON a.championship_id = b.championship_id
            WHERE a.season = ? AND a.driver_code = ? AND b.driver_code = ?
            "#,
        )
        .bind(season)
        .bind(first)
        .bind(second)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Delete every position row of a season.
    pub async fn clear_season(&self, season: i64) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM position_results WHERE season = ?")
            .bind(season)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn row(id: i64, driver: &str, position: i64, points: i64) -> PositionRecord {
        PositionRecord {
            championship_id: id,
            season: 2025,
            driver_code: driver.to_string(),
            position,
            points,
        }
    }

    async fn seed(db: &Database) {
        // Scenario A's three championships, denormalized.
        let records = vec![
            row(1, "VER", 1, 25),
            row(1, "NOR", 2, 18),
            row(1, "LEC", 3, 15),
            row(2, "NOR", 1, 25),
            row(2, "VER", 2, 18),
            row(2, "LEC", 3, 15),
            row(3, "VER", 1, 43),
            row(3, "NOR", 2, 43),
            row(3, "LEC", 3, 30),
        ];
        let mut conn = db.pool().acquire().await.unwrap();
        PositionRepository::insert_batch(&mut conn, &records)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn positions_for_a_championship_are_rank_ordered() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = PositionRepository::new(db.pool().clone());
        seed(&db).await;

        let positions = repo.for_championship(3).await.unwrap();
        let ranks: Vec<(String, i64, i64)> = positions
            .into_iter()
            .map(|p| (p.driver_code, p.position, p.points))
            .collect();
        assert_eq!(
            ranks,
            vec![
                ("VER".to_string(), 1, 43),
                ("NOR".to_string(), 2, 43),
                ("LEC".to_string(), 3, 30),
            ]
        );
    }

    #[tokio::test]
    async fn championships_at_position_lookup() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = PositionRepository::new(db.pool().clone());
        seed(&db).await;

        let ver_wins = repo
            .championships_at_position(2025, "VER", 1, 10)
            .await
            .unwrap();
        assert_eq!(ver_wins, vec![3, 1]);

        let lec_thirds = repo
            .championships_at_position(2025, "LEC", 3, 10)
            .await
            .unwrap();
        assert_eq!(lec_thirds, vec![3, 2, 1]);

        assert!(repo
            .championships_at_position(2025, "LEC", 1, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn head_to_head_counts_both_directions() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = PositionRepository::new(db.pool().clone());
        seed(&db).await;

        assert_eq!(repo.head_to_head(2025, "VER", "NOR").await.unwrap(), (2, 1));
        assert_eq!(repo.head_to_head(2025, "NOR", "VER").await.unwrap(), (1, 2));
        assert_eq!(repo.head_to_head(2025, "LEC", "VER").await.unwrap(), (0, 3));
    }

    #[tokio::test]
    async fn head_to_head_with_no_data() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = PositionRepository::new(db.pool().clone());
        assert_eq!(repo.head_to_head(2025, "VER", "NOR").await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn clear_season_empties_the_table() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = PositionRepository::new(db.pool().clone());
        seed(&db).await;

        assert_eq!(repo.clear_season(2025).await.unwrap(), 9);
        assert!(repo.for_championship(1).await.unwrap().is_empty());
    }
}
