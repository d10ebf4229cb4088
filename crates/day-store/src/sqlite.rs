//! SQLite-backed day store using sqlx.
//!
//! One row per `(location, day)` holding the snapshot as a JSON document
//! plus an update stamp. Merges are monotonic and idempotent upstream, so
//! per-row writes need no cross-document transactions.

use std::path::Path;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use snapshot_core::DailyMetricSnapshot;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use crate::{overlay, DayStore, StoreError};

/// Persistent day store backed by SQLite.
pub struct SqliteDayStore {
    pool: SqlitePool,
}

impl SqliteDayStore {
    /// Open or create the database at the given path.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Database(sqlx::Error::Io(e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "Opened day store database");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS location_days (
                location_id TEXT NOT NULL,
                date TEXT NOT NULL,
                doc TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (location_id, date)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_location_days_date ON location_days(date)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fetch_doc(
        &self,
        location_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyMetricSnapshot>, StoreError> {
        let row = sqlx::query("SELECT doc FROM location_days WHERE location_id = ? AND date = ?")
            .bind(location_id)
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let doc: String = row.get("doc");
                Ok(Some(serde_json::from_str(&doc)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DayStore for SqliteDayStore {
    async fn get_day(
        &self,
        location_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyMetricSnapshot>, StoreError> {
        self.fetch_doc(location_id, date).await
    }

    async fn upsert_day(&self, snapshot: &DailyMetricSnapshot) -> Result<(), StoreError> {
        // Read-merge-write inside one transaction so concurrent writers for
        // the same day cannot interleave between the fetch and the upsert.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT doc FROM location_days WHERE location_id = ? AND date = ?")
            .bind(&snapshot.location_id)
            .bind(snapshot.date.to_string())
            .fetch_optional(&mut *tx)
            .await?;

        let merged = match row {
            Some(row) => {
                let doc: String = row.get("doc");
                let stored: DailyMetricSnapshot = serde_json::from_str(&doc)?;
                overlay(&stored, snapshot)
            }
            None => snapshot.clone(),
        };

        let doc = serde_json::to_string(&merged)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO location_days (location_id, date, doc, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (location_id, date)
            DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at
            "#,
        )
        .bind(&merged.location_id)
        .bind(merged.date.to_string())
        .bind(doc)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_core::{Metric, SourceRank};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn roundtrips_a_snapshot() {
        let store = SqliteDayStore::open_memory().await.unwrap();

        let mut snap = DailyMetricSnapshot::empty("konyaalti", day());
        snap.sst_celsius = Metric::observed(25.13, SourceRank::Daily);
        snap.water_quality_index = Metric::observed(78.5, SourceRank::WindowAvg);

        store.upsert_day(&snap).await.unwrap();
        let loaded = store.get_day("konyaalti", day()).await.unwrap().unwrap();
        assert_eq!(loaded, snap);
    }

    #[tokio::test]
    async fn missing_day_is_none() {
        let store = SqliteDayStore::open_memory().await.unwrap();
        assert!(store.get_day("konyaalti", day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_is_a_field_level_merge() {
        let store = SqliteDayStore::open_memory().await.unwrap();

        let mut first = DailyMetricSnapshot::empty("lara", day());
        first.no2_concentration = Metric::observed(2.4e-5, SourceRank::Daily);
        store.upsert_day(&first).await.unwrap();

        let mut second = DailyMetricSnapshot::empty("lara", day());
        second.waste_risk_percent = Metric::observed(41.0, SourceRank::WindowAvg);
        store.upsert_day(&second).await.unwrap();

        let loaded = store.get_day("lara", day()).await.unwrap().unwrap();
        assert_eq!(loaded.no2_concentration.value_f64(), Some(2.4e-5));
        assert_eq!(loaded.waste_risk_percent.value_f64(), Some(41.0));
    }

    #[tokio::test]
    async fn upsert_never_downgrades_a_ranked_field() {
        let store = SqliteDayStore::open_memory().await.unwrap();

        let mut first = DailyMetricSnapshot::empty("lara", day());
        first.turbidity_index = Metric::observed(0.010, SourceRank::Daily);
        store.upsert_day(&first).await.unwrap();

        let mut second = DailyMetricSnapshot::empty("lara", day());
        second.turbidity_index = Metric::observed(-0.021, SourceRank::WindowAvg);
        store.upsert_day(&second).await.unwrap();

        let loaded = store.get_day("lara", day()).await.unwrap().unwrap();
        assert_eq!(loaded.turbidity_index.value_f64(), Some(0.010));
        assert_eq!(loaded.turbidity_index.rank(), SourceRank::Daily);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("days.db");

        {
            let store = SqliteDayStore::open(&path).await.unwrap();
            let mut snap = DailyMetricSnapshot::empty("patara", day());
            snap.chlorophyll = Metric::observed(5.5, SourceRank::Daily);
            store.upsert_day(&snap).await.unwrap();
        }

        let store = SqliteDayStore::open(&path).await.unwrap();
        let loaded = store.get_day("patara", day()).await.unwrap().unwrap();
        assert_eq!(loaded.chlorophyll.value_f64(), Some(5.5));
    }
}
