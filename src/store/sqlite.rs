//! SQLite storage. The primary key on `id` is what keeps postings unique, so
//! concurrent runs writing to the same file cannot store a posting twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use super::{JobFilter, JobStore};
use crate::error::{StoreError, StoreResult};
use crate::model::{JobField, JobId, JobRecord, RoleSet};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `database_url`, e.g.
    /// `sqlite://jobs.db`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// A private in-memory database, for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                roles TEXT NOT NULL,
                fields TEXT NOT NULL DEFAULT '{}',
                retrieved_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_source ON jobs(source);
            CREATE INDEX IF NOT EXISTS idx_jobs_retrieved_at ON jobs(retrieved_at);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_one(
        conn: &mut sqlx::SqliteConnection,
        record: &JobRecord,
    ) -> StoreResult<bool> {
        let roles = serde_json::to_string(&record.roles)?;
        let fields = serde_json::to_string(&record.fields)?;

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, source, url, title, roles, fields, retrieved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(record.id.as_str())
        .bind(&record.source)
        .bind(&record.url)
        .bind(&record.title)
        .bind(&roles)
        .bind(&fields)
        .bind(record.retrieved_at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn insert_many(&self, records: &[JobRecord]) -> StoreResult<usize> {
        let mut conn = self.pool.acquire().await?;
        let mut inserted = 0;
        let mut duplicates = 0;

        for record in records {
            match Self::insert_one(&mut conn, record).await {
                Ok(true) => inserted += 1,
                Ok(false) => duplicates += 1,
                Err(e) => tracing::warn!(id = %record.id, error = %e, "Failed to store posting"),
            }
        }

        tracing::info!(inserted, duplicates, "Inserted new documents");
        Ok(inserted)
    }

    fn find<'a>(&'a self, filter: &JobFilter) -> BoxStream<'a, StoreResult<JobRecord>> {
        sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, source, url, title, roles, fields, retrieved_at
            FROM jobs
            WHERE (?1 IS NULL OR source = ?1)
              AND (?2 IS NULL OR EXISTS (
                    SELECT 1 FROM json_each(jobs.roles) WHERE json_each.value = ?2))
              AND (?3 IS NULL OR retrieved_at >= ?3)
            ORDER BY retrieved_at, id
            "#,
        )
        .bind(filter.source.clone())
        .bind(filter.role.clone())
        .bind(filter.retrieved_since)
        .fetch(&self.pool)
        .map(|row| row.map_err(StoreError::from).and_then(JobRow::into_record))
        .boxed()
    }
}

#[derive(FromRow)]
struct JobRow {
    id: String,
    source: String,
    url: String,
    title: String,
    roles: String,
    fields: String,
    retrieved_at: DateTime<Utc>,
}

impl JobRow {
    fn into_record(self) -> StoreResult<JobRecord> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            reason,
        };
        let roles: BTreeSet<String> = serde_json::from_str(&self.roles)?;
        let roles = RoleSet::new(roles).ok_or_else(|| corrupt("no roles".to_string()))?;
        let fields: BTreeMap<JobField, String> = serde_json::from_str(&self.fields)
            .map_err(|e| corrupt(format!("unreadable fields: {e}")))?;

        Ok(JobRecord {
            id: JobId::new(self.id),
            source: self.source,
            url: self.url,
            title: self.title,
            roles,
            fields,
            retrieved_at: self.retrieved_at,
        })
    }
}
