//! Deduplicating persistence for [`JobRecord`]s.
//!
//! Records are unique by `id`. Inserting an id that is already stored is a
//! silent no-op, so re-ingesting a batch is always safe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::StoreResult;
use crate::model::JobRecord;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts records whose id is not stored yet and returns how many were
    /// new. One failing record does not keep the others from being stored.
    async fn insert_many(&self, records: &[JobRecord]) -> StoreResult<usize>;

    /// Lazily yields every stored record matching `filter`.
    fn find<'a>(&'a self, filter: &JobFilter) -> BoxStream<'a, StoreResult<JobRecord>>;
}

/// Conditions a record must meet to be returned by [`JobStore::find`].
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    pub role: Option<String>,
    pub source: Option<String>,
    pub retrieved_since: Option<DateTime<Utc>>,
}

impl JobFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn retrieved_since(mut self, since: DateTime<Utc>) -> Self {
        self.retrieved_since = Some(since);
        self
    }

    pub fn matches(&self, record: &JobRecord) -> bool {
        self.role.as_deref().map_or(true, |role| record.roles.contains(role))
            && self.source.as_deref().map_or(true, |source| record.source == source)
            && self
                .retrieved_since
                .map_or(true, |since| record.retrieved_at >= since)
    }
}
