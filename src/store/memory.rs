use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{JobFilter, JobStore};
use crate::error::StoreResult;
use crate::model::{JobId, JobRecord};

/// Process-local store, for tests and dry runs. Data is lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<JobId, JobRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.records.read().await.get(id).cloned()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_many(&self, records: &[JobRecord]) -> StoreResult<usize> {
        let mut stored = self.records.write().await;
        let mut inserted = 0;
        for record in records {
            if stored.contains_key(&record.id) {
                continue;
            }
            stored.insert(record.id.clone(), record.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    fn find<'a>(&'a self, filter: &JobFilter) -> BoxStream<'a, StoreResult<JobRecord>> {
        let filter = filter.clone();
        stream::once(async move {
            let stored = self.records.read().await;
            let matching: Vec<_> = stored
                .values()
                .filter(|record| filter.matches(record))
                .cloned()
                .map(Ok)
                .collect();
            stream::iter(matching)
        })
        .flatten()
        .boxed()
    }
}
