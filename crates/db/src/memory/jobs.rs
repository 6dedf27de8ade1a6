use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use seo_writer_core::article::{ArticleInput, ArticleOutput};
use seo_writer_core::lifecycle::JobStatus;
use seo_writer_core::pagination::{clamp_limit, clamp_offset, page_number, DEFAULT_LIMIT, MAX_LIMIT};
use seo_writer_core::types::{DbId, OwnerId, Timestamp};

use super::poisoned;
use crate::models::job::{Job, JobListQuery, JobPage, TransitionFields};
use crate::store::{validate_edge, JobStore, StoreError, StoreResult};

type Slot = Arc<Mutex<Job>>;

/// In-memory job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<DbId, Slot>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed record, replacing any job with the same id.
    pub fn insert(&self, job: Job) -> StoreResult<()> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        jobs.insert(job.id, Arc::new(Mutex::new(job)));
        Ok(())
    }

    fn slot(&self, id: DbId) -> StoreResult<Option<Slot>> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        Ok(jobs.get(&id).cloned())
    }

    /// Clone every record. Each job is locked only while it is copied.
    fn snapshot(&self) -> StoreResult<Vec<Job>> {
        let slots: Vec<Slot> = {
            let jobs = self.jobs.read().map_err(|_| poisoned())?;
            jobs.values().cloned().collect()
        };
        slots
            .iter()
            .map(|slot| slot.lock().map(|job| job.clone()).map_err(|_| poisoned()))
            .collect()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, owner_id: OwnerId, input: ArticleInput) -> StoreResult<Job> {
        let job = Job::new_pending(owner_id, input, Utc::now());
        self.insert(job.clone())?;
        Ok(job)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Job>> {
        match self.slot(id)? {
            Some(slot) => {
                let job = slot.lock().map_err(|_| poisoned())?;
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner_id: OwnerId, params: &JobListQuery) -> StoreResult<JobPage> {
        let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
        let offset = clamp_offset(params.offset);

        let mut matching: Vec<Job> = self
            .snapshot()?
            .into_iter()
            .filter(|job| job.owner_id == owner_id)
            .filter(|job| params.status.map_or(true, |status| job.status == status))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let jobs = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(JobPage {
            jobs,
            total,
            page: page_number(offset, limit),
            limit,
        })
    }

    async fn transition(
        &self,
        id: DbId,
        expected: JobStatus,
        next: JobStatus,
        fields: TransitionFields,
    ) -> StoreResult<Job> {
        validate_edge(expected, next)?;

        let slot = self.slot(id)?.ok_or(StoreError::NotFound { id })?;
        let mut job = slot.lock().map_err(|_| poisoned())?;
        if job.status != expected {
            return Err(StoreError::Conflict {
                id,
                expected,
                actual: job.status,
            });
        }
        job.apply(next, &fields, Utc::now());
        Ok(job.clone())
    }

    async fn list_stale(&self, cutoff: Timestamp) -> StoreResult<Vec<Job>> {
        let mut stale: Vec<Job> = self
            .snapshot()?
            .into_iter()
            .filter(|job| !job.status.is_terminal() && job.created_at < cutoff)
            .collect();
        stale.sort_by_key(|job| job.created_at);
        Ok(stale)
    }

    async fn update_output(
        &self,
        id: DbId,
        owner_id: OwnerId,
        output: ArticleOutput,
    ) -> StoreResult<Job> {
        let slot = self.slot(id)?.ok_or(StoreError::NotFound { id })?;
        let mut job = slot.lock().map_err(|_| poisoned())?;
        if job.owner_id != owner_id {
            return Err(StoreError::NotFound { id });
        }
        if job.status != JobStatus::Completed {
            return Err(StoreError::Conflict {
                id,
                expected: JobStatus::Completed,
                actual: job.status,
            });
        }
        job.output_data = Some(output);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn delete(&self, id: DbId, owner_id: OwnerId) -> StoreResult<bool> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        let owned = match jobs.get(&id) {
            Some(slot) => slot.lock().map_err(|_| poisoned())?.owner_id == owner_id,
            None => false,
        };
        if owned {
            jobs.remove(&id);
        }
        Ok(owned)
    }
}
