//! In-memory protocol job repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::poisoned;
use crate::protocol::{
    domain::{ProtocolJob, ProtocolJobId, ProtocolJobStatus},
    ports::{ProtocolJobRepository, ProtocolJobRepositoryError, ProtocolJobRepositoryResult},
};

/// Thread-safe in-memory protocol job repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProtocolJobRepository {
    state: Arc<RwLock<HashMap<ProtocolJobId, ProtocolJob>>>,
}

impl InMemoryProtocolJobRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored jobs.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolJobRepositoryError::Persistence`] if the lock is
    /// poisoned.
    pub fn job_count(&self) -> ProtocolJobRepositoryResult<usize> {
        let jobs = self
            .state
            .read()
            .map_err(|err| ProtocolJobRepositoryError::persistence(poisoned(&err)))?;
        Ok(jobs.len())
    }

    fn finish(
        &self,
        job: &ProtocolJob,
        expected: ProtocolJobStatus,
    ) -> ProtocolJobRepositoryResult<()> {
        let mut jobs = self
            .state
            .write()
            .map_err(|err| ProtocolJobRepositoryError::persistence(poisoned(&err)))?;
        let stored = jobs
            .get_mut(&job.id())
            .ok_or(ProtocolJobRepositoryError::NotFound(job.id()))?;
        if stored.status().is_terminal() || job.status() != expected {
            return Err(ProtocolJobRepositoryError::Transition {
                id: job.id(),
                from: stored.status(),
                to: job.status(),
            });
        }
        *stored = job.clone();
        Ok(())
    }
}

#[async_trait]
impl ProtocolJobRepository for InMemoryProtocolJobRepository {
    async fn store(&self, job: &ProtocolJob) -> ProtocolJobRepositoryResult<()> {
        let mut jobs = self
            .state
            .write()
            .map_err(|err| ProtocolJobRepositoryError::persistence(poisoned(&err)))?;
        if jobs.contains_key(&job.id()) {
            return Err(ProtocolJobRepositoryError::Duplicate(job.id()));
        }
        jobs.insert(job.id(), job.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: ProtocolJobId,
    ) -> ProtocolJobRepositoryResult<Option<ProtocolJob>> {
        let jobs = self
            .state
            .read()
            .map_err(|err| ProtocolJobRepositoryError::persistence(poisoned(&err)))?;
        Ok(jobs.get(&id).cloned())
    }

    async fn mark_completed(&self, job: &ProtocolJob) -> ProtocolJobRepositoryResult<()> {
        self.finish(job, ProtocolJobStatus::Completed)
    }

    async fn mark_failed(&self, job: &ProtocolJob) -> ProtocolJobRepositoryResult<()> {
        self.finish(job, ProtocolJobStatus::Failed)
    }
}
