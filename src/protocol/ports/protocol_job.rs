//! Repository port for protocol job records.

use crate::protocol::domain::{ProtocolJob, ProtocolJobId, ProtocolJobStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for protocol job repository operations.
pub type ProtocolJobRepositoryResult<T> = Result<T, ProtocolJobRepositoryError>;

/// Protocol job persistence contract.
///
/// The terminal writes accept the already-transitioned aggregate and only
/// succeed while the stored row is still `generating`, so a terminal row is
/// never overwritten.
#[async_trait]
pub trait ProtocolJobRepository: Send + Sync {
    /// Stores a new job.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolJobRepositoryError::Duplicate`] when the identifier
    /// already exists.
    async fn store(&self, job: &ProtocolJob) -> ProtocolJobRepositoryResult<()>;

    /// Finds a job by identifier.
    async fn find_by_id(&self, id: ProtocolJobId) -> ProtocolJobRepositoryResult<Option<ProtocolJob>>;

    /// Persists a job that has moved to `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolJobRepositoryError::NotFound`] for unknown jobs and
    /// [`ProtocolJobRepositoryError::Transition`] when the stored row is
    /// already terminal or `job` is not completed.
    async fn mark_completed(&self, job: &ProtocolJob) -> ProtocolJobRepositoryResult<()>;

    /// Persists a job that has moved to `failed`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolJobRepositoryError::NotFound`] for unknown jobs and
    /// [`ProtocolJobRepositoryError::Transition`] when the stored row is
    /// already terminal or `job` is not failed.
    async fn mark_failed(&self, job: &ProtocolJob) -> ProtocolJobRepositoryResult<()>;
}

/// Errors returned by protocol job repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ProtocolJobRepositoryError {
    /// A job with the same identifier already exists.
    #[error("duplicate protocol job identifier: {0}")]
    Duplicate(ProtocolJobId),

    /// The job was not found.
    #[error("protocol job not found: {0}")]
    NotFound(ProtocolJobId),

    /// The stored row cannot move to the requested status.
    #[error("protocol job {id} cannot move from {from} to {to}")]
    Transition {
        /// Job identifier.
        id: ProtocolJobId,
        /// Stored status.
        from: ProtocolJobStatus,
        /// Requested status.
        to: ProtocolJobStatus,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProtocolJobRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
