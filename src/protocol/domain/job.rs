//! Protocol job aggregate and its lifecycle.

use super::{
    OrganizationId, ParseJobStatusError, ProjectId, ProtocolDomainError, ProtocolJobId,
    TaskFilterRequest, TaskFilters, UserId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a protocol job.
///
/// `Generating` is the initial state; the other two are terminal and
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolJobStatus {
    /// Rendering is scheduled or running.
    Generating,
    /// The document was stored.
    Completed,
    /// Rendering or storage failed.
    Failed,
}

impl ProtocolJobStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `completed` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Generating)
    }
}

impl fmt::Display for ProtocolJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProtocolJobStatus {
    type Error = ParseJobStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "generating" => Ok(Self::Generating),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseJobStatusError(value.to_owned())),
        }
    }
}

/// The stored document of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolArtifact {
    /// Blob store key.
    pub storage_key: String,
    /// Stored size in bytes.
    pub byte_size: u64,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
}

/// Parameters of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolJobRequest {
    /// Project to report on.
    pub project_id: ProjectId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// User who asked for the protocol.
    pub requested_by: UserId,
    /// Protocol title.
    pub name: String,
    /// Raw task filters.
    pub filters: TaskFilterRequest,
}

/// Protocol job aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolJob {
    id: ProtocolJobId,
    project_id: ProjectId,
    organization_id: OrganizationId,
    requested_by: UserId,
    name: String,
    filters: TaskFilters,
    status: ProtocolJobStatus,
    artifact: Option<ProtocolArtifact>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ProtocolJob {
    /// Creates a job in the `generating` state.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolDomainError::EmptyProtocolName`] for a blank name
    /// and [`ProtocolDomainError::InvalidFilter`] for unknown filter labels.
    pub fn new(request: ProtocolJobRequest, clock: &impl Clock) -> Result<Self, ProtocolDomainError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ProtocolDomainError::EmptyProtocolName);
        }
        let filters = TaskFilters::from_request(&request.filters)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: ProtocolJobId::new(),
            project_id: request.project_id,
            organization_id: request.organization_id,
            requested_by: request.requested_by,
            name: name.to_owned(),
            filters,
            status: ProtocolJobStatus::Generating,
            artifact: None,
            failure_reason: None,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
        })
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> ProtocolJobId {
        self.id
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the organization identifier.
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Returns the requesting user.
    #[must_use]
    pub const fn requested_by(&self) -> UserId {
        self.requested_by
    }

    /// Returns the protocol title.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the validated filters.
    #[must_use]
    pub const fn filters(&self) -> &TaskFilters {
        &self.filters
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ProtocolJobStatus {
        self.status
    }

    /// Returns the stored artifact; present iff the job completed.
    #[must_use]
    pub const fn artifact(&self) -> Option<&ProtocolArtifact> {
        self.artifact.as_ref()
    }

    /// Returns the failure reason; present iff the job failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns when the job reached a terminal state.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Moves the job to `completed` with its stored artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolDomainError::JobAlreadyTerminal`] if the job has
    /// already completed or failed.
    pub fn complete(
        &mut self,
        artifact: ProtocolArtifact,
        clock: &impl Clock,
    ) -> Result<(), ProtocolDomainError> {
        self.ensure_generating()?;
        self.status = ProtocolJobStatus::Completed;
        self.artifact = Some(artifact);
        self.finish(clock);
        Ok(())
    }

    /// Moves the job to `failed`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolDomainError::JobAlreadyTerminal`] if the job has
    /// already completed or failed.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), ProtocolDomainError> {
        self.ensure_generating()?;
        self.status = ProtocolJobStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.finish(clock);
        Ok(())
    }

    const fn ensure_generating(&self) -> Result<(), ProtocolDomainError> {
        if self.status.is_terminal() {
            return Err(ProtocolDomainError::JobAlreadyTerminal {
                job_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    fn finish(&mut self, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.updated_at = timestamp;
        self.completed_at = Some(timestamp);
    }
}
