//! Read-only catalog ports the aggregator loads report data from.

use crate::protocol::domain::{
    BlueprintId, OrganizationId, OrganizationMeta, ProjectId, ProjectMeta, TaskFilters, TaskId,
    TaskSnapshot,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for catalog lookups.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Reference to a stored task photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    /// Owning task.
    pub task_id: TaskId,
    /// Blob store key of the encoded image.
    pub storage_key: String,
    /// Optional caption.
    pub caption: Option<String>,
}

/// Reference to a stored blueprint document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintRef {
    /// Blueprint identifier.
    pub id: BlueprintId,
    /// Display name.
    pub name: String,
    /// Blob store key of the source document.
    pub storage_key: String,
}

/// Project lookup scoped to an organization.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Returns the project, or `None` when it does not exist in the
    /// organization.
    async fn get(
        &self,
        id: ProjectId,
        organization_id: OrganizationId,
    ) -> CatalogResult<Option<ProjectMeta>>;
}

/// Organization lookup.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Returns the organization, or `None` when it does not exist.
    async fn get(&self, id: OrganizationId) -> CatalogResult<Option<OrganizationMeta>>;
}

/// Filtered task query.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Returns at most `cap` tasks of the project matching `filters`,
    /// ordered by task number.
    async fn query(
        &self,
        project_id: ProjectId,
        organization_id: OrganizationId,
        filters: &TaskFilters,
        cap: usize,
    ) -> CatalogResult<Vec<TaskSnapshot>>;
}

/// Photo listing per task.
#[async_trait]
pub trait TaskPhotoRepository: Send + Sync {
    /// Returns the task's photos in upload order.
    async fn list_by_task(
        &self,
        task_id: TaskId,
        organization_id: OrganizationId,
    ) -> CatalogResult<Vec<PhotoRef>>;
}

/// Blueprint listing per project.
#[async_trait]
pub trait BlueprintRepository: Send + Sync {
    /// Returns the project's blueprints in display order.
    async fn list_by_project(
        &self,
        project_id: ProjectId,
        organization_id: OrganizationId,
    ) -> CatalogResult<Vec<BlueprintRef>>;
}

/// Errors returned by catalog implementations.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Persistence-layer failure.
    #[error("catalog error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CatalogError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
