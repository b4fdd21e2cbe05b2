//! Loads everything a protocol needs from the catalog and blob store.

use crate::protocol::{
    domain::{
        Annotation, BlueprintDocument, MarkerGroup, OrganizationId, PhotoGroup, ProjectId,
        ReportData, TaskFilters, TaskId, TaskNumber, TaskPhotoAsset, TaskSnapshot,
    },
    ports::{
        BlobStore, BlueprintRef, BlueprintRepository, CatalogError, OrganizationRepository,
        PhotoRef, ProjectRepository, TaskPhotoRepository, TaskRepository,
    },
};
use futures::{StreamExt, TryStreamExt, stream};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that stop aggregation.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// The project does not exist in the organization.
    #[error("project {0} not found")]
    MissingProject(ProjectId),

    /// The organization does not exist.
    #[error("organization {0} not found")]
    MissingOrganization(OrganizationId),

    /// A catalog lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result type for aggregation.
pub type AggregationResult<T> = Result<T, AggregationError>;

/// The read-only collaborators the aggregator loads from.
#[derive(Clone)]
pub struct CatalogPorts {
    /// Project lookup.
    pub projects: Arc<dyn ProjectRepository>,
    /// Organization lookup.
    pub organizations: Arc<dyn OrganizationRepository>,
    /// Task query.
    pub tasks: Arc<dyn TaskRepository>,
    /// Photo listing.
    pub photos: Arc<dyn TaskPhotoRepository>,
    /// Blueprint listing.
    pub blueprints: Arc<dyn BlueprintRepository>,
    /// Source of photo and blueprint bytes.
    pub blobs: Arc<dyn BlobStore>,
}

impl CatalogPorts {
    /// Uses one value for every catalog port.
    #[must_use]
    pub fn from_catalog<T>(catalog: Arc<T>, blobs: Arc<dyn BlobStore>) -> Self
    where
        T: ProjectRepository
            + OrganizationRepository
            + TaskRepository
            + TaskPhotoRepository
            + BlueprintRepository
            + 'static,
    {
        Self {
            projects: catalog.clone(),
            organizations: catalog.clone(),
            tasks: catalog.clone(),
            photos: catalog.clone(),
            blueprints: catalog,
            blobs,
        }
    }
}

/// Builds [`ReportData`] for one project.
///
/// Photo and blueprint reads fan out with at most `read_concurrency`
/// requests in flight; results keep catalog order.
#[derive(Clone)]
pub struct ReportAggregator<C>
where
    C: Clock + Send + Sync,
{
    ports: CatalogPorts,
    task_cap: usize,
    read_concurrency: usize,
    clock: Arc<C>,
}

impl<C> ReportAggregator<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an aggregator.
    #[must_use]
    pub fn new(ports: CatalogPorts, task_cap: usize, read_concurrency: usize, clock: Arc<C>) -> Self {
        Self {
            ports,
            task_cap,
            read_concurrency: read_concurrency.max(1),
            clock,
        }
    }

    /// Loads project metadata, filtered tasks, their photos and every
    /// project blueprint with the overlays of the loaded tasks.
    ///
    /// The returned report is titled with the project name; callers rename
    /// it with [`ReportData::titled`].
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::MissingProject`] or
    /// [`AggregationError::MissingOrganization`] when either is absent and
    /// [`AggregationError::Catalog`] when a lookup fails. Unreadable photos
    /// and blueprints are logged and left out instead.
    pub async fn aggregate(
        &self,
        project_id: ProjectId,
        organization_id: OrganizationId,
        filters: &TaskFilters,
    ) -> AggregationResult<ReportData> {
        let project = self
            .ports
            .projects
            .get(project_id, organization_id)
            .await?
            .ok_or(AggregationError::MissingProject(project_id))?;
        let organization = self
            .ports
            .organizations
            .get(organization_id)
            .await?
            .ok_or(AggregationError::MissingOrganization(organization_id))?;

        let tasks = self
            .ports
            .tasks
            .query(project_id, organization_id, filters, self.task_cap)
            .await?;
        if tasks.len() >= self.task_cap {
            warn!(
                project_id = %project_id,
                cap = self.task_cap,
                "task list reached the cap; further tasks are omitted"
            );
        }

        let photo_groups = self.load_photo_groups(&tasks, organization_id).await?;
        let refs = self
            .ports
            .blueprints
            .list_by_project(project_id, organization_id)
            .await?;
        let blueprints = self.load_blueprints(refs, &tasks).await;

        debug!(
            project_id = %project_id,
            tasks = tasks.len(),
            photo_groups = photo_groups.len(),
            blueprints = blueprints.len(),
            "report data aggregated"
        );
        Ok(ReportData {
            protocol_name: project.name.clone(),
            project,
            organization,
            filters: filters.clone(),
            tasks,
            photo_groups,
            blueprints,
            generated_at: self.clock.utc(),
        })
    }

    async fn load_photo_groups(
        &self,
        tasks: &[TaskSnapshot],
        organization_id: OrganizationId,
    ) -> AggregationResult<Vec<PhotoGroup>> {
        let with_photos: Vec<(TaskId, TaskNumber, String)> = tasks
            .iter()
            .filter(|task| task.photo_count > 0)
            .map(|task| (task.id, task.number, task.title.clone()))
            .collect();
        let groups: Vec<PhotoGroup> = stream::iter(with_photos)
            .map(|(task_id, task_number, task_title)| async move {
                let refs = self.ports.photos.list_by_task(task_id, organization_id).await?;
                let photos = self.read_photos(refs).await;
                Ok::<_, AggregationError>(PhotoGroup {
                    task_number,
                    task_title,
                    photos,
                })
            })
            .buffered(self.read_concurrency)
            .try_collect()
            .await?;
        Ok(groups
            .into_iter()
            .filter(|group| !group.photos.is_empty())
            .collect())
    }

    async fn read_photos(&self, refs: Vec<PhotoRef>) -> Vec<TaskPhotoAsset> {
        stream::iter(refs)
            .map(|photo| async move {
                match self.ports.blobs.read(&photo.storage_key).await {
                    Ok(bytes) => Some(TaskPhotoAsset {
                        task_id: photo.task_id,
                        caption: photo.caption,
                        bytes,
                    }),
                    Err(err) => {
                        warn!(
                            task_id = %photo.task_id,
                            photo_key = %photo.storage_key,
                            error = %err,
                            "photo dropped from protocol"
                        );
                        None
                    }
                }
            })
            .buffered(self.read_concurrency)
            .filter_map(|photo| async move { photo })
            .collect()
            .await
    }

    async fn load_blueprints(
        &self,
        refs: Vec<BlueprintRef>,
        tasks: &[TaskSnapshot],
    ) -> Vec<BlueprintDocument> {
        stream::iter(refs)
            .map(|blueprint| async move {
                match self.ports.blobs.read(&blueprint.storage_key).await {
                    Ok(source) => Some(attach_overlays(
                        BlueprintDocument::new(blueprint.id, blueprint.name, source),
                        tasks,
                    )),
                    Err(err) => {
                        warn!(
                            blueprint_id = %blueprint.id,
                            blueprint_key = %blueprint.storage_key,
                            error = %err,
                            "blueprint source unreadable; skipped"
                        );
                        None
                    }
                }
            })
            .buffered(self.read_concurrency)
            .filter_map(|blueprint| async move { blueprint })
            .collect()
            .await
    }
}

fn attach_overlays(mut blueprint: BlueprintDocument, tasks: &[TaskSnapshot]) -> BlueprintDocument {
    for task in tasks
        .iter()
        .filter(|task| task.blueprint_id == Some(blueprint.id))
    {
        if let Some(area) = task.area {
            blueprint.annotations.push(Annotation {
                task_number: task.number,
                task_status: task.status.clone(),
                rect: area.rect,
                page: area.page,
            });
        }
        if !task.markers.is_empty() {
            blueprint.marker_groups.push(MarkerGroup {
                task_number: task.number,
                markers: task.markers.clone(),
            });
        }
    }
    blueprint
}
