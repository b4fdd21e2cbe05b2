//! In-memory project catalog serving every read-only catalog port.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::poisoned;
use crate::protocol::{
    domain::{
        OrganizationId, OrganizationMeta, ProjectId, ProjectMeta, TaskFilters, TaskId,
        TaskSnapshot,
    },
    ports::{
        BlueprintRef, BlueprintRepository, CatalogError, CatalogResult, OrganizationRepository,
        PhotoRef, ProjectRepository, TaskPhotoRepository, TaskRepository,
    },
};

/// Thread-safe in-memory catalog of projects, tasks, photos and blueprints.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectCatalog {
    state: Arc<RwLock<CatalogState>>,
}

#[derive(Debug, Default)]
struct CatalogState {
    organizations: HashMap<OrganizationId, OrganizationMeta>,
    projects: HashMap<ProjectId, (OrganizationId, ProjectMeta)>,
    tasks: HashMap<ProjectId, Vec<TaskSnapshot>>,
    photos: HashMap<TaskId, Vec<PhotoRef>>,
    blueprints: HashMap<ProjectId, Vec<BlueprintRef>>,
}

impl CatalogState {
    fn owns(&self, project_id: ProjectId, organization_id: OrganizationId) -> bool {
        self.projects
            .get(&project_id)
            .is_some_and(|(owner, _)| *owner == organization_id)
    }

    fn task_owned_by(&self, task_id: TaskId, organization_id: OrganizationId) -> bool {
        self.tasks.iter().any(|(project_id, tasks)| {
            self.owns(*project_id, organization_id) && tasks.iter().any(|task| task.id == task_id)
        })
    }
}

impl InMemoryProjectCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> CatalogResult<std::sync::RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|err| CatalogError::persistence(poisoned(&err)))
    }

    fn read(&self) -> CatalogResult<std::sync::RwLockReadGuard<'_, CatalogState>> {
        self.state
            .read()
            .map_err(|err| CatalogError::persistence(poisoned(&err)))
    }

    /// Adds or replaces an organization.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] if the lock is poisoned.
    pub fn insert_organization(
        &self,
        id: OrganizationId,
        organization: OrganizationMeta,
    ) -> CatalogResult<()> {
        self.write()?.organizations.insert(id, organization);
        Ok(())
    }

    /// Adds or replaces a project owned by `organization_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] if the lock is poisoned.
    pub fn insert_project(
        &self,
        id: ProjectId,
        organization_id: OrganizationId,
        project: ProjectMeta,
    ) -> CatalogResult<()> {
        self.write()?
            .projects
            .insert(id, (organization_id, project));
        Ok(())
    }

    /// Removes a project together with its tasks, photos and blueprints.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] if the lock is poisoned.
    pub fn remove_project(&self, id: ProjectId) -> CatalogResult<()> {
        let mut state = self.write()?;
        state.projects.remove(&id);
        state.blueprints.remove(&id);
        let removed = state.tasks.remove(&id).unwrap_or_default();
        for task in removed {
            state.photos.remove(&task.id);
        }
        Ok(())
    }

    /// Appends a task to a project.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] if the lock is poisoned.
    pub fn insert_task(&self, project_id: ProjectId, task: TaskSnapshot) -> CatalogResult<()> {
        self.write()?.tasks.entry(project_id).or_default().push(task);
        Ok(())
    }

    /// Appends a photo reference to its task.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] if the lock is poisoned.
    pub fn insert_photo(&self, photo: PhotoRef) -> CatalogResult<()> {
        self.write()?
            .photos
            .entry(photo.task_id)
            .or_default()
            .push(photo);
        Ok(())
    }

    /// Appends a blueprint reference to a project.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] if the lock is poisoned.
    pub fn insert_blueprint(
        &self,
        project_id: ProjectId,
        blueprint: BlueprintRef,
    ) -> CatalogResult<()> {
        self.write()?
            .blueprints
            .entry(project_id)
            .or_default()
            .push(blueprint);
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectCatalog {
    async fn get(
        &self,
        id: ProjectId,
        organization_id: OrganizationId,
    ) -> CatalogResult<Option<ProjectMeta>> {
        let state = self.read()?;
        Ok(state
            .projects
            .get(&id)
            .filter(|(owner, _)| *owner == organization_id)
            .map(|(_, project)| project.clone()))
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryProjectCatalog {
    async fn get(&self, id: OrganizationId) -> CatalogResult<Option<OrganizationMeta>> {
        Ok(self.read()?.organizations.get(&id).cloned())
    }
}

#[async_trait]
impl TaskRepository for InMemoryProjectCatalog {
    async fn query(
        &self,
        project_id: ProjectId,
        organization_id: OrganizationId,
        filters: &TaskFilters,
        cap: usize,
    ) -> CatalogResult<Vec<TaskSnapshot>> {
        let state = self.read()?;
        if !state.owns(project_id, organization_id) {
            return Ok(Vec::new());
        }
        let mut tasks: Vec<TaskSnapshot> = state
            .tasks
            .get(&project_id)
            .into_iter()
            .flatten()
            .filter(|task| filters.matches(task))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.number);
        tasks.truncate(cap);
        Ok(tasks)
    }
}

#[async_trait]
impl TaskPhotoRepository for InMemoryProjectCatalog {
    async fn list_by_task(
        &self,
        task_id: TaskId,
        organization_id: OrganizationId,
    ) -> CatalogResult<Vec<PhotoRef>> {
        let state = self.read()?;
        if !state.task_owned_by(task_id, organization_id) {
            return Ok(Vec::new());
        }
        Ok(state.photos.get(&task_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl BlueprintRepository for InMemoryProjectCatalog {
    async fn list_by_project(
        &self,
        project_id: ProjectId,
        organization_id: OrganizationId,
    ) -> CatalogResult<Vec<BlueprintRef>> {
        let state = self.read()?;
        if !state.owns(project_id, organization_id) {
            return Ok(Vec::new());
        }
        Ok(state.blueprints.get(&project_id).cloned().unwrap_or_default())
    }
}
