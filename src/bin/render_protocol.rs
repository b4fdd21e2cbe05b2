//! Renders one protocol from a bundle directory on disk.
//!
//! Usage:
//!
//! ```text
//! render_protocol <bundle-dir> [output-key]
//! ```
//!
//! `<bundle-dir>/bundle.json` must deserialize a [`Bundle`]. Photo and
//! blueprint paths are keys relative to the bundle directory, and the
//! finished document is written back into the same directory, under
//! `output-key` when given and the configured storage key template
//! otherwise. A representative bundle is:
//!
//! ```json
//! {
//!   "protocol_name": "Weekly site walk",
//!   "organization": { "name": "Northwall Construction" },
//!   "project": { "name": "Harbour Lofts", "address": "12 Harbour Road" },
//!   "filters": { "status": "open" },
//!   "blueprints": [{ "name": "Ground floor", "path": "plans/ground.pdf" }],
//!   "tasks": [{
//!     "number": 1,
//!     "title": "Seal window frame",
//!     "status": "open",
//!     "priority": "high",
//!     "trade": "Glazing",
//!     "blueprint": "Ground floor",
//!     "area": { "rect": { "x": 0.1, "y": 0.2, "width": 0.3, "height": 0.2 }, "page": 1 },
//!     "photos": [{ "path": "photos/frame.jpg", "caption": "North elevation" }]
//!   }],
//!   "config": { "task_cap": 500 }
//! }
//! ```
//!
//! The process exits with an error when the job ends `failed`.

use camino::Utf8PathBuf;
use mockable::DefaultClock;
use serde::Deserialize;
use site_protocol::protocol::{
    adapters::{
        fs::FsBlobStore,
        memory::{InMemoryAuditLog, InMemoryProjectCatalog, InMemoryProtocolJobRepository},
    },
    domain::{
        BlueprintId, Marker, OrganizationId, OrganizationMeta, ProjectId, ProjectMeta,
        ProtocolJobRequest, ProtocolJobStatus, TaskArea, TaskFilterRequest, TaskNumber,
        TaskPriority, TaskSnapshot, TaskStatus, UserId,
    },
    ports::{BlobStore, BlueprintRef, CatalogError, PhotoRef},
    services::{CatalogPorts, ProtocolConfig, ProtocolGenerationService},
};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const BUNDLE_FILE: &str = "bundle.json";

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while rendering a bundle.
#[derive(Debug, Error)]
enum RenderError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("failed to read bundle: {0}")]
    BundleRead(#[source] BoxError),
    #[error("failed to parse bundle: {0}")]
    BundleParse(#[source] serde_json::Error),
    #[error("task {number} refers to unknown blueprint '{blueprint}'")]
    UnknownBlueprint { number: u32, blueprint: String },
    #[error("failed to seed catalog: {0}")]
    Seed(#[source] CatalogError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("generation failed: {0}")]
    Generation(#[source] BoxError),
    #[error("protocol job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },
}

/// The contents of `bundle.json`.
#[derive(Debug, Deserialize)]
struct Bundle {
    protocol_name: String,
    organization: OrganizationMeta,
    project: ProjectMeta,
    #[serde(default)]
    filters: TaskFilterRequest,
    #[serde(default)]
    blueprints: Vec<BundleBlueprint>,
    #[serde(default)]
    tasks: Vec<BundleTask>,
    #[serde(default)]
    config: ProtocolConfig,
}

#[derive(Debug, Deserialize)]
struct BundleBlueprint {
    name: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct BundleTask {
    number: u32,
    title: String,
    status: TaskStatus,
    priority: TaskPriority,
    #[serde(default)]
    trade: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    blueprint: Option<String>,
    #[serde(default)]
    area: Option<TaskArea>,
    #[serde(default)]
    markers: Vec<Marker>,
    #[serde(default)]
    photos: Vec<BundlePhoto>,
}

#[derive(Debug, Deserialize)]
struct BundlePhoto {
    path: String,
    #[serde(default)]
    caption: Option<String>,
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let result = run(env::args_os().skip(1));
    if let Err(err) = &result {
        error!(error = %err, "protocol rendering failed");
    }
    result.map_err(Into::into)
}

fn run(args: impl Iterator<Item = std::ffi::OsString>) -> Result<(), RenderError> {
    let (bundle_dir, output_key) = parse_args(args)?;
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(RenderError::RuntimeInit)?;
    runtime.block_on(render(bundle_dir, output_key))
}

fn parse_args(
    args: impl Iterator<Item = std::ffi::OsString>,
) -> Result<(Utf8PathBuf, Option<String>), RenderError> {
    let mut args = args.map(|arg| {
        arg.into_string()
            .map_err(|_| RenderError::InvalidArgs("argument is not valid UTF-8".into()))
    });
    let bundle_dir = args
        .next()
        .ok_or_else(|| RenderError::InvalidArgs("missing bundle directory argument".into()))?
        .map(Utf8PathBuf::from)?;
    let output_key = args.next().transpose()?;
    if let Some(extra) = args.next().transpose()? {
        return Err(RenderError::InvalidArgs(format!(
            "unexpected extra argument: {extra}"
        )));
    }
    Ok((bundle_dir, output_key))
}

async fn render(bundle_dir: Utf8PathBuf, output_key: Option<String>) -> Result<(), RenderError> {
    let blobs = Arc::new(
        FsBlobStore::open(&bundle_dir).map_err(|err| RenderError::BundleRead(err.into()))?,
    );
    let raw = blobs
        .read(BUNDLE_FILE)
        .await
        .map_err(|err| RenderError::BundleRead(err.into()))?;
    let bundle: Bundle = serde_json::from_slice(&raw).map_err(RenderError::BundleParse)?;

    let mut config = bundle.config.clone();
    if let Some(key) = output_key {
        config.storage_key_template = key;
    }
    let catalog = Arc::new(InMemoryProjectCatalog::new());
    let request = seed_catalog(&catalog, &bundle)?;

    let service = ProtocolGenerationService::new(
        Arc::new(InMemoryProtocolJobRepository::new()),
        CatalogPorts::from_catalog(Arc::clone(&catalog), blobs),
        Arc::new(InMemoryAuditLog::new()),
        config,
        Arc::new(DefaultClock),
    )
    .map_err(|err| RenderError::Generation(err.into()))?;

    let ticket = service
        .start_generation(request)
        .await
        .map_err(|err| RenderError::Generation(err.into()))?;
    let job_id = ticket.job_id;
    let status = ticket
        .wait()
        .await
        .map_err(|err| RenderError::Generation(err.into()))?;
    let view = service
        .get_job(job_id)
        .await
        .map_err(|err| RenderError::Generation(err.into()))?;

    match (status, view) {
        (ProtocolJobStatus::Completed, Some(view)) => {
            let key = view.download_ref.unwrap_or_default();
            info!(%job_id, storage_key = %key, dir = %bundle_dir, "protocol written");
            Ok(())
        }
        (_, view) => Err(RenderError::JobFailed {
            job_id: job_id.to_string(),
            reason: view
                .and_then(|view| view.failure_reason)
                .unwrap_or_else(|| "job record missing".to_owned()),
        }),
    }
}

/// Loads the bundle into `catalog` and returns the matching request.
fn seed_catalog(
    catalog: &InMemoryProjectCatalog,
    bundle: &Bundle,
) -> Result<ProtocolJobRequest, RenderError> {
    let organization_id = OrganizationId::new();
    let project_id = ProjectId::new();
    catalog
        .insert_organization(organization_id, bundle.organization.clone())
        .map_err(RenderError::Seed)?;
    catalog
        .insert_project(project_id, organization_id, bundle.project.clone())
        .map_err(RenderError::Seed)?;

    let mut blueprint_ids = HashMap::new();
    for blueprint in &bundle.blueprints {
        let id = BlueprintId::new();
        catalog
            .insert_blueprint(
                project_id,
                BlueprintRef {
                    id,
                    name: blueprint.name.clone(),
                    storage_key: blueprint.path.clone(),
                },
            )
            .map_err(RenderError::Seed)?;
        blueprint_ids.insert(blueprint.name.as_str(), id);
    }

    for entry in &bundle.tasks {
        let task = snapshot(entry, &blueprint_ids)?;
        for photo in &entry.photos {
            catalog
                .insert_photo(PhotoRef {
                    task_id: task.id,
                    storage_key: photo.path.clone(),
                    caption: photo.caption.clone(),
                })
                .map_err(RenderError::Seed)?;
        }
        catalog
            .insert_task(project_id, task)
            .map_err(RenderError::Seed)?;
    }

    Ok(ProtocolJobRequest {
        project_id,
        organization_id,
        requested_by: UserId::new(),
        name: bundle.protocol_name.clone(),
        filters: bundle.filters.clone(),
    })
}

fn snapshot(
    entry: &BundleTask,
    blueprint_ids: &HashMap<&str, BlueprintId>,
) -> Result<TaskSnapshot, RenderError> {
    let mut task = TaskSnapshot::new(
        TaskNumber::new(entry.number),
        entry.title.clone(),
        entry.status.clone(),
        entry.priority,
    )
    .with_photo_count(u32::try_from(entry.photos.len()).unwrap_or(u32::MAX));
    task.trade.clone_from(&entry.trade);
    task.assignee.clone_from(&entry.assignee);

    let Some(name) = entry.blueprint.as_deref() else {
        return Ok(task);
    };
    let blueprint_id =
        *blueprint_ids
            .get(name)
            .ok_or_else(|| RenderError::UnknownBlueprint {
                number: entry.number,
                blueprint: name.to_owned(),
            })?;
    if let Some(area) = entry.area {
        task = task.with_area(blueprint_id, area);
    }
    Ok(task.with_markers(blueprint_id, entry.markers.clone()))
}
