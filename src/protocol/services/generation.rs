//! Protocol job orchestration.
//!
//! [`ProtocolGenerationService::start_generation`] validates the request,
//! stores a `generating` job and hands the pipeline to the
//! [`GenerationPool`]; the caller gets the job id before any rendering
//! starts. The background unit aggregates, composes and embeds, stores the
//! bytes and finally records a terminal status. Every failure inside it is
//! reduced to `failed`.

use super::aggregator::{AggregationError, CatalogPorts, ReportAggregator};
use super::composer::{CompositionError, DocumentComposer};
use super::config::{ConfigError, ProtocolConfig};
use super::embedder::{BlueprintEmbedder, EmbedError, EmbedOutcome};
use super::pool::{GenerationPool, JobHandle, PoolFull, PoolStats};
use crate::protocol::{
    domain::{
        ProtocolArtifact, ProtocolDomainError, ProtocolJob, ProtocolJobId, ProtocolJobRequest,
        ProtocolJobStatus,
    },
    ports::{
        ACTION_GENERATED, ACTION_GENERATION_FAILED, ACTION_GENERATION_REQUESTED, AuditEntry,
        AuditLog, BlobStore, BlobStoreError, PDF_CONTENT_TYPE, ProtocolJobRepository,
        ProtocolJobRepositoryError,
    },
};
use mockable::Clock;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// Service-level errors for protocol generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Request validation failed.
    #[error(transparent)]
    Domain(#[from] ProtocolDomainError),
    /// The job repository failed.
    #[error(transparent)]
    Repository(#[from] ProtocolJobRepositoryError),
    /// The pool is full; no job was created.
    #[error(transparent)]
    Backpressure(#[from] PoolFull),
    /// Report data could not be loaded.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    /// The base document could not be composed.
    #[error(transparent)]
    Composition(#[from] CompositionError),
    /// Blueprints could not be merged into the output.
    #[error(transparent)]
    Embedding(#[from] EmbedError),
    /// The finished document could not be stored.
    #[error("failed to store protocol: {0}")]
    Persist(#[source] BlobStoreError),
    /// A background task panicked or was cancelled.
    #[error("generation worker failed: {0}")]
    Worker(#[from] JoinError),
    /// The configuration or storage key template is unusable.
    #[error(transparent)]
    StorageKey(#[from] ConfigError),
}

/// Result type for generation service operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Read model of a job for callers polling its progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolJobView {
    /// Job identifier.
    pub job_id: ProtocolJobId,
    /// Lifecycle status.
    pub status: ProtocolJobStatus,
    /// Storage key of the document; present iff completed.
    pub download_ref: Option<String>,
    /// Why the job failed; present iff failed.
    pub failure_reason: Option<String>,
}

impl From<&ProtocolJob> for ProtocolJobView {
    fn from(job: &ProtocolJob) -> Self {
        Self {
            job_id: job.id(),
            status: job.status(),
            download_ref: job.artifact().map(|artifact| artifact.storage_key.clone()),
            failure_reason: job.failure_reason().map(str::to_owned),
        }
    }
}

/// An accepted generation request.
#[derive(Debug)]
pub struct GenerationTicket {
    /// Identifier of the created job.
    pub job_id: ProtocolJobId,
    handle: JobHandle<ProtocolJobStatus>,
}

impl GenerationTicket {
    /// Waits for the background unit and returns the terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Worker`] if the background task panicked.
    pub async fn wait(self) -> GenerationResult<ProtocolJobStatus> {
        Ok(self.handle.wait().await?)
    }
}

struct Pipeline<R, C>
where
    R: ProtocolJobRepository,
    C: Clock + Send + Sync,
{
    jobs: Arc<R>,
    aggregator: ReportAggregator<C>,
    composer: DocumentComposer,
    embedder: BlueprintEmbedder,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditLog>,
    config: ProtocolConfig,
    clock: Arc<C>,
}

/// Orchestrates protocol jobs from request to stored document.
pub struct ProtocolGenerationService<R, C>
where
    R: ProtocolJobRepository,
    C: Clock + Send + Sync,
{
    pipeline: Arc<Pipeline<R, C>>,
    pool: GenerationPool,
}

impl<R, C> Clone for ProtocolGenerationService<R, C>
where
    R: ProtocolJobRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            pool: self.pool.clone(),
        }
    }
}

impl<R, C> ProtocolGenerationService<R, C>
where
    R: ProtocolJobRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a service; `ports.blobs` serves both source reads and the
    /// finished document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn new(
        jobs: Arc<R>,
        ports: CatalogPorts,
        audit: Arc<dyn AuditLog>,
        config: ProtocolConfig,
        clock: Arc<C>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let blobs = Arc::clone(&ports.blobs);
        let aggregator = ReportAggregator::new(
            ports,
            config.task_cap,
            config.read_concurrency,
            Arc::clone(&clock),
        );
        let pool = GenerationPool::new(config.max_concurrent_jobs, config.max_pending_jobs);
        Ok(Self {
            pipeline: Arc::new(Pipeline {
                jobs,
                aggregator,
                composer: DocumentComposer::new(config.layout.clone()),
                embedder: BlueprintEmbedder::new(config.layout.clone()),
                blobs,
                audit,
                config,
                clock,
            }),
            pool,
        })
    }

    /// Accepts a generation request and schedules it in the background.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Backpressure`] when the pool is full,
    /// [`GenerationError::Domain`] for invalid requests and
    /// [`GenerationError::Repository`] when the job cannot be stored. No job
    /// exists after any of these.
    pub async fn start_generation(
        &self,
        request: ProtocolJobRequest,
    ) -> GenerationResult<GenerationTicket> {
        let slot = self.pool.try_reserve()?;
        let job = ProtocolJob::new(request, &*self.pipeline.clock)?;
        self.pipeline.jobs.store(&job).await?;
        info!(
            job_id = %job.id(),
            project_id = %job.project_id(),
            organization_id = %job.organization_id(),
            "protocol generation accepted"
        );
        self.pipeline
            .audit_entry(
                &job,
                ACTION_GENERATION_REQUESTED,
                json!({
                    "job_id": job.id(),
                    "project_id": job.project_id(),
                    "name": job.name(),
                    "filters": job.filters(),
                }),
            )
            .await;

        let job_id = job.id();
        let pipeline = Arc::clone(&self.pipeline);
        let handle = self.pool.spawn(slot, async move { pipeline.run(job).await });
        Ok(GenerationTicket { job_id, handle })
    }

    /// Returns the job's status and, once completed, its storage key.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Repository`] when the lookup fails.
    pub async fn get_job(&self, job_id: ProtocolJobId) -> GenerationResult<Option<ProtocolJobView>> {
        let job = self.pipeline.jobs.find_by_id(job_id).await?;
        Ok(job.as_ref().map(ProtocolJobView::from))
    }

    /// Returns current pool occupancy.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl<R, C> Pipeline<R, C>
where
    R: ProtocolJobRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn run(&self, job: ProtocolJob) -> ProtocolJobStatus {
        let generated = self.generate(&job).await.map_err(|err| err.to_string());
        match generated {
            Ok(artifact) => self.complete(job, artifact).await,
            Err(reason) => self.fail(job, reason).await,
        }
    }

    async fn generate(&self, job: &ProtocolJob) -> GenerationResult<ProtocolArtifact> {
        let report = self
            .aggregator
            .aggregate(job.project_id(), job.organization_id(), job.filters())
            .await?
            .titled(job.name());
        let storage_key =
            self.config
                .storage_key(job.organization_id(), job.project_id(), job.id())?;

        let composer = self.composer.clone();
        let embedder = self.embedder.clone();
        let outcome = tokio::task::spawn_blocking(move || -> GenerationResult<EmbedOutcome> {
            let composed = composer.compose_base(&report)?;
            Ok(embedder.embed(
                &composed.bytes,
                &report.blueprints,
                composed.base_page_count,
            )?)
        })
        .await??;
        for skipped in &outcome.report.skipped {
            warn!(
                job_id = %job.id(),
                blueprint_id = %skipped.blueprint_id,
                reason = %skipped.reason,
                "blueprint left out of protocol"
            );
        }

        self.blobs
            .write(&storage_key, &outcome.bytes, PDF_CONTENT_TYPE)
            .await
            .map_err(GenerationError::Persist)?;
        Ok(ProtocolArtifact {
            storage_key,
            byte_size: u64::try_from(outcome.bytes.len()).unwrap_or(u64::MAX),
            sha256: hex_digest(&outcome.bytes),
        })
    }

    async fn complete(&self, job: ProtocolJob, artifact: ProtocolArtifact) -> ProtocolJobStatus {
        let stored_key = artifact.storage_key.clone();
        let mut completed = job.clone();
        if let Err(err) = completed.complete(artifact, &*self.clock) {
            let reason = err.to_string();
            self.discard(&job, &stored_key).await;
            return self.fail(job, reason).await;
        }
        if let Err(err) = self.jobs.mark_completed(&completed).await {
            let reason = err.to_string();
            error!(job_id = %job.id(), error = %reason, "could not record completed protocol");
            self.discard(&job, &stored_key).await;
            return self.fail(job, reason).await;
        }

        let (storage_key, byte_size, sha256) = completed
            .artifact()
            .map(|artifact| {
                (
                    artifact.storage_key.clone(),
                    artifact.byte_size,
                    artifact.sha256.clone(),
                )
            })
            .unwrap_or_default();
        info!(
            job_id = %completed.id(),
            storage_key = %storage_key,
            byte_size,
            "protocol generated"
        );
        self.audit_entry(
            &completed,
            ACTION_GENERATED,
            json!({
                "job_id": completed.id(),
                "project_id": completed.project_id(),
                "storage_key": storage_key,
                "byte_size": byte_size,
                "sha256": sha256,
            }),
        )
        .await;
        ProtocolJobStatus::Completed
    }

    async fn fail(&self, job: ProtocolJob, reason: String) -> ProtocolJobStatus {
        error!(job_id = %job.id(), reason = %reason, "protocol generation failed");
        let mut failed = job;
        if let Err(err) = failed.fail(reason.clone(), &*self.clock) {
            warn!(job_id = %failed.id(), error = %err, "job already terminal");
            return failed.status();
        }
        if let Err(err) = self.jobs.mark_failed(&failed).await {
            error!(job_id = %failed.id(), error = %err, "could not record failed protocol");
        }
        self.audit_entry(
            &failed,
            ACTION_GENERATION_FAILED,
            json!({
                "job_id": failed.id(),
                "project_id": failed.project_id(),
                "reason": reason,
            }),
        )
        .await;
        ProtocolJobStatus::Failed
    }

    /// Removes a document written for a job that did not complete.
    async fn discard(&self, job: &ProtocolJob, storage_key: &str) {
        match self.blobs.delete(storage_key).await {
            Ok(()) => debug!(job_id = %job.id(), storage_key, "discarded unrecorded protocol"),
            Err(err) => warn!(
                job_id = %job.id(),
                storage_key,
                error = %err,
                "unrecorded protocol left in storage"
            ),
        }
    }

    /// Records an audit entry; failures are logged and never propagate.
    async fn audit_entry(&self, job: &ProtocolJob, action: &'static str, metadata: serde_json::Value) {
        let entry = AuditEntry {
            action,
            organization_id: job.organization_id(),
            actor: job.requested_by(),
            metadata,
        };
        if let Err(err) = self.audit.record(entry).await {
            warn!(job_id = %job.id(), action, error = %err, "audit entry not recorded");
        }
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
