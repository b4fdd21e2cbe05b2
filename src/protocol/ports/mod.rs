//! Port contracts for protocol generation.
//!
//! Ports define infrastructure-agnostic interfaces used by the protocol
//! services: read-only catalog lookups, byte storage, job persistence and
//! the audit trail.

pub mod audit;
pub mod blob_store;
pub mod catalog;
pub mod protocol_job;

pub use audit::{
    ACTION_GENERATED, ACTION_GENERATION_FAILED, ACTION_GENERATION_REQUESTED, AuditEntry, AuditLog,
    AuditLogError,
};
pub use blob_store::{BlobStore, BlobStoreError, BlobStoreResult, PDF_CONTENT_TYPE};
pub use catalog::{
    BlueprintRef, BlueprintRepository, CatalogError, CatalogResult, OrganizationRepository,
    PhotoRef, ProjectRepository, TaskPhotoRepository, TaskRepository,
};
pub use protocol_job::{
    ProtocolJobRepository, ProtocolJobRepositoryError, ProtocolJobRepositoryResult,
};
