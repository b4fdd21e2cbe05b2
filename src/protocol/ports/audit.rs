//! Audit trail port.

use crate::protocol::domain::{OrganizationId, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Audit action recorded when a generation request is accepted.
pub const ACTION_GENERATION_REQUESTED: &str = "protocol.generation_requested";
/// Audit action recorded when a protocol was stored.
pub const ACTION_GENERATED: &str = "protocol.generated";
/// Audit action recorded when a generation failed.
pub const ACTION_GENERATION_FAILED: &str = "protocol.generation_failed";

/// One audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Dotted action name.
    pub action: &'static str,
    /// Organization the action belongs to.
    pub organization_id: OrganizationId,
    /// User who triggered the action.
    pub actor: UserId,
    /// Structured details.
    pub metadata: serde_json::Value,
}

/// Append-only audit sink.
///
/// Callers treat writes as fire-and-forget: a failed write is logged and
/// never blocks the audited operation.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditLogError::Persistence`] when the entry cannot be written.
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditLogError>;
}

/// Errors returned by audit log implementations.
#[derive(Debug, Clone, Error)]
pub enum AuditLogError {
    /// Persistence-layer failure.
    #[error("audit persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AuditLogError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
