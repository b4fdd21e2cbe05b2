//! In-memory audit log.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use super::poisoned;
use crate::protocol::ports::{AuditEntry, AuditLog, AuditLogError};

/// Thread-safe in-memory audit log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLog {
    state: Arc<RwLock<AuditState>>,
}

#[derive(Debug, Default)]
struct AuditState {
    entries: Vec<AuditEntry>,
    failing: bool,
}

impl InMemoryAuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent [`AuditLog::record`] fail.
    ///
    /// # Errors
    ///
    /// Returns [`AuditLogError::Persistence`] if the lock is poisoned.
    pub fn set_failing(&self, failing: bool) -> Result<(), AuditLogError> {
        self.state
            .write()
            .map_err(|err| AuditLogError::persistence(poisoned(&err)))?
            .failing = failing;
        Ok(())
    }

    /// Returns the recorded entries in order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditLogError::Persistence`] if the lock is poisoned.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, AuditLogError> {
        let state = self
            .state
            .read()
            .map_err(|err| AuditLogError::persistence(poisoned(&err)))?;
        Ok(state.entries.clone())
    }

    /// Returns the recorded action names in order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditLogError::Persistence`] if the lock is poisoned.
    pub fn actions(&self) -> Result<Vec<&'static str>, AuditLogError> {
        Ok(self.entries()?.iter().map(|entry| entry.action).collect())
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditLogError> {
        let mut state = self
            .state
            .write()
            .map_err(|err| AuditLogError::persistence(poisoned(&err)))?;
        if state.failing {
            return Err(AuditLogError::persistence(std::io::Error::other(
                "audit log unavailable",
            )));
        }
        state.entries.push(entry);
        Ok(())
    }
}
