//! Typed task filters for a protocol request.

use super::{ProtocolDomainError, TaskPriority, TaskSnapshot, TaskStatus};
use serde::{Deserialize, Serialize};

/// Filter values as received from a caller, before validation.
///
/// Blank strings are treated as "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilterRequest {
    /// Status label, for example `in_progress`.
    #[serde(default)]
    pub status: Option<String>,
    /// Trade name, matched case-insensitively.
    #[serde(default)]
    pub trade: Option<String>,
    /// Priority label, for example `high`.
    #[serde(default)]
    pub priority: Option<String>,
}

/// Validated task filters; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilters {
    status: Option<TaskStatus>,
    trade: Option<String>,
    priority: Option<TaskPriority>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|raw| raw.trim()).filter(|raw| !raw.is_empty())
}

impl TaskFilters {
    /// Filters that match every task.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            status: None,
            trade: None,
            priority: None,
        }
    }

    /// Validates a raw filter request.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolDomainError::InvalidFilter`] when the status is not
    /// one of the known workflow statuses or the priority is unknown.
    pub fn from_request(request: &TaskFilterRequest) -> Result<Self, ProtocolDomainError> {
        let status = non_blank(request.status.as_ref())
            .map(|raw| {
                let status = TaskStatus::from(raw);
                if status.is_known() {
                    Ok(status)
                } else {
                    Err(ProtocolDomainError::InvalidFilter {
                        field: "status",
                        value: raw.to_owned(),
                    })
                }
            })
            .transpose()?;
        let priority = non_blank(request.priority.as_ref())
            .map(|raw| {
                TaskPriority::try_from(raw).map_err(|_| ProtocolDomainError::InvalidFilter {
                    field: "priority",
                    value: raw.to_owned(),
                })
            })
            .transpose()?;
        let trade = non_blank(request.trade.as_ref()).map(str::to_owned);
        Ok(Self {
            status,
            trade,
            priority,
        })
    }

    /// Restricts to one status.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to one trade.
    #[must_use]
    pub fn with_trade(mut self, trade: impl Into<String>) -> Self {
        self.trade = Some(trade.into());
        self
    }

    /// Restricts to one priority.
    #[must_use]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Status restriction, if any.
    #[must_use]
    pub const fn status(&self) -> Option<&TaskStatus> {
        self.status.as_ref()
    }

    /// Trade restriction, if any.
    #[must_use]
    pub fn trade(&self) -> Option<&str> {
        self.trade.as_deref()
    }

    /// Priority restriction, if any.
    #[must_use]
    pub const fn priority(&self) -> Option<TaskPriority> {
        self.priority
    }

    /// Returns `true` when no restriction is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.trade.is_none() && self.priority.is_none()
    }

    /// Returns `true` when `task` satisfies every restriction.
    #[must_use]
    pub fn matches(&self, task: &TaskSnapshot) -> bool {
        let status_ok = self.status.as_ref().is_none_or(|status| *status == task.status);
        let priority_ok = self.priority.is_none_or(|priority| priority == task.priority);
        let trade_ok = self.trade.as_deref().is_none_or(|trade| {
            task.trade
                .as_deref()
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(trade))
        });
        status_ok && priority_ok && trade_ok
    }

    /// Renders the active restrictions as `key: value` pairs for the cover.
    #[must_use]
    pub fn describe(&self) -> Option<String> {
        let parts: Vec<String> = [
            self.status
                .as_ref()
                .map(|status| format!("status: {}", status.label())),
            self.trade.as_ref().map(|trade| format!("trade: {trade}")),
            self.priority
                .map(|priority| format!("priority: {}", priority.label())),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

impl TryFrom<TaskFilterRequest> for TaskFilters {
    type Error = ProtocolDomainError;

    fn try_from(request: TaskFilterRequest) -> Result<Self, Self::Error> {
        Self::from_request(&request)
    }
}
