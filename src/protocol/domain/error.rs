//! Error types for protocol domain validation.

use super::{ProtocolJobId, ProtocolJobStatus};
use thiserror::Error;

/// Errors returned while constructing or transitioning domain values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolDomainError {
    /// A normalized coordinate was outside `[0, 1]` or not finite.
    #[error("normalized {field} must lie in [0, 1], got {value}")]
    CoordinateOutOfRange {
        /// Name of the offending component.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// Page numbers are 1-indexed.
    #[error("page numbers start at 1")]
    ZeroPageNumber,

    /// The protocol name is empty after trimming.
    #[error("protocol name must not be empty")]
    EmptyProtocolName,

    /// A filter value is not recognized.
    #[error("invalid {field} filter '{value}'")]
    InvalidFilter {
        /// Filter field name.
        field: &'static str,
        /// Rejected value.
        value: String,
    },

    /// A terminal job cannot change state again.
    #[error("protocol job {job_id} is already {status}")]
    JobAlreadyTerminal {
        /// Job identifier.
        job_id: ProtocolJobId,
        /// The terminal status the job holds.
        status: ProtocolJobStatus,
    },
}

/// Error returned while parsing a task priority label.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task priority: {0}")]
pub struct ParseTaskPriorityError(pub String);

/// Error returned while parsing a job status label.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown protocol job status: {0}")]
pub struct ParseJobStatusError(pub String);
