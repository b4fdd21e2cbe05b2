//! Domain model for protocol generation.
//!
//! Pure types with no I/O: identifiers, task snapshots, typed filters,
//! normalized overlay geometry, blueprint overlays, aggregated report
//! input and the job aggregate.

mod blueprint;
mod error;
mod filters;
mod geometry;
mod ids;
mod job;
mod palette;
mod report;
mod task;

pub use blueprint::{Annotation, BlueprintDocument, MarkerGroup, PlacedMarker};
pub use error::{ParseJobStatusError, ParseTaskPriorityError, ProtocolDomainError};
pub use filters::{TaskFilterRequest, TaskFilters};
pub use geometry::{NormalizedPoint, NormalizedRect, PageNumber, PagePoint, PageRect};
pub use ids::{
    BlueprintId, OrganizationId, ProjectId, ProtocolJobId, TaskId, TaskNumber, UserId,
};
pub use job::{ProtocolArtifact, ProtocolJob, ProtocolJobRequest, ProtocolJobStatus};
pub use palette::{StatusColors, StatusPalette};
pub use report::{OrganizationMeta, PhotoGroup, ProjectMeta, ReportData, TaskPhotoAsset};
pub use task::{Marker, StatusCounts, TaskArea, TaskPriority, TaskSnapshot, TaskStatus};
