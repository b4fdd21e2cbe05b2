//! Task snapshots as loaded for a protocol.

use super::{
    BlueprintId, NormalizedPoint, NormalizedRect, PageNumber, ParseTaskPriorityError, TaskId,
    TaskNumber,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow status of a task.
///
/// The four known statuses drive colors and stat boxes. Any other label
/// is kept verbatim so that a report can still be produced for data this
/// crate does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    /// Reported and awaiting work.
    Open,
    /// Being worked on.
    InProgress,
    /// Work finished, awaiting verification.
    Completed,
    /// Work inspected and accepted.
    Verified,
    /// A status label outside the known set.
    Other(String),
}

impl TaskStatus {
    /// The statuses counted on the cover, in display order.
    pub const COUNTED: [Self; 4] = [Self::Open, Self::InProgress, Self::Completed, Self::Verified];

    /// Returns the canonical storage representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Verified => "verified",
            Self::Other(label) => label,
        }
    }

    /// Returns a human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
            Self::Verified => "Verified",
            Self::Other(label) => label,
        }
    }

    /// Returns `true` for the four known statuses.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for TaskStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Self::Open,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "verified" => Self::Verified,
            _ => Self::Other(value.trim().to_owned()),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Normal urgency.
    Medium,
    /// Should be handled soon.
    High,
    /// Blocks other work.
    Critical,
}

impl TaskPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Returns a human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseTaskPriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseTaskPriorityError(value.to_owned())),
        }
    }
}

/// Rectangle a task occupies on one page of its blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskArea {
    /// Normalized rectangle.
    pub rect: NormalizedRect,
    /// Target page, 1-indexed.
    pub page: PageNumber,
}

/// A point reference a task places on its blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Normalized position.
    pub point: NormalizedPoint,
    /// Target page, 1-indexed.
    pub page: PageNumber,
}

/// A task as it appears in a protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier.
    pub id: TaskId,
    /// Project-scoped task number.
    pub number: TaskNumber,
    /// Task title.
    pub title: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Urgency.
    pub priority: TaskPriority,
    /// Responsible trade, if any.
    #[serde(default)]
    pub trade: Option<String>,
    /// Display name of the assignee, if any.
    #[serde(default)]
    pub assignee: Option<String>,
    /// Blueprint the task's geometry refers to.
    #[serde(default)]
    pub blueprint_id: Option<BlueprintId>,
    /// Rectangle drawn on the blueprint.
    #[serde(default)]
    pub area: Option<TaskArea>,
    /// Point markers drawn on the blueprint, in order.
    #[serde(default)]
    pub markers: Vec<Marker>,
    /// Number of photos attached to the task.
    #[serde(default)]
    pub photo_count: u32,
}

impl TaskSnapshot {
    /// Creates a snapshot with required fields and no geometry.
    #[must_use]
    pub fn new(
        number: TaskNumber,
        title: impl Into<String>,
        status: TaskStatus,
        priority: TaskPriority,
    ) -> Self {
        Self {
            id: TaskId::new(),
            number,
            title: title.into(),
            status,
            priority,
            trade: None,
            assignee: None,
            blueprint_id: None,
            area: None,
            markers: Vec::new(),
            photo_count: 0,
        }
    }

    /// Sets the trade.
    #[must_use]
    pub fn with_trade(mut self, trade: impl Into<String>) -> Self {
        self.trade = Some(trade.into());
        self
    }

    /// Sets the assignee display name.
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Anchors a rectangle on a blueprint page.
    #[must_use]
    pub const fn with_area(mut self, blueprint_id: BlueprintId, area: TaskArea) -> Self {
        self.blueprint_id = Some(blueprint_id);
        self.area = Some(area);
        self
    }

    /// Places point markers on a blueprint.
    #[must_use]
    pub fn with_markers(mut self, blueprint_id: BlueprintId, markers: Vec<Marker>) -> Self {
        self.blueprint_id = Some(blueprint_id);
        self.markers = markers;
        self
    }

    /// Records the number of attached photos.
    #[must_use]
    pub const fn with_photo_count(mut self, photo_count: u32) -> Self {
        self.photo_count = photo_count;
        self
    }
}

/// Number of tasks in each counted status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Tasks with status `open`.
    pub open: usize,
    /// Tasks with status `in_progress`.
    pub in_progress: usize,
    /// Tasks with status `completed`.
    pub completed: usize,
    /// Tasks with status `verified`.
    pub verified: usize,
}

impl StatusCounts {
    /// Tallies `tasks` by status; unknown statuses are not counted.
    #[must_use]
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a TaskSnapshot>) -> Self {
        tasks
            .into_iter()
            .fold(Self::default(), |mut counts, task| {
                match task.status {
                    TaskStatus::Open => counts.open += 1,
                    TaskStatus::InProgress => counts.in_progress += 1,
                    TaskStatus::Completed => counts.completed += 1,
                    TaskStatus::Verified => counts.verified += 1,
                    TaskStatus::Other(_) => {}
                }
                counts
            })
    }

    /// Returns the count for one of the [`TaskStatus::COUNTED`] statuses.
    #[must_use]
    pub const fn get(&self, status: &TaskStatus) -> usize {
        match status {
            TaskStatus::Open => self.open,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
            TaskStatus::Verified => self.verified,
            TaskStatus::Other(_) => 0,
        }
    }
}
