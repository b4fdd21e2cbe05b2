//! Aggregated report input handed to the composer and embedder.

use super::{BlueprintDocument, TaskFilters, TaskId, TaskNumber, TaskSnapshot};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Project metadata shown on the cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Project name.
    pub name: String,
    /// Site address.
    #[serde(default)]
    pub address: Option<String>,
    /// Free-form project status label.
    #[serde(default)]
    pub status: Option<String>,
    /// Construction start date.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Planned completion date.
    #[serde(default)]
    pub target_completion: Option<NaiveDate>,
    /// Person responsible on site.
    #[serde(default)]
    pub responsible_person: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectMeta {
    /// Creates metadata with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Cover table rows as `(label, value)`; missing values render as `-`.
    #[must_use]
    pub fn cover_rows(&self) -> Vec<(&'static str, String)> {
        let text = |value: Option<&String>| value.cloned().unwrap_or_else(|| "-".to_owned());
        let date = |value: Option<NaiveDate>| {
            value.map_or_else(|| "-".to_owned(), |day| day.format("%Y-%m-%d").to_string())
        };
        vec![
            ("Address", text(self.address.as_ref())),
            ("Status", text(self.status.as_ref())),
            ("Start date", date(self.start_date)),
            ("Target completion", date(self.target_completion)),
            ("Responsible", text(self.responsible_person.as_ref())),
            ("Description", text(self.description.as_ref())),
        ]
    }
}

/// Organization metadata shown on the cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMeta {
    /// Organization name.
    pub name: String,
}

/// Photo bytes belonging to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPhotoAsset {
    /// Owning task.
    pub task_id: TaskId,
    /// Optional caption drawn under the photo.
    pub caption: Option<String>,
    /// Raw encoded image bytes.
    pub bytes: Vec<u8>,
}

/// Photos of one task, in upload order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoGroup {
    /// Owning task number.
    pub task_number: TaskNumber,
    /// Owning task title.
    pub task_title: String,
    /// Photos that could be read.
    pub photos: Vec<TaskPhotoAsset>,
}

impl PhotoGroup {
    /// Heading drawn above the group, `"#{number} {title}"`.
    #[must_use]
    pub fn heading(&self) -> String {
        format!("#{} {}", self.task_number, self.task_title)
    }
}

/// Everything needed to render one protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportData {
    /// Protocol title.
    pub protocol_name: String,
    /// Project metadata.
    pub project: ProjectMeta,
    /// Organization metadata.
    pub organization: OrganizationMeta,
    /// Filters the task list was selected with.
    pub filters: TaskFilters,
    /// Tasks in table order.
    pub tasks: Vec<TaskSnapshot>,
    /// Photo groups in task order; groups without readable photos are omitted.
    pub photo_groups: Vec<PhotoGroup>,
    /// Blueprints in project order.
    pub blueprints: Vec<BlueprintDocument>,
    /// Timestamp printed in the footer.
    pub generated_at: DateTime<Utc>,
}

impl ReportData {
    /// Replaces the protocol title.
    #[must_use]
    pub fn titled(mut self, protocol_name: impl Into<String>) -> Self {
        self.protocol_name = protocol_name.into();
        self
    }
}
