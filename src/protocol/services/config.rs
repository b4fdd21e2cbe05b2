//! Configuration for protocol generation.

use crate::pdf::PageSize;
use crate::protocol::domain::{OrganizationId, ProjectId, ProtocolJobId};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default template for the storage key of a generated protocol.
pub const DEFAULT_STORAGE_KEY_TEMPLATE: &str =
    "protocols/{{ organization_id }}/{{ project_id }}/{{ job_id }}.pdf";

/// Errors returned by [`ProtocolConfig::validate`] and key rendering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A count that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// A length is not a positive finite number.
    #[error("{field} must be a positive finite number")]
    InvalidLength {
        /// Offending field.
        field: &'static str,
    },

    /// The storage key template does not parse or render.
    #[error("invalid storage key template: {0}")]
    Template(String),
}

/// Page geometry and drawing constants, in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of composed pages.
    pub page_width: f32,
    /// Height of composed pages.
    pub page_height: f32,
    /// Margin on every side of composed pages.
    pub margin: f32,
    /// Width every blueprint page is scaled to.
    pub blueprint_width: f32,
    /// Horizontal offset from a marker dot to its label.
    pub marker_offset_x: f32,
    /// Vertical offset from a marker dot to its label.
    pub marker_offset_y: f32,
    /// Longest pixel edge photos are downscaled to before embedding.
    pub max_photo_edge: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: PageSize::A4.width,
            page_height: PageSize::A4.height,
            margin: 40.0,
            blueprint_width: PageSize::A4.width,
            marker_offset_x: 18.0,
            marker_offset_y: 18.0,
            max_photo_edge: 800,
        }
    }
}

impl LayoutConfig {
    /// Size of composed pages.
    #[must_use]
    pub const fn page_size(&self) -> PageSize {
        PageSize::new(self.page_width, self.page_height)
    }

    /// Width available between the side margins.
    #[must_use]
    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let lengths = [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("blueprint_width", self.blueprint_width),
        ];
        for (field, value) in lengths {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidLength { field });
            }
        }
        let fits = self.margin.is_finite()
            && self.margin >= 0.0
            && self.margin * 2.0 < self.page_width
            && self.margin * 2.0 < self.page_height;
        if !fits {
            return Err(ConfigError::InvalidLength { field: "margin" });
        }
        if self.max_photo_edge == 0 {
            return Err(ConfigError::Zero("max_photo_edge"));
        }
        Ok(())
    }
}

/// Limits, concurrency and storage settings for protocol generation.
///
/// # Examples
///
/// ```
/// use site_protocol::protocol::services::ProtocolConfig;
///
/// let config = ProtocolConfig::default().with_max_concurrent_jobs(2);
/// assert_eq!(config.task_cap, 10_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Upper bound on tasks loaded for one protocol; further tasks are
    /// omitted.
    pub task_cap: usize,
    /// Jobs rendering at the same time.
    pub max_concurrent_jobs: usize,
    /// Jobs accepted but not yet finished; requests beyond this are
    /// rejected.
    pub max_pending_jobs: usize,
    /// Photo and blueprint reads in flight per job.
    pub read_concurrency: usize,
    /// `minijinja` template for the storage key, with `organization_id`,
    /// `project_id` and `job_id` in scope.
    pub storage_key_template: String,
    /// Page geometry.
    pub layout: LayoutConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            task_cap: 10_000,
            max_concurrent_jobs: 4,
            max_pending_jobs: 32,
            read_concurrency: 4,
            storage_key_template: DEFAULT_STORAGE_KEY_TEMPLATE.to_owned(),
            layout: LayoutConfig::default(),
        }
    }
}

impl ProtocolConfig {
    /// Sets the task cap.
    #[must_use]
    pub const fn with_task_cap(mut self, task_cap: usize) -> Self {
        self.task_cap = task_cap;
        self
    }

    /// Sets the number of concurrently rendering jobs.
    #[must_use]
    pub const fn with_max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.max_concurrent_jobs = jobs;
        self
    }

    /// Sets the number of accepted, unfinished jobs.
    #[must_use]
    pub const fn with_max_pending_jobs(mut self, jobs: usize) -> Self {
        self.max_pending_jobs = jobs;
        self
    }

    /// Sets the read fan-out per job.
    #[must_use]
    pub const fn with_read_concurrency(mut self, reads: usize) -> Self {
        self.read_concurrency = reads;
        self
    }

    /// Sets the storage key template.
    #[must_use]
    pub fn with_storage_key_template(mut self, template: impl Into<String>) -> Self {
        self.storage_key_template = template.into();
        self
    }

    /// Sets the page layout.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Checks limits, layout and the storage key template.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for zero limits, unusable page geometry or a
    /// template that fails to parse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("task_cap", self.task_cap),
            ("max_concurrent_jobs", self.max_concurrent_jobs),
            ("max_pending_jobs", self.max_pending_jobs),
            ("read_concurrency", self.read_concurrency),
        ];
        if let Some((field, _)) = counts.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero(field));
        }
        self.layout.validate()?;
        Environment::new()
            .template_from_str(&self.storage_key_template)
            .map(|_| ())
            .map_err(|err| ConfigError::Template(err.to_string()))
    }

    /// Renders the storage key for a job.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Template`] when rendering fails or yields an
    /// empty key.
    pub fn storage_key(
        &self,
        organization_id: OrganizationId,
        project_id: ProjectId,
        job_id: ProtocolJobId,
    ) -> Result<String, ConfigError> {
        let key = Environment::new()
            .render_str(
                &self.storage_key_template,
                context! {
                    organization_id => organization_id.to_string(),
                    project_id => project_id.to_string(),
                    job_id => job_id.to_string(),
                },
            )
            .map_err(|err| ConfigError::Template(err.to_string()))?;
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Template("rendered key is empty".to_owned()));
        }
        Ok(trimmed.to_owned())
    }
}
