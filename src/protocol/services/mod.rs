//! Orchestration services for protocol generation.
//!
//! - [`ReportAggregator`] loads report data from the catalog ports
//! - [`DocumentComposer`] lays out the cover, task table and photo grid
//! - [`BlueprintEmbedder`] splices in blueprint pages with task overlays
//! - [`ProtocolGenerationService`] runs the three on a bounded
//!   [`GenerationPool`] and records the job outcome

pub mod aggregator;
pub mod composer;
pub mod config;
pub mod embedder;
pub mod generation;
pub mod pool;

pub use aggregator::{AggregationError, AggregationResult, CatalogPorts, ReportAggregator};
pub use composer::{
    ComposedDocument, CompositionError, DocumentComposer, IMAGE_UNAVAILABLE, NO_TASKS_MESSAGE,
};
pub use config::{ConfigError, DEFAULT_STORAGE_KEY_TEMPLATE, LayoutConfig, ProtocolConfig};
pub use embedder::{
    ANNOTATION_TAG, BlueprintEmbedder, EmbedError, EmbedOutcome, EmbedReport, EmbeddedPage,
    MARKER_TAG, SkippedBlueprint,
};
pub use generation::{
    GenerationError, GenerationResult, GenerationTicket, ProtocolGenerationService,
    ProtocolJobView,
};
pub use pool::{GenerationPool, JobHandle, PoolFull, PoolSlot, PoolStats};
