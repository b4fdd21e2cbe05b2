//! Site protocol: auditable PDF reports for construction projects.
//!
//! This crate aggregates project data (metadata, tasks, photos and
//! blueprints) into a single page-based document, drawing status-colored
//! task overlays onto embedded blueprint pages.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure types with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for catalog, storage and audit
//! - **Adapters**: In-memory and filesystem implementations of the ports
//!
//! # Modules
//!
//! - [`pdf`]: Page arena, drawing canvas and document serialization
//! - [`protocol`]: Report aggregation, composition, blueprint embedding and
//!   job orchestration

pub mod pdf;
pub mod protocol;
