//! Protocol generation for construction projects.
//!
//! A protocol is a PDF report for one project: a cover with metadata and
//! status counts, a task table, photo galleries and the project's
//! blueprints with task overlays. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
