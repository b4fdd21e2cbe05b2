//! Unit tests for protocol aggregation, rendering and orchestration.

mod support;
