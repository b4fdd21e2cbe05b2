//! Step definitions for protocol generation scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
