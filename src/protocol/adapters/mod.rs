//! Adapter implementations of the protocol ports.
//!
//! - [`memory`]: thread-safe in-memory catalog, blob store, job repository
//!   and audit log, with seeding and failure-injection helpers
//! - [`fs`]: a blob store rooted in a capability directory

pub mod fs;
pub mod memory;
