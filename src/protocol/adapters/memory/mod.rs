//! In-memory adapter implementations for tests and local rendering.

mod audit;
mod blob_store;
mod catalog;
mod protocol_job;

pub use audit::InMemoryAuditLog;
pub use blob_store::InMemoryBlobStore;
pub use catalog::InMemoryProjectCatalog;
pub use protocol_job::InMemoryProtocolJobRepository;

fn poisoned(err: &impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(err.to_string())
}
