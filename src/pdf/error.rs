//! Error types for the page-based document engine.

use thiserror::Error;

/// Errors raised while building, loading or serializing documents.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The underlying object model rejected an operation.
    #[error("pdf object error: {0}")]
    Object(#[from] lopdf::Error),

    /// An image could not be decoded.
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// A page index was outside the arena.
    #[error("page index {index} out of range for {len} pages")]
    PageOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of pages in the arena.
        len: usize,
    },

    /// A loaded document is structurally unusable.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Writing the serialized document failed.
    #[error("failed to serialize document: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfError {
    /// Creates a [`PdfError::Malformed`] from any displayable reason.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}
