//! Page-based document engine.
//!
//! A thin layer over the `lopdf` object model: pages are drawn on
//! [`PageCanvas`]es, collected in a [`PdfBuilder`] arena, and serialized
//! with a flat page tree. Foreign documents can be loaded (to splice new
//! pages in) or imported page-by-page as form XObjects.

mod arena;
mod canvas;
mod color;
mod error;
mod fonts;
mod raster;

pub use arena::{ImportedPage, PageSize, PdfBuilder};
pub use canvas::{PageCanvas, Point, Rect, Stroke, TextStyle, XObjectRef};
pub use color::Rgb;
pub use error::PdfError;
pub use fonts::{Font, encode_win_ansi};
pub use raster::RasterImage;
