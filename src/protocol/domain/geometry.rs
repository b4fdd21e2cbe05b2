//! Normalized overlay geometry and its mapping into page space.
//!
//! Overlay coordinates are stored as fractions of the page in a
//! top-left-origin frame, independent of the page's real size. Drawing
//! surfaces use a bottom-left origin, so every conversion flips the
//! vertical axis against the scaled page height.

use super::ProtocolDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

fn normalized(field: &'static str, value: f32) -> Result<f32, ProtocolDomainError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ProtocolDomainError::CoordinateOutOfRange { field, value })
    }
}

/// A 1-indexed page number within a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageNumber(u32);

impl PageNumber {
    /// The first page.
    pub const FIRST: Self = Self(1);

    /// Creates a validated page number.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolDomainError::ZeroPageNumber`] for `0`.
    pub const fn new(value: u32) -> Result<Self, ProtocolDomainError> {
        if value == 0 {
            return Err(ProtocolDomainError::ZeroPageNumber);
        }
        Ok(Self(value))
    }

    /// Returns the 1-indexed value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PageNumber {
    type Error = ProtocolDomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageNumber> for u32 {
    fn from(page: PageNumber) -> Self {
        page.0
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rectangle in page space with a bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

/// A point in page space with a bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePoint {
    /// Horizontal offset from the left edge.
    pub x: f32,
    /// Vertical offset from the bottom edge.
    pub y: f32,
}

#[derive(Deserialize)]
struct RawRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// A rectangle in normalized, top-left-origin coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRect")]
pub struct NormalizedRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl NormalizedRect {
    /// Creates a validated rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolDomainError::CoordinateOutOfRange`] when any
    /// component is outside `[0, 1]` or not finite.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Result<Self, ProtocolDomainError> {
        Ok(Self {
            x: normalized("x", x)?,
            y: normalized("y", y)?,
            width: normalized("width", width)?,
            height: normalized("height", height)?,
        })
    }

    /// The rectangle covering the whole page.
    #[must_use]
    pub const fn full_page() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    /// Left edge as a fraction of page width.
    #[must_use]
    pub const fn x(self) -> f32 {
        self.x
    }

    /// Top edge as a fraction of page height, measured from the top.
    #[must_use]
    pub const fn y(self) -> f32 {
        self.y
    }

    /// Width as a fraction of page width.
    #[must_use]
    pub const fn width(self) -> f32 {
        self.width
    }

    /// Height as a fraction of page height.
    #[must_use]
    pub const fn height(self) -> f32 {
        self.height
    }

    /// Maps the rectangle onto a page of `page_width` × `page_height`
    /// points with a bottom-left origin.
    #[must_use]
    pub fn to_page_space(self, page_width: f32, page_height: f32) -> PageRect {
        PageRect {
            x: self.x * page_width,
            y: page_height - self.y * page_height - self.height * page_height,
            width: self.width * page_width,
            height: self.height * page_height,
        }
    }
}

impl TryFrom<RawRect> for NormalizedRect {
    type Error = ProtocolDomainError;

    fn try_from(raw: RawRect) -> Result<Self, Self::Error> {
        Self::new(raw.x, raw.y, raw.width, raw.height)
    }
}

#[derive(Deserialize)]
struct RawPoint {
    x: f32,
    y: f32,
}

/// A point in normalized, top-left-origin coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct NormalizedPoint {
    x: f32,
    y: f32,
}

impl NormalizedPoint {
    /// Creates a validated point.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolDomainError::CoordinateOutOfRange`] when either
    /// component is outside `[0, 1]` or not finite.
    pub fn new(x: f32, y: f32) -> Result<Self, ProtocolDomainError> {
        Ok(Self {
            x: normalized("x", x)?,
            y: normalized("y", y)?,
        })
    }

    /// Horizontal position as a fraction of page width.
    #[must_use]
    pub const fn x(self) -> f32 {
        self.x
    }

    /// Vertical position as a fraction of page height, from the top.
    #[must_use]
    pub const fn y(self) -> f32 {
        self.y
    }

    /// Maps the point onto a page of `page_width` × `page_height` points
    /// with a bottom-left origin.
    #[must_use]
    pub fn to_page_space(self, page_width: f32, page_height: f32) -> PagePoint {
        PagePoint {
            x: self.x * page_width,
            y: page_height - self.y * page_height,
        }
    }
}

impl TryFrom<RawPoint> for NormalizedPoint {
    type Error = ProtocolDomainError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Self::new(raw.x, raw.y)
    }
}
