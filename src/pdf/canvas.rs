//! Drawing surface for a single page.
//!
//! A [`PageCanvas`] records content-stream operations in PDF user space
//! (points, bottom-left origin) together with the resources the page will
//! need when it is written out. It never touches the document itself, so
//! pages can be drawn in any order and spliced into the arena afterwards.

use super::{Font, Rgb, fonts::encode_win_ansi};
use lopdf::{Object, ObjectId, StringFormat, content::Operation};
use std::collections::{BTreeMap, BTreeSet};

/// Bezier control-point factor for approximating a quarter circle.
const KAPPA: f32 = 0.552_284_8;

/// A point in page user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal offset from the left page edge.
    pub x: f32,
    /// Vertical offset from the bottom page edge.
    pub y: f32,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in page user space, anchored at its
/// lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle from its lower-left corner and extent.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the rectangle's center point.
    #[must_use]
    pub fn center(self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Font, size and color for a text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font face.
    pub font: Font,
    /// Font size in points.
    pub size: f32,
    /// Fill color of the glyphs.
    pub color: Rgb,
}

impl TextStyle {
    /// Creates a text style.
    #[must_use]
    pub const fn new(font: Font, size: f32, color: Rgb) -> Self {
        Self { font, size, color }
    }

    /// Measures `text` in this style.
    #[must_use]
    pub fn width_of(self, text: &str) -> f32 {
        self.font.text_width(text, self.size)
    }
}

/// Stroke parameters for outlined shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    /// Stroke color.
    pub color: Rgb,
    /// Line width in points.
    pub width: f32,
}

impl Stroke {
    /// Creates a stroke.
    #[must_use]
    pub const fn new(color: Rgb, width: f32) -> Self {
        Self { color, width }
    }
}

/// A named XObject that can be placed on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XObjectRef {
    name: String,
    id: ObjectId,
}

impl XObjectRef {
    pub(crate) const fn new(name: String, id: ObjectId) -> Self {
        Self { name, id }
    }

    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the object identifier.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }
}

/// Recorded content and resource usage for one page.
#[derive(Debug, Clone, Default)]
pub struct PageCanvas {
    operations: Vec<Operation>,
    opacities: BTreeSet<u16>,
    xobjects: BTreeMap<String, ObjectId>,
}

/// Parts of a finished canvas consumed by the document writer.
pub(crate) struct CanvasParts {
    pub(crate) operations: Vec<Operation>,
    pub(crate) opacities: BTreeSet<u16>,
    pub(crate) xobjects: BTreeMap<String, ObjectId>,
}

impl PageCanvas {
    /// Creates an empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the operations recorded so far.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub(crate) fn into_parts(self) -> CanvasParts {
        CanvasParts {
            operations: self.operations,
            opacities: self.opacities,
            xobjects: self.xobjects,
        }
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn set_fill(&mut self, color: Rgb) {
        let [red, green, blue] = color.components();
        self.push("rg", vec![red.into(), green.into(), blue.into()]);
    }

    fn set_stroke(&mut self, stroke: Stroke) {
        let [red, green, blue] = stroke.color.components();
        self.push("RG", vec![red.into(), green.into(), blue.into()]);
        self.push("w", vec![stroke.width.into()]);
    }

    fn rect_path(&mut self, rect: Rect) {
        self.push(
            "re",
            vec![
                rect.x.into(),
                rect.y.into(),
                rect.width.into(),
                rect.height.into(),
            ],
        );
    }

    /// Fills `rect` with a solid color.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.push("q", vec![]);
        self.set_fill(color);
        self.rect_path(rect);
        self.push("f", vec![]);
        self.push("Q", vec![]);
    }

    /// Outlines `rect`.
    pub fn stroke_rect(&mut self, rect: Rect, stroke: Stroke) {
        self.push("q", vec![]);
        self.set_stroke(stroke);
        self.rect_path(rect);
        self.push("S", vec![]);
        self.push("Q", vec![]);
    }

    /// Draws a straight line segment.
    pub fn line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.push("q", vec![]);
        self.set_stroke(stroke);
        self.push("m", vec![from.x.into(), from.y.into()]);
        self.push("l", vec![to.x.into(), to.y.into()]);
        self.push("S", vec![]);
        self.push("Q", vec![]);
    }

    /// Draws a circle with an optional fill and an optional outline.
    pub fn circle(&mut self, center: Point, radius: f32, fill: Option<Rgb>, stroke: Option<Stroke>) {
        if fill.is_none() && stroke.is_none() {
            return;
        }
        self.push("q", vec![]);
        if let Some(color) = fill {
            self.set_fill(color);
        }
        if let Some(outline) = stroke {
            self.set_stroke(outline);
        }
        self.circle_path(center, radius);
        let paint = match (fill, stroke) {
            (Some(_), Some(_)) => "B",
            (Some(_), None) => "f",
            _ => "S",
        };
        self.push(paint, vec![]);
        self.push("Q", vec![]);
    }

    fn circle_path(&mut self, center: Point, radius: f32) {
        let k = radius * KAPPA;
        let (cx, cy) = (center.x, center.y);
        self.push("m", vec![(cx + radius).into(), cy.into()]);
        let quarters = [
            [cx + radius, cy + k, cx + k, cy + radius, cx, cy + radius],
            [cx - k, cy + radius, cx - radius, cy + k, cx - radius, cy],
            [cx - radius, cy - k, cx - k, cy - radius, cx, cy - radius],
            [cx + k, cy - radius, cx + radius, cy - k, cx + radius, cy],
        ];
        for quarter in quarters {
            self.push("c", quarter.iter().map(|value| (*value).into()).collect());
        }
        self.push("h", vec![]);
    }

    /// Writes `text` with its baseline starting at `origin`.
    pub fn text(&mut self, text: &str, origin: Point, style: TextStyle) {
        if text.is_empty() {
            return;
        }
        self.push("BT", vec![]);
        self.push(
            "Tf",
            vec![
                Object::Name(style.font.resource_name().as_bytes().to_vec()),
                style.size.into(),
            ],
        );
        self.set_fill(style.color);
        self.push("Td", vec![origin.x.into(), origin.y.into()]);
        self.push(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.push("ET", vec![]);
    }

    /// Writes `text` horizontally centered on `center_x`.
    pub fn text_centered(&mut self, text: &str, center_x: f32, baseline: f32, style: TextStyle) {
        let width = style.width_of(text);
        self.text(text, Point::new(center_x - width / 2.0, baseline), style);
    }

    /// Runs `draw` with fill and stroke alpha set to `opacity`.
    pub fn with_opacity(&mut self, opacity: f32, draw: impl FnOnce(&mut Self)) {
        let permille = opacity_permille(opacity);
        self.opacities.insert(permille);
        self.push("q", vec![]);
        self.push(
            "gs",
            vec![Object::Name(opacity_resource_name(permille).into_bytes())],
        );
        draw(self);
        self.push("Q", vec![]);
    }

    /// Wraps the operations recorded by `draw` in a marked-content
    /// sequence tagged `tag`.
    pub fn marked(&mut self, tag: &str, draw: impl FnOnce(&mut Self)) {
        self.push("BMC", vec![Object::Name(tag.as_bytes().to_vec())]);
        draw(self);
        self.push("EMC", vec![]);
    }

    /// Places an XObject so that its unit square maps onto `rect`.
    ///
    /// Image XObjects are defined on the unit square, so this stretches the
    /// image to the rectangle.
    pub fn place_image(&mut self, xobject: &XObjectRef, rect: Rect) {
        self.place(xobject, [rect.width, 0.0, 0.0, rect.height, rect.x, rect.y]);
    }

    /// Places a form XObject uniformly scaled by `scale` with its origin at
    /// `origin`.
    pub fn place_form(&mut self, xobject: &XObjectRef, origin: Point, scale: f32) {
        self.place(xobject, [scale, 0.0, 0.0, scale, origin.x, origin.y]);
    }

    fn place(&mut self, xobject: &XObjectRef, matrix: [f32; 6]) {
        self.xobjects.insert(xobject.name.clone(), xobject.id);
        self.push("q", vec![]);
        self.push("cm", matrix.iter().map(|value| (*value).into()).collect());
        self.push("Do", vec![Object::Name(xobject.name.as_bytes().to_vec())]);
        self.push("Q", vec![]);
    }
}

fn opacity_permille(opacity: f32) -> u16 {
    let clamped = opacity.clamp(0.0, 1.0) * 1000.0;
    // Clamped to 0..=1000, so the rounded value always fits.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "value is clamped to 0..=1000 before the cast"
    )]
    let permille = clamped.round() as u16;
    permille
}

pub(crate) fn opacity_resource_name(permille: u16) -> String {
    format!("GS{permille}")
}

pub(crate) fn opacity_value(permille: u16) -> f32 {
    f32::from(permille) / 1000.0
}
