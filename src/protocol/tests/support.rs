//! Fixtures and output inspection shared by the protocol unit tests.

use std::io::Cursor;

use chrono::{TimeZone, Utc};
use image::{ImageFormat, Rgb as Pixel, RgbImage};
use lopdf::{Document, Object, content::Content};

use crate::pdf::{PageCanvas, PageSize, PdfBuilder, Rect, Rgb, encode_win_ansi};
use crate::protocol::domain::{
    OrganizationMeta, ProjectMeta, ReportData, TaskFilters, TaskNumber, TaskPriority,
    TaskSnapshot, TaskStatus,
};

/// Builds a blueprint document with one page per entry of `pages`.
pub(super) fn blueprint_pdf(pages: &[(f32, f32)]) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    for (width, height) in pages {
        let mut canvas = PageCanvas::new();
        canvas.fill_rect(Rect::new(20.0, 20.0, width - 40.0, 10.0), Rgb::BORDER);
        builder.push_page(PageSize::new(*width, *height), canvas);
    }
    builder.finish().expect("blueprint fixture serializes")
}

/// Encodes a small solid-color PNG.
pub(super) fn png_photo(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Pixel([200, 120, 40]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("png fixture encodes");
    bytes.into_inner()
}

pub(super) fn task(number: u32, title: &str, status: TaskStatus) -> TaskSnapshot {
    TaskSnapshot::new(TaskNumber::new(number), title, status, TaskPriority::Medium)
}

pub(super) fn report(tasks: Vec<TaskSnapshot>) -> ReportData {
    ReportData {
        protocol_name: "Weekly site walk".to_owned(),
        project: ProjectMeta {
            address: Some("12 Harbour Road".to_owned()),
            responsible_person: Some("K. Osei".to_owned()),
            ..ProjectMeta::named("Harbour Lofts")
        },
        organization: OrganizationMeta {
            name: "Northwall Construction".to_owned(),
        },
        filters: TaskFilters::none(),
        tasks,
        photo_groups: Vec::new(),
        blueprints: Vec::new(),
        generated_at: Utc
            .with_ymd_and_hms(2026, 3, 4, 9, 30, 0)
            .single()
            .expect("fixed timestamp"),
    }
}

/// A parsed output document, one operation list per page.
pub(super) struct RenderedPdf {
    pages: Vec<RenderedPage>,
}

pub(super) struct RenderedPage {
    pub(super) width: f32,
    pub(super) height: f32,
    operations: Vec<lopdf::content::Operation>,
}

impl RenderedPdf {
    pub(super) fn parse(bytes: &[u8]) -> Self {
        let document = Document::load_mem(bytes).expect("output parses");
        let pages = document
            .get_pages()
            .into_values()
            .map(|page_id| {
                let content = document.get_page_content(page_id).expect("page content");
                let operations = Content::decode(&content)
                    .expect("page content decodes")
                    .operations;
                let media = document
                    .get_dictionary(page_id)
                    .and_then(|page| page.get(b"MediaBox"))
                    .and_then(Object::as_array)
                    .expect("page media box");
                let corner = |index: usize| {
                    media
                        .get(index)
                        .and_then(|value| value.as_float().ok())
                        .expect("media box entry")
                };
                RenderedPage {
                    width: corner(2) - corner(0),
                    height: corner(3) - corner(1),
                    operations,
                }
            })
            .collect();
        Self { pages }
    }

    pub(super) fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(super) fn page(&self, index: usize) -> &RenderedPage {
        self.pages.get(index).expect("page exists")
    }

    pub(super) fn pages(&self) -> impl Iterator<Item = &RenderedPage> {
        self.pages.iter()
    }

    /// Index of the first page showing `text`.
    pub(super) fn find_page(&self, text: &str) -> Option<usize> {
        self.pages.iter().position(|page| page.has_text(text))
    }

    pub(super) fn count_text(&self, text: &str) -> usize {
        self.pages.iter().map(|page| page.count_text(text)).sum()
    }
}

impl RenderedPage {
    fn shown_strings(&self) -> impl Iterator<Item = &[u8]> {
        self.operations
            .iter()
            .filter(|operation| operation.operator == "Tj")
            .filter_map(|operation| match operation.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.as_slice()),
                _ => None,
            })
    }

    pub(super) fn has_text(&self, text: &str) -> bool {
        self.count_text(text) > 0
    }

    pub(super) fn count_text(&self, text: &str) -> usize {
        let expected = encode_win_ansi(text);
        self.shown_strings()
            .filter(|shown| *shown == expected.as_slice())
            .count()
    }

    /// Shown strings decoded byte-per-character.
    pub(super) fn texts(&self) -> Vec<String> {
        self.shown_strings()
            .map(|bytes| bytes.iter().copied().map(char::from).collect())
            .collect()
    }

    pub(super) fn tag_count(&self, tag: &str) -> usize {
        self.operations
            .iter()
            .filter(|operation| operation.operator == "BMC" && names(operation, tag))
            .count()
    }

    pub(super) fn draws_xobject(&self) -> bool {
        self.operations
            .iter()
            .any(|operation| operation.operator == "Do")
    }

    /// Numeric operands of every `operator` inside groups tagged `tag`.
    fn operands_in(&self, tag: &str, operator: &str) -> Vec<Vec<f32>> {
        let mut inside = false;
        let mut found = Vec::new();
        for operation in &self.operations {
            match operation.operator.as_str() {
                "BMC" => inside = names(operation, tag),
                "EMC" => inside = false,
                current if inside && current == operator => found.push(
                    operation
                        .operands
                        .iter()
                        .filter_map(|value| value.as_float().ok())
                        .collect(),
                ),
                _ => {}
            }
        }
        found
    }

    /// Colors set by `operator` (`RG` or `rg`) inside groups tagged `tag`.
    pub(super) fn colors_in(&self, tag: &str, operator: &str) -> Vec<[f32; 3]> {
        self.operands_in(tag, operator)
            .into_iter()
            .filter_map(|values| match values.as_slice() {
                [red, green, blue] => Some([*red, *green, *blue]),
                _ => None,
            })
            .collect()
    }

    /// Rectangles (`x y w h`) drawn inside groups tagged `tag`.
    pub(super) fn rects_in(&self, tag: &str) -> Vec<[f32; 4]> {
        self.operands_in(tag, "re")
            .into_iter()
            .filter_map(|values| match values.as_slice() {
                [x, y, width, height] => Some([*x, *y, *width, *height]),
                _ => None,
            })
            .collect()
    }
}

fn names(operation: &lopdf::content::Operation, tag: &str) -> bool {
    operation
        .operands
        .first()
        .and_then(|operand| operand.as_name().ok())
        .is_some_and(|name| name == tag.as_bytes())
}

/// Whether two colors agree to within PDF real precision.
pub(super) fn same_color(actual: [f32; 3], expected: Rgb) -> bool {
    actual
        .iter()
        .zip(expected.components())
        .all(|(left, right)| (left - right).abs() < 0.01)
}
