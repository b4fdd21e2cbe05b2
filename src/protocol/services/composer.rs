//! Lays out the cover, task table and photo grid of a protocol.

use super::config::LayoutConfig;
use crate::pdf::{
    Font, PageCanvas, PdfBuilder, PdfError, Point, RasterImage, Rect, Rgb, Stroke, TextStyle,
};
use crate::protocol::domain::{
    PhotoGroup, ReportData, StatusCounts, StatusPalette, TaskSnapshot, TaskStatus,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Message drawn instead of the task table when no task matched.
pub const NO_TASKS_MESSAGE: &str = "No tasks in this project.";
/// Text drawn in a photo cell whose image cannot be decoded.
pub const IMAGE_UNAVAILABLE: &str = "Image unavailable";

const TITLE_LIMIT: usize = 32;
const TRADE_LIMIT: usize = 15;
const ASSIGNEE_LIMIT: usize = 22;
const CAPTION_LIMIT: usize = 34;
const DESCRIPTION_MAX_LINES: usize = 12;

const ROW_HEIGHT: f32 = 18.0;
const CELL_PADDING: f32 = 4.0;
const SECTION_GAP: f32 = 20.0;
const STAT_BOX_HEIGHT: f32 = 60.0;
const GRID_COLUMNS: usize = 3;
const GRID_GAP: f32 = 10.0;
const PHOTO_HEIGHT: f32 = 120.0;
const PHOTO_ROW_HEIGHT: f32 = PHOTO_HEIGHT + 24.0;
const METADATA_LABEL_WIDTH: f32 = 130.0;

/// Fixed widths of every task table column but the last, which takes the
/// remaining content width.
const COLUMN_WIDTHS: [f32; 5] = [28.0, 165.0, 70.0, 55.0, 80.0];
const COLUMN_TITLES: [&str; 6] = ["#", "Title", "Status", "Priority", "Trade", "Assignee"];

/// Unrecoverable layout failure.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// The document engine rejected an operation.
    #[error("composition failed: {0}")]
    Pdf(#[from] PdfError),
}

/// Output of [`DocumentComposer::compose_base`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    /// Serialized document.
    pub bytes: Vec<u8>,
    /// Pages produced before any blueprint content; blueprint pages are
    /// inserted at this index.
    pub base_page_count: usize,
}

/// Composes the base document of a protocol.
#[derive(Debug, Clone)]
pub struct DocumentComposer {
    layout: LayoutConfig,
}

impl DocumentComposer {
    /// Creates a composer for the given page layout.
    #[must_use]
    pub const fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    /// Lays out the cover, task table, photo grid and footer.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError`] when the document cannot be serialized.
    /// Undecodable photos are drawn as placeholders instead.
    pub fn compose_base(&self, report: &ReportData) -> Result<ComposedDocument, CompositionError> {
        let mut flow = PageFlow::new(&self.layout);
        draw_cover(&mut flow, report);
        draw_task_table(&mut flow, &report.tasks);
        if !report.photo_groups.is_empty() {
            draw_photo_grid(&mut flow, &report.photo_groups);
        }
        let footer = format!(
            "Generated {}",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        flow.footer(&footer);

        let builder = flow.into_builder();
        let base_page_count = builder.page_count();
        let bytes = builder.finish()?;
        debug!(pages = base_page_count, bytes = bytes.len(), "base document composed");
        Ok(ComposedDocument {
            bytes,
            base_page_count,
        })
    }
}

/// A top-to-bottom cursor over a growing sequence of pages.
struct PageFlow<'a> {
    layout: &'a LayoutConfig,
    builder: PdfBuilder,
    canvas: PageCanvas,
    cursor: f32,
}

impl<'a> PageFlow<'a> {
    fn new(layout: &'a LayoutConfig) -> Self {
        Self {
            layout,
            builder: PdfBuilder::new(),
            canvas: PageCanvas::new(),
            cursor: layout.page_height - layout.margin,
        }
    }

    const fn left(&self) -> f32 {
        self.layout.margin
    }

    fn width(&self) -> f32 {
        self.layout.content_width()
    }

    fn fits(&self, height: f32) -> bool {
        self.cursor - height >= self.layout.margin
    }

    fn new_page(&mut self) {
        let finished = std::mem::take(&mut self.canvas);
        self.builder.push_page(self.layout.page_size(), finished);
        self.cursor = self.layout.page_height - self.layout.margin;
    }

    /// Starts a new page unless `height` still fits; returns whether it did.
    fn ensure(&mut self, height: f32) -> bool {
        if self.fits(height) {
            return false;
        }
        self.new_page();
        true
    }

    fn text_line(&mut self, text: &str, style: TextStyle, line_height: f32) {
        let origin = Point::new(self.left(), self.cursor - style.size);
        self.canvas.text(text, origin, style);
        self.cursor -= line_height;
    }

    fn heading(&mut self, text: &str) {
        self.text_line(text, TextStyle::new(Font::Bold, 14.0, Rgb::INK), 22.0);
    }

    /// Draws the footer once, at the current cursor position.
    fn footer(&mut self, text: &str) {
        let baseline = (self.cursor - 24.0).max(self.layout.margin / 2.0);
        self.canvas.text_centered(
            text,
            self.layout.page_width / 2.0,
            baseline,
            TextStyle::new(Font::Regular, 8.0, Rgb::MUTED),
        );
    }

    fn into_builder(mut self) -> PdfBuilder {
        self.builder
            .push_page(self.layout.page_size(), std::mem::take(&mut self.canvas));
        self.builder
    }
}

fn draw_cover(flow: &mut PageFlow<'_>, report: &ReportData) {
    flow.text_line(
        &report.organization.name,
        TextStyle::new(Font::Regular, 10.0, Rgb::MUTED),
        18.0,
    );
    flow.text_line(
        &report.protocol_name,
        TextStyle::new(Font::Bold, 20.0, Rgb::INK),
        28.0,
    );
    flow.text_line(
        &report.project.name,
        TextStyle::new(Font::Bold, 13.0, Rgb::INK),
        20.0,
    );
    if let Some(filters) = report.filters.describe() {
        flow.text_line(
            &format!("Active filters: {filters}"),
            TextStyle::new(Font::Regular, 9.0, Rgb::MUTED),
            16.0,
        );
    }
    flow.cursor -= 6.0;
    let rule_y = flow.cursor;
    let (left, right) = (flow.left(), flow.left() + flow.width());
    flow.canvas.line(
        Point::new(left, rule_y),
        Point::new(right, rule_y),
        Stroke::new(Rgb::BORDER, 0.75),
    );
    flow.cursor -= 12.0;

    draw_metadata(flow, report);
    flow.cursor -= 12.0;
    draw_stat_boxes(flow, &StatusCounts::tally(&report.tasks));
}

fn draw_metadata(flow: &mut PageFlow<'_>, report: &ReportData) {
    let label_style = TextStyle::new(Font::Bold, 10.0, Rgb::INK);
    let value_style = TextStyle::new(Font::Regular, 10.0, Rgb::INK);
    let value_width = flow.width() - METADATA_LABEL_WIDTH;
    for (label, value) in report.project.cover_rows() {
        let lines = wrap_text(&value, value_style, value_width, DESCRIPTION_MAX_LINES);
        let line_count = lines.len().max(1);
        let row_height = 13.0 * f32::from(u16::try_from(line_count).unwrap_or(u16::MAX)) + 4.0;
        flow.ensure(row_height);
        let top = flow.cursor;
        let left = flow.left();
        flow.canvas
            .text(label, Point::new(left, top - 10.0), label_style);
        let mut baseline = top - 10.0;
        for line in &lines {
            flow.canvas.text(
                line,
                Point::new(left + METADATA_LABEL_WIDTH, baseline),
                value_style,
            );
            baseline -= 13.0;
        }
        flow.cursor -= row_height;
    }
}

fn draw_stat_boxes(flow: &mut PageFlow<'_>, counts: &StatusCounts) {
    flow.ensure(STAT_BOX_HEIGHT + SECTION_GAP);
    let box_width = (flow.width() - 3.0 * GRID_GAP) / 4.0;
    let top = flow.cursor;
    let mut x = flow.left();
    for status in TaskStatus::COUNTED {
        let colors = StatusPalette::colors(&status);
        let rect = Rect::new(x, top - STAT_BOX_HEIGHT, box_width, STAT_BOX_HEIGHT);
        flow.canvas.fill_rect(rect, colors.background);
        let center_x = x + box_width / 2.0;
        flow.canvas.text_centered(
            &counts.get(&status).to_string(),
            center_x,
            top - 30.0,
            TextStyle::new(Font::Bold, 20.0, colors.text),
        );
        flow.canvas.text_centered(
            status.label(),
            center_x,
            top - 48.0,
            TextStyle::new(Font::Regular, 9.0, colors.text),
        );
        x += box_width + GRID_GAP;
    }
    flow.cursor -= STAT_BOX_HEIGHT + SECTION_GAP;
}

fn column_widths(content_width: f32) -> [f32; 6] {
    let fixed: f32 = COLUMN_WIDTHS.iter().sum();
    let [index, title, status, priority, trade] = COLUMN_WIDTHS;
    [
        index,
        title,
        status,
        priority,
        trade,
        (content_width - fixed).max(40.0),
    ]
}

fn draw_task_table(flow: &mut PageFlow<'_>, tasks: &[TaskSnapshot]) {
    flow.ensure(22.0 + 2.0 * ROW_HEIGHT);
    flow.heading("Tasks");
    if tasks.is_empty() {
        flow.text_line(
            NO_TASKS_MESSAGE,
            TextStyle::new(Font::Regular, 10.0, Rgb::INK),
            16.0,
        );
        flow.cursor -= SECTION_GAP;
        return;
    }

    let widths = column_widths(flow.width());
    draw_table_header(flow, &widths);
    for task in tasks {
        if flow.ensure(ROW_HEIGHT) {
            draw_table_header(flow, &widths);
        }
        draw_task_row(flow, &widths, task);
    }
    flow.cursor -= SECTION_GAP;
}

fn draw_table_header(flow: &mut PageFlow<'_>, widths: &[f32; 6]) {
    let top = flow.cursor;
    flow.canvas.fill_rect(
        Rect::new(flow.left(), top - ROW_HEIGHT, flow.width(), ROW_HEIGHT),
        Rgb::LIGHT,
    );
    let style = TextStyle::new(Font::Bold, 9.0, Rgb::INK);
    let mut x = flow.left();
    for (title, width) in COLUMN_TITLES.iter().zip(widths) {
        flow.canvas
            .text(title, Point::new(x + CELL_PADDING, top - 12.5), style);
        x += width;
    }
    flow.cursor -= ROW_HEIGHT;
}

fn draw_task_row(flow: &mut PageFlow<'_>, widths: &[f32; 6], task: &TaskSnapshot) {
    let top = flow.cursor;
    let body = TextStyle::new(Font::Regular, 9.0, Rgb::INK);
    let status_style = TextStyle::new(
        Font::Bold,
        9.0,
        StatusPalette::colors(&task.status).text,
    );
    let cells = [
        (task.number.to_string(), body),
        (truncate(&task.title, TITLE_LIMIT), body),
        (task.status.label().to_owned(), status_style),
        (task.priority.label().to_owned(), body),
        (optional_cell(task.trade.as_deref(), TRADE_LIMIT), body),
        (optional_cell(task.assignee.as_deref(), ASSIGNEE_LIMIT), body),
    ];
    let mut x = flow.left();
    for ((text, style), width) in cells.iter().zip(widths) {
        flow.canvas
            .text(text, Point::new(x + CELL_PADDING, top - 12.5), *style);
        x += width;
    }
    let bottom = top - ROW_HEIGHT;
    let (left, right) = (flow.left(), flow.left() + flow.width());
    flow.canvas.line(
        Point::new(left, bottom),
        Point::new(right, bottom),
        Stroke::new(Rgb::BORDER, 0.5),
    );
    flow.cursor = bottom;
}

fn draw_photo_grid(flow: &mut PageFlow<'_>, groups: &[PhotoGroup]) {
    flow.ensure(22.0 + 18.0 + PHOTO_ROW_HEIGHT);
    flow.heading("Photos");
    for group in groups {
        flow.ensure(18.0 + PHOTO_ROW_HEIGHT);
        flow.text_line(
            &truncate(&group.heading(), 70),
            TextStyle::new(Font::Bold, 11.0, Rgb::INK),
            18.0,
        );
        for row in group.photos.chunks(GRID_COLUMNS) {
            flow.ensure(PHOTO_ROW_HEIGHT);
            let top = flow.cursor;
            let cell_width = (flow.width() - 2.0 * GRID_GAP) / 3.0;
            let mut x = flow.left();
            for photo in row {
                let cell = Rect::new(x, top - PHOTO_HEIGHT, cell_width, PHOTO_HEIGHT);
                match RasterImage::decode(&photo.bytes, flow.layout.max_photo_edge) {
                    Ok(raster) => draw_photo(flow, cell, raster),
                    Err(err) => {
                        warn!(
                            task_number = %group.task_number,
                            task_id = %photo.task_id,
                            error = %err,
                            "photo could not be decoded; drawing placeholder"
                        );
                        draw_placeholder(flow, cell);
                    }
                }
                if let Some(caption) = photo.caption.as_deref() {
                    flow.canvas.text(
                        &truncate(caption, CAPTION_LIMIT),
                        Point::new(x, cell.y - 11.0),
                        TextStyle::new(Font::Regular, 8.0, Rgb::MUTED),
                    );
                }
                x += cell_width + GRID_GAP;
            }
            flow.cursor -= PHOTO_ROW_HEIGHT;
        }
        flow.cursor -= 6.0;
    }
}

fn draw_photo(flow: &mut PageFlow<'_>, cell: Rect, raster: RasterImage) {
    let ratio = raster.aspect_ratio();
    let (width, height) = if cell.width / cell.height > ratio {
        (cell.height * ratio, cell.height)
    } else {
        (cell.width, cell.width / ratio)
    };
    let placed = Rect::new(
        cell.x + (cell.width - width) / 2.0,
        cell.y + (cell.height - height) / 2.0,
        width,
        height,
    );
    let xobject = flow.builder.add_image(raster);
    flow.canvas.place_image(&xobject, placed);
    flow.canvas.stroke_rect(cell, Stroke::new(Rgb::BORDER, 0.5));
}

fn draw_placeholder(flow: &mut PageFlow<'_>, cell: Rect) {
    flow.canvas.fill_rect(cell, Rgb::LIGHT);
    flow.canvas.stroke_rect(cell, Stroke::new(Rgb::BORDER, 1.0));
    let center = cell.center();
    flow.canvas.text_centered(
        IMAGE_UNAVAILABLE,
        center.x,
        center.y - 3.0,
        TextStyle::new(Font::Regular, 9.0, Rgb::MUTED),
    );
}

fn optional_cell(value: Option<&str>, limit: usize) -> String {
    value.map_or_else(|| "-".to_owned(), |text| truncate(text, limit))
}

/// Keeps the first `limit` characters of `text`, marking cuts with `...`.
pub(crate) fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut kept: String = text.chars().take(limit).collect();
    kept.push_str("...");
    kept
}

/// Breaks `text` into lines no wider than `max_width`, keeping at most
/// `max_lines`. A single word wider than the line gets a line of its own.
fn wrap_text(text: &str, style: TextStyle, max_width: f32, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_owned()
            } else {
                format!("{current} {word}")
            };
            if current.is_empty() || style.width_of(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_owned()));
            }
        }
        lines.push(current);
    }
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push_str("...");
        }
    }
    lines
}
