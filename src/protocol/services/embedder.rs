//! Splices blueprint pages into a composed protocol and draws task overlays.
//!
//! Every source page of a blueprint becomes a form XObject drawn onto a new
//! page scaled to a fixed width. Overlay geometry is stored normalized in a
//! top-left frame and mapped onto the scaled page here.

use super::config::LayoutConfig;
use crate::pdf::{
    Font, ImportedPage, PageCanvas, PageSize, PdfBuilder, PdfError, Point, Rect, Rgb, Stroke,
    TextStyle,
};
use crate::protocol::domain::{
    Annotation, BlueprintDocument, BlueprintId, PageNumber, PlacedMarker, StatusPalette,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Marked-content tag wrapping every rectangle overlay.
pub const ANNOTATION_TAG: &str = "ProtocolAnnotation";
/// Marked-content tag wrapping every point marker.
pub const MARKER_TAG: &str = "ProtocolMarker";

const ANNOTATION_FILL_OPACITY: f32 = 0.125;
const ANNOTATION_BORDER_WIDTH: f32 = 2.0;
const BADGE_RADIUS: f32 = 9.0;
const BADGE_RING: f32 = 2.0;
const MARKER_DOT_RADIUS: f32 = 2.5;
const MARKER_LABEL_RADIUS: f32 = 9.0;
const LABEL_STRIP_HEIGHT: f32 = 18.0;

/// Divider type sizes and line steps, tried largest first.
const DIVIDER_TYPE_SIZES: [(f32, f32); 4] = [(11.0, 16.0), (9.0, 12.0), (7.0, 9.0), (5.5, 7.0)];
const DIVIDER_COLUMN_GAP: f32 = 12.0;
const DIVIDER_MIN_COLUMN_WIDTH: f32 = 60.0;

/// Failure of the output document itself.
///
/// Problems with a single blueprint never surface here; they are listed in
/// [`EmbedReport::skipped`].
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The base document could not be loaded, extended or serialized.
    #[error("blueprint embedding failed: {0}")]
    Pdf(#[from] PdfError),
}

/// One blueprint page written to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPage {
    /// Source blueprint.
    pub blueprint_id: BlueprintId,
    /// Page of the source document.
    pub source_page: PageNumber,
    /// Rectangle overlays drawn on the page.
    pub annotations: usize,
    /// Point markers drawn on the page.
    pub markers: usize,
}

/// A blueprint left out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlueprint {
    /// Blueprint identifier.
    pub blueprint_id: BlueprintId,
    /// Display name.
    pub name: String,
    /// Why it was left out.
    pub reason: String,
}

/// What [`BlueprintEmbedder::embed`] wrote and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedReport {
    /// Whether a divider page was inserted.
    pub divider: bool,
    /// Blueprint pages in output order.
    pub pages: Vec<EmbeddedPage>,
    /// Blueprints whose source could not be imported.
    pub skipped: Vec<SkippedBlueprint>,
}

impl EmbedReport {
    /// Number of pages added to the base document.
    #[must_use]
    pub fn pages_added(&self) -> usize {
        self.pages.len() + usize::from(self.divider)
    }
}

/// The merged document and its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOutcome {
    /// Serialized document.
    pub bytes: Vec<u8>,
    /// What was embedded.
    pub report: EmbedReport,
}

/// Embeds blueprint pages with overlays into a composed document.
#[derive(Debug, Clone)]
pub struct BlueprintEmbedder {
    layout: LayoutConfig,
}

impl BlueprintEmbedder {
    /// Creates an embedder for the given layout.
    #[must_use]
    pub const fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    /// Inserts a divider page followed by every page of every blueprint at
    /// `insertion_index` of `base`.
    ///
    /// Blueprints whose source cannot be parsed are skipped whole and listed
    /// in the report rather than on the divider. Overlays targeting pages the
    /// source does not have are not drawn. Without blueprints the base
    /// document is returned as is; when every blueprint is skipped no divider
    /// is added.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError`] when `base` cannot be loaded, the index lies
    /// past its last page, or serialization fails.
    pub fn embed(
        &self,
        base: &[u8],
        blueprints: &[BlueprintDocument],
        insertion_index: usize,
    ) -> Result<EmbedOutcome, EmbedError> {
        if blueprints.is_empty() {
            return Ok(EmbedOutcome {
                bytes: base.to_vec(),
                report: EmbedReport::default(),
            });
        }

        let mut builder = PdfBuilder::load(base)?;
        let mut report = EmbedReport::default();
        let mut imported = Vec::with_capacity(blueprints.len());
        for blueprint in blueprints {
            match builder.import_pages(&blueprint.source) {
                Ok(source_pages) => imported.push((blueprint, source_pages)),
                Err(err) => {
                    warn!(
                        blueprint_id = %blueprint.id,
                        blueprint = %blueprint.name,
                        error = %err,
                        "blueprint skipped"
                    );
                    report.skipped.push(SkippedBlueprint {
                        blueprint_id: blueprint.id,
                        name: blueprint.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let mut pages = Vec::new();
        if !imported.is_empty() {
            let names: Vec<&str> = imported
                .iter()
                .map(|(blueprint, _)| blueprint.name.as_str())
                .collect();
            pages.push((self.layout.page_size(), self.divider(&names)));
            report.divider = true;
        }
        for (blueprint, source_pages) in imported {
            self.draw_blueprint(blueprint, source_pages, &mut pages, &mut report);
        }

        builder.insert_pages(insertion_index, pages)?;
        let bytes = builder.finish()?;
        debug!(
            pages_added = report.pages_added(),
            skipped = report.skipped.len(),
            "blueprints embedded"
        );
        Ok(EmbedOutcome { bytes, report })
    }

    /// Lists `names` on a single page, adding columns and then shrinking the
    /// type until every name fits.
    fn divider(&self, names: &[&str]) -> PageCanvas {
        let mut canvas = PageCanvas::new();
        let left = self.layout.margin;
        let top = self.layout.page_height - self.layout.margin - 20.0;
        canvas.text(
            "Blueprints",
            Point::new(left, top),
            TextStyle::new(Font::Bold, 20.0, Rgb::INK),
        );

        let entries: Vec<String> = names.iter().map(|name| format!("\u{2022} {name}")).collect();
        let grid = self.divider_grid(&entries, top - 30.0);
        let listed = if grid.capacity() >= entries.len() {
            entries.len()
        } else {
            grid.capacity().saturating_sub(1)
        };

        let mut cells = grid.cells(left, top - 30.0);
        for (entry, origin) in entries.iter().take(listed).zip(&mut cells) {
            canvas.text(entry, origin, grid.style);
        }
        let hidden = entries.len().saturating_sub(listed);
        if hidden > 0 {
            warn!(listed, hidden, "divider cannot fit every blueprint name");
            if let Some(origin) = cells.next() {
                canvas.text(&format!("... and {hidden} more"), origin, grid.style);
            }
        }
        canvas
    }

    fn divider_grid(&self, entries: &[String], first_baseline: f32) -> DividerGrid {
        let available = self.layout.content_width();
        let mut grid = DividerGrid::default();
        for (size, step) in DIVIDER_TYPE_SIZES {
            let style = TextStyle::new(Font::Regular, size, Rgb::INK);
            let widest = entries
                .iter()
                .map(|entry| style.width_of(entry))
                .fold(DIVIDER_MIN_COLUMN_WIDTH, f32::max);
            let column_width = widest + DIVIDER_COLUMN_GAP;
            let mut columns = 1_usize;
            let mut used = column_width;
            while used + column_width <= available + DIVIDER_COLUMN_GAP {
                columns += 1;
                used += column_width;
            }
            let mut rows = 0_usize;
            let mut baseline = first_baseline;
            while baseline >= self.layout.margin {
                rows += 1;
                baseline -= step;
            }
            grid = DividerGrid {
                style,
                step,
                column_width,
                rows,
                columns,
            };
            if grid.capacity() >= entries.len() {
                break;
            }
        }
        grid
    }

    fn draw_blueprint(
        &self,
        blueprint: &BlueprintDocument,
        imported: Vec<ImportedPage>,
        pages: &mut Vec<(PageSize, PageCanvas)>,
        report: &mut EmbedReport,
    ) {
        let page_count = u32::try_from(imported.len()).unwrap_or(u32::MAX);
        let beyond = blueprint.overlays_beyond(page_count);
        if beyond > 0 {
            debug!(
                blueprint_id = %blueprint.id,
                overlays = beyond,
                pages = page_count,
                "overlays target pages the blueprint does not have"
            );
        }

        for (number, page) in (1..=page_count).zip(imported) {
            let Ok(page_number) = PageNumber::new(number) else {
                continue;
            };
            let scale = self.layout.blueprint_width / page.size.width;
            let size = PageSize::new(self.layout.blueprint_width, page.size.height * scale);
            let mut canvas = PageCanvas::new();
            canvas.place_form(&page.xobject, Point::new(0.0, 0.0), scale);
            draw_label_strip(&mut canvas, size, &format!("{} \u{2014} Page {number}", blueprint.name));

            let mut annotations = 0;
            for annotation in blueprint.annotations_on(page_number) {
                draw_annotation(&mut canvas, size, annotation);
                annotations += 1;
            }
            let mut markers = 0;
            for marker in blueprint.markers_on(page_number) {
                self.draw_marker(&mut canvas, size, &marker);
                markers += 1;
            }

            pages.push((size, canvas));
            report.pages.push(EmbeddedPage {
                blueprint_id: blueprint.id,
                source_page: page_number,
                annotations,
                markers,
            });
        }
    }

    fn draw_marker(&self, canvas: &mut PageCanvas, size: PageSize, marker: &PlacedMarker) {
        let color = StatusPalette::MARKER;
        let anchor = marker.point.to_page_space(size.width, size.height);
        let dot = Point::new(anchor.x, anchor.y);
        let label_center = Point::new(
            anchor.x + self.layout.marker_offset_x,
            anchor.y + self.layout.marker_offset_y,
        );
        let label = marker.label();
        let style = TextStyle::new(Font::Bold, 7.0, color);
        let radius = MARKER_LABEL_RADIUS.max(style.width_of(&label) / 2.0 + 3.0);

        canvas.marked(MARKER_TAG, |layer| {
            layer.circle(dot, MARKER_DOT_RADIUS, Some(color), None);
            layer.line(dot, label_center, Stroke::new(color, 0.75));
            layer.circle(label_center, radius, Some(Rgb::WHITE), Some(Stroke::new(color, 1.25)));
            layer.text_centered(&label, label_center.x, label_center.y - 2.5, style);
        });
    }
}

/// Column layout of the divider's name list.
#[derive(Debug, Clone, Copy)]
struct DividerGrid {
    style: TextStyle,
    step: f32,
    column_width: f32,
    rows: usize,
    columns: usize,
}

impl Default for DividerGrid {
    fn default() -> Self {
        Self {
            style: TextStyle::new(Font::Regular, 11.0, Rgb::INK),
            step: 16.0,
            column_width: DIVIDER_MIN_COLUMN_WIDTH,
            rows: 0,
            columns: 1,
        }
    }
}

impl DividerGrid {
    const fn capacity(&self) -> usize {
        self.rows.saturating_mul(self.columns)
    }

    /// Baselines in reading order: down each column, then across.
    fn cells(self, left: f32, top: f32) -> impl Iterator<Item = Point> {
        let mut row = 0_usize;
        let mut origin = Point::new(left, top);
        std::iter::from_fn(move || {
            if self.rows == 0 {
                return None;
            }
            if row == self.rows {
                row = 0;
                origin = Point::new(origin.x + self.column_width, top);
            }
            let cell = origin;
            row += 1;
            origin.y -= self.step;
            Some(cell)
        })
        .take(self.capacity())
    }
}

fn draw_label_strip(canvas: &mut PageCanvas, size: PageSize, text: &str) {
    let strip = Rect::new(0.0, size.height - LABEL_STRIP_HEIGHT, size.width, LABEL_STRIP_HEIGHT);
    canvas.with_opacity(0.8, |layer| layer.fill_rect(strip, Rgb::WHITE));
    canvas.text(
        text,
        Point::new(6.0, size.height - 12.5),
        TextStyle::new(Font::Bold, 9.0, Rgb::INK),
    );
}

fn draw_annotation(canvas: &mut PageCanvas, size: PageSize, annotation: &Annotation) {
    let colors = StatusPalette::colors(&annotation.task_status);
    let area = annotation.rect.to_page_space(size.width, size.height);
    let rect = Rect::new(area.x, area.y, area.width, area.height);
    let center = rect.center();
    let number = annotation.task_number.to_string();
    let style = TextStyle::new(Font::Bold, 9.0, Rgb::WHITE);

    canvas.marked(ANNOTATION_TAG, |layer| {
        layer.with_opacity(ANNOTATION_FILL_OPACITY, |fill| fill.fill_rect(rect, colors.text));
        layer.stroke_rect(rect, Stroke::new(colors.text, ANNOTATION_BORDER_WIDTH));
        layer.circle(center, BADGE_RADIUS + BADGE_RING, Some(Rgb::WHITE), None);
        layer.circle(center, BADGE_RADIUS, Some(colors.text), None);
        layer.text_centered(&number, center.x, center.y - 3.0, style);
    });
}
