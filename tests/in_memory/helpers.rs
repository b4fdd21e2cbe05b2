//! Shared test helpers for in-memory integration tests.

use camino::Utf8PathBuf;
use image::{ImageFormat, Rgb as Pixel, RgbImage};
use lopdf::{Document, Object, content::Content};
use mockable::DefaultClock;
use rstest::fixture;
use site_protocol::{
    pdf::{PageCanvas, PageSize, PdfBuilder, Rect, Rgb},
    protocol::{
        adapters::memory::InMemoryProjectCatalog,
        domain::{
            OrganizationId, OrganizationMeta, ProjectId, ProjectMeta, ProtocolJobRequest,
            TaskFilterRequest, TaskNumber, TaskPriority, TaskSnapshot, TaskStatus, UserId,
        },
    },
};
use std::io::{self, Cursor};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Provides a multi-threaded tokio runtime for async operations in tests.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
#[fixture]
pub fn runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
}

/// Provides a clock for job creation.
#[fixture]
pub fn clock() -> DefaultClock {
    DefaultClock
}

/// A catalog holding one organization and one of its projects.
pub struct SeededProject {
    pub catalog: Arc<InMemoryProjectCatalog>,
    pub organization_id: OrganizationId,
    pub project_id: ProjectId,
}

impl SeededProject {
    /// Appends a task to the seeded project.
    ///
    /// # Panics
    ///
    /// Panics if the catalog lock is poisoned.
    pub fn add_task(&self, task: TaskSnapshot) {
        self.catalog
            .insert_task(self.project_id, task)
            .expect("insert task");
    }

    /// Builds a generation request for the seeded project.
    #[must_use]
    pub fn request(&self, name: &str) -> ProtocolJobRequest {
        ProtocolJobRequest {
            project_id: self.project_id,
            organization_id: self.organization_id,
            requested_by: UserId::new(),
            name: name.to_owned(),
            filters: TaskFilterRequest::default(),
        }
    }
}

/// Provides a catalog seeded with "Harbour Lofts" owned by "Northwall
/// Construction".
#[fixture]
pub fn seeded_project() -> SeededProject {
    let catalog = Arc::new(InMemoryProjectCatalog::new());
    let organization_id = OrganizationId::new();
    let project_id = ProjectId::new();
    catalog
        .insert_organization(
            organization_id,
            OrganizationMeta {
                name: "Northwall Construction".to_owned(),
            },
        )
        .expect("insert organization");
    catalog
        .insert_project(project_id, organization_id, ProjectMeta::named("Harbour Lofts"))
        .expect("insert project");
    SeededProject {
        catalog,
        organization_id,
        project_id,
    }
}

/// Builds a task snapshot with medium priority.
#[must_use]
pub fn task(number: u32, title: &str, status: TaskStatus) -> TaskSnapshot {
    TaskSnapshot::new(TaskNumber::new(number), title, status, TaskPriority::Medium)
}

/// Builds a blueprint document with one page per size.
///
/// # Panics
///
/// Panics if the document cannot be serialized.
#[must_use]
pub fn blueprint_pdf(pages: &[(f32, f32)]) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    for (width, height) in pages {
        let mut canvas = PageCanvas::new();
        canvas.fill_rect(Rect::new(10.0, 10.0, 50.0, 50.0), Rgb::BORDER);
        builder.push_page(PageSize::new(*width, *height), canvas);
    }
    builder.finish().expect("blueprint fixture serializes")
}

/// Encodes a solid-color PNG.
///
/// # Panics
///
/// Panics if encoding fails.
#[must_use]
pub fn png_photo(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, Pixel([90, 140, 200]))
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("png fixture encodes");
    bytes.into_inner()
}

/// Returns the text shown on each page, byte-per-character.
///
/// # Panics
///
/// Panics if the document or a page content stream does not parse.
#[must_use]
pub fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
    let document = Document::load_mem(bytes).expect("document parses");
    document
        .get_pages()
        .into_values()
        .map(|page_id| {
            let content = document.get_page_content(page_id).expect("page content");
            Content::decode(&content)
                .expect("content decodes")
                .operations
                .into_iter()
                .filter(|operation| operation.operator == "Tj")
                .filter_map(|operation| match operation.operands.into_iter().next() {
                    Some(Object::String(shown, _)) => {
                        Some(shown.into_iter().map(char::from).collect())
                    }
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// Creates a unique directory under the system temp dir.
///
/// # Panics
///
/// Panics if the temp dir is not UTF-8 or cannot be written.
#[must_use]
pub fn scratch_dir(prefix: &str) -> Utf8PathBuf {
    let base = Utf8PathBuf::try_from(std::env::temp_dir()).expect("utf-8 temp dir");
    let dir = base.join(format!("{prefix}_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
