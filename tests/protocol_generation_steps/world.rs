//! Shared world state for protocol generation BDD scenarios.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::{ImageFormat, Rgb as Pixel, RgbImage};
use lopdf::{Document, Object, content::Operation};
use mockable::DefaultClock;
use rstest::fixture;
use site_protocol::{
    pdf::{PageCanvas, PageSize, PdfBuilder, Rect, Rgb, encode_win_ansi},
    protocol::{
        adapters::memory::{
            InMemoryAuditLog, InMemoryBlobStore, InMemoryProjectCatalog,
            InMemoryProtocolJobRepository,
        },
        domain::{
            BlueprintId, OrganizationId, ProjectId, ProjectMeta, ProtocolJobId,
            ProtocolJobRequest, TaskFilterRequest, UserId,
        },
        ports::{CatalogError, CatalogResult, ProjectRepository},
        services::{
            CatalogPorts, GenerationTicket, ProtocolConfig, ProtocolGenerationService,
            ProtocolJobView,
        },
    },
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Service type used by the BDD world.
pub type TestProtocolService =
    ProtocolGenerationService<InMemoryProtocolJobRepository, DefaultClock>;

/// Project lookup that waits for the world's gate before answering.
struct GatedProjects {
    inner: Arc<InMemoryProjectCatalog>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl ProjectRepository for GatedProjects {
    async fn get(
        &self,
        id: ProjectId,
        organization_id: OrganizationId,
    ) -> CatalogResult<Option<ProjectMeta>> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(CatalogError::persistence)?;
        ProjectRepository::get(&*self.inner, id, organization_id).await
    }
}

/// Scenario world for protocol generation behaviour tests.
pub struct ProtocolWorld {
    /// The generation service under test.
    pub service: TestProtocolService,
    /// Catalog behind every read port.
    pub catalog: Arc<InMemoryProjectCatalog>,
    /// Source and output bytes.
    pub blobs: Arc<InMemoryBlobStore>,
    /// Gate in front of project lookups.
    pub gate: Arc<Semaphore>,
    /// Permit held while background work is paused.
    pub held: Option<OwnedSemaphorePermit>,
    /// Project the scenario reports on.
    pub project_id: ProjectId,
    /// Owner of the project.
    pub organization_id: OrganizationId,
    /// Blueprints added so far, by name.
    pub blueprints: HashMap<String, BlueprintId>,
    /// Ticket of the running job.
    pub ticket: Option<GenerationTicket>,
    /// Identifier of the requested job.
    pub job_id: Option<ProtocolJobId>,
    /// Job state after it finished.
    pub finished: Option<ProtocolJobView>,
    /// Stored document of a completed job.
    pub document: Option<RenderedProtocol>,
}

impl ProtocolWorld {
    /// Creates a world with an empty catalog and an open gate.
    #[must_use]
    pub fn new() -> Self {
        let catalog = Arc::new(InMemoryProjectCatalog::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let gate = Arc::new(Semaphore::new(1));
        let mut ports = CatalogPorts::from_catalog(Arc::clone(&catalog), blobs.clone());
        ports.projects = Arc::new(GatedProjects {
            inner: Arc::clone(&catalog),
            gate: Arc::clone(&gate),
        });
        let service = ProtocolGenerationService::new(
            Arc::new(InMemoryProtocolJobRepository::new()),
            ports,
            Arc::new(InMemoryAuditLog::new()),
            ProtocolConfig::default(),
            Arc::new(DefaultClock),
        )
        .expect("default configuration is valid");
        Self {
            service,
            catalog,
            blobs,
            gate,
            held: None,
            project_id: ProjectId::new(),
            organization_id: OrganizationId::new(),
            blueprints: HashMap::new(),
            ticket: None,
            job_id: None,
            finished: None,
            document: None,
        }
    }

    /// Builds a generation request for the scenario project.
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

    /// Returns the stored document of the finished job.
    ///
    /// # Errors
    ///
    /// Returns an error when no document was stored.
    pub fn document(&self) -> Result<&RenderedProtocol, eyre::Report> {
        self.document
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no protocol document in scenario world"))
    }
}

impl Default for ProtocolWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ProtocolWorld {
    ProtocolWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Builds a blueprint document with `pages` landscape pages.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn blueprint_pdf(pages: usize) -> Result<Vec<u8>, eyre::Report> {
    let mut builder = PdfBuilder::new();
    for _ in 0..pages {
        let mut canvas = PageCanvas::new();
        canvas.fill_rect(Rect::new(30.0, 30.0, 200.0, 120.0), Rgb::BORDER);
        builder.push_page(PageSize::new(800.0, 600.0), canvas);
    }
    Ok(builder.finish()?)
}

/// Encodes a small PNG photo.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn png_photo() -> Result<Vec<u8>, eyre::Report> {
    let mut bytes = Cursor::new(Vec::new());
    RgbImage::from_pixel(24, 18, Pixel([120, 160, 90])).write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// A stored protocol parsed back into per-page content operations.
pub struct RenderedProtocol {
    pages: Vec<Vec<Operation>>,
}

impl RenderedProtocol {
    /// Parses a stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document or a content stream does not parse.
    pub fn parse(bytes: &[u8]) -> Result<Self, eyre::Report> {
        let document = Document::load_mem(bytes)?;
        let pages = document
            .get_pages()
            .into_values()
            .map(|page_id| {
                let content = document.get_page_content(page_id)?;
                Ok(lopdf::content::Content::decode(&content)?.operations)
            })
            .collect::<Result<Vec<_>, lopdf::Error>>()?;
        Ok(Self { pages })
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Strings shown on page `index`, byte-per-character.
    #[must_use]
    pub fn texts(&self, index: usize) -> Vec<String> {
        self.pages
            .get(index)
            .map(|operations| {
                operations
                    .iter()
                    .filter_map(shown)
                    .map(|bytes| bytes.iter().copied().map(char::from).collect())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// How often `text` is shown anywhere in the document.
    #[must_use]
    pub fn count_text(&self, text: &str) -> usize {
        (0..self.pages.len())
            .map(|index| self.count_text_on(index, text))
            .sum()
    }

    /// How often `text` is shown on page `index`.
    #[must_use]
    pub fn count_text_on(&self, index: usize, text: &str) -> usize {
        let expected = encode_win_ansi(text);
        self.pages.get(index).map_or(0, |operations| {
            operations
                .iter()
                .filter_map(shown)
                .filter(|bytes| *bytes == expected.as_slice())
                .count()
        })
    }

    /// Indices of the pages whose label strip names `blueprint`.
    #[must_use]
    pub fn blueprint_pages(&self, blueprint: &str) -> Vec<usize> {
        (0..self.pages.len())
            .filter(|index| {
                self.texts(*index)
                    .iter()
                    .any(|text| text.starts_with(blueprint) && text.contains(" Page "))
            })
            .collect()
    }

    /// Marked-content groups tagged `tag` on page `index`.
    #[must_use]
    pub fn tag_count(&self, index: usize, tag: &str) -> usize {
        self.pages.get(index).map_or(0, |operations| {
            operations
                .iter()
                .filter(|operation| operation.operator == "BMC" && names(operation, tag))
                .count()
        })
    }

    /// Stroke colors set inside groups tagged `tag` on page `index`.
    #[must_use]
    pub fn stroke_colors_in(&self, index: usize, tag: &str) -> Vec<Vec<f32>> {
        let mut inside = false;
        let mut colors = Vec::new();
        for operation in self.pages.get(index).into_iter().flatten() {
            match operation.operator.as_str() {
                "BMC" => inside = names(operation, tag),
                "EMC" => inside = false,
                "RG" if inside => colors.push(
                    operation
                        .operands
                        .iter()
                        .filter_map(|value| value.as_float().ok())
                        .collect(),
                ),
                _ => {}
            }
        }
        colors
    }
}

fn shown(operation: &Operation) -> Option<&[u8]> {
    if operation.operator != "Tj" {
        return None;
    }
    match operation.operands.first() {
        Some(Object::String(bytes, _)) => Some(bytes.as_slice()),
        _ => None,
    }
}

fn names(operation: &Operation, tag: &str) -> bool {
    operation
        .operands
        .first()
        .and_then(|operand| operand.as_name().ok())
        .is_some_and(|name| name == tag.as_bytes())
}
