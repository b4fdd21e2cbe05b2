//! End-to-end protocol jobs against a directory-backed blob store.

use crate::in_memory::helpers::{
    SeededProject, blueprint_pdf, page_texts, png_photo, runtime, scratch_dir, seeded_project,
    task,
};
use camino::Utf8PathBuf;
use mockable::DefaultClock;
use rstest::rstest;
use site_protocol::protocol::{
    adapters::{
        fs::FsBlobStore,
        memory::{InMemoryAuditLog, InMemoryProtocolJobRepository},
    },
    domain::{
        BlueprintId, NormalizedRect, PageNumber, ProtocolJobStatus, TaskArea, TaskFilterRequest,
        TaskStatus,
    },
    ports::{BlueprintRef, PhotoRef},
    services::{CatalogPorts, ProtocolConfig, ProtocolGenerationService},
};
use std::io;
use std::sync::Arc;
use tokio::runtime::Runtime;

type DiskService = ProtocolGenerationService<InMemoryProtocolJobRepository, DefaultClock>;

struct DiskSite {
    seeded: SeededProject,
    root: Utf8PathBuf,
    service: DiskService,
}

impl DiskSite {
    fn new(seeded: SeededProject) -> Self {
        let root = scratch_dir("site_protocol_e2e");
        let blobs = Arc::new(FsBlobStore::open(&root).expect("open store"));
        let service = ProtocolGenerationService::new(
            Arc::new(InMemoryProtocolJobRepository::new()),
            CatalogPorts::from_catalog(Arc::clone(&seeded.catalog), blobs),
            Arc::new(InMemoryAuditLog::new()),
            ProtocolConfig::default(),
            Arc::new(DefaultClock),
        )
        .expect("valid config");
        Self {
            seeded,
            root,
            service,
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create blob dir");
        }
        std::fs::write(path, bytes).expect("write blob");
    }

    fn seed_tasks_with_blueprint(&self) {
        let blueprint_id = BlueprintId::new();
        self.put("blueprints/ground.pdf", &blueprint_pdf(&[(842.0, 595.0)]));
        self.seeded
            .catalog
            .insert_blueprint(
                self.seeded.project_id,
                BlueprintRef {
                    id: blueprint_id,
                    name: "Ground floor".to_owned(),
                    storage_key: "blueprints/ground.pdf".to_owned(),
                },
            )
            .expect("insert blueprint");

        let open = task(1, "Seal window frame", TaskStatus::Open)
            .with_photo_count(1)
            .with_area(
                blueprint_id,
                TaskArea {
                    rect: NormalizedRect::new(0.2, 0.2, 0.3, 0.1).expect("rect"),
                    page: PageNumber::FIRST,
                },
            );
        self.put("photos/frame.png", &png_photo(16, 12));
        self.seeded
            .catalog
            .insert_photo(PhotoRef {
                task_id: open.id,
                storage_key: "photos/frame.png".to_owned(),
                caption: Some("North elevation".to_owned()),
            })
            .expect("insert photo");
        self.seeded.add_task(open);
        self.seeded
            .add_task(task(2, "Paint stairwell", TaskStatus::Completed));
    }
}

impl Drop for DiskSite {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Tests that a job reads sources from disk and writes the protocol back.
#[rstest]
fn completed_job_writes_document_to_disk(
    runtime: io::Result<Runtime>,
    seeded_project: SeededProject,
) {
    let rt = runtime.expect("runtime creation");
    let site = DiskSite::new(seeded_project);
    site.seed_tasks_with_blueprint();

    let view = rt.block_on(async {
        let ticket = site
            .service
            .start_generation(site.seeded.request("Weekly site walk"))
            .await
            .expect("job accepted");
        let job_id = ticket.job_id;
        assert_eq!(ticket.wait().await.expect("worker"), ProtocolJobStatus::Completed);
        site.service
            .get_job(job_id)
            .await
            .expect("lookup")
            .expect("job exists")
    });

    let key = view.download_ref.expect("download ref");
    let bytes = std::fs::read(site.root.join(&key)).expect("protocol on disk");
    let pages = page_texts(&bytes);

    assert!(bytes.starts_with(b"%PDF"));
    let cover = pages.first().expect("cover page");
    assert!(cover.iter().any(|text| text == "Weekly site walk"));
    assert!(pages.iter().flatten().any(|text| text == "Seal window frame"));
    assert!(pages.iter().flatten().any(|text| text == "Paint stairwell"));
    assert!(pages.iter().flatten().any(|text| text == "North elevation"));
    let last = pages.last().expect("pages");
    assert!(
        last.iter()
            .any(|text| text.starts_with("Ground floor") && text.ends_with("Page 1"))
    );
}

/// Tests that request filters narrow the rendered task table.
#[rstest]
fn filters_narrow_the_rendered_tasks(
    runtime: io::Result<Runtime>,
    seeded_project: SeededProject,
) {
    let rt = runtime.expect("runtime creation");
    let site = DiskSite::new(seeded_project);
    site.seed_tasks_with_blueprint();
    let mut request = site.seeded.request("Completed items");
    request.filters = TaskFilterRequest {
        status: Some("completed".to_owned()),
        ..TaskFilterRequest::default()
    };

    let view = rt.block_on(async {
        let ticket = site
            .service
            .start_generation(request)
            .await
            .expect("job accepted");
        let job_id = ticket.job_id;
        ticket.wait().await.expect("worker");
        site.service
            .get_job(job_id)
            .await
            .expect("lookup")
            .expect("job exists")
    });

    assert_eq!(view.status, ProtocolJobStatus::Completed);
    let key = view.download_ref.expect("download ref");
    let pages = page_texts(&std::fs::read(site.root.join(&key)).expect("protocol on disk"));
    let texts: Vec<&String> = pages.iter().flatten().collect();
    assert!(texts.iter().any(|text| *text == "Paint stairwell"));
    assert!(!texts.iter().any(|text| *text == "Seal window frame"));
    assert!(!texts.iter().any(|text| *text == "North elevation"));
}
