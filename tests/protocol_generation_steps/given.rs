//! Given steps for protocol generation BDD scenarios.

use super::world::{ProtocolWorld, blueprint_pdf, png_photo};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use site_protocol::protocol::{
    domain::{
        BlueprintId, NormalizedRect, OrganizationMeta, PageNumber, ProjectMeta, TaskArea,
        TaskNumber, TaskPriority, TaskSnapshot, TaskStatus,
    },
    ports::{BlueprintRef, PhotoRef},
};

fn add_blueprint(world: &mut ProtocolWorld, name: &str, source: Vec<u8>) -> eyre::Result<()> {
    let id = BlueprintId::new();
    let storage_key = format!("blueprints/{id}.pdf");
    world
        .blobs
        .insert(storage_key.clone(), source)
        .wrap_err("store blueprint source")?;
    world
        .catalog
        .insert_blueprint(
            world.project_id,
            BlueprintRef {
                id,
                name: name.to_owned(),
                storage_key,
            },
        )
        .wrap_err("insert blueprint")?;
    world.blueprints.insert(name.to_owned(), id);
    Ok(())
}

#[given(r#"a project "{project}" owned by "{organization}""#)]
fn a_project_owned_by(
    world: &mut ProtocolWorld,
    project: String,
    organization: String,
) -> Result<(), eyre::Report> {
    world
        .catalog
        .insert_organization(world.organization_id, OrganizationMeta { name: organization })
        .wrap_err("insert organization")?;
    world
        .catalog
        .insert_project(world.project_id, world.organization_id, ProjectMeta::named(project))
        .wrap_err("insert project")?;
    Ok(())
}

#[given(r#"a blueprint "{name}" with {pages:usize} pages"#)]
fn a_blueprint_with_pages(
    world: &mut ProtocolWorld,
    name: String,
    pages: usize,
) -> Result<(), eyre::Report> {
    let source = blueprint_pdf(pages)?;
    add_blueprint(world, &name, source)
}

#[given(r#"an unreadable blueprint "{name}""#)]
fn an_unreadable_blueprint(world: &mut ProtocolWorld, name: String) -> Result<(), eyre::Report> {
    add_blueprint(world, &name, b"%PDF-1.7 truncated upload".to_vec())
}

#[given(
    r#"open task {number:u32} "{title}" with {photos:usize} photos drawn on page {page:u32} of "{blueprint}""#
)]
fn open_task_on_blueprint(
    world: &mut ProtocolWorld,
    number: u32,
    title: String,
    photos: usize,
    page: u32,
    blueprint: String,
) -> Result<(), eyre::Report> {
    let blueprint_id = *world
        .blueprints
        .get(&blueprint)
        .ok_or_else(|| eyre::eyre!("unknown blueprint '{blueprint}' in scenario world"))?;
    let area = TaskArea {
        rect: NormalizedRect::new(0.1, 0.2, 0.3, 0.2)?,
        page: PageNumber::new(page)?,
    };
    let task = TaskSnapshot::new(
        TaskNumber::new(number),
        title,
        TaskStatus::Open,
        TaskPriority::High,
    )
    .with_photo_count(u32::try_from(photos)?)
    .with_area(blueprint_id, area);

    for index in 0..photos {
        let storage_key = format!("photos/{}-{index}.png", task.id);
        world
            .blobs
            .insert(storage_key.clone(), png_photo()?)
            .wrap_err("store photo")?;
        world
            .catalog
            .insert_photo(PhotoRef {
                task_id: task.id,
                storage_key,
                caption: Some(format!("Photo {}", index + 1)),
            })
            .wrap_err("insert photo")?;
    }
    world
        .catalog
        .insert_task(world.project_id, task)
        .wrap_err("insert task")?;
    Ok(())
}

#[given("background work is held")]
fn background_work_is_held(world: &mut ProtocolWorld) -> Result<(), eyre::Report> {
    let permit = std::sync::Arc::clone(&world.gate)
        .try_acquire_owned()
        .wrap_err("hold the project lookup gate")?;
    world.held = Some(permit);
    Ok(())
}
