//! When steps for protocol generation BDD scenarios.

use super::world::{ProtocolWorld, RenderedProtocol, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use site_protocol::protocol::ports::BlobStore;

#[when(r#"a protocol named "{name}" is requested"#)]
fn a_protocol_is_requested(world: &mut ProtocolWorld, name: String) -> Result<(), eyre::Report> {
    let request = world.request(&name);
    let ticket = run_async(world.service.start_generation(request))
        .wrap_err("start protocol generation")?;
    world.job_id = Some(ticket.job_id);
    world.ticket = Some(ticket);
    Ok(())
}

#[when("the project is deleted")]
fn the_project_is_deleted(world: &mut ProtocolWorld) -> Result<(), eyre::Report> {
    world
        .catalog
        .remove_project(world.project_id)
        .wrap_err("remove project")?;
    Ok(())
}

#[when("background work is released")]
fn background_work_is_released(world: &mut ProtocolWorld) {
    world.held = None;
}

#[when("the job finishes")]
fn the_job_finishes(world: &mut ProtocolWorld) -> Result<(), eyre::Report> {
    let ticket = world
        .ticket
        .take()
        .ok_or_else(|| eyre::eyre!("no running job in scenario world"))?;
    let job_id = ticket.job_id;
    run_async(ticket.wait()).wrap_err("wait for the background job")?;

    let view = run_async(world.service.get_job(job_id))
        .wrap_err("look up finished job")?
        .ok_or_else(|| eyre::eyre!("job {job_id} was not stored"))?;
    if let Some(key) = view.download_ref.as_deref() {
        let bytes = run_async(world.blobs.read(key)).wrap_err("read stored protocol")?;
        world.document = Some(RenderedProtocol::parse(&bytes)?);
    }
    world.finished = Some(view);
    Ok(())
}
