//! Then steps for protocol generation BDD scenarios.

use super::world::ProtocolWorld;
use rstest_bdd_macros::then;
use site_protocol::protocol::{
    domain::{ProtocolJobStatus, StatusPalette, TaskStatus},
    services::{ANNOTATION_TAG, ProtocolJobView},
};

fn finished(world: &ProtocolWorld) -> Result<&ProtocolJobView, eyre::Report> {
    world
        .finished
        .as_ref()
        .ok_or_else(|| eyre::eyre!("the job has not finished in scenario world"))
}

/// Output index of page `page` of `blueprint`.
fn blueprint_page(
    world: &ProtocolWorld,
    blueprint: &str,
    page: usize,
) -> Result<usize, eyre::Report> {
    let pages = world.document()?.blueprint_pages(blueprint);
    page.checked_sub(1)
        .and_then(|offset| pages.get(offset).copied())
        .ok_or_else(|| eyre::eyre!("'{blueprint}' has no page {page} in the protocol"))
}

#[then(r#"the job status is "{status}""#)]
fn the_job_status_is(world: &ProtocolWorld, status: String) -> Result<(), eyre::Report> {
    let expected = ProtocolJobStatus::try_from(status.as_str())?;
    let view = finished(world)?;
    if view.status != expected {
        return Err(eyre::eyre!(
            "expected job status {expected}, found {} ({:?})",
            view.status,
            view.failure_reason
        ));
    }
    Ok(())
}

#[then("the protocol has {count:usize} page")]
fn the_protocol_has_pages(world: &ProtocolWorld, count: usize) -> Result<(), eyre::Report> {
    let found = world.document()?.page_count();
    if found != count {
        return Err(eyre::eyre!("expected {count} pages, found {found}"));
    }
    Ok(())
}

#[then(r#"the protocol shows "{text}""#)]
fn the_protocol_shows(world: &ProtocolWorld, text: String) -> Result<(), eyre::Report> {
    if world.document()?.count_text(&text) == 0 {
        return Err(eyre::eyre!("expected the protocol to show '{text}'"));
    }
    Ok(())
}

#[then("every status count reads zero")]
fn every_status_count_reads_zero(world: &ProtocolWorld) -> Result<(), eyre::Report> {
    let document = world.document()?;
    for status in TaskStatus::COUNTED {
        if document.count_text(status.label()) == 0 {
            return Err(eyre::eyre!("missing stat box for '{}'", status.label()));
        }
    }
    let zeros = document.count_text("0");
    if zeros != TaskStatus::COUNTED.len() {
        return Err(eyre::eyre!(
            "expected {} zero counts, found {zeros}",
            TaskStatus::COUNTED.len()
        ));
    }
    Ok(())
}

#[then(r#"the protocol has no "{heading}" section"#)]
fn the_protocol_has_no_section(world: &ProtocolWorld, heading: String) -> Result<(), eyre::Report> {
    if world.document()?.count_text(&heading) > 0 {
        return Err(eyre::eyre!("expected no '{heading}' section"));
    }
    Ok(())
}

#[then(r#"the protocol ends with a divider and {count:usize} pages of "{blueprint}""#)]
fn ends_with_divider_and_pages(
    world: &ProtocolWorld,
    count: usize,
    blueprint: String,
) -> Result<(), eyre::Report> {
    let document = world.document()?;
    let total = document.page_count();
    let pages = document.blueprint_pages(&blueprint);
    let expected: Vec<usize> = (total.saturating_sub(count)..total).collect();
    if pages != expected {
        return Err(eyre::eyre!(
            "expected '{blueprint}' on pages {expected:?}, found {pages:?}"
        ));
    }
    let divider = total
        .checked_sub(count + 1)
        .ok_or_else(|| eyre::eyre!("no room for a divider before the blueprint pages"))?;
    if document.count_text_on(divider, "Blueprints") != 1 {
        return Err(eyre::eyre!("page {divider} is not the blueprint divider"));
    }
    Ok(())
}

#[then(r#"page {page:usize} of "{blueprint}" has {count:usize} red annotation with badge "{badge}""#)]
fn page_has_red_annotation(
    world: &ProtocolWorld,
    page: usize,
    blueprint: String,
    count: usize,
    badge: String,
) -> Result<(), eyre::Report> {
    let index = blueprint_page(world, &blueprint, page)?;
    let document = world.document()?;
    let found = document.tag_count(index, ANNOTATION_TAG);
    if found != count {
        return Err(eyre::eyre!("expected {count} annotations, found {found}"));
    }
    let red = StatusPalette::colors(&TaskStatus::Open).text.components();
    let strokes = document.stroke_colors_in(index, ANNOTATION_TAG);
    let all_red = !strokes.is_empty()
        && strokes.iter().all(|color| {
            color.len() == 3
                && color
                    .iter()
                    .zip(red)
                    .all(|(actual, expected)| (actual - expected).abs() < 0.01)
        });
    if !all_red {
        return Err(eyre::eyre!("expected red annotation borders, found {strokes:?}"));
    }
    if document.count_text_on(index, &badge) != count {
        return Err(eyre::eyre!("expected badge '{badge}' on the annotated page"));
    }
    Ok(())
}

#[then(r#"page {page:usize} of "{blueprint}" has {count:usize} annotations"#)]
fn page_has_annotations(
    world: &ProtocolWorld,
    page: usize,
    blueprint: String,
    count: usize,
) -> Result<(), eyre::Report> {
    let index = blueprint_page(world, &blueprint, page)?;
    let found = world.document()?.tag_count(index, ANNOTATION_TAG);
    if found != count {
        return Err(eyre::eyre!("expected {count} annotations, found {found}"));
    }
    Ok(())
}

#[then(r#"the protocol has no pages of "{blueprint}""#)]
fn the_protocol_has_no_pages_of(
    world: &ProtocolWorld,
    blueprint: String,
) -> Result<(), eyre::Report> {
    let pages = world.document()?.blueprint_pages(&blueprint);
    if !pages.is_empty() {
        return Err(eyre::eyre!("expected no '{blueprint}' pages, found {pages:?}"));
    }
    Ok(())
}

#[then("no storage key is recorded")]
fn no_storage_key_is_recorded(world: &ProtocolWorld) -> Result<(), eyre::Report> {
    let view = finished(world)?;
    if let Some(key) = view.download_ref.as_deref() {
        return Err(eyre::eyre!("expected no storage key, found '{key}'"));
    }
    if view.failure_reason.is_none() {
        return Err(eyre::eyre!("expected a failure reason"));
    }
    Ok(())
}

#[then("no protocol document was stored")]
fn no_protocol_document_was_stored(world: &ProtocolWorld) -> Result<(), eyre::Report> {
    let keys = world.blobs.keys()?;
    if keys.iter().any(|key| key.starts_with("protocols/")) {
        return Err(eyre::eyre!("expected no stored protocol, found {keys:?}"));
    }
    Ok(())
}
