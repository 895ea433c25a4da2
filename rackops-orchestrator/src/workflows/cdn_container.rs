use super::{Outcome, Session};
use crate::console::Console;
use crate::upload::upload_directory;
use rackops_common::validate::{check_min_ttl, MIN_CDN_TTL};
use rackops_common::{Container, RackopsError};
use rackops_providers::ObjectStore;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct CdnContainerOptions {
    pub directory: PathBuf,
    pub container: String,
    pub ttl: u32,
    /// Upload into a container that already exists.
    pub force: bool,
}

/// Get a CDN-enabled container, creating it when missing.
///
/// An existing container is only reused with `force`; one that is not yet
/// published is CDN-enabled with `ttl`.
pub(crate) async fn prepare_cdn_container(
    store: &dyn ObjectStore,
    name: &str,
    ttl: u32,
    force: bool,
    console: &mut Console,
) -> Result<Container, RackopsError> {
    console.line("Checking if container already exists...");
    let Some(existing) = store.get_container(name).await? else {
        console.line(format!(
            "Container '{}' not found, creating with TTL set to {}...",
            name, ttl
        ));
        store.create_container(name).await?;
        return Ok(store.enable_cdn(name, ttl).await?);
    };

    match &existing.cdn {
        Some(cdn) => console.line(format!(
            "Container '{}' found with TTL set to {}",
            existing.name, cdn.ttl
        )),
        None => console.line(format!("Container '{}' found (not CDN enabled)", existing.name)),
    }
    if !force {
        console.line("Force flag not set, exiting...");
        return Err(RackopsError::ContainerExists(existing.name));
    }
    console.line("Proceeding as force flag is set");
    if existing.cdn.is_none() {
        return Ok(store.enable_cdn(name, ttl).await?);
    }
    Ok(existing)
}

pub async fn run(session: &mut Session, opts: &CdnContainerOptions) -> Result<Outcome, RackopsError> {
    check_min_ttl(opts.ttl, MIN_CDN_TTL, "CDN TTL")?;
    if !opts.directory.is_dir() {
        return Err(RackopsError::InvalidInput(format!(
            "directory '{}' not found, please check the path and try again",
            opts.directory.display()
        )));
    }
    let Session { cloud, console, .. } = session;
    let store = cloud.object_store.as_ref();

    let container = prepare_cdn_container(store, &opts.container, opts.ttl, opts.force, console).await?;

    console.line("Beginning directory/folder upload");
    let count = upload_directory(store, &container.name, &opts.directory, console).await?;
    console.line(format!("Number of objects uploaded: {}", count));

    if let Some(cdn) = &container.cdn {
        console.line("CDN links:");
        console.line(format!("\tHTTP: {}", cdn.uri));
        console.line(format!("\tHTTPS: {}", cdn.ssl_uri));
        console.line(format!("\tStreaming: {}", cdn.streaming_uri));
        console.line(format!("\tiOS streaming: {}", cdn.ios_uri));
    }
    console.line("Upload completed successfully");
    Ok(Outcome::Completed)
}
