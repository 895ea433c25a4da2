use super::{print_networks, Outcome, Session};
use crate::poller::{wait_until_settled, WaitSpec};
use rackops_common::{RackopsError, ResourceStatus};

#[derive(Clone, Debug)]
pub struct CloneServerOptions {
    pub source_id: String,
    /// Defaults to the source name with `-copy` appended.
    pub name: Option<String>,
}

/// Snapshot a server and build a new server from the snapshot.
///
/// The intermediate image is removed afterwards; failing to delete it only
/// produces a warning.
pub async fn run(session: &mut Session, opts: &CloneServerOptions) -> Result<Outcome, RackopsError> {
    let Session {
        cloud,
        intervals,
        console,
    } = session;
    let compute = cloud.compute.as_ref();

    let source = compute
        .get_server(&opts.source_id)
        .await?
        .ok_or_else(|| RackopsError::not_found("server", opts.source_id.as_str()))?;
    let clone_name = opts
        .name
        .clone()
        .unwrap_or_else(|| format!("{}-copy", source.name));

    let image_id = compute.create_image(&source.id, &clone_name).await?;
    console.line("Server image creation in progress...");
    let image = wait_until_settled(&WaitSpec::image_save(intervals), &image_id, console, || {
        compute.get_image(&image_id)
    })
    .await?;
    if !image.status.is_active() {
        return Err(RackopsError::BuildFailed {
            kind: "image",
            name: clone_name,
            status: image.status,
        });
    }
    console.line("Image creation complete.  Building server...");

    let requested = compute
        .create_server(&clone_name, &image.id, &source.flavor_id, &[])
        .await?;
    let mut server = wait_until_settled(
        &WaitSpec::server_clone(intervals),
        &requested.id,
        console,
        || compute.get_server(&requested.id),
    )
    .await?;
    if server.status != ResourceStatus::Active {
        console.line("Something went wrong during the server creation");
        console.line(format!("\tID: {}", server.id));
        console.line(format!("\tName: {}", server.name));
        console.line(format!("\tStatus: {}", server.status));
        return Err(RackopsError::BuildFailed {
            kind: "server",
            name: server.name,
            status: server.status,
        });
    }
    server.admin_pass = requested.admin_pass.clone();

    console.line("Cloning completed successfully");
    console.line("Server details:");
    console.line(format!("\tName: {}", server.name));
    if let Some(pass) = &server.admin_pass {
        console.line(format!("\tAdmin password: {}", pass));
    }
    print_networks(console, &server);

    if let Err(err) = compute.delete_image(&image.id).await {
        tracing::warn!("failed to delete clone image {}: {:#}", image.id, err);
        console.line("WARNING: Clone image delete request failed");
        console.line("Please review and delete manually");
    }
    Ok(Outcome::Completed)
}
