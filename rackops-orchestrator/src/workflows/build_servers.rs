use super::{finish_builds, flavor_by_ram, image_by_name, print_image, print_networks, Outcome, Session};
use crate::poller::{track_builds, WaitSpec};
use rackops_common::validate::pretty_hostname;
use rackops_common::RackopsError;

pub const MAX_SERVERS: u32 = 20;

#[derive(Clone, Debug)]
pub struct BuildServersOptions {
    pub prefix: String,
    pub ram_mb: u32,
    pub count: u32,
    /// Fragment matched against image names.
    pub image: String,
}

impl Default for BuildServersOptions {
    fn default() -> Self {
        Self {
            prefix: "server".to_string(),
            ram_mb: 512,
            count: 3,
            image: "Squeeze".to_string(),
        }
    }
}

/// Build `count` identical servers and report each one as it settles.
pub async fn run(session: &mut Session, opts: &BuildServersOptions) -> Result<Outcome, RackopsError> {
    if !(1..=MAX_SERVERS).contains(&opts.count) {
        return Err(RackopsError::InvalidInput(format!(
            "server count must be between 1 and {}",
            MAX_SERVERS
        )));
    }
    let Session {
        cloud,
        intervals,
        console,
    } = session;
    let compute = cloud.compute.as_ref();

    console.line("Cloud Server build request initiated");
    let image = image_by_name(compute, &opts.image).await?;
    let flavor = flavor_by_ram(compute, opts.ram_mb).await?;

    print_image(console, &image);
    console.line(format!("Server size: {} MB", opts.ram_mb));
    console.line(format!("Number of servers to be created: {}", opts.count));

    let mut requested = Vec::with_capacity(opts.count as usize);
    for i in 1..=opts.count {
        let name = format!("{}{}", opts.prefix, pretty_hostname(i));
        requested.push(compute.create_server(&name, &image.id, &flavor.id, &[]).await?);
    }
    tracing::info!("requested {} server build(s) from image {}", requested.len(), image.id);

    let mut errors = false;
    let spec = WaitSpec::server_build(intervals);
    track_builds(compute, requested, &spec, console, |console, server| {
        console.line(format!("Server name: {}, Status: {}", server.name, server.status));
        if server.status.is_active() {
            print_networks(console, server);
        } else {
            errors = true;
            console.line("WARNING: Something went wrong with the build request");
            console.line("Please review the server state");
        }
    })
    .await?;

    Ok(finish_builds(console, errors))
}
