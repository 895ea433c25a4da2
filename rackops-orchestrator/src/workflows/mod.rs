//! The provisioning workflows, one module each, plus the lookups they share.

use crate::config::PollIntervals;
use crate::console::Console;
use rackops_common::error::EXIT_COMPLETED_WITH_ERRORS;
use rackops_common::{
    Container, DnsRecord, Flavor, Image, LoadBalancer, RackopsError, Server, Zone,
};
use rackops_providers::{list_all_zones, Cloud, ComputeProvider, DnsProvider, ObjectStore};

pub mod add_record;
pub mod balanced_servers;
pub mod build_servers;
pub mod cdn_container;
pub mod clone_server;
pub mod cloud_database;
pub mod server_dns;
pub mod static_site;
pub mod upload_folder;
pub mod web_stack;

/// Zones are listed in pages of this size.
pub const ZONE_PAGE_SIZE: usize = 25;

/// Everything a workflow run needs: the provider services, poll timing and the report sink.
pub struct Session {
    pub cloud: Cloud,
    pub intervals: PollIntervals,
    pub console: Console,
}

impl Session {
    pub fn new(cloud: Cloud, intervals: PollIntervals, console: Console) -> Self {
        Self {
            cloud,
            intervals,
            console,
        }
    }
}

/// How a workflow that did not fail outright finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    CompletedWithErrors,
}

impl Outcome {
    pub fn from_error_flag(errors: bool) -> Self {
        if errors {
            Self::CompletedWithErrors
        } else {
            Self::Completed
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::CompletedWithErrors => EXIT_COMPLETED_WITH_ERRORS,
        }
    }
}

/// Final summary line shared by the multi-server workflows.
pub(crate) fn finish_builds(console: &mut Console, errors: bool) -> Outcome {
    let msg = "Build requests completed";
    if errors {
        console.line(format!("{} - with errors (see above for details)", msg));
    } else {
        console.line(msg);
    }
    Outcome::from_error_flag(errors)
}

pub(crate) async fn image_by_name(
    compute: &dyn ComputeProvider,
    fragment: &str,
) -> Result<Image, RackopsError> {
    compute
        .list_images()
        .await?
        .into_iter()
        .find(|i| i.name.contains(fragment))
        .ok_or_else(|| RackopsError::not_found("image", fragment))
}

pub(crate) async fn image_by_id(
    compute: &dyn ComputeProvider,
    id: &str,
) -> Result<Image, RackopsError> {
    compute
        .list_images()
        .await?
        .into_iter()
        .find(|i| i.id == id)
        .ok_or_else(|| RackopsError::not_found("image", id))
}

pub(crate) async fn flavor_by_ram(
    compute: &dyn ComputeProvider,
    ram_mb: u32,
) -> Result<Flavor, RackopsError> {
    compute
        .list_flavors()
        .await?
        .into_iter()
        .find(|f| f.ram_mb == ram_mb)
        .ok_or_else(|| RackopsError::not_found("flavor", format!("{} MB", ram_mb)))
}

pub(crate) async fn flavor_by_name(
    compute: &dyn ComputeProvider,
    name: &str,
) -> Result<Flavor, RackopsError> {
    compute
        .list_flavors()
        .await?
        .into_iter()
        .find(|f| f.name == name)
        .ok_or_else(|| RackopsError::not_found("flavor", name))
}

/// Find the zone named `name` among all zones on the account (case-insensitive, exact).
pub(crate) async fn find_zone(dns: &dyn DnsProvider, name: &str) -> Result<Zone, RackopsError> {
    let zones = list_all_zones(dns, ZONE_PAGE_SIZE).await?;
    if zones.is_empty() {
        return Err(RackopsError::NoZones);
    }
    zones
        .into_iter()
        .find(|z| z.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| RackopsError::not_found("zone", name))
}

/// Fetch a container, creating it when missing. The flag is true when it already existed.
pub(crate) async fn get_or_create_container(
    store: &dyn ObjectStore,
    name: &str,
) -> Result<(Container, bool), RackopsError> {
    match store.get_container(name).await? {
        Some(c) => Ok((c, true)),
        None => Ok((store.create_container(name).await?, false)),
    }
}

pub(crate) fn print_image(console: &mut Console, image: &Image) {
    console.line("-- Image details");
    console.line(format!("\tID: {}", image.id));
    console.line(format!("\tName: {}", image.name));
}

pub(crate) fn print_server(console: &mut Console, server: &Server) {
    console.line("-- Server details");
    console.line(format!("\tName: {}", server.name));
    console.line(format!("\tStatus: {}", server.status));
    if let Some(pass) = &server.admin_pass {
        console.line(format!("\tAdmin password: {}", pass));
    }
    print_networks(console, server);
}

pub(crate) fn print_networks(console: &mut Console, server: &Server) {
    console.line("\tNetworks:");
    for (i, addr) in server.networks.public.iter().enumerate() {
        console.line(format!("\t\tPublic #{}: {}", i + 1, addr));
    }
    for addr in &server.networks.private {
        console.line(format!("\t\tPrivate: {}", addr));
    }
}

pub(crate) fn print_load_balancer(console: &mut Console, lb: &LoadBalancer) {
    console.line("-- LB details");
    console.line(format!("\tName: {}", lb.name));
    console.line(format!("\tPort: {}", lb.port));
    console.line(format!("\tAlgorithm type: {}", lb.algorithm));
    console.line(format!("\tNode count: {}", lb.nodes.len()));
    for (i, vip) in lb.virtual_ips.iter().enumerate() {
        console.line(format!("\tIP address #{}: {}", i + 1, vip.address));
    }
}

pub(crate) fn print_record(console: &mut Console, record: &DnsRecord) {
    console.line("-- Record details");
    console.line(format!("\tName: {}", record.name));
    console.line(format!("\tType: {}", record.record_type));
    console.line(format!("\tData: {}", record.data));
    console.line(format!("\tTTL: {}", record.ttl));
}
