use super::{find_zone, flavor_by_ram, image_by_id, print_record, print_server, Outcome, Session};
use crate::poller::{wait_until_settled, WaitSpec};
use rackops_common::validate::{check_min_ttl, zone_from_fqdn, MIN_DNS_TTL};
use rackops_common::{NewRecord, RackopsError, RecordType};

/// Debian 6 (Squeeze).
pub const DEFAULT_IMAGE_ID: &str = "8ae428cd-0490-4f3a-818f-28213a7286b0";

/// RAM sizes (MB) of the standard server flavors.
pub const SERVER_RAM_SIZES: [u32; 7] = [512, 1024, 2048, 4096, 8192, 15360, 30720];

#[derive(Clone, Debug)]
pub struct ServerDnsOptions {
    pub fqdn: String,
    pub image_id: String,
    pub ram_mb: u32,
    pub ttl: u32,
}

impl ServerDnsOptions {
    pub fn new(fqdn: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            image_id: DEFAULT_IMAGE_ID.to_string(),
            ram_mb: 512,
            ttl: MIN_DNS_TTL,
        }
    }
}

pub(crate) fn check_server_ram(ram_mb: u32) -> Result<u32, RackopsError> {
    if SERVER_RAM_SIZES.contains(&ram_mb) {
        Ok(ram_mb)
    } else {
        Err(RackopsError::InvalidInput(format!(
            "server RAM must be one of {:?} MB",
            SERVER_RAM_SIZES
        )))
    }
}

/// Build one server named after the FQDN and point an A record at it.
pub async fn run(session: &mut Session, opts: &ServerDnsOptions) -> Result<Outcome, RackopsError> {
    check_server_ram(opts.ram_mb)?;
    check_min_ttl(opts.ttl, MIN_DNS_TTL, "TTL")?;
    let zone_name = zone_from_fqdn(&opts.fqdn)?;

    let Session {
        cloud,
        intervals,
        console,
    } = session;
    let compute = cloud.compute.as_ref();

    let zone = find_zone(cloud.dns.as_ref(), &zone_name).await?;
    let image = image_by_id(compute, &opts.image_id).await?;
    let flavor = flavor_by_ram(compute, opts.ram_mb).await?;

    console.line(format!("Building server '{}' from image '{}'", opts.fqdn, image.name));
    let requested = compute
        .create_server(&opts.fqdn, &image.id, &flavor.id, &[])
        .await?;
    let mut server = wait_until_settled(
        &WaitSpec::server_clone(intervals),
        &requested.id,
        console,
        || compute.get_server(&requested.id),
    )
    .await?;
    if !server.status.is_active() {
        return Err(RackopsError::BuildFailed {
            kind: "server",
            name: server.name,
            status: server.status,
        });
    }
    if server.admin_pass.is_none() {
        server.admin_pass = requested.admin_pass.clone();
    }
    print_server(console, &server);

    let address = server.networks.public_ipv4().ok_or_else(|| {
        RackopsError::Api(anyhow::anyhow!("server '{}' has no public IPv4 address", server.name))
    })?;
    let record = cloud
        .dns
        .add_record(
            &zone.id,
            &NewRecord {
                record_type: RecordType::A,
                name: opts.fqdn.clone(),
                data: address.to_string(),
                ttl: opts.ttl,
            },
        )
        .await?;
    print_record(console, &record);
    Ok(Outcome::Completed)
}
