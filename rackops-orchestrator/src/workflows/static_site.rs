use super::cdn_container::prepare_cdn_container;
use super::{find_zone, print_record, Outcome, Session};
use crate::upload::upload_directory;
use rackops_common::validate::{check_min_ttl, zone_from_fqdn, MIN_CDN_TTL, MIN_DNS_TTL};
use rackops_common::{NewRecord, RackopsError, RecordType};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub const WEB_INDEX_HEADER: &str = "X-Container-Meta-Web-Index";
const PLACEHOLDER: &str = "Index page placeholder\n";

#[derive(Clone, Debug)]
pub struct StaticSiteOptions {
    pub directory: PathBuf,
    pub container: String,
    pub fqdn: String,
    pub cdn_ttl: u32,
    pub index: String,
    pub cname_ttl: u32,
    pub force: bool,
}

impl StaticSiteOptions {
    pub fn new(directory: impl Into<PathBuf>, container: impl Into<String>, fqdn: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            container: container.into(),
            fqdn: fqdn.into(),
            cdn_ttl: MIN_CDN_TTL,
            index: "index.html".to_string(),
            cname_ttl: MIN_DNS_TTL,
            force: false,
        }
    }
}

/// Publish a directory as a CDN-backed static site reachable through a CNAME.
pub async fn run(session: &mut Session, opts: &StaticSiteOptions) -> Result<Outcome, RackopsError> {
    check_min_ttl(opts.cdn_ttl, MIN_CDN_TTL, "CDN TTL")?;
    check_min_ttl(opts.cname_ttl, MIN_DNS_TTL, "CNAME TTL")?;
    if !opts.directory.is_dir() {
        return Err(RackopsError::InvalidInput(format!(
            "directory '{}' not found, please check the path and try again",
            opts.directory.display()
        )));
    }
    let zone_name = zone_from_fqdn(&opts.fqdn)?;

    let Session { cloud, console, .. } = session;
    let store = cloud.object_store.as_ref();

    let zone = find_zone(cloud.dns.as_ref(), &zone_name).await?;
    console.line(format!("Zone '{}' found", zone.name));

    let container =
        prepare_cdn_container(store, &opts.container, opts.cdn_ttl, opts.force, console).await?;
    let cdn = container.cdn.clone().ok_or_else(|| {
        RackopsError::Api(anyhow::anyhow!(
            "container '{}' has no CDN details after enabling",
            container.name
        ))
    })?;

    let metadata = BTreeMap::from([(WEB_INDEX_HEADER.to_string(), opts.index.clone())]);
    store.set_container_metadata(&container.name, &metadata).await?;
    console.line(format!("Index page set to '{}'", opts.index));

    let index_path = opts.directory.join(&opts.index);
    if !index_path.exists() {
        console.line(format!(
            "Index file '{}' not found locally, creating a placeholder",
            index_path.display()
        ));
        fs::write(&index_path, PLACEHOLDER)?;
    }

    console.line("Beginning directory/folder upload");
    let count = upload_directory(store, &container.name, &opts.directory, console).await?;
    console.line(format!("Number of objects uploaded: {}", count));

    let record = cloud
        .dns
        .add_record(
            &zone.id,
            &NewRecord {
                record_type: RecordType::Cname,
                name: opts.fqdn.clone(),
                data: cdn.host().to_string(),
                ttl: opts.cname_ttl,
            },
        )
        .await?;
    print_record(console, &record);
    console.line(format!("Static site available at http://{}", opts.fqdn));
    Ok(Outcome::Completed)
}
