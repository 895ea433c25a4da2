use anyhow::Result;
use async_trait::async_trait;
use rackops_common::{
    Container, DbFlavor, DbInstance, DbUser, DnsRecord, Flavor, HealthMonitor, Image,
    LoadBalancer, NewLoadBalancer, NewRecord, NewZone, Personality, Server, Zone, ZonePage,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait ComputeProvider: Send + Sync {
    async fn list_images(&self) -> Result<Vec<Image>>;
    async fn list_flavors(&self) -> Result<Vec<Flavor>>;

    /// `None` when the provider does not know the id.
    async fn get_server(&self, server_id: &str) -> Result<Option<Server>>;

    /// Returns the server as accepted by the provider (status BUILD, admin password set).
    async fn create_server(
        &self,
        name: &str,
        image_id: &str,
        flavor_id: &str,
        personality: &[Personality],
    ) -> Result<Server>;

    /// Snapshot a server; returns the new image id.
    async fn create_image(&self, server_id: &str, image_name: &str) -> Result<String>;
    async fn get_image(&self, image_id: &str) -> Result<Option<Image>>;
    async fn delete_image(&self, image_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `None` when the container does not exist. CDN details are filled in when enabled.
    async fn get_container(&self, name: &str) -> Result<Option<Container>>;
    async fn create_container(&self, name: &str) -> Result<Container>;

    /// Publish a container through the CDN with the given TTL.
    async fn enable_cdn(&self, name: &str, ttl: u32) -> Result<Container>;

    async fn set_container_metadata(
        &self,
        name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<()>;

    async fn put_object(
        &self,
        container: &str,
        object_name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    async fn list_object_names(&self, container: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    async fn list_zones(&self, limit: usize, offset: usize) -> Result<ZonePage>;
    async fn create_zone(&self, zone: &NewZone) -> Result<Zone>;
    async fn add_record(&self, zone_id: &str, record: &NewRecord) -> Result<DnsRecord>;
}

#[async_trait]
pub trait LoadBalancerProvider: Send + Sync {
    async fn create_load_balancer(&self, request: &NewLoadBalancer) -> Result<LoadBalancer>;
    async fn get_load_balancer(&self, lb_id: &str) -> Result<Option<LoadBalancer>>;
    async fn set_health_monitor(&self, lb_id: &str, monitor: &HealthMonitor) -> Result<()>;
    async fn set_error_page(&self, lb_id: &str, html: &str) -> Result<()>;
}

#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    async fn list_flavors(&self) -> Result<Vec<DbFlavor>>;
    async fn create_instance(
        &self,
        name: &str,
        flavor: &DbFlavor,
        volume_gb: u32,
    ) -> Result<DbInstance>;
    async fn get_instance(&self, instance_id: &str) -> Result<Option<DbInstance>>;
    async fn create_database(&self, instance_id: &str, db_name: &str) -> Result<()>;
    async fn create_user(&self, instance_id: &str, user: &DbUser) -> Result<()>;
}

/// Every service a workflow may touch, behind one handle.
#[derive(Clone)]
pub struct Cloud {
    pub compute: Arc<dyn ComputeProvider>,
    pub object_store: Arc<dyn ObjectStore>,
    pub dns: Arc<dyn DnsProvider>,
    pub load_balancers: Arc<dyn LoadBalancerProvider>,
    pub databases: Arc<dyn DatabaseProvider>,
}

impl Cloud {
    /// Wire all services to a single provider implementation.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: ComputeProvider
            + ObjectStore
            + DnsProvider
            + LoadBalancerProvider
            + DatabaseProvider
            + 'static,
    {
        Self {
            compute: provider.clone(),
            object_store: provider.clone(),
            dns: provider.clone(),
            load_balancers: provider.clone(),
            databases: provider,
        }
    }
}

/// Walk every zone page; providers cap page sizes.
pub async fn list_all_zones(dns: &dyn DnsProvider, page_size: usize) -> Result<Vec<Zone>> {
    let mut zones = Vec::new();
    let mut offset = 0;
    loop {
        let page = dns.list_zones(page_size, offset).await?;
        let fetched = page.zones.len();
        zones.extend(page.zones);
        offset += fetched;
        let more = match page.total {
            Some(total) => offset < total,
            None => page.has_next,
        };
        if !more || fetched == 0 {
            break;
        }
    }
    Ok(zones)
}

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "rackspace")]
pub mod rackspace;
