//! In-memory provider used by the `mock` provider choice and by workflow tests.
//!
//! Resources created here start in a transitional status and settle after a
//! configurable number of polls. Builds can be forced to fail by resource name
//! and individual operations can be made to error.

use crate::{ComputeProvider, DatabaseProvider, DnsProvider, LoadBalancerProvider, ObjectStore};
use anyhow::Result;
use async_trait::async_trait;
use rackops_common::{
    CdnInfo, Container, DbFlavor, DbInstance, DbUser, DnsRecord, Flavor, HealthMonitor, Image,
    LoadBalancer, Networks, NewLoadBalancer, NewRecord, NewZone, Personality, ResourceStatus,
    Server, VipType, VirtualIp, Zone, ZonePage,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

pub const SQUEEZE_IMAGE_ID: &str = "8ae428cd-0490-4f3a-818f-28213a7286b0";
pub const WHEEZY_IMAGE_ID: &str = "c195ef3b-9195-4474-b6f7-16e5bd86acd0";

/// A stored object as the mock received it.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    pub name: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Default)]
struct Pending {
    polls_left: u32,
    settle_to: Option<ResourceStatus>,
}

#[derive(Default)]
struct StoredContainer {
    cdn: Option<CdnInfo>,
    metadata: BTreeMap<String, String>,
    objects: Vec<StoredObject>,
}

#[derive(Default)]
struct LbState {
    lb: Option<LoadBalancer>,
    health_monitor: Option<HealthMonitor>,
    error_page: Option<String>,
}

#[derive(Default)]
struct DbState {
    instance: Option<DbInstance>,
    databases: Vec<String>,
    users: Vec<DbUser>,
}

#[derive(Default)]
struct State {
    images: Vec<Image>,
    flavors: Vec<Flavor>,
    db_flavors: Vec<DbFlavor>,
    servers: Vec<Server>,
    personalities: HashMap<String, Vec<Personality>>,
    containers: BTreeMap<String, StoredContainer>,
    zones: Vec<Zone>,
    records: Vec<(String, DnsRecord)>,
    load_balancers: Vec<LbState>,
    db_instances: Vec<DbState>,
    pending: HashMap<String, Pending>,
    failing_builds: HashSet<String>,
    failing_ops: HashSet<String>,
    next_ip: u8,
}

impl State {
    fn check_op(&self, op: &str) -> Result<()> {
        if self.failing_ops.contains(op) {
            anyhow::bail!("mock: {} rejected", op);
        }
        Ok(())
    }

    fn take_ip(&mut self) -> u8 {
        self.next_ip = self.next_ip.wrapping_add(1).max(2);
        self.next_ip
    }

    /// Advance a pending resource by one poll and return its status once settled.
    fn poll(&mut self, id: &str) -> Option<ResourceStatus> {
        let pending = self.pending.get_mut(id)?;
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return None;
        }
        let settled = pending.settle_to.take();
        self.pending.remove(id);
        settled
    }

    fn track(&mut self, id: &str, polls: u32, name: &str) {
        let settle_to = if self.failing_builds.contains(name) {
            ResourceStatus::Error
        } else {
            ResourceStatus::Active
        };
        self.pending.insert(
            id.to_string(),
            Pending {
                polls_left: polls,
                settle_to: Some(settle_to),
            },
        );
    }
}

pub struct MockCloud {
    state: Mutex<State>,
    build_polls: u32,
}

impl Default for MockCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCloud {
    pub fn new() -> Self {
        let images = [
            (SQUEEZE_IMAGE_ID, "Debian 6 (Squeeze)"),
            (WHEEZY_IMAGE_ID, "Debian 7 (Wheezy) (PVHVM)"),
            ("5cebb13a-f783-4f8c-8058-c4182c724ccd", "Ubuntu 12.04 LTS (Precise Pangolin)"),
            ("da1f0392-8c64-468f-a839-a9e56caebf07", "CentOS 6.4"),
        ]
        .into_iter()
        .map(|(id, name)| Image {
            id: id.to_string(),
            name: name.to_string(),
            status: ResourceStatus::Active,
        })
        .collect();

        let standard = [
            ("2", "512MB Standard Instance", 512, 1, 20),
            ("3", "1GB Standard Instance", 1024, 1, 40),
            ("4", "2GB Standard Instance", 2048, 2, 80),
            ("5", "4GB Standard Instance", 4096, 2, 160),
            ("6", "8GB Standard Instance", 8192, 4, 320),
            ("7", "15GB Standard Instance", 15360, 6, 620),
            ("8", "30GB Standard Instance", 30720, 8, 1200),
            ("performance1-1", "1 GB Performance", 1024, 1, 20),
            ("performance1-2", "2 GB Performance", 2048, 2, 40),
        ];
        let flavors = standard
            .into_iter()
            .map(|(id, name, ram_mb, vcpus, disk_gb)| Flavor {
                id: id.to_string(),
                name: name.to_string(),
                ram_mb,
                vcpus,
                disk_gb,
            })
            .collect();

        let db_flavors = [512u32, 1024, 2048, 4096, 8192, 16384]
            .into_iter()
            .enumerate()
            .map(|(i, ram_mb)| DbFlavor {
                id: (i + 1).to_string(),
                name: format!("{}MB Instance", ram_mb),
                ram_mb,
                href: Some(format!("https://mock.dbaas/v1.0/flavors/{}", i + 1)),
            })
            .collect();

        Self {
            state: Mutex::new(State {
                images,
                flavors,
                db_flavors,
                ..State::default()
            }),
            build_polls: 1,
        }
    }

    /// Number of polls a new resource reports its transitional status before settling.
    pub fn with_build_polls(mut self, polls: u32) -> Self {
        self.build_polls = polls;
        self
    }

    pub fn with_zone(self, name: &str) -> Self {
        {
            let mut st = self.state();
            let id = (st.zones.len() + 1000).to_string();
            st.zones.push(Zone {
                id,
                name: name.to_string(),
                email: Some(format!("hostmaster@{}", name)),
                ttl: Some(3600),
            });
        }
        self
    }

    /// Pre-create a container, optionally CDN-enabled with the given TTL.
    pub fn with_container(self, name: &str, cdn_ttl: Option<u32>) -> Self {
        {
            let mut st = self.state();
            let cdn = cdn_ttl.map(|ttl| cdn_for(name, ttl));
            st.containers.insert(
                name.to_string(),
                StoredContainer {
                    cdn,
                    ..StoredContainer::default()
                },
            );
        }
        self
    }

    /// Resources with this name settle as ERROR.
    pub fn fail_build(self, name: &str) -> Self {
        self.state().failing_builds.insert(name.to_string());
        self
    }

    /// Make an operation (`add_record`, `put_object`, `create_container`, ...) fail.
    pub fn fail_operation(self, op: &str) -> Self {
        self.state().failing_ops.insert(op.to_string());
        self
    }

    /// Add an already-running server, e.g. as a clone source.
    pub fn add_active_server(&self, name: &str, flavor_id: &str) -> Server {
        let mut st = self.state();
        let ip = st.take_ip();
        let server = Server {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            status: ResourceStatus::Active,
            flavor_id: flavor_id.to_string(),
            image_id: Some(SQUEEZE_IMAGE_ID.to_string()),
            admin_pass: None,
            networks: networks_for(ip),
        };
        st.servers.push(server.clone());
        server
    }

    /// Drop a server as if the provider lost it.
    pub fn remove_server(&self, server_id: &str) {
        let mut st = self.state();
        st.servers.retain(|s| s.id != server_id);
        st.pending.remove(server_id);
    }

    pub fn servers(&self) -> Vec<Server> {
        self.state().servers.clone()
    }

    pub fn images(&self) -> Vec<Image> {
        self.state().images.clone()
    }

    pub fn personality(&self, server_id: &str) -> Vec<Personality> {
        self.state()
            .personalities
            .get(server_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn zones(&self) -> Vec<Zone> {
        self.state().zones.clone()
    }

    /// Records as `(zone_id, record)`.
    pub fn records(&self) -> Vec<(String, DnsRecord)> {
        self.state().records.clone()
    }

    pub fn objects(&self, container: &str) -> Vec<StoredObject> {
        self.state()
            .containers
            .get(container)
            .map(|c| c.objects.clone())
            .unwrap_or_default()
    }

    pub fn container_metadata(&self, container: &str) -> BTreeMap<String, String> {
        self.state()
            .containers
            .get(container)
            .map(|c| c.metadata.clone())
            .unwrap_or_default()
    }

    pub fn load_balancers(&self) -> Vec<LoadBalancer> {
        self.state()
            .load_balancers
            .iter()
            .filter_map(|l| l.lb.clone())
            .collect()
    }

    pub fn health_monitor(&self, lb_id: &str) -> Option<HealthMonitor> {
        self.state()
            .load_balancers
            .iter()
            .find(|l| l.lb.as_ref().map(|lb| lb.id.as_str()) == Some(lb_id))
            .and_then(|l| l.health_monitor.clone())
    }

    pub fn error_page(&self, lb_id: &str) -> Option<String> {
        self.state()
            .load_balancers
            .iter()
            .find(|l| l.lb.as_ref().map(|lb| lb.id.as_str()) == Some(lb_id))
            .and_then(|l| l.error_page.clone())
    }

    pub fn db_instances(&self) -> Vec<DbInstance> {
        self.state()
            .db_instances
            .iter()
            .filter_map(|d| d.instance.clone())
            .collect()
    }

    pub fn databases(&self, instance_id: &str) -> Vec<String> {
        self.with_db(instance_id, |d| d.databases.clone())
            .unwrap_or_default()
    }

    pub fn db_users(&self, instance_id: &str) -> Vec<DbUser> {
        self.with_db(instance_id, |d| d.users.clone())
            .unwrap_or_default()
    }

    fn with_db<T>(&self, instance_id: &str, f: impl FnOnce(&mut DbState) -> T) -> Option<T> {
        let mut st = self.state();
        st.db_instances
            .iter_mut()
            .find(|d| d.instance.as_ref().map(|i| i.id.as_str()) == Some(instance_id))
            .map(f)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn networks_for(ip: u8) -> Networks {
    Networks {
        public: vec![format!("2001:db8::{:x}", ip), format!("198.51.100.{}", ip)],
        private: vec![format!("10.176.0.{}", ip)],
    }
}

fn cdn_for(container: &str, ttl: u32) -> CdnInfo {
    let id = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, container.as_bytes())
        .simple()
        .to_string();
    let host = &id[..20];
    CdnInfo {
        ttl,
        uri: format!("http://{}.r1.cf1.rackcdn.com", host),
        ssl_uri: format!("https://{}.ssl.cf1.rackcdn.com", host),
        streaming_uri: format!("http://{}.r1.stream.cf1.rackcdn.com", host),
        ios_uri: format!("http://{}.iosr.cf1.rackcdn.com", host),
    }
}

#[async_trait]
impl ComputeProvider for MockCloud {
    async fn list_images(&self) -> Result<Vec<Image>> {
        Ok(self.state().images.clone())
    }

    async fn list_flavors(&self) -> Result<Vec<Flavor>> {
        Ok(self.state().flavors.clone())
    }

    async fn get_server(&self, server_id: &str) -> Result<Option<Server>> {
        let mut st = self.state();
        if let Some(settled) = st.poll(server_id) {
            if let Some(s) = st.servers.iter_mut().find(|s| s.id == server_id) {
                s.status = settled;
            }
        }
        Ok(st.servers.iter().find(|s| s.id == server_id).map(|s| {
            let mut s = s.clone();
            s.admin_pass = None;
            s
        }))
    }

    async fn create_server(
        &self,
        name: &str,
        image_id: &str,
        flavor_id: &str,
        personality: &[Personality],
    ) -> Result<Server> {
        let mut st = self.state();
        st.check_op("create_server")?;
        if !st.images.iter().any(|i| i.id == image_id) {
            anyhow::bail!("mock: image {} not found", image_id);
        }
        if !st.flavors.iter().any(|f| f.id == flavor_id) {
            anyhow::bail!("mock: flavor {} not found", flavor_id);
        }
        let ip = st.take_ip();
        let server = Server {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            status: ResourceStatus::Build,
            flavor_id: flavor_id.to_string(),
            image_id: Some(image_id.to_string()),
            admin_pass: Some(uuid::Uuid::new_v4().simple().to_string()[..12].to_string()),
            networks: networks_for(ip),
        };
        st.track(&server.id, self.build_polls, name);
        st.personalities.insert(server.id.clone(), personality.to_vec());
        st.servers.push(server.clone());
        tracing::debug!("mock: server {} created id={}", name, server.id);
        Ok(server)
    }

    async fn create_image(&self, server_id: &str, image_name: &str) -> Result<String> {
        let mut st = self.state();
        st.check_op("create_image")?;
        if !st.servers.iter().any(|s| s.id == server_id) {
            anyhow::bail!("mock: server {} not found", server_id);
        }
        let id = uuid::Uuid::new_v4().to_string();
        st.images.push(Image {
            id: id.clone(),
            name: image_name.to_string(),
            status: ResourceStatus::Saving,
        });
        st.track(&id, self.build_polls, image_name);
        Ok(id)
    }

    async fn get_image(&self, image_id: &str) -> Result<Option<Image>> {
        let mut st = self.state();
        if let Some(settled) = st.poll(image_id) {
            if let Some(i) = st.images.iter_mut().find(|i| i.id == image_id) {
                i.status = settled;
            }
        }
        Ok(st.images.iter().find(|i| i.id == image_id).cloned())
    }

    async fn delete_image(&self, image_id: &str) -> Result<()> {
        let mut st = self.state();
        st.check_op("delete_image")?;
        let before = st.images.len();
        st.images.retain(|i| i.id != image_id);
        if st.images.len() == before {
            anyhow::bail!("mock: image {} not found", image_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MockCloud {
    async fn get_container(&self, name: &str) -> Result<Option<Container>> {
        let st = self.state();
        Ok(st.containers.get(name).map(|c| Container {
            name: name.to_string(),
            object_count: c.objects.len() as u64,
            bytes_used: c.objects.iter().map(|o| o.body.len() as u64).sum(),
            cdn: c.cdn.clone(),
        }))
    }

    async fn create_container(&self, name: &str) -> Result<Container> {
        let mut st = self.state();
        st.check_op("create_container")?;
        st.containers.entry(name.to_string()).or_default();
        Ok(Container {
            name: name.to_string(),
            object_count: 0,
            bytes_used: 0,
            cdn: None,
        })
    }

    async fn enable_cdn(&self, name: &str, ttl: u32) -> Result<Container> {
        {
            let mut st = self.state();
            st.check_op("enable_cdn")?;
            let c = st
                .containers
                .get_mut(name)
                .ok_or_else(|| anyhow::anyhow!("mock: container {} not found", name))?;
            c.cdn = Some(cdn_for(name, ttl));
        }
        self.get_container(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("mock: container {} not found", name))
    }

    async fn set_container_metadata(
        &self,
        name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut st = self.state();
        st.check_op("set_container_metadata")?;
        let c = st
            .containers
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("mock: container {} not found", name))?;
        c.metadata
            .extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        object_name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let mut st = self.state();
        st.check_op("put_object")?;
        let c = st
            .containers
            .get_mut(container)
            .ok_or_else(|| anyhow::anyhow!("mock: container {} not found", container))?;
        c.objects.retain(|o| o.name != object_name);
        c.objects.push(StoredObject {
            name: object_name.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        Ok(())
    }

    async fn list_object_names(&self, container: &str) -> Result<Vec<String>> {
        let st = self.state();
        let c = st
            .containers
            .get(container)
            .ok_or_else(|| anyhow::anyhow!("mock: container {} not found", container))?;
        let mut names: Vec<String> = c.objects.iter().map(|o| o.name.clone()).collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl DnsProvider for MockCloud {
    async fn list_zones(&self, limit: usize, offset: usize) -> Result<ZonePage> {
        let st = self.state();
        let zones: Vec<Zone> = st.zones.iter().skip(offset).take(limit).cloned().collect();
        let total = st.zones.len();
        Ok(ZonePage {
            has_next: offset + zones.len() < total,
            zones,
            total: Some(total),
        })
    }

    async fn create_zone(&self, zone: &NewZone) -> Result<Zone> {
        let mut st = self.state();
        st.check_op("create_zone")?;
        if st.zones.iter().any(|z| z.name.eq_ignore_ascii_case(&zone.name)) {
            anyhow::bail!("mock: zone {} already exists", zone.name);
        }
        let created = Zone {
            id: (st.zones.len() + 1000).to_string(),
            name: zone.name.clone(),
            email: Some(zone.email.clone()),
            ttl: Some(zone.ttl),
        };
        st.zones.push(created.clone());
        Ok(created)
    }

    async fn add_record(&self, zone_id: &str, record: &NewRecord) -> Result<DnsRecord> {
        let mut st = self.state();
        st.check_op("add_record")?;
        if !st.zones.iter().any(|z| z.id == zone_id) {
            anyhow::bail!("mock: zone {} not found", zone_id);
        }
        let created = DnsRecord {
            id: format!("{}-{}", record.record_type, uuid::Uuid::new_v4().simple()),
            record_type: record.record_type,
            name: record.name.clone(),
            data: record.data.clone(),
            ttl: record.ttl,
        };
        st.records.push((zone_id.to_string(), created.clone()));
        Ok(created)
    }
}

#[async_trait]
impl LoadBalancerProvider for MockCloud {
    async fn create_load_balancer(&self, request: &NewLoadBalancer) -> Result<LoadBalancer> {
        let mut st = self.state();
        st.check_op("create_load_balancer")?;
        let ip = st.take_ip();
        let virtual_ips = match request.vip_type {
            VipType::Public => vec![
                VirtualIp {
                    address: format!("2001:db8:1b::{:x}", ip),
                    ip_version: "IPV6".to_string(),
                    vip_type: VipType::Public,
                },
                VirtualIp {
                    address: format!("203.0.113.{}", ip),
                    ip_version: "IPV4".to_string(),
                    vip_type: VipType::Public,
                },
            ],
            VipType::ServiceNet => vec![VirtualIp {
                address: format!("10.190.0.{}", ip),
                ip_version: "IPV4".to_string(),
                vip_type: VipType::ServiceNet,
            }],
        };
        let lb = LoadBalancer {
            id: (st.load_balancers.len() + 100).to_string(),
            name: request.name.clone(),
            status: ResourceStatus::Build,
            port: request.port,
            protocol: request.protocol.clone(),
            algorithm: request.algorithm,
            nodes: request.nodes.clone(),
            virtual_ips,
        };
        st.track(&lb.id, self.build_polls, &request.name);
        st.load_balancers.push(LbState {
            lb: Some(lb.clone()),
            ..LbState::default()
        });
        Ok(lb)
    }

    async fn get_load_balancer(&self, lb_id: &str) -> Result<Option<LoadBalancer>> {
        let mut st = self.state();
        let settled = st.poll(lb_id);
        let Some(entry) = st
            .load_balancers
            .iter_mut()
            .find_map(|l| l.lb.as_mut().filter(|lb| lb.id == lb_id))
        else {
            return Ok(None);
        };
        if let Some(status) = settled {
            entry.status = status;
        }
        Ok(Some(entry.clone()))
    }

    async fn set_health_monitor(&self, lb_id: &str, monitor: &HealthMonitor) -> Result<()> {
        let polls = self.build_polls;
        let mut st = self.state();
        st.check_op("set_health_monitor")?;
        let entry = st
            .load_balancers
            .iter_mut()
            .find(|l| l.lb.as_ref().map(|lb| lb.id.as_str()) == Some(lb_id))
            .ok_or_else(|| anyhow::anyhow!("mock: load balancer {} not found", lb_id))?;
        entry.health_monitor = Some(monitor.clone());
        let name = match entry.lb.as_mut() {
            Some(lb) => {
                lb.status = ResourceStatus::PendingUpdate;
                lb.name.clone()
            }
            None => String::new(),
        };
        st.track(lb_id, polls, &name);
        Ok(())
    }

    async fn set_error_page(&self, lb_id: &str, html: &str) -> Result<()> {
        let mut st = self.state();
        st.check_op("set_error_page")?;
        let entry = st
            .load_balancers
            .iter_mut()
            .find(|l| l.lb.as_ref().map(|lb| lb.id.as_str()) == Some(lb_id))
            .ok_or_else(|| anyhow::anyhow!("mock: load balancer {} not found", lb_id))?;
        entry.error_page = Some(html.to_string());
        Ok(())
    }
}

#[async_trait]
impl DatabaseProvider for MockCloud {
    async fn list_flavors(&self) -> Result<Vec<DbFlavor>> {
        Ok(self.state().db_flavors.clone())
    }

    async fn create_instance(
        &self,
        name: &str,
        flavor: &DbFlavor,
        volume_gb: u32,
    ) -> Result<DbInstance> {
        let mut st = self.state();
        st.check_op("create_instance")?;
        let id = uuid::Uuid::new_v4().to_string();
        let instance = DbInstance {
            hostname: Some(format!("{}.rackspaceclouddb.com", id.replace('-', ""))),
            id,
            name: name.to_string(),
            status: ResourceStatus::Build,
            flavor_id: Some(flavor.id.clone()),
            volume_gb,
        };
        st.track(&instance.id, self.build_polls, name);
        st.db_instances.push(DbState {
            instance: Some(instance.clone()),
            ..DbState::default()
        });
        Ok(instance)
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Option<DbInstance>> {
        let mut st = self.state();
        let settled = st.poll(instance_id);
        let Some(instance) = st
            .db_instances
            .iter_mut()
            .find_map(|d| d.instance.as_mut().filter(|i| i.id == instance_id))
        else {
            return Ok(None);
        };
        if let Some(status) = settled {
            instance.status = status;
        }
        Ok(Some(instance.clone()))
    }

    async fn create_database(&self, instance_id: &str, db_name: &str) -> Result<()> {
        self.state().check_op("create_database")?;
        self.with_db(instance_id, |d| d.databases.push(db_name.to_string()))
            .ok_or_else(|| anyhow::anyhow!("mock: instance {} not found", instance_id))
    }

    async fn create_user(&self, instance_id: &str, user: &DbUser) -> Result<()> {
        self.state().check_op("create_user")?;
        self.with_db(instance_id, |d| d.users.push(user.clone()))
            .ok_or_else(|| anyhow::anyhow!("mock: instance {} not found", instance_id))
    }
}
