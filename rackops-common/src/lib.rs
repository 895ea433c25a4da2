use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

pub mod error;
pub mod validate;

pub use error::RackopsError;

// --- Enums ---

/// Status reported by the provider for any asynchronously built resource.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ResourceStatus {
    Build,         // Being created
    Active,        // Ready for use
    Error,         // Build failed
    Unknown,       // Provider lost track of it
    Saving,        // Image snapshot in progress
    Deleted,       // Gone
    PendingUpdate, // Load balancer applying a change
    Other(String), // Anything else, kept verbatim
}

impl ResourceStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUILD" | "BUILDING" => Self::Build,
            "ACTIVE" => Self::Active,
            "ERROR" => Self::Error,
            "UNKNOWN" => Self::Unknown,
            "SAVING" => Self::Saving,
            "DELETED" => Self::Deleted,
            "PENDING_UPDATE" => Self::PendingUpdate,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Build => "BUILD",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
            Self::Saving => "SAVING",
            Self::Deleted => "DELETED",
            Self::PendingUpdate => "PENDING_UPDATE",
            Self::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }
}

impl From<String> for ResourceStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ResourceStatus> for String {
    fn from(s: ResourceStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Ord,
    Dfw,
    Lon,
    Iad,
    Hkg,
    Syd,
}

impl Region {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ORD" => Some(Self::Ord),
            "DFW" => Some(Self::Dfw),
            "LON" => Some(Self::Lon),
            "IAD" => Some(Self::Iad),
            "HKG" => Some(Self::Hkg),
            "SYD" => Some(Self::Syd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ord => "ORD",
            Self::Dfw => "DFW",
            Self::Lon => "LON",
            Self::Iad => "IAD",
            Self::Hkg => "HKG",
            Self::Syd => "SYD",
        }
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("unknown region '{}' (expected ORD, DFW, LON, IAD, HKG or SYD)", s)
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    LeastConnections,
    Random,
    RoundRobin,
    WeightedLeastConnections,
    WeightedRoundRobin,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeastConnections => "LEAST_CONNECTIONS",
            Self::Random => "RANDOM",
            Self::RoundRobin => "ROUND_ROBIN",
            Self::WeightedLeastConnections => "WEIGHTED_LEAST_CONNECTIONS",
            Self::WeightedRoundRobin => "WEIGHTED_ROUND_ROBIN",
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "LEAST_CONNECTIONS" => Ok(Self::LeastConnections),
            "RANDOM" => Ok(Self::Random),
            "ROUND_ROBIN" => Ok(Self::RoundRobin),
            "WEIGHTED_LEAST_CONNECTIONS" => Ok(Self::WeightedLeastConnections),
            "WEIGHTED_ROUND_ROBIN" => Ok(Self::WeightedRoundRobin),
            _ => Err(format!("unknown load balancing algorithm '{}'", s)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum VipType {
    #[serde(rename = "PUBLIC")]
    Public,
    #[serde(rename = "SERVICENET", alias = "SNET")]
    ServiceNet,
}

impl VipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::ServiceNet => "SERVICENET",
        }
    }
}

impl FromStr for VipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Self::Public),
            "SERVICENET" | "SNET" => Ok(Self::ServiceNet),
            _ => Err(format!("unknown VIP type '{}' (expected PUBLIC or SERVICENET)", s)),
        }
    }
}

impl fmt::Display for VipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Cname,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Pollable handles ---

/// A provider-owned resource we hold a transient reference to.
pub trait Resource {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn status(&self) -> &ResourceStatus;
}

macro_rules! impl_resource {
    ($($ty:ty),*) => {
        $(impl Resource for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn status(&self) -> &ResourceStatus {
                &self.status
            }
        })*
    };
}

// --- Compute ---

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Networks {
    pub public: Vec<String>,
    pub private: Vec<String>,
}

impl Networks {
    /// First public address that is a dotted-quad IPv4 address.
    pub fn public_ipv4(&self) -> Option<&str> {
        self.public
            .iter()
            .map(String::as_str)
            .find(|a| a.parse::<Ipv4Addr>().is_ok())
    }

    pub fn first_private(&self) -> Option<&str> {
        self.private.first().map(String::as_str)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub flavor_id: String,
    pub image_id: Option<String>,
    pub admin_pass: Option<String>, // Only returned by the create call
    pub networks: Networks,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    pub ram_mb: u32,
    pub vcpus: u32,
    pub disk_gb: u32,
}

/// A file injected into a server at build time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Personality {
    pub path: String,
    pub contents: String,
}

// --- Object storage ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CdnInfo {
    pub ttl: u32,
    pub uri: String,
    pub ssl_uri: String,
    pub streaming_uri: String,
    pub ios_uri: String,
}

impl CdnInfo {
    /// CDN host without scheme, suitable as CNAME target.
    pub fn host(&self) -> &str {
        self.uri
            .strip_prefix("http://")
            .or_else(|| self.uri.strip_prefix("https://"))
            .unwrap_or(&self.uri)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Container {
    pub name: String,
    pub object_count: u64,
    pub bytes_used: u64,
    pub cdn: Option<CdnInfo>,
}

// --- DNS ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub ttl: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ZonePage {
    pub zones: Vec<Zone>,
    pub total: Option<usize>,
    pub has_next: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewZone {
    pub name: String,
    pub email: String,
    pub ttl: u32,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewRecord {
    pub record_type: RecordType,
    pub name: String,
    pub data: String,
    pub ttl: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DnsRecord {
    pub id: String,
    pub record_type: RecordType,
    pub name: String,
    pub data: String,
    pub ttl: u32,
}

// --- Load balancing ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Node {
    pub address: String,
    pub port: u16,
    pub condition: String,
}

impl Node {
    pub fn enabled(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            condition: "ENABLED".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VirtualIp {
    pub address: String,
    pub ip_version: String,
    pub vip_type: VipType,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub port: u16,
    pub protocol: String,
    pub algorithm: Algorithm,
    pub nodes: Vec<Node>,
    pub virtual_ips: Vec<VirtualIp>,
}

impl LoadBalancer {
    pub fn first_ipv4(&self) -> Option<&str> {
        self.virtual_ips
            .iter()
            .map(|v| v.address.as_str())
            .find(|a| a.parse::<Ipv4Addr>().is_ok())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewLoadBalancer {
    pub name: String,
    pub port: u16,
    pub protocol: String,
    pub algorithm: Algorithm,
    pub vip_type: VipType,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthMonitor {
    pub kind: String,
    pub delay: u32,
    pub timeout: u32,
    pub attempts_before_deactivation: u32,
}

impl HealthMonitor {
    pub fn connect(delay: u32, timeout: u32, attempts_before_deactivation: u32) -> Self {
        Self {
            kind: "CONNECT".to_string(),
            delay,
            timeout,
            attempts_before_deactivation,
        }
    }
}

// --- Databases ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DbFlavor {
    pub id: String,
    pub name: String,
    pub ram_mb: u32,
    pub href: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DbInstance {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub hostname: Option<String>,
    pub flavor_id: Option<String>,
    pub volume_gb: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DbUser {
    pub name: String,
    pub password: String,
    pub host: String,
    pub databases: Vec<String>,
}

impl_resource!(Server, Image, LoadBalancer, DbInstance);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_roundtrip() {
        for (s, st) in [
            ("BUILD", ResourceStatus::Build),
            ("ACTIVE", ResourceStatus::Active),
            ("ERROR", ResourceStatus::Error),
            ("UNKNOWN", ResourceStatus::Unknown),
            ("SAVING", ResourceStatus::Saving),
            ("PENDING_UPDATE", ResourceStatus::PendingUpdate),
        ] {
            assert_eq!(ResourceStatus::parse(s), st);
            assert_eq!(ResourceStatus::parse(&s.to_lowercase()), st);
            assert_eq!(st.as_str(), s);
        }
        assert_eq!(
            ResourceStatus::parse("rescue"),
            ResourceStatus::Other("RESCUE".to_string())
        );
    }

    #[test]
    fn status_serde_uses_provider_strings() {
        let st: ResourceStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(st, ResourceStatus::Active);
        assert_eq!(serde_json::to_string(&ResourceStatus::Saving).unwrap(), "\"SAVING\"");
    }

    #[test]
    fn public_ipv4_skips_v6() {
        let nets = Networks {
            public: vec!["2001:4800:7812::1".into(), "162.209.1.10".into()],
            private: vec!["10.176.2.2".into()],
        };
        assert_eq!(nets.public_ipv4(), Some("162.209.1.10"));
        assert_eq!(nets.first_private(), Some("10.176.2.2"));
        assert_eq!(Networks::default().public_ipv4(), None);
    }

    #[test]
    fn cdn_host_strips_scheme() {
        let cdn = CdnInfo {
            ttl: 900,
            uri: "http://abc.r1.cf1.rackcdn.com".into(),
            ssl_uri: String::new(),
            streaming_uri: String::new(),
            ios_uri: String::new(),
        };
        assert_eq!(cdn.host(), "abc.r1.cf1.rackcdn.com");
    }

    #[test]
    fn vip_type_accepts_snet_alias() {
        let v: VipType = serde_json::from_str("\"SNET\"").unwrap();
        assert_eq!(v, VipType::ServiceNet);
        assert_eq!(serde_json::to_string(&VipType::ServiceNet).unwrap(), "\"SERVICENET\"");
    }

    #[test]
    fn region_parse() {
        assert_eq!(Region::parse("lon"), Some(Region::Lon));
        assert_eq!(Region::parse("XYZ"), None);
        assert!("XYZ".parse::<Region>().is_err());
    }

    #[test]
    fn cli_spellings_parse() {
        assert_eq!("random".parse::<Algorithm>(), Ok(Algorithm::Random));
        assert_eq!(
            "weighted-round-robin".parse::<Algorithm>(),
            Ok(Algorithm::WeightedRoundRobin)
        );
        assert_eq!("snet".parse::<VipType>(), Ok(VipType::ServiceNet));
        assert!("private".parse::<VipType>().is_err());
    }
}
