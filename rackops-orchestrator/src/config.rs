use rackops_common::{RackopsError, Region};
use rackops_providers::Cloud;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CREDENTIALS_FILE: &str = ".rackspace_cloud_credentials";

/// Region used when neither `--region` nor `RAX_REGION` names one.
pub const DEFAULT_REGION: Region = Region::Ord;

/// Account credentials read from a `KEY=VALUE` file.
#[derive(Clone, Debug, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
    pub region: Option<String>,
}

/// Raw `RAX_*` values as they appear in the credentials file.
#[derive(Debug, Default)]
struct FileValues {
    username: Option<String>,
    api_key: Option<String>,
    region: Option<String>,
}

fn read_file(path: &Path) -> Result<FileValues, RackopsError> {
    if !path.is_file() {
        return Err(RackopsError::CredentialsNotFound(path.to_path_buf()));
    }
    let iter = dotenv::from_path_iter(path).map_err(|e| {
        RackopsError::AuthenticationFailed(format!("cannot read {}: {}", path.display(), e))
    })?;

    let mut values = FileValues::default();
    for item in iter {
        let (key, value) = item.map_err(|e| {
            RackopsError::AuthenticationFailed(format!("bad line in {}: {}", path.display(), e))
        })?;
        match key.as_str() {
            "RAX_USERNAME" => values.username = Some(value),
            "RAX_API_KEY" => values.api_key = Some(value),
            "RAX_REGION" => values.region = Some(value),
            _ => {}
        }
    }
    Ok(values)
}

impl Credentials {
    /// Read the file only; values already in the process environment are not consulted.
    pub fn from_file(path: &Path) -> Result<Self, RackopsError> {
        let file = read_file(path)?;
        Self::from_values(file.username, file.api_key, file.region, path)
    }

    /// Read the file, then let `RAX_*` variables from the environment override or complete it.
    pub fn load(path: &Path) -> Result<Self, RackopsError> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RackopsError> {
        let file = read_file(path)?;
        Self::from_values(
            lookup("RAX_USERNAME").or(file.username),
            lookup("RAX_API_KEY").or(file.api_key),
            lookup("RAX_REGION").or(file.region),
            path,
        )
    }

    fn from_values(
        username: Option<String>,
        api_key: Option<String>,
        region: Option<String>,
        path: &Path,
    ) -> Result<Self, RackopsError> {
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let missing = |key: &str| {
            RackopsError::AuthenticationFailed(format!("{} missing from {}", key, path.display()))
        };
        Ok(Self {
            username: present(username).ok_or_else(|| missing("RAX_USERNAME"))?,
            api_key: present(api_key).ok_or_else(|| missing("RAX_API_KEY"))?,
            region: present(region),
        })
    }
}

/// `~/.rackspace_cloud_credentials`, or the bare file name when no home directory is known.
pub fn default_credentials_path() -> PathBuf {
    home::home_dir()
        .map(|h| h.join(CREDENTIALS_FILE))
        .unwrap_or_else(|| PathBuf::from(CREDENTIALS_FILE))
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// `--region` first, then the credentials' region, then the default.
pub fn resolve_region(
    flag: Option<Region>,
    configured: Option<&str>,
) -> Result<Region, RackopsError> {
    if let Some(r) = flag {
        return Ok(r);
    }
    match configured {
        Some(name) => Region::parse(name)
            .ok_or_else(|| RackopsError::InvalidInput(format!("unknown region '{}'", name))),
        None => Ok(DEFAULT_REGION),
    }
}

/// Sleep between status polls, per resource kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollIntervals {
    pub server: Duration,
    pub image: Duration,
    pub database: Duration,
    pub load_balancer: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            server: Duration::from_secs(15),
            image: Duration::from_secs(30),
            database: Duration::from_secs(30),
            load_balancer: Duration::from_secs(5),
        }
    }
}

impl PollIntervals {
    pub fn immediate() -> Self {
        Self {
            server: Duration::ZERO,
            image: Duration::ZERO,
            database: Duration::ZERO,
            load_balancer: Duration::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    Rackspace,
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rackspace => "rackspace",
            Self::Mock => "mock",
        }
    }
}

/// Build the service bundle for the chosen provider.
pub async fn connect(
    kind: ProviderKind,
    credentials: &Path,
    region: Option<Region>,
) -> Result<Cloud, RackopsError> {
    tracing::debug!("connecting provider={}", kind.as_str());
    match kind {
        #[cfg(feature = "provider-rackspace")]
        ProviderKind::Rackspace => {
            use rackops_providers::rackspace::{ApiKeyCredentials, RackspaceProvider, DEFAULT_AUTH_URL};

            let creds = Credentials::load(credentials)?;
            let region = resolve_region(region, creds.region.as_deref())?;
            let auth_url = env::var("RAX_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string());
            let provider = RackspaceProvider::connect(
                &auth_url,
                &ApiKeyCredentials {
                    username: creds.username,
                    api_key: creds.api_key,
                },
                region.as_str(),
            )
            .await?;
            Ok(Cloud::from_provider(Arc::new(provider)))
        }
        #[cfg(feature = "provider-mock")]
        ProviderKind::Mock => {
            use rackops_providers::mock::MockCloud;

            let _ = (credentials, region);
            let cloud = MockCloud::new().with_build_polls(2).with_zone("example.com");
            Ok(Cloud::from_provider(Arc::new(cloud)))
        }
        #[allow(unreachable_patterns)]
        other => Err(RackopsError::InvalidInput(format!(
            "provider '{}' is not compiled into this build",
            other.as_str()
        ))),
    }
}
