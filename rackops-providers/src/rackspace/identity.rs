//! Identity v2.0 API-key authentication and service catalog lookup.

use rackops_common::RackopsError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_AUTH_URL: &str = "https://identity.api.rackspacecloud.com/v2.0";

pub const COMPUTE: &str = "compute";
pub const OBJECT_STORE: &str = "object-store";
pub const OBJECT_CDN: &str = "rax:object-cdn";
pub const DNS: &str = "rax:dns";
pub const LOAD_BALANCER: &str = "rax:load-balancer";
pub const DATABASE: &str = "rax:database";

#[derive(Clone, Debug)]
pub struct ApiKeyCredentials {
    pub username: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Access {
    pub token: Token,
    #[serde(rename = "serviceCatalog", default)]
    pub service_catalog: Vec<CatalogService>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Token {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogService {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogEndpoint {
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

impl Access {
    /// Public URL of a service type in `region`. A service whose endpoints all lack a
    /// region (DNS) is global and matches any region.
    pub fn endpoint(&self, kind: &str, region: &str) -> Option<String> {
        let services = self.service_catalog.iter().filter(|s| s.kind == kind);
        let endpoints: Vec<&CatalogEndpoint> = services.flat_map(|s| s.endpoints.iter()).collect();
        let regional = endpoints.iter().any(|e| e.region.is_some());
        let found = if regional {
            endpoints.iter().find(|e| {
                e.region
                    .as_deref()
                    .map(|r| r.eq_ignore_ascii_case(region))
                    .unwrap_or(false)
            })
        } else {
            endpoints.first()
        };
        found.map(|e| e.public_url.trim_end_matches('/').to_string())
    }
}

pub async fn authenticate(
    client: &Client,
    auth_url: &str,
    creds: &ApiKeyCredentials,
) -> Result<Access, RackopsError> {
    let url = format!("{}/tokens", auth_url.trim_end_matches('/'));
    let body = json!({
        "auth": {
            "RAX-KSKEY:apiKeyCredentials": {
                "username": creds.username,
                "apiKey": creds.api_key,
            }
        }
    });

    tracing::debug!("[Rackspace API] POST {} - authenticating user={}", url, creds.username);

    let resp = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| RackopsError::Api(anyhow::anyhow!("identity request failed: {}", e)))?;

    let status = resp.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(RackopsError::AuthenticationFailed(format!(
            "identity service returned {}",
            status.as_u16()
        )));
    }
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(RackopsError::Api(anyhow::anyhow!(
            "identity request failed: status={} body={}",
            status.as_u16(),
            text
        )));
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| RackopsError::Api(anyhow::anyhow!("bad identity response: {}", e)))?;

    tracing::debug!(
        "[Rackspace API] authenticated, {} catalog service(s)",
        token.access.service_catalog.len()
    );
    Ok(token.access)
}
