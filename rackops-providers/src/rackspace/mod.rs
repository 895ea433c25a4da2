use anyhow::{Context, Result};
use rackops_common::RackopsError;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

mod compute;
mod database;
mod dns;
pub mod identity;
mod load_balancer;
mod object_store;

pub use identity::{ApiKeyCredentials, DEFAULT_AUTH_URL};

/// Public endpoints resolved from the service catalog for one region.
#[derive(Clone, Debug, Default)]
pub struct Endpoints {
    pub compute: Option<String>,
    pub object_store: Option<String>,
    pub cdn: Option<String>,
    pub dns: Option<String>,
    pub load_balancer: Option<String>,
    pub database: Option<String>,
}

pub struct RackspaceProvider {
    client: Client,
    token: String,
    region: String,
    endpoints: Endpoints,
    dns_job_interval: Duration,
}

impl RackspaceProvider {
    /// Authenticate and resolve the endpoints of `region`.
    pub async fn connect(
        auth_url: &str,
        creds: &ApiKeyCredentials,
        region: &str,
    ) -> Result<Self, RackopsError> {
        // Bound every API call.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| RackopsError::Api(e.into()))?;

        let access = identity::authenticate(&client, auth_url, creds).await?;
        let endpoints = Endpoints {
            compute: access.endpoint(identity::COMPUTE, region),
            object_store: access.endpoint(identity::OBJECT_STORE, region),
            cdn: access.endpoint(identity::OBJECT_CDN, region),
            dns: access.endpoint(identity::DNS, region),
            load_balancer: access.endpoint(identity::LOAD_BALANCER, region),
            database: access.endpoint(identity::DATABASE, region),
        };
        tracing::info!("[Rackspace API] session ready for region {}", region);
        Ok(Self::from_parts(client, access.token.id, region, endpoints))
    }

    /// Build a provider from an existing token and endpoint set.
    pub fn with_endpoints(token: String, region: &str, endpoints: Endpoints) -> Self {
        Self::from_parts(Client::new(), token, region, endpoints)
    }

    fn from_parts(client: Client, token: String, region: &str, endpoints: Endpoints) -> Self {
        Self {
            client,
            token,
            region: region.to_uppercase(),
            endpoints,
            dns_job_interval: Duration::from_secs(2),
        }
    }

    pub fn with_dns_job_interval(mut self, interval: Duration) -> Self {
        self.dns_job_interval = interval;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn endpoint<'a>(&self, ep: &'a Option<String>, service: &str) -> Result<&'a str> {
        ep.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} service is not available in region {}",
                service,
                self.region
            )
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Auth-Token", &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let req = req.build()?;
        let method = req.method().clone();
        let url = req.url().clone();
        tracing::debug!("[Rackspace API] {} {} - {}", method, url, what);

        let resp = self
            .client
            .execute(req)
            .await
            .with_context(|| format!("{} request failed", what))?;
        tracing::debug!(
            "[Rackspace API] {} {} -> status={}",
            method,
            url,
            resp.status().as_u16()
        );
        Ok(resp)
    }

    /// Send and fail on any non-2xx status.
    async fn send_ok(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = self.send(req, what).await?;
        ensure_success(resp, what).await
    }

    /// Send and decode a JSON body; `None` on 404.
    async fn send_json_opt(&self, req: RequestBuilder, what: &str) -> Result<Option<Value>> {
        let resp = self.send(req, what).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp, what).await?;
        Ok(Some(resp.json().await.with_context(|| format!("{}: bad JSON", what))?))
    }

    async fn send_json(&self, req: RequestBuilder, what: &str) -> Result<Value> {
        let resp = self.send_ok(req, what).await?;
        resp.json().await.with_context(|| format!("{}: bad JSON", what))
    }
}

async fn ensure_success(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    tracing::warn!(
        "[Rackspace API] {} failed: status={} body={}",
        what,
        status.as_u16(),
        text
    );
    Err(anyhow::anyhow!(
        "{} failed: status={} body={}",
        what,
        status.as_u16(),
        text
    ))
}

/// Append path segments to a base URL, percent-encoding each one.
fn url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid endpoint URL {}", base))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("endpoint URL {} cannot take a path", base))?;
        path.pop_if_empty();
        for seg in segments {
            path.push(seg);
        }
    }
    Ok(url)
}

/// Provider ids arrive as strings or numbers depending on the service.
fn id_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn u32_field(v: &Value, key: &str) -> u32 {
    v.get(key)
        .and_then(|x| x.as_u64().or_else(|| x.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(0) as u32
}
