use super::{ensure_success, url, RackspaceProvider};
use crate::ObjectStore;
use anyhow::Result;
use async_trait::async_trait;
use rackops_common::{CdnInfo, Container};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;

/// Listing page size used by the storage API.
const LIST_LIMIT: usize = 10_000;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
}

fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
    header(headers, name).and_then(|s| s.parse().ok()).unwrap_or(0)
}

pub(super) fn parse_cdn(headers: &HeaderMap) -> Option<CdnInfo> {
    let enabled = header(headers, "X-Cdn-Enabled")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !enabled {
        return None;
    }
    Some(CdnInfo {
        ttl: header(headers, "X-Ttl").and_then(|s| s.parse().ok()).unwrap_or(0),
        uri: header(headers, "X-Cdn-Uri").unwrap_or_default(),
        ssl_uri: header(headers, "X-Cdn-Ssl-Uri").unwrap_or_default(),
        streaming_uri: header(headers, "X-Cdn-Streaming-Uri").unwrap_or_default(),
        ios_uri: header(headers, "X-Cdn-Ios-Uri").unwrap_or_default(),
    })
}

impl RackspaceProvider {
    async fn cdn_info(&self, name: &str) -> Result<Option<CdnInfo>> {
        // Some regions ship without a CDN endpoint.
        let Some(base) = self.endpoints.cdn.as_deref() else {
            return Ok(None);
        };
        let resp = self
            .send(self.request(Method::HEAD, url(base, &[name])?), "head CDN container")
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp, "head CDN container").await?;
        Ok(parse_cdn(resp.headers()))
    }
}

#[async_trait]
impl ObjectStore for RackspaceProvider {
    async fn get_container(&self, name: &str) -> Result<Option<Container>> {
        let base = self.endpoint(&self.endpoints.object_store, "object-store")?;
        let resp = self
            .send(self.request(Method::HEAD, url(base, &[name])?), "head container")
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp, "head container").await?;
        let headers = resp.headers();
        let object_count = header_u64(headers, "X-Container-Object-Count");
        let bytes_used = header_u64(headers, "X-Container-Bytes-Used");
        let cdn = self.cdn_info(name).await?;
        Ok(Some(Container {
            name: name.to_string(),
            object_count,
            bytes_used,
            cdn,
        }))
    }

    async fn create_container(&self, name: &str) -> Result<Container> {
        let base = self.endpoint(&self.endpoints.object_store, "object-store")?;
        self.send_ok(self.request(Method::PUT, url(base, &[name])?), "create container")
            .await?;
        tracing::info!("[Rackspace API] container {} created", name);
        Ok(Container {
            name: name.to_string(),
            object_count: 0,
            bytes_used: 0,
            cdn: None,
        })
    }

    async fn enable_cdn(&self, name: &str, ttl: u32) -> Result<Container> {
        let base = self.endpoint(&self.endpoints.cdn, "object-cdn")?;
        self.send_ok(
            self.request(Method::PUT, url(base, &[name])?)
                .header("X-Cdn-Enabled", "True")
                .header("X-Ttl", ttl.to_string()),
            "enable CDN",
        )
        .await?;
        let container = self
            .get_container(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("container {} vanished after CDN enable", name))?;
        if container.cdn.is_none() {
            anyhow::bail!("CDN enable for container {} was not applied", name);
        }
        Ok(container)
    }

    async fn set_container_metadata(
        &self,
        name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<()> {
        let base = self.endpoint(&self.endpoints.object_store, "object-store")?;
        let mut req = self.request(Method::POST, url(base, &[name])?);
        for (k, v) in metadata {
            req = req.header(k.as_str(), v.as_str());
        }
        self.send_ok(req, "set container metadata").await?;
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        object_name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let base = self.endpoint(&self.endpoints.object_store, "object-store")?;
        let mut segments = vec![container];
        segments.extend(object_name.split('/').filter(|s| !s.is_empty()));
        self.send_ok(
            self.request(Method::PUT, url(base, &segments)?)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body),
            "put object",
        )
        .await?;
        Ok(())
    }

    async fn list_object_names(&self, container: &str) -> Result<Vec<String>> {
        let base = self.endpoint(&self.endpoints.object_store, "object-store")?;
        let mut names: Vec<String> = Vec::new();
        loop {
            let mut u = url(base, &[container])?;
            {
                let mut q = u.query_pairs_mut();
                q.append_pair("format", "json");
                q.append_pair("limit", &LIST_LIMIT.to_string());
                if let Some(last) = names.last() {
                    q.append_pair("marker", last);
                }
            }
            let resp = self
                .send_ok(self.request(Method::GET, u), "list objects")
                .await?;
            // Empty containers answer 204 with no body.
            if resp.status() == StatusCode::NO_CONTENT {
                break;
            }
            let text = resp.text().await?;
            if text.trim().is_empty() {
                break;
            }
            let body: Value = serde_json::from_str(&text)
                .map_err(|e| anyhow::anyhow!("list objects: bad JSON: {}", e))?;
            let page: Vec<String> = body
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|o| o.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let fetched = page.len();
            names.extend(page);
            if fetched < LIST_LIMIT {
                break;
            }
        }
        Ok(names)
    }
}
