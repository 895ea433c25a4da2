use super::{id_string, str_field, u32_field, url, RackspaceProvider};
use crate::ComputeProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rackops_common::{Flavor, Image, Networks, Personality, ResourceStatus, Server};
use reqwest::Method;
use serde_json::{json, Value};

fn parse_addresses(v: &Value, network: &str) -> Vec<String> {
    v.get("addresses")
        .and_then(|a| a.get(network))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| a.get("addr").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(super) fn parse_server(v: &Value) -> Server {
    // Image is "" for boot-from-volume servers.
    let image_id = v
        .get("image")
        .and_then(|i| i.get("id"))
        .map(id_string)
        .filter(|s| !s.is_empty());
    Server {
        id: id_string(&v["id"]),
        name: str_field(v, "name"),
        status: ResourceStatus::parse(v["status"].as_str().unwrap_or("UNKNOWN")),
        flavor_id: v
            .get("flavor")
            .and_then(|f| f.get("id"))
            .map(id_string)
            .unwrap_or_default(),
        image_id,
        admin_pass: v.get("adminPass").and_then(Value::as_str).map(str::to_string),
        networks: Networks {
            public: parse_addresses(v, "public"),
            private: parse_addresses(v, "private"),
        },
    }
}

fn parse_image(v: &Value) -> Image {
    Image {
        id: id_string(&v["id"]),
        name: str_field(v, "name"),
        status: ResourceStatus::parse(v["status"].as_str().unwrap_or("UNKNOWN")),
    }
}

fn parse_flavor(v: &Value) -> Flavor {
    Flavor {
        id: id_string(&v["id"]),
        name: str_field(v, "name"),
        ram_mb: u32_field(v, "ram"),
        vcpus: u32_field(v, "vcpus"),
        disk_gb: u32_field(v, "disk"),
    }
}

#[async_trait]
impl ComputeProvider for RackspaceProvider {
    async fn list_images(&self) -> Result<Vec<Image>> {
        let base = self.endpoint(&self.endpoints.compute, "compute")?;
        let body = self
            .send_json(self.request(Method::GET, url(base, &["images", "detail"])?), "list images")
            .await?;
        Ok(body["images"]
            .as_array()
            .map(|a| a.iter().map(parse_image).collect())
            .unwrap_or_default())
    }

    async fn list_flavors(&self) -> Result<Vec<Flavor>> {
        let base = self.endpoint(&self.endpoints.compute, "compute")?;
        let body = self
            .send_json(
                self.request(Method::GET, url(base, &["flavors", "detail"])?),
                "list flavors",
            )
            .await?;
        Ok(body["flavors"]
            .as_array()
            .map(|a| a.iter().map(parse_flavor).collect())
            .unwrap_or_default())
    }

    async fn get_server(&self, server_id: &str) -> Result<Option<Server>> {
        let base = self.endpoint(&self.endpoints.compute, "compute")?;
        let body = self
            .send_json_opt(
                self.request(Method::GET, url(base, &["servers", server_id])?),
                "get server",
            )
            .await?;
        Ok(body.map(|b| parse_server(&b["server"])))
    }

    async fn create_server(
        &self,
        name: &str,
        image_id: &str,
        flavor_id: &str,
        personality: &[Personality],
    ) -> Result<Server> {
        let base = self.endpoint(&self.endpoints.compute, "compute")?;
        let mut server = json!({
            "name": name,
            "imageRef": image_id,
            "flavorRef": flavor_id,
        });
        if !personality.is_empty() {
            server["personality"] = Value::Array(
                personality
                    .iter()
                    .map(|p| json!({"path": p.path, "contents": STANDARD.encode(&p.contents)}))
                    .collect(),
            );
        }

        let body = self
            .send_json(
                self.request(Method::POST, url(base, &["servers"])?)
                    .json(&json!({ "server": server })),
                "create server",
            )
            .await?;

        // The create response only carries id, links and adminPass.
        let mut created = parse_server(&body["server"]);
        if created.id.is_empty() {
            anyhow::bail!("No server id in create response");
        }
        if created.name.is_empty() {
            created.name = name.to_string();
        }
        if created.flavor_id.is_empty() {
            created.flavor_id = flavor_id.to_string();
        }
        if created.image_id.is_none() {
            created.image_id = Some(image_id.to_string());
        }
        if body["server"].get("status").is_none() {
            created.status = ResourceStatus::Build;
        }
        tracing::info!("[Rackspace API] server {} requested: id={}", name, created.id);
        Ok(created)
    }

    async fn create_image(&self, server_id: &str, image_name: &str) -> Result<String> {
        let base = self.endpoint(&self.endpoints.compute, "compute")?;
        let resp = self
            .send_ok(
                self.request(Method::POST, url(base, &["servers", server_id, "action"])?)
                    .json(&json!({"createImage": {"name": image_name}})),
                "create image",
            )
            .await?;

        // Image id is the last segment of the Location header; newer APIs also return it in the body.
        let from_location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
            .map(str::to_string);
        let image_id = match from_location {
            Some(id) if !id.is_empty() => id,
            _ => {
                let body: Value = resp.json().await.context("create image: no Location header")?;
                body.get("image_id")
                    .map(id_string)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| anyhow::anyhow!("No image id in create image response"))?
            }
        };
        tracing::info!("[Rackspace API] image {} requested from server {}", image_id, server_id);
        Ok(image_id)
    }

    async fn get_image(&self, image_id: &str) -> Result<Option<Image>> {
        let base = self.endpoint(&self.endpoints.compute, "compute")?;
        let body = self
            .send_json_opt(
                self.request(Method::GET, url(base, &["images", image_id])?),
                "get image",
            )
            .await?;
        Ok(body.map(|b| parse_image(&b["image"])))
    }

    async fn delete_image(&self, image_id: &str) -> Result<()> {
        let base = self.endpoint(&self.endpoints.compute, "compute")?;
        self.send_ok(
            self.request(Method::DELETE, url(base, &["images", image_id])?),
            "delete image",
        )
        .await?;
        Ok(())
    }
}
