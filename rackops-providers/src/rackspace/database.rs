use super::{id_string, str_field, u32_field, url, RackspaceProvider};
use crate::DatabaseProvider;
use anyhow::Result;
use async_trait::async_trait;
use rackops_common::{DbFlavor, DbInstance, DbUser, ResourceStatus};
use reqwest::Method;
use serde_json::{json, Value};

fn parse_flavor(v: &Value) -> DbFlavor {
    let href = v["links"].as_array().and_then(|links| {
        links
            .iter()
            .find(|l| l["rel"].as_str() == Some("self"))
            .or_else(|| links.first())
            .and_then(|l| l["href"].as_str())
            .map(str::to_string)
    });
    DbFlavor {
        id: id_string(&v["id"]),
        name: str_field(v, "name"),
        ram_mb: u32_field(v, "ram"),
        href,
    }
}

fn parse_instance(v: &Value) -> DbInstance {
    DbInstance {
        id: id_string(&v["id"]),
        name: str_field(v, "name"),
        status: ResourceStatus::parse(v["status"].as_str().unwrap_or("UNKNOWN")),
        hostname: v.get("hostname").and_then(Value::as_str).map(str::to_string),
        flavor_id: v.get("flavor").and_then(|f| f.get("id")).map(id_string),
        volume_gb: v.get("volume").map(|vol| u32_field(vol, "size")).unwrap_or(0),
    }
}

#[async_trait]
impl DatabaseProvider for RackspaceProvider {
    async fn list_flavors(&self) -> Result<Vec<DbFlavor>> {
        let base = self.endpoint(&self.endpoints.database, "database")?;
        let body = self
            .send_json(self.request(Method::GET, url(base, &["flavors"])?), "list DB flavors")
            .await?;
        Ok(body["flavors"]
            .as_array()
            .map(|a| a.iter().map(parse_flavor).collect())
            .unwrap_or_default())
    }

    async fn create_instance(
        &self,
        name: &str,
        flavor: &DbFlavor,
        volume_gb: u32,
    ) -> Result<DbInstance> {
        let base = self.endpoint(&self.endpoints.database, "database")?;
        let flavor_ref = flavor.href.clone().unwrap_or_else(|| flavor.id.clone());
        let body = json!({
            "instance": {
                "name": name,
                "flavorRef": flavor_ref,
                "volume": {"size": volume_gb},
            }
        });
        let resp = self
            .send_json(
                self.request(Method::POST, url(base, &["instances"])?).json(&body),
                "create DB instance",
            )
            .await?;
        let mut instance = parse_instance(&resp["instance"]);
        if instance.id.is_empty() {
            anyhow::bail!("No instance id in create response");
        }
        if instance.volume_gb == 0 {
            instance.volume_gb = volume_gb;
        }
        tracing::info!(
            "[Rackspace API] DB instance {} requested: id={} flavor={} volume={}GB",
            name,
            instance.id,
            flavor.name,
            volume_gb
        );
        Ok(instance)
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Option<DbInstance>> {
        let base = self.endpoint(&self.endpoints.database, "database")?;
        let body = self
            .send_json_opt(
                self.request(Method::GET, url(base, &["instances", instance_id])?),
                "get DB instance",
            )
            .await?;
        Ok(body.map(|b| parse_instance(&b["instance"])))
    }

    async fn create_database(&self, instance_id: &str, db_name: &str) -> Result<()> {
        let base = self.endpoint(&self.endpoints.database, "database")?;
        self.send_ok(
            self.request(Method::POST, url(base, &["instances", instance_id, "databases"])?)
                .json(&json!({"databases": [{"name": db_name}]})),
            "create database",
        )
        .await?;
        Ok(())
    }

    async fn create_user(&self, instance_id: &str, user: &DbUser) -> Result<()> {
        let base = self.endpoint(&self.endpoints.database, "database")?;
        let databases: Vec<Value> = user.databases.iter().map(|d| json!({"name": d})).collect();
        let body = json!({
            "users": [{
                "name": user.name,
                "password": user.password,
                "host": user.host,
                "databases": databases,
            }]
        });
        self.send_ok(
            self.request(Method::POST, url(base, &["instances", instance_id, "users"])?)
                .json(&body),
            "create DB user",
        )
        .await?;
        Ok(())
    }
}
