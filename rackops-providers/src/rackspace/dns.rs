use super::{id_string, str_field, u32_field, url, RackspaceProvider};
use crate::DnsProvider;
use anyhow::Result;
use async_trait::async_trait;
use rackops_common::{DnsRecord, NewRecord, NewZone, RecordType, Zone, ZonePage};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::time::sleep;

fn parse_zone(v: &Value) -> Zone {
    Zone {
        id: id_string(&v["id"]),
        name: str_field(v, "name"),
        email: v.get("emailAddress").and_then(Value::as_str).map(str::to_string),
        ttl: v.get("ttl").and_then(Value::as_u64).map(|t| t as u32),
    }
}

fn parse_record(v: &Value) -> Result<DnsRecord> {
    let record_type = match v["type"].as_str().unwrap_or_default().to_ascii_uppercase().as_str() {
        "A" => RecordType::A,
        "CNAME" => RecordType::Cname,
        other => anyhow::bail!("unsupported record type {}", other),
    };
    Ok(DnsRecord {
        id: id_string(&v["id"]),
        record_type,
        name: str_field(v, "name"),
        data: str_field(v, "data"),
        ttl: u32_field(v, "ttl"),
    })
}

impl RackspaceProvider {
    /// DNS mutations are asynchronous jobs; poll the job until it settles and return its response.
    async fn wait_dns_job(&self, accepted: Value, what: &str) -> Result<Value> {
        let base = self.endpoint(&self.endpoints.dns, "dns")?;
        let job_id = accepted
            .get("jobId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("{}: no jobId in response", what))?
            .to_string();

        let mut job = accepted;
        loop {
            match job["status"].as_str().unwrap_or_default() {
                "COMPLETED" => {
                    tracing::debug!("[Rackspace API] DNS job {} completed", job_id);
                    return Ok(job["response"].clone());
                }
                "ERROR" => {
                    let err = &job["error"];
                    let message = err
                        .get("details")
                        .or_else(|| err.get("message"))
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error");
                    anyhow::bail!("{} failed: {}", what, message);
                }
                _ => {}
            }
            sleep(self.dns_job_interval).await;
            let mut u = url(base, &["status", &job_id])?;
            u.query_pairs_mut().append_pair("showDetails", "true");
            job = self
                .send_json(self.request(Method::GET, u), "get DNS job status")
                .await?;
        }
    }
}

#[async_trait]
impl DnsProvider for RackspaceProvider {
    async fn list_zones(&self, limit: usize, offset: usize) -> Result<ZonePage> {
        let base = self.endpoint(&self.endpoints.dns, "dns")?;
        let mut u = url(base, &["domains"])?;
        u.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        let body = self.send_json(self.request(Method::GET, u), "list zones").await?;

        let zones = body["domains"]
            .as_array()
            .map(|a| a.iter().map(parse_zone).collect())
            .unwrap_or_default();
        let has_next = body["links"]
            .as_array()
            .map(|links| links.iter().any(|l| l["rel"].as_str() == Some("next")))
            .unwrap_or(false);
        Ok(ZonePage {
            zones,
            total: body["totalEntries"].as_u64().map(|t| t as usize),
            has_next,
        })
    }

    async fn create_zone(&self, zone: &NewZone) -> Result<Zone> {
        let base = self.endpoint(&self.endpoints.dns, "dns")?;
        let mut domain = json!({
            "name": zone.name,
            "emailAddress": zone.email,
            "ttl": zone.ttl,
        });
        if let Some(comment) = &zone.comment {
            domain["comment"] = json!(comment);
        }
        let accepted = self
            .send_json(
                self.request(Method::POST, url(base, &["domains"])?)
                    .json(&json!({ "domains": [domain] })),
                "create zone",
            )
            .await?;
        let response = self.wait_dns_job(accepted, "create zone").await?;
        response["domains"]
            .as_array()
            .and_then(|d| d.first())
            .map(parse_zone)
            .ok_or_else(|| anyhow::anyhow!("create zone: no domain in job response"))
    }

    async fn add_record(&self, zone_id: &str, record: &NewRecord) -> Result<DnsRecord> {
        let base = self.endpoint(&self.endpoints.dns, "dns")?;
        let body = json!({
            "records": [{
                "type": record.record_type.as_str(),
                "name": record.name,
                "data": record.data,
                "ttl": record.ttl,
            }]
        });
        let accepted = self
            .send_json(
                self.request(Method::POST, url(base, &["domains", zone_id, "records"])?)
                    .json(&body),
                "add record",
            )
            .await?;
        let response = self.wait_dns_job(accepted, "add record").await?;
        let first = response["records"]
            .as_array()
            .and_then(|r| r.first())
            .ok_or_else(|| anyhow::anyhow!("add record: no record in job response"))?;
        parse_record(first)
    }
}
