use super::{id_string, str_field, url, RackspaceProvider};
use crate::LoadBalancerProvider;
use anyhow::Result;
use async_trait::async_trait;
use rackops_common::{
    Algorithm, HealthMonitor, LoadBalancer, NewLoadBalancer, Node, ResourceStatus, VipType,
    VirtualIp,
};
use reqwest::Method;
use serde_json::{json, Value};

fn parse_node(v: &Value) -> Node {
    Node {
        address: str_field(v, "address"),
        port: v["port"].as_u64().unwrap_or(0) as u16,
        condition: str_field(v, "condition"),
    }
}

fn parse_vip(v: &Value) -> VirtualIp {
    VirtualIp {
        address: str_field(v, "address"),
        ip_version: str_field(v, "ipVersion"),
        vip_type: serde_json::from_value(v["type"].clone()).unwrap_or(VipType::Public),
    }
}

pub(super) fn parse_load_balancer(v: &Value) -> LoadBalancer {
    let list = |key: &str| v.get(key).and_then(Value::as_array).cloned().unwrap_or_default();
    LoadBalancer {
        id: id_string(&v["id"]),
        name: str_field(v, "name"),
        status: ResourceStatus::parse(v["status"].as_str().unwrap_or("UNKNOWN")),
        port: v["port"].as_u64().unwrap_or(0) as u16,
        protocol: str_field(v, "protocol"),
        algorithm: serde_json::from_value(v["algorithm"].clone())
            .unwrap_or(Algorithm::RoundRobin),
        nodes: list("nodes").iter().map(parse_node).collect(),
        virtual_ips: list("virtualIps").iter().map(parse_vip).collect(),
    }
}

#[async_trait]
impl LoadBalancerProvider for RackspaceProvider {
    async fn create_load_balancer(&self, request: &NewLoadBalancer) -> Result<LoadBalancer> {
        let base = self.endpoint(&self.endpoints.load_balancer, "load-balancer")?;
        let nodes: Vec<Value> = request
            .nodes
            .iter()
            .map(|n| json!({"address": n.address, "port": n.port, "condition": n.condition}))
            .collect();
        let body = json!({
            "loadBalancer": {
                "name": request.name,
                "port": request.port,
                "protocol": request.protocol,
                "algorithm": request.algorithm.as_str(),
                "virtualIps": [{"type": request.vip_type.as_str()}],
                "nodes": nodes,
            }
        });
        let resp = self
            .send_json(
                self.request(Method::POST, url(base, &["loadbalancers"])?).json(&body),
                "create load balancer",
            )
            .await?;
        let lb = parse_load_balancer(&resp["loadBalancer"]);
        if lb.id.is_empty() {
            anyhow::bail!("No load balancer id in create response");
        }
        tracing::info!(
            "[Rackspace API] load balancer {} requested: id={} nodes={}",
            request.name,
            lb.id,
            request.nodes.len()
        );
        Ok(lb)
    }

    async fn get_load_balancer(&self, lb_id: &str) -> Result<Option<LoadBalancer>> {
        let base = self.endpoint(&self.endpoints.load_balancer, "load-balancer")?;
        let body = self
            .send_json_opt(
                self.request(Method::GET, url(base, &["loadbalancers", lb_id])?),
                "get load balancer",
            )
            .await?;
        Ok(body.map(|b| parse_load_balancer(&b["loadBalancer"])))
    }

    async fn set_health_monitor(&self, lb_id: &str, monitor: &HealthMonitor) -> Result<()> {
        let base = self.endpoint(&self.endpoints.load_balancer, "load-balancer")?;
        let body = json!({
            "healthMonitor": {
                "type": monitor.kind,
                "delay": monitor.delay,
                "timeout": monitor.timeout,
                "attemptsBeforeDeactivation": monitor.attempts_before_deactivation,
            }
        });
        self.send_ok(
            self.request(Method::PUT, url(base, &["loadbalancers", lb_id, "healthmonitor"])?)
                .json(&body),
            "set health monitor",
        )
        .await?;
        Ok(())
    }

    async fn set_error_page(&self, lb_id: &str, html: &str) -> Result<()> {
        let base = self.endpoint(&self.endpoints.load_balancer, "load-balancer")?;
        self.send_ok(
            self.request(Method::PUT, url(base, &["loadbalancers", lb_id, "errorpage"])?)
                .json(&json!({"errorpage": {"content": html}})),
            "set error page",
        )
        .await?;
        Ok(())
    }
}
