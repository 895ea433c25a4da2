use super::{finish_builds, flavor_by_name, image_by_name, print_image, print_load_balancer, print_server, Outcome, Session};
use crate::poller::{track_builds, WaitSpec};
use rackops_common::{Algorithm, NewLoadBalancer, Node, RackopsError, VipType};

pub const MAX_SERVERS: u32 = 10;

/// Backend port on every node.
const NODE_PORT: u16 = 80;

#[derive(Clone, Debug)]
pub struct BalancedServersOptions {
    pub prefix: String,
    pub flavor: String,
    /// Fragment matched against image names.
    pub image: String,
    pub count: u32,
    /// Defaults to the prefix followed by `lb`.
    pub lb_name: Option<String>,
    pub vip_type: VipType,
    pub algorithm: Algorithm,
    pub port: u16,
}

impl Default for BalancedServersOptions {
    fn default() -> Self {
        Self {
            prefix: "server-".to_string(),
            flavor: "1 GB Performance".to_string(),
            image: "Debian 7 (Wheezy".to_string(),
            count: 2,
            lb_name: None,
            vip_type: VipType::Public,
            algorithm: Algorithm::Random,
            port: 80,
        }
    }
}

impl BalancedServersOptions {
    pub fn lb_name(&self) -> String {
        self.lb_name
            .clone()
            .unwrap_or_else(|| format!("{}lb", self.prefix))
    }
}

/// Build a set of servers and put the ones that came up behind an HTTP load balancer.
pub async fn run(session: &mut Session, opts: &BalancedServersOptions) -> Result<Outcome, RackopsError> {
    if !(1..=MAX_SERVERS).contains(&opts.count) {
        return Err(RackopsError::InvalidInput(format!(
            "server count must be between 1 and {}",
            MAX_SERVERS
        )));
    }
    let Session {
        cloud,
        intervals,
        console,
    } = session;
    let compute = cloud.compute.as_ref();

    let image = image_by_name(compute, &opts.image).await?;
    let flavor = flavor_by_name(compute, &opts.flavor).await?;
    print_image(console, &image);
    console.line(format!("Server flavor: {}", flavor.name));
    console.line(format!("Number of servers to be created: {}", opts.count));

    let mut requested = Vec::with_capacity(opts.count as usize);
    for i in 1..=opts.count {
        let name = format!("{}{}", opts.prefix, i);
        requested.push(compute.create_server(&name, &image.id, &flavor.id, &[]).await?);
    }
    console.line("Server build requests sent, waiting for them to complete...");

    let mut errors = false;
    let spec = WaitSpec::server_build(intervals);
    let settled = track_builds(compute, requested, &spec, console, |console, server| {
        if server.status.is_active() {
            print_server(console, server);
        } else {
            errors = true;
            console.line(format!(
                "WARN: Build process for {} failed (status: {})",
                server.name, server.status
            ));
        }
    })
    .await?;

    let nodes: Vec<Node> = settled
        .iter()
        .filter(|s| s.status.is_active())
        .filter_map(|s| s.networks.first_private())
        .map(|addr| Node::enabled(addr, NODE_PORT))
        .collect();
    if nodes.is_empty() {
        return Err(RackopsError::NoActiveServers);
    }

    let lb_name = opts.lb_name();
    console.line(format!("Creating load balancer '{}' with {} node(s)", lb_name, nodes.len()));
    let lb = cloud
        .load_balancers
        .create_load_balancer(&NewLoadBalancer {
            name: lb_name,
            port: opts.port,
            protocol: "HTTP".to_string(),
            algorithm: opts.algorithm,
            vip_type: opts.vip_type,
            nodes,
        })
        .await?;
    tracing::info!("load balancer {} requested ({})", lb.name, lb.id);
    print_load_balancer(console, &lb);

    Ok(finish_builds(console, errors))
}
