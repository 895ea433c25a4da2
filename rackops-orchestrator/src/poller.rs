//! Fixed-interval status polling of provider-side resources.

use crate::config::PollIntervals;
use crate::console::Console;
use rackops_common::{RackopsError, Resource, ResourceStatus, Server};
use rackops_providers::ComputeProvider;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// What to wait for, how often to look, and which statuses end the wait.
#[derive(Clone, Copy, Debug)]
pub struct WaitSpec {
    pub what: &'static str,
    pub interval: Duration,
    pub settled: fn(&ResourceStatus) -> bool,
}

impl WaitSpec {
    pub fn server_build(intervals: &PollIntervals) -> Self {
        Self {
            what: "server",
            interval: intervals.server,
            settled: |s| {
                matches!(
                    s,
                    ResourceStatus::Active | ResourceStatus::Error | ResourceStatus::Unknown
                )
            },
        }
    }

    /// Any status other than BUILD ends the wait.
    pub fn server_clone(intervals: &PollIntervals) -> Self {
        Self {
            what: "server",
            interval: intervals.server,
            settled: |s| *s != ResourceStatus::Build,
        }
    }

    pub fn image_save(intervals: &PollIntervals) -> Self {
        Self {
            what: "image",
            interval: intervals.image,
            settled: |s| *s != ResourceStatus::Saving,
        }
    }

    pub fn database_build(intervals: &PollIntervals) -> Self {
        Self {
            what: "database instance",
            interval: intervals.database,
            settled: |s| *s != ResourceStatus::Build,
        }
    }

    pub fn load_balancer(intervals: &PollIntervals) -> Self {
        Self {
            what: "load balancer",
            interval: intervals.load_balancer,
            settled: |s| matches!(s, ResourceStatus::Active | ResourceStatus::Error),
        }
    }

    pub fn is_settled(&self, status: &ResourceStatus) -> bool {
        (self.settled)(status)
    }
}

/// Poll `fetch` until the resource reaches a settled status, printing a dot per wait.
///
/// A resource that disappears while being waited on is reported as not found.
pub async fn wait_until_settled<T, F, Fut>(
    spec: &WaitSpec,
    id: &str,
    console: &mut Console,
    mut fetch: F,
) -> Result<T, RackopsError>
where
    T: Resource,
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Option<T>>>,
{
    let mut polls = 0u32;
    loop {
        let current = fetch()
            .await?
            .ok_or_else(|| RackopsError::not_found(spec.what, id))?;
        polls += 1;
        if spec.is_settled(current.status()) {
            console.end_progress();
            tracing::debug!(
                "{} {} settled as {} after {} poll(s)",
                spec.what,
                id,
                current.status(),
                polls
            );
            return Ok(current);
        }
        console.dot();
        sleep(spec.interval).await;
    }
}

/// Poll several server builds in turn until each has settled.
///
/// Every pass fetches each pending server once. Settled servers are handed to
/// `on_settled` and dropped from the pending list; the loop only sleeps while
/// work remains. Returns the servers in settlement order.
pub async fn track_builds<F>(
    compute: &dyn ComputeProvider,
    pending: Vec<Server>,
    spec: &WaitSpec,
    console: &mut Console,
    mut on_settled: F,
) -> Result<Vec<Server>, RackopsError>
where
    F: FnMut(&mut Console, &Server),
{
    let mut pending = pending;
    let mut settled = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let mut waiting = Vec::with_capacity(pending.len());
        for requested in pending {
            let current = match compute.get_server(&requested.id).await? {
                Some(mut s) => {
                    // Only the create response carries the admin password.
                    if s.admin_pass.is_none() {
                        s.admin_pass = requested.admin_pass.clone();
                    }
                    s
                }
                None => {
                    tracing::warn!(
                        "server {} ({}) vanished during build",
                        requested.name,
                        requested.id
                    );
                    Server {
                        status: ResourceStatus::Unknown,
                        ..requested
                    }
                }
            };
            if spec.is_settled(&current.status) {
                on_settled(console, &current);
                settled.push(current);
            } else {
                waiting.push(current);
            }
        }
        pending = waiting;
        if !pending.is_empty() {
            tracing::debug!("{} {}(s) still building", pending.len(), spec.what);
            sleep(spec.interval).await;
        }
    }
    Ok(settled)
}
