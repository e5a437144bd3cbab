//! Node Telemetry Agent: a per-host sidecar that samples node and per-container
//! resource usage via `/proc` and cgroups, reads live player counts from game
//! servers, and reports compact telemetry to the fleet orchestrator.
//!
//! This library provides server discovery against the local host-management
//! API, cgroup resolution and counter parsing, rate computation, the
//! status-ping probe, and the control loop tying them together.

use std::future::Future;
use std::sync::Arc;

use agent::{OrchestratorPublisher, Settings, TelemetryLoop};
use cgroup::CgroupResolver;
use config::Config;
use discovery::HostApiDiscoverer;
use http::JsonClient;
use probe::StatusPingProbe;

pub mod agent;
pub mod cgroup;
pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod fsutil;
pub mod http;
pub mod probe;
pub mod sampler;

/// Runs the telemetry agent until `shutdown` resolves.
///
/// Reads the configuration from the environment, wires discovery, sampling,
/// probing and publishing together, and hands control to the [`TelemetryLoop`].
///
/// # Errors
///
/// Only startup can fail:
/// - Missing or malformed configuration (e.g. `NODE_ID` unset).
/// - The HTTP client cannot be built.
///
/// Once the loop runs, every failure is logged and retried.
pub async fn run(shutdown: impl Future<Output = ()>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    log::info!(
        "starting telemetry agent for node `{}` (orchestrator {}, host API {})",
        config.node_id,
        config.orchestrator_base_url,
        config.wings_base_url
    );
    log::debug!(
        "cgroup root: {}, CPU counters: {}",
        config.cgroup_root.display(),
        config.proc_stat_path.display()
    );

    let client = JsonClient::new(config.http_timeout, config.insecure_tls)?;
    let discoverer = HostApiDiscoverer::new(
        client.clone(),
        config.wings_base_url.as_str(),
        config.wings_token.clone(),
    );
    let publisher = OrchestratorPublisher::new(
        client,
        &config.orchestrator_base_url,
        &config.node_id,
        config.node_token.as_str(),
    );
    log::debug!("publishing telemetry to {}", publisher.url());
    let probe = StatusPingProbe::new(config.node_ip.as_str(), config.ping_timeout);
    let resolver = Arc::new(CgroupResolver::new(config.cgroup_root.clone()));

    let mut telemetry = TelemetryLoop::new(
        Settings::from(&config),
        discoverer,
        probe,
        publisher,
        resolver,
    );
    telemetry.run(shutdown).await;

    Ok(())
}
