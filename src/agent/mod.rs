//! The telemetry control loop.
//!
//! One tick runs discovery (when due), samples the node and every known
//! server, probes player counts (when due), assembles a [`TelemetryPayload`]
//! and publishes it (unless backing off). Ticks run strictly one after
//! another; the pseudo-file reads of a tick happen on the blocking pool but
//! are awaited before anything else proceeds.
mod backoff;
mod payload;
mod publisher;
mod state;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

pub use backoff::{INITIAL_BACKOFF, PublishBackoff};
pub use payload::{NodeReport, ServerReport, TelemetryPayload};
pub use publisher::{OrchestratorPublisher, TelemetryPublisher};
pub use state::{Reconciled, ServerRuntimeState, ServerStates};

use crate::cgroup::{CgroupResolver, read_counters};
use crate::config::{Config, IntervalRange};
use crate::container::ContainerID;
use crate::discovery::{DiscoveredServer, ServerSource};
use crate::error::ResultOkLogExt;
use crate::probe::PlayerCountProbe;
use crate::sampler::{CounterReading, NodeMetricTracker, ProcStatSnapshot, container_rates};

/// Discovery never runs more often than this, whatever the configuration says.
pub const MIN_DISCOVERY_INTERVAL: Duration = Duration::from_secs(5);

/// Pause after a failed tick.
const ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Stand-in deadline for delays too long to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, saturating at a far-future instant instead of overflowing.
pub(crate) fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("counter collection task failed: {0}")]
    CounterTask(#[from] tokio::task::JoinError),
}

/// Cadences and identity the loop runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub node_id: String,
    pub sample_interval: IntervalRange,
    pub players_interval: IntervalRange,
    pub discovery_interval: Duration,
    pub send_backoff_max: Duration,
    pub proc_stat_path: PathBuf,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            node_id: config.node_id.clone(),
            sample_interval: config.sample_interval,
            players_interval: config.players_interval,
            discovery_interval: config.discovery_interval.max(MIN_DISCOVERY_INTERVAL),
            send_backoff_max: config.send_backoff_max,
            proc_stat_path: config.proc_stat_path.clone(),
        }
    }
}

/// Raw readings of one tick, taken together on the blocking pool.
#[derive(Debug)]
struct TickReadings {
    node: Option<ProcStatSnapshot>,
    /// One entry per discovered server, in the same order.
    containers: Vec<Option<CounterReading>>,
}

pub struct TelemetryLoop<D, P, S> {
    settings: Settings,
    source: D,
    probe: P,
    publisher: S,
    resolver: Arc<CgroupResolver>,
    servers: Vec<DiscoveredServer>,
    states: ServerStates,
    node_tracker: NodeMetricTracker,
    next_discovery_at: Option<Instant>,
    backoff: PublishBackoff,
}

impl<D, P, S> TelemetryLoop<D, P, S>
where
    D: ServerSource,
    P: PlayerCountProbe,
    S: TelemetryPublisher,
{
    pub fn new(
        settings: Settings,
        source: D,
        probe: P,
        publisher: S,
        resolver: Arc<CgroupResolver>,
    ) -> Self {
        let backoff = PublishBackoff::new(settings.send_backoff_max);
        Self {
            settings,
            source,
            probe,
            publisher,
            resolver,
            servers: Vec::new(),
            states: ServerStates::default(),
            node_tracker: NodeMetricTracker::default(),
            next_discovery_at: None,
            backoff,
        }
    }

    /// Ticks until `shutdown` resolves.
    ///
    /// A failed tick is logged and followed by a short pause; nothing but
    /// `shutdown` ends the loop.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        let sample_interval = self.settings.sample_interval;
        tick_until(async || self.tick().await, sample_interval, shutdown).await;
        log::info!("telemetry loop stopped");
    }

    /// Runs one pass of discovery, sampling, probing and publishing.
    ///
    /// Returns the payload assembled this tick, whether or not it was published.
    pub async fn tick(&mut self) -> Result<TelemetryPayload, Error> {
        if self.next_discovery_at.is_none_or(|at| Instant::now() >= at) {
            self.refresh_servers().await;
        }

        let readings = self.read_counters().await?;
        let node = self.node_tracker.observe(readings.node);

        let mut reports = Vec::with_capacity(self.servers.len());
        for (server, reading) in self.servers.iter().zip(readings.containers) {
            let state = self.states.get_or_insert(&server.server_id, Instant::now());
            let metrics = container_rates(state, reading);

            if state.player_probe_due(Instant::now()) {
                let players = self.probe.players_online(server.allocated_port).await;
                state.record_players(players);
                state.next_player_probe_at =
                    deadline_after(Instant::now(), self.settings.players_interval.sample());
            }

            reports.push(ServerReport::new(
                server.server_id.as_str(),
                state.players_online,
                metrics,
            ));
        }

        let payload = TelemetryPayload::new(
            self.settings.node_id.as_str(),
            chrono::Utc::now(),
            node.into(),
            reports,
        );
        self.publish_if_due(&payload).await;

        Ok(payload)
    }

    async fn refresh_servers(&mut self) {
        let servers = self.source.discover().await;
        log::info!("discovered {} running servers", servers.len());

        let changes = self.states.reconcile(&servers, Instant::now());
        if changes != Reconciled::default() {
            log::debug!(
                "server set changed: {} added, {} removed",
                changes.added,
                changes.removed
            );
        }
        self.resolver.retain(|container_id| {
            servers
                .iter()
                .any(|server| &server.container_id == container_id)
        });

        self.servers = servers;
        self.next_discovery_at = Some(deadline_after(
            Instant::now(),
            self.settings.discovery_interval,
        ));
    }

    async fn read_counters(&self) -> Result<TickReadings, Error> {
        let resolver = Arc::clone(&self.resolver);
        let proc_stat_path = self.settings.proc_stat_path.clone();
        let container_ids: Vec<ContainerID> = self
            .servers
            .iter()
            .map(|server| server.container_id.clone())
            .collect();

        let readings = tokio::task::spawn_blocking(move || {
            let before = std::time::Instant::now();
            let readings = collect_readings(&proc_stat_path, &resolver, &container_ids);
            log::trace!(
                "collecting counters for {} containers took {} microseconds",
                container_ids.len(),
                before.elapsed().as_micros()
            );
            readings
        })
        .await?;

        Ok(readings)
    }

    async fn publish_if_due(&mut self, payload: &TelemetryPayload) {
        if !self.backoff.is_due(Instant::now()) {
            log::trace!("publish skipped while backing off");
            return;
        }

        match self.publisher.publish(payload).await {
            Ok(()) => {
                self.backoff.on_success();
                log::info!("published telemetry for {} servers", payload.servers.len());
            }
            Err(err) => {
                let delay = self.backoff.on_failure(Instant::now());
                log::warn!(
                    "failed to publish telemetry, retrying in {:?}: {}",
                    delay,
                    err
                );
            }
        }
    }
}

/// Calls `tick` until `shutdown` resolves, sleeping a jittered sample interval
/// after each success and [`ERROR_PAUSE`] after each failure.
async fn tick_until<T, E>(
    mut tick: impl AsyncFnMut() -> Result<T, E>,
    sample_interval: IntervalRange,
    shutdown: impl Future<Output = ()>,
) where
    E: std::fmt::Display,
{
    tokio::pin!(shutdown);
    loop {
        let outcome = tokio::select! {
            _ = &mut shutdown => break,
            res = tick() => res,
        };
        let delay = match outcome {
            Ok(_) => sample_interval.sample(),
            Err(err) => {
                log::error!("telemetry tick failed: {}", err);
                ERROR_PAUSE
            }
        };
        log::trace!("next tick in {:?}", delay);

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

fn collect_readings(
    proc_stat_path: &Path,
    resolver: &CgroupResolver,
    container_ids: &[ContainerID],
) -> TickReadings {
    let node = ProcStatSnapshot::read(proc_stat_path)
        .ok_log_at(log::Level::Warn, "failed to read host CPU counters");

    let containers = container_ids
        .iter()
        .map(|container_id| {
            let cgroup_dir = resolver.resolve(container_id)?;
            let counters = read_counters(&cgroup_dir)?;
            Some(CounterReading {
                counters,
                taken_at: Instant::now(),
            })
        })
        .collect();

    TickReadings { node, containers }
}
