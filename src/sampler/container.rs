use tokio::time::Instant;

use crate::agent::ServerRuntimeState;
use crate::cgroup::ContainerCounters;

/// Container counters together with the moment they were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReading {
    pub counters: ContainerCounters,
    pub taken_at: Instant,
}

/// Per-container resource rates over the last sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerMetrics {
    /// CPU time used as a percentage of one core.
    pub cpu_pct: f64,
    pub io_write_bytes_per_s: f64,
}

/// Computes rates from `reading` against the baseline stored in `state`.
///
/// Without a reading (unresolved cgroup, unreadable counters) the result is zero
/// and `state` is left untouched. Otherwise the reading always becomes the new
/// baseline, even when no rate could be computed yet. Counters that went
/// backwards contribute a zero delta.
pub fn container_rates(
    state: &mut ServerRuntimeState,
    reading: Option<CounterReading>,
) -> ContainerMetrics {
    let Some(reading) = reading else {
        return ContainerMetrics::default();
    };
    let ContainerCounters {
        cpu_usage_usec,
        write_bytes,
    } = reading.counters;

    let mut metrics = ContainerMetrics::default();
    if let (Some(last_cpu), Some(last_write), Some(last_at)) = (
        state.last_cpu_usage_usec,
        state.last_write_bytes,
        state.last_sample_at,
    ) {
        let elapsed = reading.taken_at.saturating_duration_since(last_at).as_secs_f64();
        if elapsed > 0.0 {
            let cpu_delta = cpu_usage_usec.saturating_sub(last_cpu) as f64;
            let io_delta = write_bytes.saturating_sub(last_write) as f64;
            metrics.cpu_pct = cpu_delta / (elapsed * 1_000_000.0) * 100.0;
            metrics.io_write_bytes_per_s = io_delta / elapsed;
        }
    }

    state.last_cpu_usage_usec = Some(cpu_usage_usec);
    state.last_write_bytes = Some(write_bytes);
    state.last_sample_at = Some(reading.taken_at);

    metrics
}
