//! Rate computation from monotonic counters.
//!
//! Counters only ever grow while their owner lives; a decrease means the
//! process or cgroup was reset, and the affected delta is clamped to zero.
mod container;
mod node;

pub use container::{ContainerMetrics, CounterReading, container_rates};
pub use node::{DEFAULT_PROC_STAT_PATH, NodeMetricTracker, NodeMetrics, ProcStatSnapshot};
