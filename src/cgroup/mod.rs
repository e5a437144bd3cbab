//! Control-group lookup and counter reading for running containers.
//!
//! Hosts in the fleet run a mix of kernels, so both on-disk layouts are handled:
//!
//! - cgroup v2 (unified hierarchy): `cpu.stat` and `io.stat` inside a systemd
//!   scope such as `system.slice/docker-<id>.scope`.
//! - cgroup v1: `cpuacct.usage` and `blkio.throttle.io_service_bytes` inside
//!   the controller's `docker/<id>` subtree.
//!
//! # Key Components
//!
//! - [`CgroupResolver`] maps a container id onto its cgroup directory, with a
//!   validated cache and a bounded fallback search.
//! - [`read_counters`] reads the cumulative CPU and write counters from a
//!   resolved directory, whichever generation it belongs to.
//! - [`stats`] holds the per-file parsers.
//!
//! # Platform Requirements
//!
//! - Linux with the cgroup filesystem mounted (default `/sys/fs/cgroup`).
mod counters;
mod resolver;
pub mod stats;

pub use counters::{ContainerCounters, read_counters, read_cpu_usage_usec, read_write_bytes};
pub use resolver::{CgroupResolver, DEFAULT_CGROUP_ROOT};
