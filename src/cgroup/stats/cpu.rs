//! CPU usage counters for both cgroup generations.
//!
//! - `cpu.stat` (v2, and v1 `cpu` controllers on newer kernels): key/value lines.
//!   Only the cumulative usage keys are tracked; `usage_usec` is preferred and
//!   `usage_nsec` is accepted where a kernel reports nanoseconds instead.
//! - `cpuacct.usage` (v1): one cumulative value in nanoseconds.
//!
//! # Examples
//!
//! ```rust
//! use node_telemetry_agent::cgroup::stats::{CpuAcctUsage, CpuStat, KeyValueStat, SingleLineStat};
//!
//! let stat = CpuStat::from_reader(&mut "usage_usec 1500\nuser_usec 1000\n".as_bytes()).unwrap();
//! assert_eq!(stat.total_usage_usec(), Some(1500));
//!
//! let usage = CpuAcctUsage::from_reader(&mut "2500000\n".as_bytes()).unwrap();
//! assert_eq!(usage.usage_usec(), 2500);
//! ```

use std::io::BufRead;

use super::{KeyValueStat, Layout, Setter, SingleLineStat, StatParseError};

/// Cumulative usage counters parsed from a `cpu.stat` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuStat {
    /// Total CPU time (user + system) in microseconds.
    pub usage_usec: Option<u64>,
    /// Total CPU time in nanoseconds, reported by some kernels instead of `usage_usec`.
    pub usage_nsec: Option<u64>,
}

impl CpuStat {
    /// Cumulative usage in microseconds, preferring the native microsecond counter.
    pub fn total_usage_usec(&self) -> Option<u64> {
        self.usage_usec.or(self.usage_nsec.map(|nsec| nsec / 1000))
    }
}

impl KeyValueStat for CpuStat {
    const LAYOUT: Layout = Layout::Columns;

    fn setter(key: &str) -> Option<Setter<Self>> {
        match key {
            "usage_usec" => Some(|stat, usec| stat.usage_usec = Some(usec)),
            "usage_nsec" => Some(|stat, nsec| stat.usage_nsec = Some(nsec)),
            _ => None,
        }
    }
}

/// Cumulative CPU time from a cgroup v1 `cpuacct.usage` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuAcctUsage {
    /// Total CPU time in nanoseconds.
    pub usage_nsec: u64,
}

impl CpuAcctUsage {
    pub fn usage_usec(&self) -> u64 {
        self.usage_nsec / 1000
    }
}

impl SingleLineStat for CpuAcctUsage {
    /// Parses the single nanosecond counter of `cpuacct.usage`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `InvalidData` if the value is not a `u64`.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut line = String::new();
        buf.read_line(&mut line)?;
        let line = line.trim();
        let usage_nsec = line
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidValue {
                value: line.to_string(),
                line: 1,
                source,
            })?;

        Ok(CpuAcctUsage { usage_nsec })
    }
}
