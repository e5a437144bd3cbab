use std::io::BufRead;
use std::path::Path;

use crate::cgroup::stats::StatParseError;
use crate::fsutil::{self, FileReadError};

/// Default location of the host-wide CPU counters.
pub const DEFAULT_PROC_STAT_PATH: &str = "/proc/stat";

/// Minimum number of counters on the aggregate `cpu` line (user … iowait).
const MIN_CPU_FIELDS: usize = 5;
const IDLE_FIELD: usize = 3;
const IOWAIT_FIELD: usize = 4;

/// Host-wide CPU counters (in clock ticks) from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcStatSnapshot {
    /// Sum of every field on the line.
    pub total: u64,
    pub idle: u64,
    pub iowait: u64,
}

impl ProcStatSnapshot {
    /// Reads a snapshot from a `/proc/stat`-formatted file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, FileReadError> {
        fsutil::read_with(path, Self::from_reader)
    }

    /// Parses the first line starting with `cpu ` (the all-CPU aggregate).
    ///
    /// # Errors
    ///
    /// Returns an error of kind `InvalidData` if the line is missing, has fewer than
    /// five fields, or contains a non-numeric field.
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            if let Some(fields) = line.strip_prefix("cpu ") {
                return Self::parse_fields(fields, lineno);
            }
            line.clear();
        }

        Err(StatParseError::MissingField { field: "cpu" }.into())
    }

    fn parse_fields(fields: &str, lineno: usize) -> std::io::Result<Self> {
        let values = fields
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<u64>()
                    .map_err(|source| StatParseError::InvalidValue {
                        value: token.to_string(),
                        line: lineno,
                        source,
                    })
            })
            .collect::<Result<Vec<u64>, _>>()?;

        if values.len() < MIN_CPU_FIELDS {
            return Err(StatParseError::MissingField { field: "iowait" }.into());
        }

        Ok(Self {
            total: values.iter().fold(0u64, |acc, v| acc.saturating_add(*v)),
            idle: values[IDLE_FIELD],
            iowait: values[IOWAIT_FIELD],
        })
    }
}

/// Host-wide CPU utilisation over the last sampling interval, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeMetrics {
    pub cpu_pct: f64,
    pub iowait_pct: f64,
}

/// Turns consecutive `/proc/stat` snapshots into utilisation percentages.
#[derive(Debug, Default)]
pub struct NodeMetricTracker {
    previous: Option<ProcStatSnapshot>,
}

impl NodeMetricTracker {
    /// Folds in the latest snapshot and returns the utilisation since the previous one.
    ///
    /// Reports zeros when there is no baseline yet, when `current` is `None` (the
    /// baseline is kept), or when no time has passed on the counters.
    pub fn observe(&mut self, current: Option<ProcStatSnapshot>) -> NodeMetrics {
        let Some(current) = current else {
            return NodeMetrics::default();
        };
        let Some(previous) = self.previous.replace(current) else {
            return NodeMetrics::default();
        };

        let total_delta = current.total.saturating_sub(previous.total);
        if total_delta == 0 {
            return NodeMetrics::default();
        }
        let idle_delta = current.idle.saturating_sub(previous.idle);
        let iowait_delta = current.iowait.saturating_sub(previous.iowait);
        let busy_delta = total_delta
            .saturating_sub(idle_delta)
            .saturating_sub(iowait_delta);

        let total = total_delta as f64;
        NodeMetrics {
            cpu_pct: busy_delta as f64 / total * 100.0,
            iowait_pct: iowait_delta as f64 / total * 100.0,
        }
    }
}
