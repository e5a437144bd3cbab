//! Cumulative block-I/O write counters for both cgroup generations.
//!
//! - `io.stat` (v2): one line per device, `key=value` pairs after the device
//!   number. Every `wbytes=` field is summed.
//! - `blkio.throttle.io_service_bytes` (v1): `<major:minor> <Op> <bytes>` lines.
//!   The byte column of every `Write` line is summed; the operation name is
//!   matched case-insensitively and the trailing `Total` line is ignored.
//!
//! Both report `None` for the write total when the file carried no write
//! field at all, which lets callers distinguish "zero bytes written" from
//! "this file does not track writes".
//!
//! # Example
//!
//! ```rust
//! use node_telemetry_agent::cgroup::stats::{BlkioServiceBytes, IoStat, KeyValueStat};
//!
//! let v2 = "8:0 rbytes=1024 wbytes=2048 rios=12 wios=24\n254:0 wbytes=2048\n";
//! assert_eq!(IoStat::from_reader(&mut v2.as_bytes()).unwrap().wbytes, Some(4096));
//!
//! let v1 = "8:0 Read 100\n8:0 Write 300\n8:16 Write 200\nTotal 600\n";
//! assert_eq!(BlkioServiceBytes::from_reader(&mut v1.as_bytes()).unwrap().write_bytes, Some(500));
//! ```

use super::{KeyValueStat, Layout, Setter};

/// Aggregated counters from a cgroup v2 `io.stat` file, summed across devices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IoStat {
    /// Total bytes written across all devices.
    pub wbytes: Option<u64>,
}

impl IoStat {
    fn add_wbytes(&mut self, wbytes: u64) {
        self.wbytes = Some(self.wbytes.unwrap_or(0).saturating_add(wbytes));
    }
}

impl KeyValueStat for IoStat {
    const LAYOUT: Layout = Layout::Assignments('=');
    const LEADING_COLUMNS: usize = 1;

    fn setter(key: &str) -> Option<Setter<Self>> {
        match key {
            "wbytes" => Some(Self::add_wbytes),
            _ => None,
        }
    }
}

/// Aggregated write bytes from a cgroup v1 `blkio.throttle.io_service_bytes` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlkioServiceBytes {
    pub write_bytes: Option<u64>,
}

impl KeyValueStat for BlkioServiceBytes {
    const LAYOUT: Layout = Layout::Columns;
    const LEADING_COLUMNS: usize = 1;

    fn setter(op: &str) -> Option<Setter<Self>> {
        if !op.eq_ignore_ascii_case("write") {
            return None;
        }
        Some(|stat, bytes| {
            stat.write_bytes = Some(stat.write_bytes.unwrap_or(0).saturating_add(bytes));
        })
    }
}
