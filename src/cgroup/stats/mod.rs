//! Parsers for the cumulative counters exposed by cgroup v1 and v2.
//!
//! Each file format gets its own small struct holding only the counters the
//! agent reads; [`KeyValueStat`] and [`SingleLineStat`] do the line handling.
//!
//! | file | generation | type |
//! |---|---|---|
//! | `cpu.stat` | v2 (and some v1 kernels) | [`CpuStat`] |
//! | `cpuacct.usage` | v1 | [`CpuAcctUsage`] |
//! | `io.stat` | v2 | [`IoStat`] |
//! | `blkio.throttle.io_service_bytes` | v1 | [`BlkioServiceBytes`] |

mod cpu;
pub(crate) mod error;
mod io;
mod parser;

pub use cpu::{CpuAcctUsage, CpuStat};
pub use error::StatParseError;
pub use io::{BlkioServiceBytes, IoStat};
pub use parser::{KeyValueStat, Layout, Setter, SingleLineStat};
