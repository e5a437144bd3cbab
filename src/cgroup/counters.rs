use std::io;
use std::path::Path;

use crate::error::ResultOkLogExt;
use crate::fsutil;

use super::stats::{BlkioServiceBytes, CpuAcctUsage, CpuStat, IoStat, KeyValueStat, SingleLineStat};

pub(crate) const CPU_STAT: &str = "cpu.stat";
pub(crate) const CPUACCT_USAGE: &str = "cpuacct.usage";
const IO_STAT: &str = "io.stat";
const BLKIO_SERVICE_BYTES: &str = "blkio.throttle.io_service_bytes";

/// Raw cumulative counters of one container at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerCounters {
    /// Cumulative CPU time in microseconds.
    pub cpu_usage_usec: u64,
    /// Cumulative bytes written to block devices.
    pub write_bytes: u64,
}

/// Reads both counters from a resolved cgroup directory.
///
/// Returns `None` unless both could be read; a half-populated reading is useless
/// for rate computation.
pub fn read_counters(cgroup_dir: &Path) -> Option<ContainerCounters> {
    Some(ContainerCounters {
        cpu_usage_usec: read_cpu_usage_usec(cgroup_dir)?,
        write_bytes: read_write_bytes(cgroup_dir)?,
    })
}

/// Cumulative CPU usage in microseconds.
///
/// Tries `cpu.stat` (`usage_usec`, then `usage_nsec`), then the v1 `cpuacct.usage`
/// nanosecond counter.
pub fn read_cpu_usage_usec(cgroup_dir: &Path) -> Option<u64> {
    read_optional(&cgroup_dir.join(CPU_STAT), CpuStat::from_reader)
        .and_then(|stat| stat.total_usage_usec())
        .or_else(|| {
            read_optional(&cgroup_dir.join(CPUACCT_USAGE), CpuAcctUsage::from_reader)
                .map(|usage| usage.usage_usec())
        })
}

/// Cumulative bytes written.
///
/// Sums `wbytes=` across `io.stat`, falling back to the `Write` rows of the v1
/// `blkio.throttle.io_service_bytes` file.
pub fn read_write_bytes(cgroup_dir: &Path) -> Option<u64> {
    read_optional(&cgroup_dir.join(IO_STAT), IoStat::from_reader)
        .and_then(|stat| stat.wbytes)
        .or_else(|| {
            read_optional(
                &cgroup_dir.join(BLKIO_SERVICE_BYTES),
                BlkioServiceBytes::from_reader,
            )
            .and_then(|stat| stat.write_bytes)
        })
}

/// Reads and parses `path`, treating absence as normal and anything else as noteworthy.
fn read_optional<T>(
    path: &Path,
    parser: impl FnOnce(&mut io::BufReader<std::fs::File>) -> io::Result<T>,
) -> Option<T> {
    match fsutil::read_with(path, parser) {
        Err(err) if err.is_not_found() => {
            log::trace!("counter file `{}` not present", path.display());
            None
        }
        res => res.ok_log_at(log::Level::Debug, "counter read"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_v2_counters() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPU_STAT, "usage_usec 5000\nuser_usec 3000\n");
        write(dir.path(), IO_STAT, "8:0 rbytes=1 wbytes=100\n8:16 wbytes=50\n");

        assert_eq!(
            read_counters(dir.path()),
            Some(ContainerCounters {
                cpu_usage_usec: 5000,
                write_bytes: 150,
            })
        );
    }

    #[test]
    fn test_v1_counters() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUACCT_USAGE, "7000000\n");
        write(
            dir.path(),
            BLKIO_SERVICE_BYTES,
            "8:0 Read 10\n8:0 Write 4096\nTotal 4106\n",
        );

        assert_eq!(read_cpu_usage_usec(dir.path()), Some(7000));
        assert_eq!(read_write_bytes(dir.path()), Some(4096));
    }

    #[test]
    fn test_unparsable_cpu_stat_falls_back_to_cpuacct() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPU_STAT, "usage_usec garbage\n");
        write(dir.path(), CPUACCT_USAGE, "2000\n");
        assert_eq!(read_cpu_usage_usec(dir.path()), Some(2));
    }

    #[test]
    fn test_io_stat_without_writes_falls_back_to_blkio() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), IO_STAT, "8:0 rbytes=100\n");
        write(dir.path(), BLKIO_SERVICE_BYTES, "8:0 write 77\n");
        assert_eq!(read_write_bytes(dir.path()), Some(77));
    }

    #[test]
    fn test_missing_counter_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPU_STAT, "usage_usec 5000\n");
        assert_eq!(read_write_bytes(dir.path()), None);
        assert_eq!(read_counters(dir.path()), None);
    }
}
