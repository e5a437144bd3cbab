//! Line-oriented parsing shared by the counter files.
//!
//! - [`KeyValueStat`]: files made of key/value pairs (`cpu.stat`, `io.stat`,
//!   `blkio.throttle.io_service_bytes`). An implementor picks a [`Layout`],
//!   how many leading columns to ignore, and which keys it cares about.
//! - [`SingleLineStat`]: files holding one value (`cpuacct.usage`).
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use node_telemetry_agent::cgroup::stats::{KeyValueStat, Layout, Setter};
//!
//! #[derive(Default)]
//! struct Pressure {
//!     total: u64,
//! }
//!
//! impl KeyValueStat for Pressure {
//!     const LAYOUT: Layout = Layout::Assignments('=');
//!     const LEADING_COLUMNS: usize = 1;
//!
//!     fn setter(key: &str) -> Option<Setter<Self>> {
//!         match key {
//!             "total" => Some(|stat, value| stat.total += value),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let stat = Pressure::from_reader(&mut "some avg10=0.00 total=10\nfull total=5\n".as_bytes()).unwrap();
//! assert_eq!(stat.total, 15);
//! ```

use std::io::BufRead;

use super::StatParseError;

/// Applies one parsed value to a stat.
pub type Setter<S> = fn(&mut S, u64);

/// Where keys and values sit on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One `key value` pair per line, as two whitespace-separated columns.
    Columns,
    /// Any number of `key<sep>value` tokens per line. Tokens without the
    /// separator are skipped.
    Assignments(char),
}

/// A counter file made of key/value pairs.
///
/// Keys without a [`setter`](KeyValueStat::setter) are ignored, so their
/// values are never parsed. A recognised key with a non-numeric value fails
/// the whole file.
pub trait KeyValueStat: Default {
    const LAYOUT: Layout;

    /// Whitespace-separated columns to skip at the start of every line, such as
    /// a `major:minor` device number.
    const LEADING_COLUMNS: usize = 0;

    /// Returns how to apply the value of `key`, or `None` to ignore it.
    fn setter(key: &str) -> Option<Setter<Self>>;

    /// Parses a whole file.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if reading fails, or a [`StatParseError`] wrapped in
    /// an `io::Error` of kind `InvalidData` if a recognised key has a value that
    /// is not a `u64`.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let mut line = String::new();
        let mut lineno = 0;

        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut apply = |key: &str, value: &str| -> Result<(), StatParseError> {
                let Some(set) = Self::setter(key) else {
                    return Ok(());
                };
                let parsed = value
                    .parse::<u64>()
                    .map_err(|source| StatParseError::InvalidKeyValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        line: lineno,
                        source,
                    })?;
                set(&mut stat, parsed);
                Ok(())
            };

            let mut tokens = line.split_whitespace().skip(Self::LEADING_COLUMNS);
            match Self::LAYOUT {
                Layout::Columns => {
                    if let (Some(key), Some(value)) = (tokens.next(), tokens.next()) {
                        apply(key, value)?;
                    }
                }
                Layout::Assignments(sep) => {
                    for (key, value) in tokens.filter_map(|token| token.split_once(sep)) {
                        apply(key, value)?;
                    }
                }
            }

            line.clear();
        }

        Ok(stat)
    }
}

/// A counter file holding a single value, such as `cpuacct.usage`.
pub trait SingleLineStat: Sized {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self>;
}
