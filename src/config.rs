//! Agent settings read from the process environment at startup.
//!
//! Every problem found here is fatal: the agent refuses to start rather than
//! run with a half-understood configuration.

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;

use crate::cgroup::DEFAULT_CGROUP_ROOT;
use crate::sampler::DEFAULT_PROC_STAT_PATH;

const DEFAULT_WINGS_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{0}` is required")]
    Missing(&'static str),
    #[error("environment variable `{key}` has invalid value `{value}`: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("`{min_key}`/`{max_key}` must satisfy 0 < min <= max (got {min:?}..={max:?})")]
    InvalidRange {
        min_key: &'static str,
        max_key: &'static str,
        min: Duration,
        max: Duration,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A closed range of durations to draw jittered delays from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRange {
    pub min: Duration,
    pub max: Duration,
}

impl IntervalRange {
    /// Draws a delay uniformly from `min..=max`.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node_id: String,
    pub node_token: String,
    /// Address the node's game servers listen on; used for status pings.
    pub node_ip: String,
    pub orchestrator_base_url: String,
    pub wings_base_url: String,
    pub wings_token: Option<String>,
    pub http_timeout: Duration,
    pub insecure_tls: bool,
    pub sample_interval: IntervalRange,
    pub players_interval: IntervalRange,
    pub discovery_interval: Duration,
    pub send_backoff_max: Duration,
    pub ping_timeout: Duration,
    pub cgroup_root: PathBuf,
    pub proc_stat_path: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a key to its raw value.
    ///
    /// # Errors
    ///
    /// - [`Error::Missing`] if a required value is absent or blank.
    /// - [`Error::Invalid`] if a value does not parse.
    /// - [`Error::InvalidRange`] if an interval pair is empty or inverted.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let sample_interval = env.interval_range(
            "AGENT_SAMPLE_INTERVAL_MIN_SEC",
            5.0,
            "AGENT_SAMPLE_INTERVAL_MAX_SEC",
            10.0,
        )?;
        let players_interval = env.interval_range(
            "AGENT_PLAYERS_INTERVAL_MIN_SEC",
            20.0,
            "AGENT_PLAYERS_INTERVAL_MAX_SEC",
            30.0,
        )?;

        Ok(Self {
            node_id: env.required("NODE_ID")?,
            node_token: env.required("NODE_TOKEN")?,
            node_ip: env.required("NODE_IP")?,
            orchestrator_base_url: trim_trailing_slashes(env.required("ORCHESTRATOR_BASE_URL")?),
            wings_base_url: trim_trailing_slashes(
                env.optional("WINGS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_WINGS_BASE_URL.to_owned()),
            ),
            wings_token: env.optional("WINGS_TOKEN"),
            http_timeout: env.positive_secs("AGENT_HTTP_TIMEOUT_SEC", 5.0)?,
            insecure_tls: env.bool("AGENT_INSECURE_TLS", false)?,
            sample_interval,
            players_interval,
            discovery_interval: env.positive_secs("AGENT_DISCOVERY_INTERVAL_SEC", 15.0)?,
            send_backoff_max: env.positive_secs("AGENT_SEND_BACKOFF_MAX_SEC", 60.0)?,
            ping_timeout: env.positive_secs("AGENT_MINECRAFT_PING_TIMEOUT_SEC", 3.0)?,
            cgroup_root: env
                .optional("AGENT_CGROUP_ROOT")
                .map_or_else(|| PathBuf::from(DEFAULT_CGROUP_ROOT), PathBuf::from),
            proc_stat_path: env
                .optional("AGENT_PROC_STAT_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_PROC_STAT_PATH), PathBuf::from),
        })
    }
}

fn trim_trailing_slashes(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Returns the trimmed value, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        let value = (self.0)(key)?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_owned())
    }

    fn required(&self, key: &'static str) -> Result<String> {
        self.optional(key).ok_or(Error::Missing(key))
    }

    fn secs(&self, key: &'static str, default: f64) -> Result<Duration> {
        let Some(raw) = self.optional(key) else {
            return Ok(Duration::from_secs_f64(default));
        };
        let invalid = || Error::Invalid {
            key,
            value: raw.clone(),
            expected: "a non-negative number of seconds",
        };
        let secs = raw.parse::<f64>().map_err(|_| invalid())?;
        Duration::try_from_secs_f64(secs).map_err(|_| invalid())
    }

    fn positive_secs(&self, key: &'static str, default: f64) -> Result<Duration> {
        let value = self.secs(key, default)?;
        if value.is_zero() {
            return Err(Error::Invalid {
                key,
                value: format!("{value:?}"),
                expected: "a positive number of seconds",
            });
        }
        Ok(value)
    }

    fn interval_range(
        &self,
        min_key: &'static str,
        min_default: f64,
        max_key: &'static str,
        max_default: f64,
    ) -> Result<IntervalRange> {
        let min = self.secs(min_key, min_default)?;
        let max = self.secs(max_key, max_default)?;
        if min.is_zero() || max < min {
            return Err(Error::InvalidRange {
                min_key,
                max_key,
                min,
                max,
            });
        }
        Ok(IntervalRange { min, max })
    }

    fn bool(&self, key: &'static str, default: bool) -> Result<bool> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(Error::Invalid {
                key,
                value: raw,
                expected: "one of 1/true/yes/on or 0/false/no/off",
            }),
        }
    }
}
