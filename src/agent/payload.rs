use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::sampler::{ContainerMetrics, NodeMetrics};

/// The report sent to the orchestrator after every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryPayload {
    pub node_id: String,
    /// RFC 3339 UTC timestamp with microseconds and a `+00:00` offset.
    pub timestamp: String,
    pub node: NodeReport,
    pub servers: Vec<ServerReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeReport {
    pub cpu_pct: f64,
    pub iowait_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerReport {
    pub server_id: String,
    pub players_online: Option<u32>,
    pub cpu_pct: f64,
    pub io_write_bytes_per_s: f64,
}

impl TelemetryPayload {
    pub fn new(
        node_id: impl Into<String>,
        taken_at: DateTime<Utc>,
        node: NodeReport,
        servers: Vec<ServerReport>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            timestamp: taken_at.to_rfc3339_opts(SecondsFormat::Micros, false),
            node,
            servers,
        }
    }
}

impl From<NodeMetrics> for NodeReport {
    fn from(metrics: NodeMetrics) -> Self {
        Self {
            cpu_pct: round3(metrics.cpu_pct),
            iowait_pct: round3(metrics.iowait_pct),
        }
    }
}

impl ServerReport {
    pub fn new(
        server_id: impl Into<String>,
        players_online: Option<u32>,
        metrics: ContainerMetrics,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            players_online,
            cpu_pct: round3(metrics.cpu_pct),
            io_write_bytes_per_s: round3(metrics.io_write_bytes_per_s),
        }
    }
}

/// Rounds to three decimal places.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialized_shape() {
        let taken_at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 30, 5).unwrap();
        let payload = TelemetryPayload::new(
            "node-1",
            taken_at,
            NodeMetrics {
                cpu_pct: 12.34567,
                iowait_pct: 0.0004,
            }
            .into(),
            vec![
                ServerReport::new(
                    "abc",
                    Some(3),
                    ContainerMetrics {
                        cpu_pct: 50.0,
                        io_write_bytes_per_s: 2048.12345,
                    },
                ),
                ServerReport::new("def", None, ContainerMetrics::default()),
            ],
        );

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "node_id": "node-1",
                "timestamp": "2026-10-19T12:30:05.000000+00:00",
                "node": {"cpu_pct": 12.346, "iowait_pct": 0.0},
                "servers": [
                    {"server_id": "abc", "players_online": 3, "cpu_pct": 50.0, "io_write_bytes_per_s": 2048.123},
                    {"server_id": "def", "players_online": null, "cpu_pct": 0.0, "io_write_bytes_per_s": 0.0},
                ],
            })
        );
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.23449), 1.234);
        assert_eq!(round3(99.9996), 100.0);
        assert_eq!(round3(0.0), 0.0);
    }
}
