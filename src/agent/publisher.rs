use std::future::Future;

use crate::http::{self, JsonClient, Method};

use super::TelemetryPayload;

/// Destination of telemetry reports.
pub trait TelemetryPublisher {
    fn publish(&self, payload: &TelemetryPayload) -> impl Future<Output = http::Result<()>>;
}

/// Posts reports to `{orchestrator}/internal/nodes/{node_id}/telemetry`.
#[derive(Debug, Clone)]
pub struct OrchestratorPublisher {
    client: JsonClient,
    url: String,
    token: String,
}

impl OrchestratorPublisher {
    pub fn new(
        client: JsonClient,
        orchestrator_base_url: &str,
        node_id: &str,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: telemetry_url(orchestrator_base_url, node_id),
            token: token.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TelemetryPublisher for OrchestratorPublisher {
    async fn publish(&self, payload: &TelemetryPayload) -> http::Result<()> {
        self.client
            .request(Method::POST, &self.url, Some(self.token.as_str()), Some(payload))
            .await?;
        Ok(())
    }
}

fn telemetry_url(base_url: &str, node_id: &str) -> String {
    format!(
        "{}/internal/nodes/{}/telemetry",
        base_url.trim_end_matches('/'),
        urlencoding::encode(node_id)
    )
}
