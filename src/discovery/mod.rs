//! Discovery of the game servers currently running on this host.
mod extract;

use std::future::Future;

pub use extract::extract_servers;

use crate::container::ContainerID;
use crate::http::{self, JsonClient};

/// Paths tried in order on the host-management API; the first one that answers wins.
pub const CANDIDATE_ENDPOINTS: [&str; 4] = [
    "/api/servers",
    "/api/system/servers",
    "/api/application/servers",
    "/api/servers/list",
];

/// A running game server and where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredServer {
    pub server_id: String,
    pub container_id: ContainerID,
    pub allocated_port: u16,
}

/// Produces the current list of running servers.
///
/// Implementations are best-effort: failures are logged and reported as an
/// empty list, never as an error.
pub trait ServerSource {
    fn discover(&self) -> impl Future<Output = Vec<DiscoveredServer>>;
}

/// Discovers servers through the local host-management (Wings) HTTP API.
#[derive(Debug, Clone)]
pub struct HostApiDiscoverer {
    client: JsonClient,
    base_url: String,
    token: Option<String>,
}

impl HostApiDiscoverer {
    pub fn new(client: JsonClient, base_url: impl Into<String>, token: Option<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client,
            base_url,
            token,
        }
    }

    /// Fetches the first payload any candidate endpoint serves.
    ///
    /// Transport and HTTP status failures move on to the next endpoint. A body
    /// that is not JSON still ends the search: the endpoint exists, its answer
    /// is just unusable.
    ///
    /// When every endpoint fails, the error of the last one is returned.
    async fn fetch(&self) -> http::Result<serde_json::Value> {
        let [earlier @ .., last] = CANDIDATE_ENDPOINTS;
        for endpoint in earlier {
            match self.get(endpoint).await {
                Err(err @ http::Error::Decode { .. }) => return Err(err),
                Err(err) => log::trace!("discovery endpoint {} unavailable: {}", endpoint, err),
                ok => return ok,
            }
        }
        self.get(last).await
    }

    async fn get(&self, endpoint: &str) -> http::Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let payload = self.client.get(&url, self.token.as_deref()).await?;
        log::trace!("discovery payload served by {}", url);
        Ok(payload)
    }
}

impl ServerSource for HostApiDiscoverer {
    async fn discover(&self) -> Vec<DiscoveredServer> {
        match self.fetch().await {
            Ok(payload) => extract_servers(&payload),
            Err(err) => {
                log::warn!("server discovery failed: {}", err);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves one canned HTTP response per entry of `responses`, recording request lines.
    async fn host_api(
        responses: Vec<(&'static str, &'static str)>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).into_owned();
                requests.push(request);

                let reply = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });
        (base_url, handle)
    }

    fn client() -> JsonClient {
        JsonClient::new(Duration::from_secs(2), false).unwrap()
    }

    #[tokio::test]
    async fn test_falls_through_to_first_working_endpoint() {
        let (base_url, server) = host_api(vec![
            ("404 Not Found", r#"{"error":"not found"}"#),
            (
                "200 OK",
                r#"{"data":[{"uuid":"abc","container_id":"deadbeef","port":25565,"status":"running"}]}"#,
            ),
        ])
        .await;

        let discoverer = HostApiDiscoverer::new(client(), base_url, Some("secret".to_owned()));
        let servers = discoverer.discover().await;
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].server_id, "abc");
        assert_eq!(servers[0].allocated_port, 25565);

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /api/servers HTTP/1.1"));
        assert!(requests[1].starts_with("GET /api/system/servers HTTP/1.1"));
        assert!(
            requests[1]
                .to_ascii_lowercase()
                .contains("authorization: bearer secret")
        );
    }

    #[tokio::test]
    async fn test_invalid_json_ends_discovery() {
        let (base_url, server) = host_api(vec![("200 OK", "<html>")]).await;

        let discoverer = HostApiDiscoverer::new(client(), base_url, None);
        assert!(discoverer.discover().await.is_empty());

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].to_ascii_lowercase().contains("authorization"));
    }

    #[tokio::test]
    async fn test_all_endpoints_failing_yields_empty_list() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let discoverer = HostApiDiscoverer::new(client(), base_url, None);
        assert!(discoverer.discover().await.is_empty());
    }
}
