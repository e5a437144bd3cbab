//! Authenticated JSON-over-HTTP(S) transport shared by discovery and publishing.

use std::time::Duration;

use reqwest::header::ACCEPT;

pub use reqwest::{Method, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to `{url}` failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("`{url}` answered HTTP {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("`{url}` returned invalid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Thin wrapper around [`reqwest::Client`] speaking JSON in both directions.
#[derive(Debug, Clone)]
pub struct JsonClient {
    inner: reqwest::Client,
}

impl JsonClient {
    /// Builds a client whose requests all share `timeout`.
    ///
    /// With `insecure_tls` set, certificate validation is disabled; meant for
    /// host daemons serving self-signed certificates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, insecure_tls: bool) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure_tls)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Build)?;
        Ok(Self { inner })
    }

    /// Sends a body-less `GET`.
    pub async fn get(&self, url: &str, bearer_token: Option<&str>) -> Result<serde_json::Value> {
        self.request::<()>(Method::GET, url, bearer_token, None).await
    }

    /// Sends one request and parses the response body as JSON.
    ///
    /// A body is serialized with `Content-Type: application/json`. An empty
    /// response body is returned as an empty JSON object.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] on connection failures and timeouts.
    /// - [`Error::Status`] on non-2xx responses; the body is kept for logging.
    /// - [`Error::Decode`] if a 2xx body is not JSON.
    pub async fn request<B>(
        &self,
        method: Method,
        url: &str,
        bearer_token: Option<&str>,
        body: Option<&B>,
    ) -> Result<serde_json::Value>
    where
        B: serde::Serialize + ?Sized,
    {
        let mut request = self
            .inner
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let transport = |source| Error::Transport {
            url: url.to_owned(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_owned(),
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        decode_body(&bytes).map_err(|source| Error::Decode {
            url: url.to_owned(),
            source,
        })
    }
}

fn decode_body(bytes: &[u8]) -> std::result::Result<serde_json::Value, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_body_is_empty_object() {
        assert_eq!(decode_body(b"").unwrap(), json!({}));
        assert_eq!(decode_body(b" \n").unwrap(), json!({}));
    }

    #[test]
    fn test_decodes_json_body() {
        assert_eq!(decode_body(br#"[{"id":"a"}]"#).unwrap(), json!([{"id": "a"}]));
        assert!(decode_body(b"<html>").is_err());
    }

    #[test]
    fn test_status_error_message_includes_body() {
        let err = Error::Status {
            url: "https://orchestrator/x".to_owned(),
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: "bad payload".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "`https://orchestrator/x` answered HTTP 422 Unprocessable Entity: bad payload"
        );
    }

    #[test]
    fn test_client_builds() {
        assert!(JsonClient::new(Duration::from_secs(1), true).is_ok());
    }
}
