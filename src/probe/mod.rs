//! Player-count probe speaking the game server's status-ping protocol.
//!
//! One probe is a short-lived TCP exchange:
//!
//! 1. client sends a handshake (next state = status) and an empty status request,
//! 2. server answers with `varint(len) varint(0x00) varint(json_len) json`,
//! 3. `players.online` is taken from the JSON document.
//!
//! Connect and every read/write share one configured timeout. Failures never
//! escape [`PlayerCountProbe::players_online`]: they are logged and reported as
//! "no data".
mod error;
pub mod packet;
pub mod varint;

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub use error::{Error, Result};

use varint::read_varint;

/// Upper bound for the status JSON document; anything larger is treated as garbage.
pub const MAX_STATUS_JSON_LEN: u32 = 2 * 1024 * 1024;

/// Source of live player counts, keyed by a server's allocated game port.
pub trait PlayerCountProbe {
    /// Returns the current player count, or `None` if it could not be determined.
    fn players_online(&self, port: u16) -> impl Future<Output = Option<u32>>;
}

/// Status-ping client targeting one host.
#[derive(Debug, Clone)]
pub struct StatusPingProbe {
    host: String,
    timeout: Duration,
}

impl StatusPingProbe {
    /// Creates a probe for game servers reachable at `host`.
    ///
    /// `host` is also the server address announced in the handshake.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            timeout,
        }
    }

    /// Runs one status ping against `port`.
    ///
    /// # Errors
    ///
    /// Any timeout, connection or protocol failure; see [`Error`].
    pub async fn query(&self, port: u16) -> Result<u32> {
        let mut stream = self
            .timed("connecting", TcpStream::connect((self.host.as_str(), port)))
            .await?;

        self.timed(
            "sending handshake",
            stream.write_all(&packet::handshake(&self.host, port)),
        )
        .await?;
        self.timed(
            "sending status request",
            stream.write_all(&packet::status_request()),
        )
        .await?;

        let _packet_len = self
            .timed("reading packet length", read_varint(&mut stream))
            .await?;
        let packet_id = self
            .timed("reading packet id", read_varint(&mut stream))
            .await?;
        if packet_id != packet::STATUS_RESPONSE_PACKET_ID {
            return Err(Error::UnexpectedPacketId(packet_id));
        }

        let json_len = self
            .timed("reading payload length", read_varint(&mut stream))
            .await?;
        if json_len > MAX_STATUS_JSON_LEN {
            return Err(Error::PayloadTooLarge(json_len));
        }
        let mut body = vec![0u8; json_len as usize];
        self.timed("reading payload", stream.read_exact(&mut body))
            .await?;

        parse_players_online(&body)
    }

    async fn timed<T, E>(
        &self,
        stage: &'static str,
        fut: impl Future<Output = std::result::Result<T, E>>,
    ) -> Result<T>
    where
        E: Into<Error>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(Into::into),
            Err(_) => Err(Error::Timeout {
                stage,
                timeout: self.timeout,
            }),
        }
    }
}

impl PlayerCountProbe for StatusPingProbe {
    async fn players_online(&self, port: u16) -> Option<u32> {
        match self.query(port).await {
            Ok(players) => {
                log::trace!("{}:{} reports {} players online", self.host, port, players);
                Some(players)
            }
            Err(err) => {
                log::debug!("status ping to {}:{} failed: {}", self.host, port, err);
                None
            }
        }
    }
}

/// Extracts `players.online` from a status JSON document.
pub fn parse_players_online(body: &[u8]) -> Result<u32> {
    let status: serde_json::Value = serde_json::from_slice(body)?;
    status
        .get("players")
        .and_then(|players| players.get("online"))
        .and_then(serde_json::Value::as_u64)
        .and_then(|online| u32::try_from(online).ok())
        .ok_or(Error::MissingPlayerCount)
}
