#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("timed out after {timeout:?} while {stage}")]
    Timeout {
        stage: &'static str,
        timeout: std::time::Duration,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("varint exceeds 5 bytes")]
    VarintTooLong,
    #[error("varint does not fit in 32 bits")]
    VarintOverflow,
    #[error("unexpected packet id {0:#04x}")]
    UnexpectedPacketId(u32),
    #[error("status payload of {0} bytes exceeds limit")]
    PayloadTooLarge(u32),
    #[error("invalid status JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("status JSON has no non-negative `players.online`")]
    MissingPlayerCount,
}

pub type Result<T> = std::result::Result<T, Error>;
