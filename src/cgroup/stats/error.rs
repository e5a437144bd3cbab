use std::num::ParseIntError;

/// Malformed content in a counter file.
///
/// Converts into an [`std::io::Error`] of kind `InvalidData`, so parsers keep the
/// `io::Result` signature of the readers they wrap.
#[derive(Debug, thiserror::Error)]
pub enum StatParseError {
    #[error("line {line}: `{key}` has non-numeric value `{value}`: {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("line {line}: non-numeric value `{value}`: {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("missing field `{field}`")]
    MissingField { field: &'static str },
}

impl From<StatParseError> for std::io::Error {
    fn from(err: StatParseError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}

/// Digs the [`StatParseError`] out of an `io::Error` produced by a parser.
#[cfg(test)]
pub(crate) fn extract_stat_parse_error(err: &std::io::Error) -> &StatParseError {
    err.get_ref()
        .and_then(|e| e.downcast_ref::<StatParseError>())
        .unwrap()
}
