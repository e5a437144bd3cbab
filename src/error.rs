/// Turns a `Result` into an `Option`, logging the error instead of propagating it.
///
/// Used at the best-effort boundaries of the agent (counter readers, discovery,
/// probes) where a failure degrades one tick's data but must never stop the loop.
pub trait ResultOkLogExt<T, E> {
    /// Logs the error at `level`, prefixed with `context`, and discards it.
    fn ok_log_at(self, level: log::Level, context: &str) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log_at(self, level: log::Level, context: &str) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::log!(level, "{context}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_log_at_keeps_value() {
        let res: Result<u32, std::io::Error> = Ok(7);
        assert_eq!(res.ok_log_at(log::Level::Warn, "reading counter"), Some(7));
    }

    #[test]
    fn test_ok_log_at_discards_error() {
        let res: Result<u32, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(res.ok_log_at(log::Level::Debug, "reading counter"), None);
    }
}
