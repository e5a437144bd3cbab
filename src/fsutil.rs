use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening or parsing a pseudo-file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file `{path}`: {source}")]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FileReadError {
    /// Returns `true` if the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileReadError`] if the file cannot be opened.
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileReadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Opens `path` and hands the buffered reader to `parser`.
///
/// Both open and parse failures are reported with the offending path attached,
/// so callers can log a single line per failed read.
///
/// # Example
/// ```no_run
/// # use node_telemetry_agent::fsutil;
/// use node_telemetry_agent::cgroup::stats::{CpuStat, KeyValueStat};
///
/// let stat = fsutil::read_with("/sys/fs/cgroup/cpu.stat", CpuStat::from_reader)?;
/// # Ok::<(), fsutil::FileReadError>(())
/// ```
pub fn read_with<T>(
    path: impl AsRef<Path>,
    parser: impl FnOnce(&mut BufReader<File>) -> io::Result<T>,
) -> Result<T, FileReadError> {
    let path = path.as_ref();
    let mut reader = open_file_reader(path)?;
    parser(&mut reader).map_err(|source| FileReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns `true` if `dir` is a directory containing at least one of `names`.
pub fn dir_contains_any(dir: &Path, names: &[&str]) -> bool {
    dir.is_dir() && names.iter().any(|name| dir.join(name).exists())
}

#[cfg(test)]
mod tests {
    use std::io::BufRead;

    use super::*;

    #[test]
    fn test_open_file_reader_success() {
        let tmp = tempfile::NamedTempFile::new().expect("failed to create temp file");
        let path = tmp.path();
        let reader = open_file_reader(path).expect("should open test file");
        let metadata = reader.get_ref().metadata().unwrap();
        assert!(metadata.is_file());
    }

    #[test]
    fn test_open_file_reader_error() {
        let result = open_file_reader("/definitely/does/not/exist");
        let err = result.unwrap_err();
        assert_eq!(err.path, PathBuf::from("/definitely/does/not/exist"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_with_attaches_path_to_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");
        std::fs::write(&path, "abc\n").unwrap();

        let err = read_with(&path, |r| {
            let mut line = String::new();
            r.read_line(&mut line)?;
            line.trim()
                .parse::<u64>()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        })
        .unwrap_err();

        assert_eq!(err.path, path);
        assert_eq!(err.source.kind(), io::ErrorKind::InvalidData);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_dir_contains_any() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!dir_contains_any(dir.path(), &["cpu.stat"]));
        std::fs::write(dir.path().join("cpuacct.usage"), "1\n").unwrap();
        assert!(dir_contains_any(dir.path(), &["cpu.stat", "cpuacct.usage"]));
        assert!(!dir_contains_any(&dir.path().join("missing"), &["cpuacct.usage"]));
    }
}
