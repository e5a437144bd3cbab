use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// Length of the abbreviated container id used by docker in names and cgroup paths.
pub const SHORT_ID_LEN: usize = 12;

/// Scheme prefix some host APIs put in front of docker container ids.
const DOCKER_SCHEME: &str = "docker://";

/// A validated, normalized container identifier.
///
/// Surrounding whitespace and a leading `docker://` scheme are stripped on
/// construction, so two spellings of the same container compare equal.
///
/// # Examples
///
/// ```
/// # use node_telemetry_agent::container::ContainerID;
/// let id = ContainerID::new(" docker://deadbeef ").unwrap();
/// assert_eq!(id.as_ref(), "deadbeef");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyContainerID`] if nothing is left after normalization and
    /// [`Error::InvalidContainerID`] if the id exceeds [`CONTAINER_ID_MAX_LEN`] or
    /// contains a path separator.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let raw = src.as_ref();
        let trimmed = raw.trim();
        let normalized = trimmed.strip_prefix(DOCKER_SCHEME).unwrap_or(trimmed);
        if normalized.is_empty() {
            return Err(Error::EmptyContainerID(raw.to_owned()));
        }
        if normalized.len() > CONTAINER_ID_MAX_LEN || normalized.contains('/') {
            return Err(Error::InvalidContainerID(raw.to_owned()));
        }

        Ok(Self(normalized.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12-character short form, if the id is long enough to have one.
    pub fn short(&self) -> Option<&str> {
        if self.0.len() < SHORT_ID_LEN {
            return None;
        }
        self.0.get(..SHORT_ID_LEN)
    }

    /// Returns the identifiers worth looking for on disk: the full id, then its short form.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.as_str()).chain(self.short())
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
