use std::path::{Path, PathBuf};

use dashmap::DashMap;
use walkdir::WalkDir;

use crate::container::ContainerID;
use crate::fsutil;

use super::counters::{CPU_STAT, CPUACCT_USAGE};

/// Default mount point of the cgroup hierarchy.
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// How far below the root the fallback search descends.
const MAX_SEARCH_DEPTH: usize = 8;

/// Files whose presence marks a directory as a usable cgroup (v2 or v1).
const CGROUP_MARKERS: [&str; 2] = [CPU_STAT, CPUACCT_USAGE];

/// Maps container ids onto their cgroup directories.
///
/// Resolved paths are cached per container id. A cached path is re-validated on
/// every lookup and dropped once its directory disappears, so a recycled or
/// removed cgroup never keeps feeding stale counters.
#[derive(Debug)]
pub struct CgroupResolver {
    root: PathBuf,
    cache: DashMap<ContainerID, PathBuf>,
}

impl CgroupResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: DashMap::default(),
        }
    }

    /// Returns the cgroup directory of `container_id`, if one can be found.
    ///
    /// Lookup order: a still-valid cache entry; the well-known layouts for the full
    /// id and then its short form; finally a bounded walk of the hierarchy.
    /// `None` means no metrics are available this tick, not a failure.
    pub fn resolve(&self, container_id: &ContainerID) -> Option<PathBuf> {
        if let Some(cached) = self.cached(container_id) {
            return Some(cached);
        }

        let resolved = container_id
            .identifiers()
            .flat_map(|identifier| self.candidate_paths(identifier))
            .find(|candidate| is_cgroup_dir(candidate))
            .or_else(|| self.search_tree(container_id));

        match &resolved {
            Some(path) => {
                log::debug!(
                    "resolved cgroup for container `{}`: {}",
                    container_id,
                    path.display()
                );
                self.cache.insert(container_id.clone(), path.clone());
            }
            None => log::debug!("no cgroup found for container `{}`", container_id),
        }

        resolved
    }

    /// Drops cache entries for containers that are no longer of interest.
    pub fn retain(&self, mut keep: impl FnMut(&ContainerID) -> bool) {
        self.cache.retain(|container_id, _| keep(container_id));
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn cached(&self, container_id: &ContainerID) -> Option<PathBuf> {
        let path = self.cache.get(container_id)?.value().clone();
        if path.is_dir() {
            return Some(path);
        }

        log::debug!(
            "cached cgroup `{}` for container `{}` is gone",
            path.display(),
            container_id
        );
        self.cache.remove(container_id);
        None
    }

    /// Well-known layouts: systemd scopes of docker and containerd under the
    /// unified hierarchy, the v1 `docker` subtree, and the id directly below the root.
    fn candidate_paths(&self, identifier: &str) -> [PathBuf; 4] {
        let system_slice = self.root.join("system.slice");
        [
            system_slice.join(format!("docker-{identifier}.scope")),
            system_slice.join(format!("containerd-{identifier}.scope")),
            self.root.join("docker").join(identifier),
            self.root.join(identifier),
        ]
    }

    fn search_tree(&self, container_id: &ContainerID) -> Option<PathBuf> {
        if !self.root.is_dir() {
            return None;
        }
        log::trace!(
            "searching `{}` for container `{}`",
            self.root.display(),
            container_id
        );

        let identifiers: Vec<&str> = container_id.identifiers().collect();
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(MAX_SEARCH_DEPTH)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy();
                identifiers.iter().any(|identifier| name.contains(identifier))
            })
            .map(|entry| entry.into_path())
            .find(|path| is_cgroup_dir(path))
    }
}

fn is_cgroup_dir(path: &Path) -> bool {
    fsutil::dir_contains_any(path, &CGROUP_MARKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_ID: &str = "4f1c2a7be90d5c3318a1e2b4c6d8f0a1b3c5d7e9f1a3b5c7d9e1f3a5b7c9d1e3";

    fn cgroup_dir(root: &Path, rel: &str, marker: &str) -> PathBuf {
        let dir = root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(marker), "0\n").unwrap();
        dir
    }

    #[test]
    fn test_resolves_v2_systemd_scope() {
        let root = tempfile::tempdir().unwrap();
        let expected = cgroup_dir(
            root.path(),
            &format!("system.slice/docker-{FULL_ID}.scope"),
            CPU_STAT,
        );

        let resolver = CgroupResolver::new(root.path());
        let id = ContainerID::new(FULL_ID).unwrap();
        assert_eq!(resolver.resolve(&id), Some(expected));
    }

    #[test]
    fn test_resolves_v1_docker_subtree() {
        let root = tempfile::tempdir().unwrap();
        let expected = cgroup_dir(root.path(), &format!("docker/{FULL_ID}"), CPUACCT_USAGE);

        let resolver = CgroupResolver::new(root.path());
        let id = ContainerID::new(FULL_ID).unwrap();
        assert_eq!(resolver.resolve(&id), Some(expected));
    }

    #[test]
    fn test_resolves_containerd_scope_by_short_id() {
        let root = tempfile::tempdir().unwrap();
        let expected = cgroup_dir(
            root.path(),
            &format!("system.slice/containerd-{}.scope", &FULL_ID[..12]),
            CPU_STAT,
        );

        let resolver = CgroupResolver::new(root.path());
        let id = ContainerID::new(FULL_ID).unwrap();
        assert_eq!(resolver.resolve(&id), Some(expected));
    }

    #[test]
    fn test_directory_without_markers_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join(format!("system.slice/docker-{FULL_ID}.scope")))
            .unwrap();
        let expected = cgroup_dir(root.path(), FULL_ID, CPU_STAT);

        let resolver = CgroupResolver::new(root.path());
        let id = ContainerID::new(FULL_ID).unwrap();
        assert_eq!(resolver.resolve(&id), Some(expected));
    }

    #[test]
    fn test_falls_back_to_tree_search() {
        let root = tempfile::tempdir().unwrap();
        let expected = cgroup_dir(
            root.path(),
            &format!("kubepods.slice/kubepods-besteffort.slice/cri-containerd-{FULL_ID}.scope"),
            CPU_STAT,
        );

        let resolver = CgroupResolver::new(root.path());
        let id = ContainerID::new(FULL_ID).unwrap();
        assert_eq!(resolver.resolve(&id), Some(expected));
    }

    #[test]
    fn test_unknown_container_resolves_to_none() {
        let root = tempfile::tempdir().unwrap();
        cgroup_dir(root.path(), "system.slice/docker-other.scope", CPU_STAT);

        let resolver = CgroupResolver::new(root.path());
        let id = ContainerID::new("deadbeef").unwrap();
        assert_eq!(resolver.resolve(&id), None);
        assert_eq!(resolver.cache_len(), 0);
    }

    #[test]
    fn test_stale_cache_entry_is_re_resolved() {
        let root = tempfile::tempdir().unwrap();
        let first = cgroup_dir(
            root.path(),
            &format!("system.slice/docker-{FULL_ID}.scope"),
            CPU_STAT,
        );
        let resolver = CgroupResolver::new(root.path());
        let id = ContainerID::new(FULL_ID).unwrap();
        assert_eq!(resolver.resolve(&id), Some(first.clone()));

        std::fs::remove_dir_all(&first).unwrap();
        let second = cgroup_dir(root.path(), &format!("docker/{FULL_ID}"), CPUACCT_USAGE);
        assert_eq!(resolver.resolve(&id), Some(second));
        assert_eq!(resolver.cache_len(), 1);
    }

    #[test]
    fn test_retain_prunes_cache() {
        let root = tempfile::tempdir().unwrap();
        cgroup_dir(root.path(), "docker/aaa", CPU_STAT);
        let resolver = CgroupResolver::new(root.path());
        let id = ContainerID::new("aaa").unwrap();
        assert!(resolver.resolve(&id).is_some());

        resolver.retain(|_| false);
        assert_eq!(resolver.cache_len(), 0);
    }
}
