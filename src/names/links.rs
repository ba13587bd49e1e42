use std::path::PathBuf;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{Error, Result};
use crate::fsutil;

/// Cache of interface names keyed by interface index.
///
/// Names are resolved from a sysfs-style directory holding one entry per
/// interface, each with an `ifindex` attribute file. Lookups that miss the
/// cache rescan the directory and remember every interface found. An index
/// that cannot be resolved is not looked up again for [`MISS_TTL`].
#[derive(Debug)]
pub struct LinkNames {
    sysfs_net: PathBuf,
    names: DashMap<u32, String>,
    misses: DashMap<u32, Instant>,
    miss_ttl: Duration,
}

/// How long an unresolved interface index is remembered before rescanning.
pub const MISS_TTL: Duration = Duration::from_secs(30);

impl LinkNames {
    pub fn new(sysfs_net: impl Into<PathBuf>) -> Self {
        Self::with_miss_ttl(sysfs_net, MISS_TTL)
    }

    pub fn with_miss_ttl(sysfs_net: impl Into<PathBuf>, miss_ttl: Duration) -> Self {
        Self {
            sysfs_net: sysfs_net.into(),
            names: DashMap::new(),
            misses: DashMap::new(),
            miss_ttl,
        }
    }

    /// Returns the name of the interface with index `ifindex`.
    ///
    /// Falls back to the decimal index if no such interface can be found.
    pub fn name(&self, ifindex: u32) -> String {
        self.lookup(ifindex)
            .unwrap_or_else(|| ifindex.to_string())
    }

    /// Returns the name of the interface with index `ifindex`, if it can be resolved.
    pub fn lookup(&self, ifindex: u32) -> Option<String> {
        if let Some(name) = self.names.get(&ifindex) {
            return Some(name.value().clone());
        }
        if let Some(missed) = self.misses.get(&ifindex) {
            if missed.elapsed() < self.miss_ttl {
                return None;
            }
        }

        let found = match self.rescan(ifindex) {
            Ok(found) => {
                if found.is_none() {
                    log::debug!("Failed to get interface name for ifindex:{ifindex}");
                }
                found
            }
            Err(err) => {
                log::debug!("Failed to get interface name for ifindex:{ifindex}: {err}");
                None
            }
        };
        match found {
            Some(_) => {
                self.misses.remove(&ifindex);
            }
            None => {
                self.misses.insert(ifindex, Instant::now());
            }
        }
        found
    }

    /// Number of cached interface names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn rescan(&self, wanted: u32) -> Result<Option<String>> {
        let entries = std::fs::read_dir(&self.sysfs_net).map_err(|source| Error::ListInterfaces {
            path: self.sysfs_net.clone(),
            source,
        })?;

        let mut found = None;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::trace!("skipping unreadable interface entry: {err}");
                    continue;
                }
            };
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let ifindex = match fsutil::read_trimmed(entry.path().join("ifindex")) {
                Ok(ifindex) => ifindex,
                Err(err) => {
                    log::trace!("skipping interface {name}: {err}");
                    continue;
                }
            };
            let Ok(ifindex) = ifindex.parse::<u32>() else {
                log::trace!("skipping interface {name}: invalid ifindex `{ifindex}`");
                continue;
            };

            if ifindex == wanted {
                found = Some(name.clone());
            }
            if self.names.insert(ifindex, name.clone()).is_none() {
                log::debug!("Adding link {name:?} to cache");
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn add_link(root: &Path, name: &str, ifindex: &str) {
        let dir = root.join(name);
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("ifindex"), format!("{ifindex}\n")).unwrap();
    }

    #[test]
    fn test_resolves_and_caches_names() {
        let dir = tempfile::tempdir().unwrap();
        add_link(dir.path(), "lo", "1");
        add_link(dir.path(), "eth0", "2");

        let links = LinkNames::new(dir.path());
        assert!(links.is_empty());
        assert_eq!(links.name(2), "eth0");
        assert_eq!(links.len(), 2);

        // Cached names survive the interface disappearing.
        std::fs::remove_dir_all(dir.path().join("eth0")).unwrap();
        assert_eq!(links.name(2), "eth0");
        assert_eq!(links.lookup(1).as_deref(), Some("lo"));
    }

    #[test]
    fn test_unknown_index_falls_back_to_number() {
        let dir = tempfile::tempdir().unwrap();
        add_link(dir.path(), "eth0", "2");

        let links = LinkNames::new(dir.path());
        assert_eq!(links.lookup(7), None);
        assert_eq!(links.name(7), "7");
    }

    #[test]
    fn test_new_interfaces_are_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let links = LinkNames::with_miss_ttl(dir.path(), Duration::ZERO);
        assert_eq!(links.name(5), "5");

        add_link(dir.path(), "wg0", "5");
        assert_eq!(links.name(5), "wg0");
    }

    #[test]
    fn test_misses_are_not_rescanned_until_they_expire() {
        let dir = tempfile::tempdir().unwrap();
        let links = LinkNames::new(dir.path());
        assert_eq!(links.lookup(5), None);

        // Still inside the miss window, so the directory is not read again.
        add_link(dir.path(), "wg0", "5");
        assert_eq!(links.lookup(5), None);
        assert!(links.is_empty());

        let links = LinkNames::with_miss_ttl(dir.path(), Duration::from_millis(20));
        std::fs::remove_dir_all(dir.path().join("wg0")).unwrap();
        assert_eq!(links.lookup(5), None);
        add_link(dir.path(), "wg0", "5");
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(links.lookup(5).as_deref(), Some("wg0"));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        add_link(dir.path(), "bogus", "not-a-number");
        std::fs::create_dir(dir.path().join("noattr")).unwrap();
        add_link(dir.path(), "br0", "4");

        let links = LinkNames::new(dir.path());
        assert_eq!(links.name(4), "br0");
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_missing_directory() {
        let links = LinkNames::new("/definitely/does/not/exist");
        assert_eq!(links.name(3), "3");
    }
}
