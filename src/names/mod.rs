//! Human-readable names for interfaces and hosts, used to decorate log output
//! and the `/flows` listing.
mod error;
pub mod leases;
mod links;

use std::path::PathBuf;
use std::sync::Arc;

pub use error::{Error, Result};
pub use leases::{Lease, LeaseNames};
pub use links::LinkNames;

use crate::mac::MacAddr;

/// Interface and host name caches shared by the reporting tasks and the API.
#[derive(Debug)]
pub struct Names {
    links: LinkNames,
    leases: Arc<LeaseNames>,
}

impl Names {
    pub fn new(sysfs_net: impl Into<PathBuf>) -> Self {
        Self {
            links: LinkNames::new(sysfs_net),
            leases: Arc::new(LeaseNames::new()),
        }
    }

    /// Interface name for `ifindex`, or the index itself if it cannot be resolved.
    pub fn link_name(&self, ifindex: u32) -> String {
        self.links.name(ifindex)
    }

    /// Hostname from the DHCP leases for `mac`, if any.
    pub fn hostname(&self, mac: &MacAddr) -> Option<String> {
        self.leases.hostname(mac)
    }

    pub fn leases(&self) -> &Arc<LeaseNames> {
        &self.leases
    }

    /// Loads the dnsmasq lease file at `path` and keeps it in sync.
    ///
    /// A lease file that does not exist yet is not an error: the watch still
    /// picks it up once dnsmasq creates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or the watch
    /// cannot be set up.
    pub fn follow_leases(&self, path: impl Into<PathBuf>) -> Result<notify::RecommendedWatcher> {
        let path = path.into();
        match self.leases.load(&path) {
            Ok(count) => log::info!("loaded {count} leases from {}", path.display()),
            Err(Error::Read(err)) if err.source.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("lease file {} does not exist yet", path.display());
            }
            Err(err) => return Err(err),
        }
        leases::watch(Arc::clone(&self.leases), path)
    }
}
