use std::ffi::OsStr;
use std::io::BufRead;
use std::net::{AddrParseError, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use notify::event::{DataChange, ModifyKind};
use notify::{EventKind, RecursiveMode, Watcher};

use super::{Error, Result};
use crate::error::ResultOkLogExt;
use crate::fsutil;
use crate::mac::{self, MacAddr};

/// Hostname dnsmasq records for clients that did not send one.
const UNKNOWN_HOSTNAME: &str = "*";

/// A single DHCP lease from a dnsmasq lease file.
///
/// Lines have the form `<expiry> <mac> <ip> <hostname> <client-id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub hostname: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LeaseLineError {
    #[error("expected at least 5 fields, found {0}")]
    TooFewFields(usize),
    #[error("failed to parse lease macaddr: {0}")]
    InvalidMac(#[from] mac::ParseError),
    #[error("failed to parse lease ip `{0}`: {1}")]
    InvalidIp(String, #[source] AddrParseError),
}

/// Parses one line of a dnsmasq lease file.
pub fn parse_line(line: &str) -> std::result::Result<Lease, LeaseLineError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(LeaseLineError::TooFewFields(fields.len()));
    }
    let mac = fields[1].parse::<MacAddr>()?;
    let ip = fields[2]
        .parse::<Ipv4Addr>()
        .map_err(|err| LeaseLineError::InvalidIp(fields[2].to_owned(), err))?;
    Ok(Lease {
        mac,
        ip,
        hostname: fields[3].to_owned(),
    })
}

/// Hostnames of DHCP clients keyed by MAC address.
///
/// Entries are only ever added or renamed; a lease disappearing from the
/// file keeps the last known name.
#[derive(Debug, Default)]
pub struct LeaseNames {
    hostnames: DashMap<MacAddr, String>,
}

impl LeaseNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hostname(&self, mac: &MacAddr) -> Option<String> {
        self.hostnames.get(mac).map(|name| name.value().clone())
    }

    /// Records `hostname` for `mac`. Returns `true` if the cache changed.
    pub fn set(&self, mac: MacAddr, hostname: &str) -> bool {
        match self.hostnames.entry(mac) {
            Entry::Occupied(mut entry) => {
                if entry.get() == hostname {
                    return false;
                }
                log::info!(
                    "Updating entry macaddr:{mac} name:{:?}->{hostname:?}",
                    entry.get()
                );
                entry.insert(hostname.to_owned());
            }
            Entry::Vacant(entry) => {
                log::info!("Adding entry lease macaddr:{mac} name:{hostname:?}");
                entry.insert(hostname.to_owned());
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.hostnames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty()
    }

    /// Reads the lease file at `path` and merges its leases into the cache.
    ///
    /// Malformed lines are logged and skipped.
    ///
    /// # Returns
    ///
    /// The number of entries that were added or renamed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let reader = fsutil::open_file_reader(path)?;

        let mut changed = 0;
        for line in reader.lines() {
            let line = line.map_err(|source| Error::ReadLeases {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let lease = match parse_line(&line) {
                Ok(lease) => lease,
                Err(err) => {
                    log::warn!("skipping dnsmasq lease line {line:?}: {err}");
                    continue;
                }
            };
            if lease.hostname == UNKNOWN_HOSTNAME {
                continue;
            }
            if self.set(lease.mac, &lease.hostname) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// Watches the lease file at `path` and reloads it into `leases` whenever it is
/// written or recreated.
///
/// The parent directory is watched rather than the file itself, since dnsmasq
/// may replace the file instead of writing it in place. The watch stops when
/// the returned watcher is dropped.
///
/// # Errors
///
/// Returns an error if `path` has no parent directory or the watch cannot be set up.
pub fn watch(
    leases: Arc<LeaseNames>,
    path: impl Into<PathBuf>,
) -> Result<notify::RecommendedWatcher> {
    let path = path.into();
    let file_name = path.file_name().map(OsStr::to_os_string);
    let parent = path.parent().map(Path::to_path_buf);
    let (Some(file_name), Some(parent)) = (file_name, parent) else {
        return Err(Error::InvalidLeasePath(path));
    };
    let parent = if parent.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        parent
    };

    let lease_path = path.clone();
    let mut watcher = notify::recommended_watcher(
        move |res: std::result::Result<notify::Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    log::warn!("lease file watcher error: {err}");
                    return;
                }
            };
            let is_write = matches!(
                event.kind,
                EventKind::Modify(ModifyKind::Data(DataChange::Any | DataChange::Content))
                    | EventKind::Modify(ModifyKind::Name(_))
                    | EventKind::Create(_)
            );
            let is_lease_file = event
                .paths
                .iter()
                .any(|p| p.file_name().is_some_and(|f| f == file_name));
            if !is_write || !is_lease_file {
                return;
            }

            log::info!("Dnsmasq file changed, updating");
            leases.load(&lease_path).ok_log();
        },
    )
    .map_err(|source| Error::Watch {
        path: path.clone(),
        source,
    })?;

    watcher
        .watch(&parent, RecursiveMode::NonRecursive)
        .map_err(|source| Error::Watch {
            path: parent.clone(),
            source,
        })?;
    log::debug!("watching {} for lease changes", parent.display());

    Ok(watcher)
}
