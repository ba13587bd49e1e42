//! Start-up configuration read from environment variables.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const LISTEN_ADDR_VAR: &str = "OVERSEER_LISTEN_ADDR";
pub const STATS_INTERVAL_VAR: &str = "OVERSEER_STATS_INTERVAL_SECS";
pub const DNSMASQ_LEASES_VAR: &str = "OVERSEER_DNSMASQ_LEASES";
pub const EVENT_QUEUE_VAR: &str = "OVERSEER_EVENT_QUEUE";
pub const SYSFS_NET_VAR: &str = "OVERSEER_SYSFS_NET";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9042";
const DEFAULT_DNSMASQ_LEASES: &str = "/run/dnsmasq.leases";
const DEFAULT_EVENT_QUEUE: usize = 1024;
const DEFAULT_SYSFS_NET: &str = "/sys/class/net";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{var}`: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address of the HTTP server exposing `/metrics` and `/flows`.
    pub listen_addr: SocketAddr,
    /// Interval of the periodic stats printout. `None` disables it.
    pub stats_interval: Option<Duration>,
    /// dnsmasq lease file used to name hosts by MAC address. `None` disables it.
    pub dnsmasq_leases: Option<PathBuf>,
    /// Number of undelivered events the event channel holds before dropping.
    pub event_queue_capacity: usize,
    /// Directory with one entry per network interface, e.g. `/sys/class/net`.
    pub sysfs_net: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9042)),
            stats_interval: None,
            dnsmasq_leases: Some(PathBuf::from(DEFAULT_DNSMASQ_LEASES)),
            event_queue_capacity: DEFAULT_EVENT_QUEUE,
            sysfs_net: PathBuf::from(DEFAULT_SYSFS_NET),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if a variable is set to a value that cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    ///
    /// Unset variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if a variable is set to a value that cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = lookup(LISTEN_ADDR_VAR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = listen_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| Error::Invalid {
                var: LISTEN_ADDR_VAR,
                value: listen_addr.clone(),
                reason: err.to_string(),
            })?;

        let stats_interval = match lookup(STATS_INTERVAL_VAR) {
            None => None,
            Some(value) => {
                let secs = value.trim().parse::<u64>().map_err(|err| Error::Invalid {
                    var: STATS_INTERVAL_VAR,
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        let dnsmasq_leases = match lookup(DNSMASQ_LEASES_VAR) {
            None => Some(PathBuf::from(DEFAULT_DNSMASQ_LEASES)),
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(PathBuf::from(value.trim())),
        };

        let event_queue_capacity = match lookup(EVENT_QUEUE_VAR) {
            None => DEFAULT_EVENT_QUEUE,
            Some(value) => match value.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(Error::Invalid {
                        var: EVENT_QUEUE_VAR,
                        value,
                        reason: "capacity must be greater than zero".to_owned(),
                    });
                }
                Ok(capacity) => capacity,
                Err(err) => {
                    return Err(Error::Invalid {
                        var: EVENT_QUEUE_VAR,
                        reason: err.to_string(),
                        value,
                    });
                }
            },
        };

        let sysfs_net = lookup(SYSFS_NET_VAR)
            .map(|value| PathBuf::from(value.trim()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSFS_NET));

        Ok(Self {
            listen_addr,
            stats_interval,
            dnsmasq_leases,
            event_queue_capacity,
            sysfs_net,
        })
    }
}
