//! Overseer: per-host traffic accounting for private IPv4 networks.
//!
//! Packets handed to the [`monitor::Monitor`] entry points are parsed, filtered
//! to private address space and accounted per (address, interface, MAC,
//! direction) in a bounded [`flow::FlowTable`]. New and failed flows are
//! reported over a lossy event channel. The service exposes the table as
//! Prometheus metrics and JSON, and decorates its output with interface names
//! and dnsmasq host names.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

pub mod accountant;
pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod fsutil;
pub mod mac;
pub mod metrics;
pub mod monitor;
pub mod names;
pub mod packet;
pub mod report;

pub use error::{Error, Result};

use config::Config;
use error::ResultOkLogExt;
use events::EventReceiver;
use flow::FlowTable;
use monitor::Monitor;
use names::Names;

/// The assembled service: flow table, entry points, event consumer, name
/// caches and HTTP API.
pub struct Overseer {
    config: Config,
    monitor: Arc<Monitor>,
    names: Arc<Names>,
    events: EventReceiver,
}

impl Overseer {
    /// Wires the flow table, event channel, monitor and name caches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyEventQueue`] if the configured event queue has no capacity.
    pub fn new(config: Config) -> Result<Self> {
        if config.event_queue_capacity == 0 {
            return Err(Error::EmptyEventQueue);
        }
        let (tx, rx) = events::channel(config.event_queue_capacity);
        let monitor = Arc::new(Monitor::new(Arc::new(FlowTable::new()), tx));
        let names = Arc::new(Names::new(config.sysfs_net.clone()));
        Ok(Self {
            config,
            monitor,
            names,
            events: rx,
        })
    }

    /// Handle to the packet entry points, for binding them to interface hooks.
    pub fn monitor(&self) -> Arc<Monitor> {
        Arc::clone(&self.monitor)
    }

    pub fn names(&self) -> &Arc<Names> {
        &self.names
    }

    /// Runs the event consumer, the stats reporter, the lease watcher and the
    /// HTTP server until `shutdown` resolves or the server fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server cannot be started or fails, or a
    /// background task panics.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let Self {
            config,
            monitor,
            names,
            events,
        } = self;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Dropping the watcher ends the watch, so keep it for the lifetime of the service.
        let _lease_watcher = match &config.dnsmasq_leases {
            Some(path) => names.follow_leases(path.clone()).ok_log(),
            None => {
                log::info!("No dnsmasq lease file, ignoring");
                None
            }
        };

        let state = api::AppState::new(
            Arc::clone(monitor.table()),
            Arc::clone(&names),
            events.dropped_counter(),
        );
        let consumer = tokio::spawn(report::consume_events(
            events,
            Arc::clone(&names),
            shutdown_rx.clone(),
        ));
        let reporter = config.stats_interval.map(|period| {
            tokio::spawn(report::stats_reporter(
                Arc::clone(&monitor),
                Arc::clone(&names),
                period,
                shutdown_rx.clone(),
            ))
        });

        let mut server_shutdown = shutdown_rx;
        let mut server = tokio::spawn(api::APIServer::new(state).listen(
            config.listen_addr,
            async move {
                let _ = server_shutdown.changed().await;
            },
        ));

        let finished = tokio::select! {
            () = shutdown => None,
            joined = &mut server => Some(joined),
        };
        log::info!("shutting down");
        let _ = shutdown_tx.send(true);

        let served = match finished {
            Some(joined) => joined,
            None => server.await,
        };
        consumer.await?;
        if let Some(reporter) = reporter {
            reporter.await?;
        }
        served??;
        Ok(())
    }
}

/// Runs the service with configuration from the environment until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the service fails.
pub async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    log::debug!("Config: {:?}", config);
    Overseer::new(config)?.run(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok_log();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                log::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
