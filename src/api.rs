use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::flow::FlowTable;
use crate::metrics;
use crate::names::Names;

mod models;

pub use models::FlowEntry;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Shared state of the HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    table: Arc<FlowTable>,
    names: Arc<Names>,
    events_dropped: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(table: Arc<FlowTable>, names: Arc<Names>, events_dropped: Arc<AtomicU64>) -> Self {
        Self {
            table,
            names,
            events_dropped,
        }
    }
}

async fn export_metrics(State(state): State<AppState>) -> Response {
    let dropped = state.events_dropped.load(Ordering::Relaxed);
    match metrics::render(&state.table, dropped) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(err) => {
            log::error!("Failed to encode metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

async fn list_flows(State(state): State<AppState>) -> Response {
    // Interface names may need a sysfs rescan.
    let flows = tokio::task::spawn_blocking(move || {
        let mut snapshot = state.table.snapshot();
        snapshot.sort_by_key(|(key, _)| {
            (
                u32::from_be(key.address_be()),
                key.ifindex(),
                key.mac(),
                key.direction(),
            )
        });
        snapshot
            .iter()
            .map(|(key, stats)| FlowEntry::new(key, stats, &state.names))
            .collect::<Vec<_>>()
    })
    .await;

    match flows {
        Ok(flows) => (StatusCode::OK, Json(flows)).into_response(),
        Err(err) => {
            log::error!("Failed to list flows: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to list flows").into_response()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(state: AppState) -> Self {
        let router = axum::Router::new()
            .route("/metrics", get(export_metrics))
            .route("/flows", get(list_flows))
            .with_state(state);
        Self { router }
    }

    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    /// Serves the API on `addr` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the server fails.
    pub async fn listen(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        log::info!("HTTP server listening on {}", addr);
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(Error::Serve)
    }
}
