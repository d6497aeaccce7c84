//! Live HTTP API for dashboards.
//!
//! The server exposes the most recent readings of a running session:
//! - `GET /health`
//! - `GET /api/latest`: latest record per sensor type
//! - `GET /api/history/:sensor_type?limit=N`: the last N records in
//!   chronological order (default 50)
//!
//! # Architecture
//!
//! ```text
//! frame loop ──→ LiveStore (EventSink) ←── axum handlers ←── dashboard
//! ```

use crate::core::{EventRecord, SENSOR_TYPE};
use crate::sink::{EventSink, SinkError};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Records returned by the history endpoint when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// In-memory store of recent records, fed as an [`EventSink`].
#[derive(Debug)]
pub struct LiveStore {
    latest: RwLock<BTreeMap<String, EventRecord>>,
    history: RwLock<VecDeque<EventRecord>>,
    capacity: usize,
}

impl LiveStore {
    /// Keep at most `capacity` records of history.
    pub fn new(capacity: usize) -> Self {
        Self {
            latest: RwLock::new(BTreeMap::new()),
            history: RwLock::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity: capacity.max(1),
        }
    }

    /// Latest record per sensor type. This agent's sensor type is always
    /// present, `None` until the first record arrives.
    pub fn latest(&self) -> BTreeMap<String, Option<EventRecord>> {
        let latest = self.latest.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: BTreeMap<String, Option<EventRecord>> = latest
            .iter()
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect();
        out.entry(SENSOR_TYPE.to_string()).or_insert(None);
        out
    }

    /// The last `limit` records of `sensor_type`, oldest first.
    pub fn history(&self, sensor_type: &str, limit: usize) -> Vec<EventRecord> {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        let mut newest_first: Vec<EventRecord> = history
            .iter()
            .rev()
            .filter(|r| r.sensor_type == sensor_type)
            .take(limit)
            .cloned()
            .collect();
        newest_first.reverse();
        newest_first
    }

    pub fn len(&self) -> usize {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for LiveStore {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.sensor_type.clone(), record.clone());

        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        while history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(record.clone());
        Ok(())
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub records: usize,
    pub timestamp: DateTime<Utc>,
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<String>,
}

impl HistoryParams {
    /// Missing, zero or unparseable limits fall back to the default.
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<usize>().ok())
            .filter(|&l| l > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}

/// GET /health
async fn health(State(store): State<Arc<LiveStore>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        records: store.len(),
        timestamp: Utc::now(),
    })
}

/// GET /api/latest
async fn latest(
    State(store): State<Arc<LiveStore>>,
) -> Json<BTreeMap<String, Option<EventRecord>>> {
    Json(store.latest())
}

/// GET /api/history/:sensor_type
async fn history(
    State(store): State<Arc<LiveStore>>,
    Path(sensor_type): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Json<Vec<EventRecord>> {
    Json(store.history(&sensor_type, params.limit()))
}

/// Build the router over a store.
pub fn router(store: Arc<LiveStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/latest", get(latest))
        .route("/api/history/:sensor_type", get(history))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(store)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    store: Arc<LiveStore>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(store);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Live API listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OcularState, RecordBuilder};

    fn record(state: OcularState) -> EventRecord {
        RecordBuilder::new("op").build(state, None, 0.3, Utc::now())
    }

    #[test]
    fn test_latest_starts_empty() {
        let store = LiveStore::new(10);
        let latest = store.latest();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[SENSOR_TYPE], None);
    }

    #[test]
    fn test_history_is_bounded_and_chronological() {
        let store = LiveStore::new(3);
        for state in [
            OcularState::GazeLeft,
            OcularState::GazeRight,
            OcularState::Blinking,
            OcularState::GazeCenter,
        ] {
            store.emit(&record(state)).unwrap();
        }

        assert_eq!(store.len(), 3);
        let states: Vec<_> = store
            .history(SENSOR_TYPE, 50)
            .iter()
            .map(|r| r.state)
            .collect();
        assert_eq!(
            states,
            vec![
                OcularState::GazeRight,
                OcularState::Blinking,
                OcularState::GazeCenter
            ]
        );

        let last_two: Vec<_> = store
            .history(SENSOR_TYPE, 2)
            .iter()
            .map(|r| r.state)
            .collect();
        assert_eq!(last_two, vec![OcularState::Blinking, OcularState::GazeCenter]);
        assert!(store.history("stress", 50).is_empty());
    }

    #[test]
    fn test_history_limit_parsing() {
        let parse = |l: Option<&str>| {
            HistoryParams {
                limit: l.map(str::to_string),
            }
            .limit()
        };
        assert_eq!(parse(None), DEFAULT_HISTORY_LIMIT);
        assert_eq!(parse(Some("0")), DEFAULT_HISTORY_LIMIT);
        assert_eq!(parse(Some("abc")), DEFAULT_HISTORY_LIMIT);
        assert_eq!(parse(Some("5")), 5);
    }
}
