use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};

use optrack_models::{StreamMessage, ToolReport};
use optrack_vision::ToolTracker;

use crate::config::ServerConfig;

/// Capacity of the event fan-out channel. Slow subscribers past this
/// lag are skipped, not blocked on.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Fan-out of frames, reports and errors to WebSocket subscribers.
    events: broadcast::Sender<StreamMessage>,
    pub tracker: Arc<Mutex<ToolTracker>>,
    /// Most recent published report, for the polling endpoint.
    latest_report: Arc<RwLock<Option<ToolReport>>>,
    active_connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            events,
            tracker: Arc::new(Mutex::new(ToolTracker::new())),
            latest_report: Arc::new(RwLock::new(None)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.events.subscribe()
    }

    /// Sender half of the event channel; the session publishes through a
    /// clone of this.
    pub fn events(&self) -> broadcast::Sender<StreamMessage> {
        self.events.clone()
    }

    pub async fn latest_report(&self) -> Option<ToolReport> {
        self.latest_report.read().await.clone()
    }

    /// Shared slot the session writes each published report into.
    pub fn latest_report_slot(&self) -> Arc<RwLock<Option<ToolReport>>> {
        Arc::clone(&self.latest_report)
    }

    pub fn connection_opened(&self) -> usize {
        self.active_connections.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn connection_closed(&self) -> usize {
        self.active_connections.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}
