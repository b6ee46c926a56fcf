//! Status channel: one-way event stream from the core to its caller
//!
//! Events fan out over a tokio broadcast channel. Log entries are also kept
//! in an append-only history so a caller that subscribes late can still read
//! the full audit trail.

use chrono::Local;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use super::errors::StatusError;
use super::streaming::FilteredReceiver;
use super::types::{CompletionPhase, ErrorKind, LogEntry, StatusEvent};
use crate::crawl_engine::CrawlState;

/// Cheap to clone; every clone publishes into the same stream and history
#[derive(Debug, Clone)]
pub struct StatusChannel {
    sender: broadcast::Sender<StatusEvent>,
    history: Arc<Mutex<Vec<LogEntry>>>,
    published: Arc<AtomicU64>,
    undelivered: Arc<AtomicU64>,
}

impl StatusChannel {
    /// Create a channel buffering up to `capacity` events per slow receiver
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            history: Arc::new(Mutex::new(Vec::new())),
            published: Arc::new(AtomicU64::new(0)),
            undelivered: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the events accepted by `filter`
    #[must_use]
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&StatusEvent) -> bool + Send + Sync + 'static,
    {
        FilteredReceiver::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Publish an event to all subscribers
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of subscribers that received the event
    /// * `Err(StatusError::NoSubscribers)` - Nobody is listening
    pub fn publish(&self, event: StatusEvent) -> Result<usize, StatusError> {
        self.published.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(event) {
            Ok(count) => Ok(count),
            Err(_) => {
                self.undelivered.fetch_add(1, Ordering::Relaxed);
                Err(StatusError::NoSubscribers)
            }
        }
    }

    /// Publish where an absent listener is fine
    fn emit(&self, event: StatusEvent) {
        if let Err(e) = self.publish(event) {
            log::debug!("Status event not delivered: {e}");
        }
    }

    /// Append a log entry and broadcast it
    pub fn log(&self, message: impl Into<String>, detail: Option<String>) -> LogEntry {
        // Hold the history lock across send so sequence order equals delivery order
        let mut history = self.history.lock();
        let entry = LogEntry {
            sequence: history.len() as u64 + 1,
            message: message.into(),
            detail,
            timestamp: Local::now(),
        };
        history.push(entry.clone());
        log::info!("{entry}");
        self.emit(StatusEvent::Log(entry.clone()));
        entry
    }

    /// Shorthand for a log entry without detail
    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.log(message, None)
    }

    /// Log an error and publish its typed counterpart
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>, detail: impl Into<String>) {
        let detail = detail.into();
        self.log(message, Some(detail.clone()));
        self.emit(StatusEvent::Error { kind, detail });
    }

    /// Phase 1: fetching finished, export running
    pub fn processing(&self) {
        self.emit(StatusEvent::Progress(CompletionPhase::Processing));
    }

    /// Phase 2: export finished, artifact ready
    pub fn ready(&self, path: PathBuf, row_count: usize) {
        self.emit(StatusEvent::Ready { path, row_count });
    }

    pub fn state_changed(&self, state: CrawlState) {
        self.emit(StatusEvent::StateChanged(state));
    }

    /// Snapshot of every log entry so far, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<LogEntry> {
        self.history.lock().clone()
    }

    /// (published, undelivered) event counters
    #[must_use]
    pub fn counters(&self) -> (u64, u64) {
        (
            self.published.load(Ordering::Relaxed),
            self.undelivered.load(Ordering::Relaxed),
        )
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new(crate::utils::DEFAULT_STATUS_CAPACITY)
    }
}
