//! Event types carried on the status channel

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::crawl_engine::CrawlState;

/// One line of the caller-visible audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 1-based, strictly increasing per channel
    pub sequence: u64,
    pub message: String,
    pub detail: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {}",
            self.sequence,
            self.timestamp.format("%Y.%m.%d %H:%M:%S"),
            self.message
        )?;
        match &self.detail {
            Some(detail) => write!(f, " ({detail})"),
            None => Ok(()),
        }
    }
}

/// Phase 1 of two-phase completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionPhase {
    /// Fetching is over and the export is running
    Processing,
}

/// Category of an error event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Auth,
    Precondition,
    ExtractTransient,
    ExtractFatal,
    Export,
    Busy,
    Cancelled,
    /// A browser surface could not be opened outside a crawl
    Browser,
}

/// Everything the core tells its caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatusEvent {
    Log(LogEntry),
    Progress(CompletionPhase),
    /// Phase 2: the artifact is on disk
    Ready { path: PathBuf, row_count: usize },
    Error { kind: ErrorKind, detail: String },
    StateChanged(CrawlState),
}

impl StatusEvent {
    #[must_use]
    pub fn as_log(&self) -> Option<&LogEntry> {
        match self {
            Self::Log(entry) => Some(entry),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal_signal(&self) -> bool {
        match self {
            Self::Ready { .. } => true,
            Self::StateChanged(state) => state.is_terminal(),
            _ => false,
        }
    }
}
