//! Core types for feed crawling
//!
//! Requests, per-page failure classification, orchestrator states and the
//! final outcome of a crawl.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::record_buffer::RecordBuffer;
use crate::exporter::{ExportArtifact, ExportFailure};
use crate::utils::SURFACE_CLOSED_MARKERS;

/// Reasons a crawl refuses to start
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("target identifier is empty")]
    EmptyTarget,

    #[error("page count must be at least 1")]
    ZeroPages,

    #[error("no persisted session, log in first")]
    MissingSession,

    #[error("persisted session is unreadable: {0}")]
    UnreadableSession(String),
}

/// A validated crawl request
///
/// Immutable once built: `target` is non-empty and `page_count >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    target: String,
    page_count: u32,
}

impl CrawlRequest {
    /// Validate and build a request
    ///
    /// # Errors
    ///
    /// `EmptyTarget` for a blank identifier, `ZeroPages` for a zero page count.
    pub fn new(target: impl Into<String>, page_count: u32) -> Result<Self, PreconditionError> {
        let target = target.into().trim().to_string();
        if target.is_empty() {
            return Err(PreconditionError::EmptyTarget);
        }
        if page_count == 0 {
            return Err(PreconditionError::ZeroPages);
        }
        Ok(Self { target, page_count })
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}

/// How the orchestrator reacts to a page failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Flaky network or DOM; the same page is fetched again
    Transient,
    /// The browser surface is gone; the crawl stops without exporting
    Fatal,
    /// The crawl's cancellation token fired mid-page
    Cancelled,
}

impl FailureKind {
    /// Classify a failure by its message
    ///
    /// Only a closed surface is fatal. Everything else is worth another try.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();
        if SURFACE_CLOSED_MARKERS.iter().any(|marker| msg.contains(marker)) {
            Self::Fatal
        } else {
            Self::Transient
        }
    }
}

/// Step of the per-page protocol a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractStep {
    Navigate,
    Scroll,
    AwaitNextPage,
    Expand,
    Extract,
}

impl fmt::Display for ExtractStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Navigate => "navigating",
            Self::Scroll => "scrolling",
            Self::AwaitNextPage => "waiting for the next-page control",
            Self::Expand => "expanding full text",
            Self::Extract => "extracting records",
        };
        f.write_str(name)
    }
}

/// Failure of one page fetch, escalated to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("error while {step}: {message}")]
pub struct ExtractFailure {
    pub kind: FailureKind,
    pub step: ExtractStep,
    pub message: String,
}

impl ExtractFailure {
    /// Build a failure, classifying it from the message
    #[must_use]
    pub fn new(step: ExtractStep, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: FailureKind::classify(&message),
            step,
            message,
        }
    }

    #[must_use]
    pub fn cancelled(step: ExtractStep) -> Self {
        Self {
            kind: FailureKind::Cancelled,
            step,
            message: "crawl cancelled".to_string(),
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind == FailureKind::Fatal
    }
}

impl From<(ExtractStep, anyhow::Error)> for ExtractFailure {
    fn from((step, err): (ExtractStep, anyhow::Error)) -> Self {
        // {:#} keeps the whole context chain, which is where CDP puts "Target closed"
        Self::new(step, format!("{err:#}"))
    }
}

/// Orchestrator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlState {
    Idle,
    Initializing,
    FetchingPage(u32),
    Retrying { page: u32, attempt: u32 },
    Advancing { next_page: u32 },
    Exporting,
    Completed,
    AbortedFatal,
    Cancelled,
    ExportFailed,
}

impl CrawlState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::AbortedFatal | Self::Cancelled | Self::ExportFailed
        )
    }
}

/// Transient view of an in-flight crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub state: CrawlState,
    pub current_page: u32,
    pub target_page_count: u32,
    pub last_error: Option<String>,
}

impl CrawlProgress {
    #[must_use]
    pub fn new(target_page_count: u32) -> Self {
        Self {
            state: CrawlState::Idle,
            current_page: 0,
            target_page_count,
            last_error: None,
        }
    }
}

/// How a crawl ended
#[derive(Debug)]
pub enum CrawlOutcome {
    /// All pages fetched and the artifact written
    Completed(ExportArtifact),
    /// The crawl never started
    PreconditionFailed(PreconditionError),
    /// Stopped on a fatal failure or after exhausting retries; nothing exported
    AbortedFatal { page: u32, reason: String },
    /// Stopped by cancellation; nothing exported
    Cancelled { page: u32 },
    /// Every page fetched but the write failed
    ///
    /// The accumulated records come back so export can be attempted again
    /// without re-crawling.
    ExportFailed {
        failure: ExportFailure,
        buffer: RecordBuffer,
    },
}

impl CrawlOutcome {
    #[must_use]
    pub fn artifact(&self) -> Option<&ExportArtifact> {
        match self {
            Self::Completed(artifact) => Some(artifact),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}
