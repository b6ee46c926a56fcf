//! Crawl Engine Module
//!
//! Request validation, failure classification, the per-crawl record buffer,
//! the same-page retry policy and the orchestrator state machine that ties
//! page extraction to export.

// Sub-modules
pub mod crawl_types;
pub mod orchestrator;
pub mod record_buffer;
pub mod retry_policy;

// Re-exports for public API
pub use crawl_types::{
    CrawlOutcome, CrawlProgress, CrawlRequest, CrawlState, ExtractFailure, ExtractStep,
    FailureKind, PreconditionError,
};
pub use orchestrator::CrawlOrchestrator;
pub use record_buffer::RecordBuffer;
pub use retry_policy::RetryPolicy;
