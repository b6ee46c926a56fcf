//! Status channel between the crawl core and its caller
//!
//! Progress, errors and the two-phase completion signal are typed events on
//! a broadcast channel; log entries additionally form an append-only history.

// Sub-modules
pub mod bus;
pub mod errors;
pub mod streaming;
pub mod types;

// Re-exports for public API
pub use bus::StatusChannel;
pub use errors::StatusError;
pub use streaming::FilteredReceiver;
pub use types::{CompletionPhase, ErrorKind, LogEntry, StatusEvent};
