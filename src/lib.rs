pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod crawl_engine;
pub mod exporter;
pub mod page_extractor;
pub mod session;
pub mod spider;
pub mod status;
pub mod surface;
pub mod utils;

pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use config::{SpiderConfig, SpiderConfigBuilder};
pub use crawl_engine::{
    CrawlOrchestrator, CrawlOutcome, CrawlProgress, CrawlRequest, CrawlState, ExtractFailure,
    ExtractStep, FailureKind, PreconditionError, RecordBuffer, RetryPolicy,
};
pub use exporter::{ExportArtifact, ExportFailure, export};
pub use page_extractor::{ExtractOptions, FeedPageExtractor, PageExtractor};
pub use session::{AuthFailure, Session, SessionCookie, SessionError, SessionStore};
pub use spider::{Spider, SpiderError};
pub use status::{CompletionPhase, ErrorKind, LogEntry, StatusChannel, StatusEvent};
pub use surface::{
    ChromeSurface, ChromeSurfaceProvider, NavigableSurface, SurfaceOptions, SurfaceProvider,
};
