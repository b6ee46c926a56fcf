//! Caller-facing entry point
//!
//! [`Spider`] wires the session store, surface provider, page extractor and
//! status channel together. It rejects a second crawl while one is running,
//! and every operation reports on the status channel in addition to its
//! typed result.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SpiderConfig;
use crate::crawl_engine::{
    CrawlOrchestrator, CrawlOutcome, CrawlRequest, PreconditionError, RetryPolicy,
};
use crate::exporter::{ExportArtifact, ExportFailure, copy_artifact};
use crate::page_extractor::{ExtractOptions, FeedPageExtractor, PageExtractor};
use crate::session::{AuthFailure, Session, SessionError, SessionStore, authenticate};
use crate::status::{ErrorKind, StatusChannel, StatusEvent};
use crate::surface::{ChromeSurfaceProvider, NavigableSurface, SurfaceOptions, SurfaceProvider};
use crate::utils::{EXPORT_EXTENSION, profile_url};

#[derive(Debug, thiserror::Error)]
pub enum SpiderError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("crawl aborted at page {page}: {reason}")]
    Extract { page: u32, reason: String },

    #[error(transparent)]
    Export(#[from] ExportFailure),

    /// A crawl is already running on this spider
    #[error("a crawl is already in progress")]
    Busy,

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("browser error: {0:#}")]
    Browser(#[from] anyhow::Error),
}

struct SpiderInner {
    config: SpiderConfig,
    provider: Arc<dyn SurfaceProvider>,
    extractor: Arc<dyn PageExtractor>,
    store: SessionStore,
    status: StatusChannel,
    busy: AtomicBool,
    crawl_cancel: Mutex<Option<CancellationToken>>,
    login_cancel: Mutex<Option<CancellationToken>>,
}

/// Releases the busy flag when a crawl task ends, whatever the outcome
struct BusyGuard {
    inner: Arc<SpiderInner>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.crawl_cancel.lock().take();
        self.inner.busy.store(false, Ordering::Release);
    }
}

/// Cheap to clone; clones share state
#[derive(Clone)]
pub struct Spider {
    inner: Arc<SpiderInner>,
}

impl Spider {
    /// Spider backed by a real Chrome browser
    #[must_use]
    pub fn new(config: SpiderConfig) -> Self {
        let provider = Arc::new(ChromeSurfaceProvider::new(&config));
        Self::with_provider(config, provider)
    }

    /// Spider using `provider` for surfaces and the feed extractor for pages
    #[must_use]
    pub fn with_provider(config: SpiderConfig, provider: Arc<dyn SurfaceProvider>) -> Self {
        let extractor = Arc::new(FeedPageExtractor::new(ExtractOptions::from(&config)));
        Self::with_components(config, provider, extractor)
    }

    #[must_use]
    pub fn with_components(
        config: SpiderConfig,
        provider: Arc<dyn SurfaceProvider>,
        extractor: Arc<dyn PageExtractor>,
    ) -> Self {
        let store = SessionStore::new(config.session_path());
        let status = StatusChannel::new(config.status_capacity());
        Self {
            inner: Arc::new(SpiderInner {
                config,
                provider,
                extractor,
                store,
                status,
                busy: AtomicBool::new(false),
                crawl_cancel: Mutex::new(None),
                login_cancel: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SpiderConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn status(&self) -> &StatusChannel {
        &self.inner.status
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.status.subscribe()
    }

    #[must_use]
    pub fn session_store(&self) -> &SessionStore {
        &self.inner.store
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub async fn has_session(&self) -> bool {
        self.inner.store.exists().await
    }

    /// Interactive login; persists the captured session
    pub async fn authenticate(&self) -> Result<Session, SpiderError> {
        let cancel = CancellationToken::new();
        *self.inner.login_cancel.lock() = Some(cancel.clone());
        let result = authenticate(
            self.inner.provider.as_ref(),
            &self.inner.store,
            &self.inner.config,
            &self.inner.status,
            &cancel,
        )
        .await;
        self.inner.login_cancel.lock().take();
        result.map_err(SpiderError::from)
    }

    /// Run [`authenticate`](Self::authenticate) in the background
    pub fn start_authentication(&self) -> JoinHandle<Result<Session, SpiderError>> {
        let spider = self.clone();
        tokio::spawn(async move { spider.authenticate().await })
    }

    /// Validate and launch a crawl, returning as soon as it is running
    ///
    /// # Errors
    ///
    /// `Precondition` for a bad request or a missing session, `Busy` while
    /// another crawl is in flight.
    pub async fn start_crawl(
        &self,
        target: &str,
        page_count: u32,
    ) -> Result<JoinHandle<CrawlOutcome>, SpiderError> {
        let status = &self.inner.status;

        let request = match CrawlRequest::new(target, page_count) {
            Ok(request) => request,
            Err(e) => {
                status.error(ErrorKind::Precondition, "Crawl not started", e.to_string());
                return Err(e.into());
            }
        };

        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            status.error(
                ErrorKind::Busy,
                "Crawl already running",
                format!("rejected request for {}", request.target()),
            );
            return Err(SpiderError::Busy);
        }
        let guard = BusyGuard {
            inner: Arc::clone(&self.inner),
        };

        if !self.inner.store.exists().await {
            let e = PreconditionError::MissingSession;
            status.error(ErrorKind::Precondition, "Crawl not started", e.to_string());
            return Err(e.into());
        }

        let cancel = CancellationToken::new();
        *self.inner.crawl_cancel.lock() = Some(cancel.clone());

        let mut orchestrator = CrawlOrchestrator::new(
            Arc::clone(&self.inner.provider),
            Arc::clone(&self.inner.extractor),
            self.inner.store.clone(),
            self.inner.config.export_dir(),
            RetryPolicy::from_config(&self.inner.config),
            status.clone(),
            cancel,
        );

        Ok(tokio::spawn(async move {
            let _guard = guard;
            orchestrator.run(request).await
        }))
    }

    /// Crawl and wait for the artifact
    pub async fn run_crawl(
        &self,
        target: &str,
        page_count: u32,
    ) -> Result<ExportArtifact, SpiderError> {
        let handle = self.start_crawl(target, page_count).await?;
        let outcome = handle
            .await
            .map_err(|e| anyhow::anyhow!("crawl task failed: {e}"))?;
        match outcome {
            CrawlOutcome::Completed(artifact) => Ok(artifact),
            CrawlOutcome::PreconditionFailed(e) => Err(e.into()),
            CrawlOutcome::AbortedFatal { page, reason } => Err(SpiderError::Extract { page, reason }),
            CrawlOutcome::Cancelled { .. } => Err(SpiderError::Cancelled),
            CrawlOutcome::ExportFailed { failure, .. } => Err(failure.into()),
        }
    }

    /// Cancel the running crawl and any pending login; returns whether anything was running
    pub fn cancel(&self) -> bool {
        let mut cancelled = false;
        for slot in [&self.inner.crawl_cancel, &self.inner.login_cancel] {
            if let Some(token) = slot.lock().as_ref() {
                token.cancel();
                cancelled = true;
            }
        }
        cancelled
    }

    /// Open a visible surface on a profile for manual inspection
    ///
    /// A bare identifier is expanded to its profile URL. The caller owns the
    /// returned surface and closes it when done.
    pub async fn validate_target_link(
        &self,
        link: &str,
    ) -> Result<Box<dyn NavigableSurface>, SpiderError> {
        let url = profile_url(self.inner.config.feed_base_url(), link);
        match self
            .inner
            .provider
            .open(SurfaceOptions::visible(url.clone()))
            .await
        {
            Ok(surface) => {
                self.inner.status.log("Opened link for checking", Some(url));
                Ok(surface)
            }
            Err(e) => {
                self.inner.status.error(
                    ErrorKind::Browser,
                    "Could not open link",
                    format!("{url}: {e:#}"),
                );
                Err(e.into())
            }
        }
    }

    /// Copy an artifact to `dest` (default `spider.csv` in the working directory)
    pub async fn export_artifact(
        &self,
        src: &Path,
        dest: Option<&Path>,
    ) -> Result<PathBuf, SpiderError> {
        match copy_artifact(src, dest).await {
            Ok(path) => {
                self.inner
                    .status
                    .log("Export saved", Some(path.display().to_string()));
                Ok(path)
            }
            Err(e) => {
                self.inner
                    .status
                    .error(ErrorKind::Export, "Export not saved", e.to_string());
                Err(e.into())
            }
        }
    }

    /// Forget the persisted session; returns whether one existed
    pub async fn logout(&self) -> Result<bool, SpiderError> {
        let removed = match self.inner.store.clear().await {
            Ok(removed) => removed,
            Err(e) => {
                self.inner
                    .status
                    .error(ErrorKind::Auth, "Session not cleared", e.to_string());
                return Err(e.into());
            }
        };
        let message = if removed {
            "Session cleared"
        } else {
            "No session to clear"
        };
        self.inner.status.info(message);
        Ok(removed)
    }

    /// Artifacts in the export directory, oldest first by name
    pub async fn list_artifacts(&self) -> Result<Vec<PathBuf>, SpiderError> {
        self.read_artifacts().await.map_err(|e| {
            self.inner
                .status
                .error(ErrorKind::Export, "Could not list exports", e.to_string());
            e.into()
        })
    }

    async fn read_artifacts(&self) -> Result<Vec<PathBuf>, ExportFailure> {
        let dir = self.inner.config.export_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(ExportFailure::Io { path: dir, source }),
        };
        let mut artifacts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| ExportFailure::Io {
                path: dir.clone(),
                source,
            })?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXPORT_EXTENSION) {
                artifacts.push(path);
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    /// Cancel work in flight and release browser processes
    pub async fn shutdown(&self) -> Result<(), SpiderError> {
        self.cancel();
        self.inner.provider.shutdown().await?;
        Ok(())
    }
}
