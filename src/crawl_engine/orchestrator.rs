//! Crawl orchestration
//!
//! Drives one crawl through its states:
//! - Initializing: load the session, open a surface, install cookies
//! - FetchingPage(n) for n = 1..=k, strictly in order, one page at a time
//! - Retrying the same page on a transient failure, with backoff
//! - Exporting once every page is in the buffer
//!
//! A closed surface, exhausted retries or cancellation end the crawl without
//! exporting.

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::crawl_types::{
    CrawlOutcome, CrawlProgress, CrawlRequest, CrawlState, ExtractFailure, FailureKind,
    PreconditionError,
};
use super::record_buffer::RecordBuffer;
use super::retry_policy::RetryPolicy;
use crate::exporter;
use crate::page_extractor::PageExtractor;
use crate::session::SessionStore;
use crate::status::{ErrorKind, StatusChannel};
use crate::surface::{NavigableSurface, SurfaceOptions, SurfaceProvider, sleep_or_cancel};

/// Runs crawls against surfaces from one provider
///
/// Each orchestrator owns its record buffer; separate instances never share
/// accumulated state.
pub struct CrawlOrchestrator {
    provider: Arc<dyn SurfaceProvider>,
    extractor: Arc<dyn PageExtractor>,
    store: SessionStore,
    export_dir: PathBuf,
    retry: RetryPolicy,
    status: StatusChannel,
    cancel: CancellationToken,
    buffer: RecordBuffer,
    progress: CrawlProgress,
}

impl CrawlOrchestrator {
    #[must_use]
    pub fn new(
        provider: Arc<dyn SurfaceProvider>,
        extractor: Arc<dyn PageExtractor>,
        store: SessionStore,
        export_dir: PathBuf,
        retry: RetryPolicy,
        status: StatusChannel,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            extractor,
            store,
            export_dir,
            retry,
            status,
            cancel,
            buffer: RecordBuffer::new(),
            progress: CrawlProgress::new(0),
        }
    }

    #[must_use]
    pub fn progress(&self) -> &CrawlProgress {
        &self.progress
    }

    #[must_use]
    pub fn buffer(&self) -> &RecordBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn transition(&mut self, state: CrawlState) {
        debug!("Crawl state {:?} -> {:?}", self.progress.state, state);
        self.progress.state = state;
        self.status.state_changed(state);
    }

    /// Run one crawl to its end
    pub async fn run(&mut self, request: CrawlRequest) -> CrawlOutcome {
        self.buffer.clear();
        self.progress = CrawlProgress::new(request.page_count());
        self.transition(CrawlState::Initializing);

        let surface = match self.initialize().await {
            Ok(surface) => surface,
            Err(outcome) => return outcome,
        };

        let fetched = self.fetch_pages(surface.as_ref(), &request).await;

        // Closing the surface marks the end of fetching
        if let Err(e) = surface.close().await {
            debug!("Crawl surface close failed: {e:#}");
        }

        match fetched {
            Ok(()) => self.finish(&request).await,
            Err(outcome) => outcome,
        }
    }

    async fn initialize(&mut self) -> Result<Box<dyn NavigableSurface>, CrawlOutcome> {
        self.status.info("Reading session");
        let session = match self.store.load().await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(self.precondition_failed(PreconditionError::MissingSession)),
            Err(e) => {
                return Err(
                    self.precondition_failed(PreconditionError::UnreadableSession(e.to_string()))
                );
            }
        };
        self.status
            .log("Session read", Some(format!("{} cookies", session.len())));

        let surface = match self.provider.open(SurfaceOptions::background()).await {
            Ok(surface) => surface,
            Err(e) => return Err(self.abort(0, format!("could not open a browser surface: {e:#}"))),
        };

        if let Err(e) = surface.set_cookies(session.cookies()).await {
            if let Err(close_err) = surface.close().await {
                debug!("Crawl surface close failed: {close_err:#}");
            }
            return Err(self.abort(0, format!("could not install session cookies: {e:#}")));
        }

        self.status.info("Spider started");
        Ok(surface)
    }

    async fn fetch_pages(
        &mut self,
        surface: &dyn NavigableSurface,
        request: &CrawlRequest,
    ) -> Result<(), CrawlOutcome> {
        let page_count = request.page_count();
        let mut page = 1;
        let mut attempt = 0;

        while page <= page_count {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(page));
            }

            self.progress.current_page = page;
            self.transition(CrawlState::FetchingPage(page));
            self.status
                .info(format!("Crawling page {page} of {page_count}"));

            let result = self
                .extractor
                .extract_page(surface, request.target(), page, &self.status, &self.cancel)
                .await;

            match result {
                Ok(records) => {
                    debug!("Page {page} appended {} records", records.len());
                    self.buffer.extend(records);
                    attempt = 0;
                    page += 1;
                    if page <= page_count {
                        self.transition(CrawlState::Advancing { next_page: page });
                    }
                }
                Err(failure) => {
                    self.progress.last_error = Some(failure.to_string());
                    match failure.kind {
                        FailureKind::Cancelled => return Err(self.cancelled(page)),
                        FailureKind::Fatal => {
                            return Err(self.abort(page, failure.to_string()));
                        }
                        FailureKind::Transient => {
                            attempt += 1;
                            self.retry_page(page, attempt, &failure).await?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Report a transient failure and wait out the backoff before the same page is fetched again
    async fn retry_page(
        &mut self,
        page: u32,
        attempt: u32,
        failure: &ExtractFailure,
    ) -> Result<(), CrawlOutcome> {
        self.status.error(
            ErrorKind::ExtractTransient,
            format!("Page {page} failed"),
            failure.to_string(),
        );

        if !self.retry.allows(attempt) {
            let reason = format!(
                "page {page} still failing after {} retries: {failure}",
                attempt - 1
            );
            return Err(self.abort(page, reason));
        }

        let delay = self.retry.delay_for(attempt);
        warn!("Retrying page {page} (attempt {attempt}) in {delay:?}");
        self.transition(CrawlState::Retrying { page, attempt });
        self.status.log(
            format!("Retrying page {page}"),
            Some(format!("attempt {attempt}, waiting {delay:?}")),
        );
        if !sleep_or_cancel(delay, &self.cancel).await {
            return Err(self.cancelled(page));
        }
        Ok(())
    }

    async fn finish(&mut self, request: &CrawlRequest) -> CrawlOutcome {
        self.status.info("Crawl finished");
        self.transition(CrawlState::Exporting);
        self.status.processing();

        match exporter::export(&mut self.buffer, request.target(), &self.export_dir).await {
            Ok(artifact) => {
                info!(
                    "Crawl of {} exported {} rows",
                    request.target(),
                    artifact.row_count
                );
                self.status.log(
                    "Export written",
                    Some(artifact.path.display().to_string()),
                );
                self.status.ready(artifact.path.clone(), artifact.row_count);
                self.transition(CrawlState::Completed);
                CrawlOutcome::Completed(artifact)
            }
            Err(failure) => {
                self.status
                    .error(ErrorKind::Export, "Export failed", failure.to_string());
                self.progress.last_error = Some(failure.to_string());
                self.transition(CrawlState::ExportFailed);
                CrawlOutcome::ExportFailed {
                    failure,
                    buffer: self.buffer.clone(),
                }
            }
        }
    }

    fn precondition_failed(&mut self, error: PreconditionError) -> CrawlOutcome {
        self.status
            .error(ErrorKind::Precondition, "Crawl not started", error.to_string());
        self.progress.last_error = Some(error.to_string());
        self.transition(CrawlState::Idle);
        CrawlOutcome::PreconditionFailed(error)
    }

    fn abort(&mut self, page: u32, reason: String) -> CrawlOutcome {
        self.status
            .error(ErrorKind::ExtractFatal, "Crawl aborted", reason.clone());
        self.progress.last_error = Some(reason.clone());
        self.transition(CrawlState::AbortedFatal);
        CrawlOutcome::AbortedFatal { page, reason }
    }

    fn cancelled(&mut self, page: u32) -> CrawlOutcome {
        self.status.error(
            ErrorKind::Cancelled,
            "Crawl cancelled",
            format!("stopped at page {page}"),
        );
        self.transition(CrawlState::Cancelled);
        CrawlOutcome::Cancelled { page }
    }
}
