//! Feed page extraction steps

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{ExtractOptions, PageExtractor};
use crate::crawl_engine::{ExtractFailure, ExtractStep, FailureKind};
use crate::status::StatusChannel;
use crate::surface::{NavigableSurface, WaitError, sleep_or_cancel, wait_for_selector};
use crate::utils::{
    COLLAPSED_CONTENT_SELECTOR, EXPAND_CONTROL_SELECTOR, EXPAND_MARK_ATTRIBUTE,
    FULL_CONTENT_SELECTOR, NEXT_PAGE_SELECTOR, collapsed_record, feed_page_url,
    safe_truncate_chars, strip_markup,
};

/// Longest error detail copied into the status log
const MAX_DETAIL_CHARS: usize = 500;

/// Extractor for the profile feed
#[derive(Debug, Clone)]
pub struct FeedPageExtractor {
    options: ExtractOptions,
}

impl FeedPageExtractor {
    #[must_use]
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Scroll in fixed steps until the next-page control shows up
    ///
    /// Reaching the bottom without the control rewinds to the top so the
    /// feed's lazy chunks get another chance to load.
    async fn scroll_until_ready(
        &self,
        surface: &dyn NavigableSurface,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), ExtractFailure> {
        let step = self.options.scroll_step_px;
        let mut scrolled: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ExtractFailure::cancelled(ExtractStep::Scroll));
            }
            if surface
                .exists(NEXT_PAGE_SELECTOR)
                .await
                .map_err(|e| ExtractFailure::from((ExtractStep::Scroll, e)))?
            {
                return Ok(());
            }

            let height = surface
                .scroll_by(step)
                .await
                .map_err(|e| ExtractFailure::from((ExtractStep::Scroll, e)))?;
            scrolled += u64::from(step);
            if scrolled >= height {
                surface
                    .scroll_to_top()
                    .await
                    .map_err(|e| ExtractFailure::from((ExtractStep::Scroll, e)))?;
                scrolled = 0;
            }

            if Instant::now() >= deadline {
                return Err(ExtractFailure::new(
                    ExtractStep::Scroll,
                    format!(
                        "next-page control did not appear within {:?}",
                        self.options.page_ready_timeout
                    ),
                ));
            }
            if !sleep_or_cancel(self.options.scroll_interval, cancel).await {
                return Err(ExtractFailure::cancelled(ExtractStep::Scroll));
            }
        }
    }

    async fn await_next_page(
        &self,
        surface: &dyn NavigableSurface,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), ExtractFailure> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        wait_for_selector(
            surface,
            NEXT_PAGE_SELECTOR,
            remaining,
            self.options.selector_poll_interval,
            cancel,
        )
        .await
        .map_err(|e| match e {
            WaitError::Cancelled => ExtractFailure::cancelled(ExtractStep::AwaitNextPage),
            WaitError::TimedOut(_) => ExtractFailure::new(
                ExtractStep::AwaitNextPage,
                format!(
                    "next-page control did not appear within {:?}",
                    self.options.page_ready_timeout
                ),
            ),
            WaitError::Surface(err) => ExtractFailure::from((ExtractStep::AwaitNextPage, err)),
        })
    }

    /// Click every expand control, one at a time
    ///
    /// The controls are tagged once up front, so a click that swaps its post
    /// out of the page does not shift the ones after it. Returns how many
    /// clicks succeeded.
    async fn expand_all(
        &self,
        surface: &dyn NavigableSurface,
        status: &StatusChannel,
        cancel: &CancellationToken,
    ) -> Result<usize, ExtractFailure> {
        let total = surface
            .mark_all(EXPAND_CONTROL_SELECTOR, EXPAND_MARK_ATTRIBUTE)
            .await
            .map_err(|e| ExtractFailure::from((ExtractStep::Expand, e)))?;

        let mut expanded = 0;
        for index in 0..total {
            if let Err(e) = surface.click_marked(EXPAND_MARK_ATTRIBUTE, index).await {
                let failure = ExtractFailure::from((ExtractStep::Expand, e));
                if failure.is_fatal() {
                    return Err(failure);
                }
                report_step(status, &failure);
            } else {
                expanded += 1;
            }
            if !sleep_or_cancel(self.options.expand_settle_delay, cancel).await {
                return Err(ExtractFailure::cancelled(ExtractStep::Expand));
            }
        }
        Ok(expanded)
    }

    async fn read_records(
        &self,
        surface: &dyn NavigableSurface,
    ) -> Result<Vec<String>, ExtractFailure> {
        let collapsed = surface
            .inner_html_all(COLLAPSED_CONTENT_SELECTOR)
            .await
            .map_err(|e| ExtractFailure::from((ExtractStep::Extract, e)))?;
        let full = surface
            .inner_html_all(FULL_CONTENT_SELECTOR)
            .await
            .map_err(|e| ExtractFailure::from((ExtractStep::Extract, e)))?;

        let mut records = Vec::with_capacity(collapsed.len() + full.len());
        records.extend(collapsed.iter().map(|html| collapsed_record(html)));
        records.extend(full.iter().map(|html| strip_markup(html)));
        Ok(records)
    }
}

/// Log a step failure on the status channel
fn report_step(status: &StatusChannel, failure: &ExtractFailure) {
    let detail = safe_truncate_chars(&failure.message, MAX_DETAIL_CHARS).to_string();
    status.log(format!("Error while {}", failure.step), Some(detail));
}

/// Scroll and next-page failures only matter when they are fatal or cancelled
fn tolerate(
    status: &StatusChannel,
    result: Result<(), ExtractFailure>,
) -> Result<(), ExtractFailure> {
    match result {
        Err(failure) if failure.kind == FailureKind::Transient => {
            report_step(status, &failure);
            Ok(())
        }
        other => other,
    }
}

#[async_trait]
impl PageExtractor for FeedPageExtractor {
    async fn extract_page(
        &self,
        surface: &dyn NavigableSurface,
        target: &str,
        page: u32,
        status: &StatusChannel,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExtractFailure> {
        if cancel.is_cancelled() {
            return Err(ExtractFailure::cancelled(ExtractStep::Navigate));
        }

        let url = feed_page_url(&self.options.feed_base_url, target, page);
        log::debug!("Extracting page {page} from {url}");
        if let Err(e) = surface.navigate(&url).await {
            let failure = ExtractFailure::from((ExtractStep::Navigate, e));
            report_step(status, &failure);
            return Err(failure);
        }

        let deadline = Instant::now() + self.options.page_ready_timeout;
        tolerate(
            status,
            self.scroll_until_ready(surface, deadline, cancel).await,
        )?;
        tolerate(status, self.await_next_page(surface, deadline, cancel).await)?;

        match self.expand_all(surface, status, cancel).await {
            Ok(count) => log::debug!("Expanded {count} posts on page {page}"),
            Err(failure) if failure.kind != FailureKind::Transient => return Err(failure),
            Err(failure) => report_step(status, &failure),
        }

        match self.read_records(surface).await {
            Ok(records) => {
                log::debug!("Page {page} yielded {} records", records.len());
                Ok(records)
            }
            Err(failure) => {
                report_step(status, &failure);
                Err(failure)
            }
        }
    }
}
