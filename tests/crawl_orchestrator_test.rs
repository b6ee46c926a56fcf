//! Crawl state machine: page order, retry, fatal abort and export hand-off

use feedscrape::crawl_engine::{
    CrawlOrchestrator, CrawlOutcome, CrawlRequest, CrawlState, ExtractFailure, ExtractStep,
    FailureKind, PreconditionError, RecordBuffer, RetryPolicy,
};
use feedscrape::exporter;
use feedscrape::page_extractor::PageExtractor;
use feedscrape::session::SessionStore;
use feedscrape::status::{CompletionPhase, ErrorKind, StatusChannel, StatusEvent};
use feedscrape::SpiderConfig;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

mod common;
use common::*;

struct Harness {
    _dir: TempDir,
    config: SpiderConfig,
    provider: Arc<MockProvider>,
    extractor: Arc<ScriptedExtractor>,
    status: StatusChannel,
}

impl Harness {
    async fn new(extractor: ScriptedExtractor, retries: Option<u32>, with_session: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let config = test_config_with_retries(dir.path(), retries);
        if with_session {
            write_session(&config).await;
        }
        Self {
            _dir: dir,
            config,
            provider: Arc::new(MockProvider::new(SurfaceScript::default())),
            extractor: Arc::new(extractor),
            status: StatusChannel::new(256),
        }
    }

    fn orchestrator(&self) -> CrawlOrchestrator {
        let extractor: Arc<dyn PageExtractor> = self.extractor.clone();
        CrawlOrchestrator::new(
            self.provider.clone(),
            extractor,
            SessionStore::new(self.config.session_path()),
            self.config.export_dir(),
            RetryPolicy::from_config(&self.config),
            self.status.clone(),
            CancellationToken::new(),
        )
    }

    fn exported_files(&self) -> Vec<std::path::PathBuf> {
        files_in(&self.config.export_dir())
    }
}

fn transient(message: &str) -> ExtractFailure {
    ExtractFailure::new(ExtractStep::Navigate, message)
}

#[tokio::test]
async fn pages_are_fetched_once_each_in_increasing_order() {
    let extractor = ScriptedExtractor::new(vec![
        Ok(owned(&["one"])),
        Ok(owned(&["two"])),
        Ok(owned(&["three"])),
    ]);
    let h = Harness::new(extractor, Some(5), true).await;
    let mut orchestrator = h.orchestrator();

    let outcome = orchestrator
        .run(CrawlRequest::new("hu_ge", 3).unwrap())
        .await;

    assert!(outcome.is_completed(), "unexpected outcome: {outcome:?}");
    assert_eq!(h.extractor.calls(), vec![1, 2, 3]);
    assert_eq!(orchestrator.progress().state, CrawlState::Completed);
    assert_eq!(h.exported_files().len(), 1);
}

#[tokio::test]
async fn hu_ge_scenario_exports_distinct_rows_in_order() {
    let extractor =
        ScriptedExtractor::new(vec![Ok(owned(&["a", "", "b"])), Ok(owned(&["b", "c"]))]);
    let h = Harness::new(extractor, Some(5), true).await;
    let mut orchestrator = h.orchestrator();

    let outcome = orchestrator
        .run(CrawlRequest::new("hu_ge", 2).unwrap())
        .await;

    let artifact = outcome.artifact().expect("artifact written").clone();
    assert_eq!(artifact.row_count, 3);
    let content = std::fs::read_to_string(&artifact.path).unwrap();
    assert_eq!(content, "\u{feff}内容\na\nb\nc\n");
    assert!(
        artifact
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("hu_ge__")
    );
    // Buffer is reset once the export succeeded
    assert!(orchestrator.buffer().is_empty());
}

#[tokio::test]
async fn session_cookies_are_installed_and_surface_closed() {
    let h = Harness::new(ScriptedExtractor::new(vec![Ok(owned(&["x"]))]), Some(5), true).await;
    h.orchestrator()
        .run(CrawlRequest::new("hu_ge", 1).unwrap())
        .await;

    let records = h.provider.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].installed_cookies, sample_session().into_cookies());
    assert!(records[0].closed);
    assert!(!h.provider.opened_options()[0].visible);
}

#[tokio::test]
async fn transient_failure_refetches_the_same_page() {
    let extractor = ScriptedExtractor::new(vec![
        Ok(owned(&["p1"])),
        Err(transient("net::ERR_TIMED_OUT")),
        Ok(owned(&["p2"])),
    ]);
    let h = Harness::new(extractor, Some(5), true).await;
    let outcome = h
        .orchestrator()
        .run(CrawlRequest::new("hu_ge", 2).unwrap())
        .await;

    assert!(outcome.is_completed());
    assert_eq!(h.extractor.calls(), vec![1, 2, 2]);

    let history = h.status.history();
    assert!(has_message(&history, "Page 2 failed"));
    assert!(has_message(&history, "Retrying page 2"));
}

#[tokio::test]
async fn records_repeated_by_a_retried_page_are_deduplicated_at_export() {
    // The retry of page 2 comes back with page 1's posts pinned above its own
    let extractor = ScriptedExtractor::new(vec![
        Ok(owned(&["a", "b"])),
        Err(transient("flaky")),
        Ok(owned(&["a", "b", "c"])),
    ]);
    let h = Harness::new(extractor, Some(5), true).await;
    let outcome = h
        .orchestrator()
        .run(CrawlRequest::new("t", 2).unwrap())
        .await;

    assert_eq!(h.extractor.calls(), vec![1, 2, 2]);
    let artifact = outcome.artifact().unwrap();
    assert_eq!(artifact.row_count, 3);
    assert_eq!(
        std::fs::read_to_string(&artifact.path).unwrap(),
        "\u{feff}内容\na\nb\nc\n"
    );
}

#[tokio::test]
async fn bounded_retries_escalate_to_aborted_fatal() {
    let extractor =
        ScriptedExtractor::new(vec![]).with_fallback(Err(transient("net::ERR_CONNECTION_RESET")));
    let h = Harness::new(extractor, Some(2), true).await;
    let mut orchestrator = h.orchestrator();

    let outcome = orchestrator
        .run(CrawlRequest::new("hu_ge", 3).unwrap())
        .await;

    match outcome {
        CrawlOutcome::AbortedFatal { page, reason } => {
            assert_eq!(page, 1);
            assert!(reason.contains("after 2 retries"), "reason: {reason}");
        }
        other => panic!("expected AbortedFatal, got {other:?}"),
    }
    // One first attempt plus two retries, never page 2
    assert_eq!(h.extractor.calls(), vec![1, 1, 1]);
    assert_eq!(orchestrator.progress().state, CrawlState::AbortedFatal);
    assert!(h.exported_files().is_empty());
}

#[tokio::test]
async fn unbounded_retries_continue_until_cancelled() {
    let extractor = ScriptedExtractor::new(vec![])
        .with_fallback(Err(transient("net::ERR_CONNECTION_RESET")))
        .cancel_after(40);
    let h = Harness::new(extractor, None, true).await;

    let outcome = h
        .orchestrator()
        .run(CrawlRequest::new("hu_ge", 2).unwrap())
        .await;

    assert!(matches!(outcome, CrawlOutcome::Cancelled { page: 1 }));
    let calls = h.extractor.calls();
    assert_eq!(calls.len(), 40);
    assert!(calls.iter().all(|&p| p == 1));
    assert!(h.exported_files().is_empty());
}

#[tokio::test]
async fn closed_surface_aborts_without_export() {
    let closed = ExtractFailure::new(
        ExtractStep::Extract,
        "Protocol error (Runtime.evaluate): Target closed.",
    );
    assert_eq!(closed.kind, FailureKind::Fatal);

    let extractor = ScriptedExtractor::new(vec![Ok(owned(&["a"])), Err(closed)]);
    let h = Harness::new(extractor, None, true).await;
    let mut rx = h.status.subscribe();

    let outcome = h
        .orchestrator()
        .run(CrawlRequest::new("hu_ge", 3).unwrap())
        .await;

    assert!(matches!(outcome, CrawlOutcome::AbortedFatal { page: 2, .. }));
    assert_eq!(h.extractor.calls(), vec![1, 2]);
    assert!(h.exported_files().is_empty());

    let mut saw_fatal = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            StatusEvent::Progress(_) | StatusEvent::Ready { .. } => {
                panic!("export must not start after a fatal failure")
            }
            StatusEvent::Error {
                kind: ErrorKind::ExtractFatal,
                ..
            } => saw_fatal = true,
            _ => {}
        }
    }
    assert!(saw_fatal);
}

#[tokio::test]
async fn missing_session_is_a_precondition_failure() {
    let h = Harness::new(ScriptedExtractor::new(vec![]), Some(5), false).await;

    let outcome = h
        .orchestrator()
        .run(CrawlRequest::new("hu_ge", 2).unwrap())
        .await;

    assert!(matches!(
        outcome,
        CrawlOutcome::PreconditionFailed(PreconditionError::MissingSession)
    ));
    assert!(h.extractor.calls().is_empty());
    assert!(h.provider.opened_options().is_empty());
    assert!(has_message(&h.status.history(), "Crawl not started"));
}

#[tokio::test]
async fn unopenable_surface_aborts_before_any_page() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_session(&config).await;
    let mut provider = MockProvider::new(SurfaceScript::default());
    provider.fail_open = true;
    let extractor = Arc::new(ScriptedExtractor::new(vec![]));
    let extractor_dyn: Arc<dyn PageExtractor> = extractor.clone();

    let mut orchestrator = CrawlOrchestrator::new(
        Arc::new(provider),
        extractor_dyn,
        SessionStore::new(config.session_path()),
        config.export_dir(),
        RetryPolicy::from_config(&config),
        StatusChannel::new(64),
        CancellationToken::new(),
    );
    let outcome = orchestrator
        .run(CrawlRequest::new("hu_ge", 1).unwrap())
        .await;

    assert!(matches!(outcome, CrawlOutcome::AbortedFatal { page: 0, .. }));
    assert!(extractor.calls().is_empty());
}

#[tokio::test]
async fn export_failure_keeps_the_buffer() {
    let extractor = ScriptedExtractor::new(vec![Ok(owned(&["a", "b"])), Ok(owned(&["c"]))]);
    let h = Harness::new(extractor, Some(5), true).await;
    // A plain file where the export directory should be
    std::fs::write(h.config.export_dir(), b"").unwrap();

    let mut orchestrator = h.orchestrator();
    let outcome = orchestrator
        .run(CrawlRequest::new("hu_ge", 2).unwrap())
        .await;

    match outcome {
        CrawlOutcome::ExportFailed { buffer, .. } => {
            assert_eq!(buffer.records(), owned(&["a", "b", "c"]).as_slice());
        }
        other => panic!("expected ExportFailed, got {other:?}"),
    }
    assert_eq!(orchestrator.buffer().len(), 3);
    assert_eq!(orchestrator.progress().state, CrawlState::ExportFailed);
    assert!(has_message(&h.status.history(), "Export failed"));
}

#[tokio::test]
async fn completion_is_processing_then_ready() {
    let h = Harness::new(ScriptedExtractor::new(vec![Ok(owned(&["x"]))]), Some(5), true).await;
    let mut rx = h.status.subscribe();

    let outcome = h
        .orchestrator()
        .run(CrawlRequest::new("hu_ge", 1).unwrap())
        .await;
    let artifact = outcome.artifact().unwrap().clone();

    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            StatusEvent::Progress(CompletionPhase::Processing) => phases.push("processing"),
            StatusEvent::Ready { path, row_count } => {
                assert_eq!(path, artifact.path);
                assert_eq!(row_count, 1);
                phases.push("ready");
            }
            _ => {}
        }
    }
    assert_eq!(phases, vec!["processing", "ready"]);

    let history = messages(&h.status.history());
    let expected = [
        "Reading session",
        "Session read",
        "Spider started",
        "Crawling page 1 of 1",
        "Crawl finished",
        "Export written",
    ];
    let positions: Vec<usize> = expected
        .iter()
        .map(|m| history.iter().position(|h| h == m).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{history:?}");
}

#[tokio::test]
async fn exporting_the_same_buffer_twice_gives_same_rows_in_distinct_files() {
    let dir = TempDir::new().unwrap();
    let buffer = RecordBuffer::from(owned(&["a", " b ", "", "a", "c, d"]));

    let mut first_buffer = buffer.clone();
    let mut second_buffer = buffer.clone();
    let first = exporter::export(&mut first_buffer, "hu_ge", dir.path())
        .await
        .unwrap();
    let second = exporter::export(&mut second_buffer, "hu_ge", dir.path())
        .await
        .unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(first.row_count, 3);
    assert_eq!(second.row_count, first.row_count);

    let first_bytes = std::fs::read(&first.path).unwrap();
    let second_bytes = std::fs::read(&second.path).unwrap();
    assert!(first_bytes.starts_with("\u{feff}".as_bytes()));
    assert!(second_bytes.starts_with("\u{feff}".as_bytes()));
    assert_eq!(first_bytes, second_bytes);
    assert!(first_buffer.is_empty() && second_buffer.is_empty());
}
