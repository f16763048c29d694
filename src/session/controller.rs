//! The analysis flow controller.
//!
//! Drives one session through the two-phase flow: submit a URL, extract
//! features, let the user narrow the selection, start the analysis, and
//! poll status until a terminal outcome. The controller owns all mutable
//! session state and the single polling loop; teardown is cooperative
//! through a watch channel, and a status response that arrives after
//! teardown is dropped rather than applied.
//!
//! Nothing here retries automatically. Every failure lands the session
//! in an interactive phase from which the user decides what to do next.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::{AnalysisBackend, ApiError};
use crate::models::{AnalysisSession, SessionPhase, StatusSnapshot};
use crate::urls;

/// Errors surfaced to the caller of controller operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Local validation failure; the backend was never contacted.
    #[error("{0}")]
    Validation(String),

    /// A backend operation failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Handle for tearing down an active polling loop from outside the
/// controller (e.g. a Ctrl-C handler).
#[derive(Clone)]
pub struct TeardownHandle {
    cancel: Arc<watch::Sender<bool>>,
}

impl TeardownHandle {
    /// Stop the polling loop. Idempotent.
    pub fn teardown(&self) {
        let _ = self.cancel.send(true);
    }
}

/// Orchestrates a single analysis session against a backend.
pub struct AnalysisController<B> {
    backend: Arc<B>,
    session: AnalysisSession,
    poll_interval: Duration,
    completion_delay: Duration,
    cancel: Arc<watch::Sender<bool>>,
    cancelled: watch::Receiver<bool>,
}

impl<B: AnalysisBackend> AnalysisController<B> {
    /// Create a controller with an empty `Input` session.
    pub fn new(backend: Arc<B>, poll_interval: Duration, completion_delay: Duration) -> Self {
        let (cancel, cancelled) = watch::channel(false);
        Self {
            backend,
            session: AnalysisSession::new("", ""),
            poll_interval,
            completion_delay,
            cancel: Arc::new(cancel),
            cancelled,
        }
    }

    pub fn session(&self) -> &AnalysisSession {
        &self.session
    }

    /// Handle for cancelling the polling loop from another task.
    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle {
            cancel: Arc::clone(&self.cancel),
        }
    }

    /// Submit a product URL: validate, check backend health, and extract
    /// features. On success the session moves to `SelectingFeatures`.
    ///
    /// Validation failures leave the session in `Input` untouched.
    /// Extraction failures leave it in `ExtractingFeatures` with the
    /// error recorded, so the user can resubmit.
    pub async fn submit(&mut self, url: &str, name: Option<&str>) -> Result<(), FlowError> {
        match self.session.phase {
            SessionPhase::Input | SessionPhase::ExtractingFeatures => {}
            phase => {
                return Err(FlowError::Validation(format!(
                    "Cannot submit a URL while the session is {}",
                    phase.as_str()
                )))
            }
        }

        let url = url.trim();
        if url.is_empty() {
            return Err(FlowError::Validation("Please enter a product URL".into()));
        }
        if !urls::is_valid_url(url) {
            return Err(FlowError::Validation("Please enter a valid URL".into()));
        }
        if !urls::is_supported_retail_url(url) {
            return Err(FlowError::Validation(
                "Currently we only support Amazon product URLs".into(),
            ));
        }

        if let Err(err) = self.backend.health_check().await {
            self.session.error_message = Some(err.to_string());
            return Err(err.into());
        }

        let derived = urls::derive_product_name(url);
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ if !derived.is_empty() => derived,
            _ => "Product Analysis".to_string(),
        };

        self.session.product_url = url.to_string();
        self.session.product_name = name;
        self.session.phase = SessionPhase::ExtractingFeatures;
        self.session.error_message = None;
        info!(url, "extracting features");

        match self
            .backend
            .extract_features(&self.session.product_url, &self.session.product_name)
            .await
        {
            Ok(features) => {
                debug!(count = features.len(), "features extracted");
                self.session.set_extracted_features(features);
                self.session.phase = SessionPhase::SelectingFeatures;
                Ok(())
            }
            Err(err) => {
                // The input form stays available; the user may resubmit.
                warn!(error = %err, "feature extraction failed");
                self.session.error_message = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Flip one feature's selection. Only meaningful while selecting.
    pub fn toggle_feature(&mut self, feature: &str) {
        if self.session.phase == SessionPhase::SelectingFeatures {
            self.session.toggle_feature(feature);
        }
    }

    /// Select all features, or clear the selection if everything is
    /// already selected.
    pub fn toggle_all(&mut self) {
        if self.session.phase == SessionPhase::SelectingFeatures {
            self.session.toggle_all();
        }
    }

    /// Abandon feature selection and return to `Input`, discarding the
    /// extraction.
    pub fn back(&mut self) {
        if self.session.phase == SessionPhase::SelectingFeatures {
            self.session = AnalysisSession::new("", "");
        }
    }

    /// Confirm the feature selection and start the analysis. On success
    /// the session enters `Analyzing` and the caller should run
    /// [`poll_until_terminal`](Self::poll_until_terminal).
    ///
    /// If the start call fails the session lands in `Failed` and the
    /// polling loop must never be started for it.
    pub async fn confirm(&mut self) -> Result<(), FlowError> {
        if self.session.phase != SessionPhase::SelectingFeatures {
            return Err(FlowError::Validation(
                "No feature selection is in progress".into(),
            ));
        }
        if self.session.selected_features.is_empty() {
            return Err(FlowError::Validation(
                "Please select at least one feature to analyze".into(),
            ));
        }

        self.session.reset_analysis_state();
        self.session.phase = SessionPhase::Analyzing;
        info!(
            url = %self.session.product_url,
            features = self.session.selected_features.len(),
            "starting analysis"
        );

        let result = self
            .backend
            .start_analysis(
                &self.session.product_url,
                &self.session.product_name,
                Some(&self.session.selected_features),
            )
            .await;

        if let Err(err) = result {
            warn!(error = %err, "failed to start analysis");
            self.session.error_message = Some(err.to_string());
            self.session.phase = SessionPhase::Failed;
            return Err(err.into());
        }
        Ok(())
    }

    /// Poll the backend until the session reaches a terminal phase or
    /// teardown fires. Polls once immediately, then on the fixed
    /// interval. `on_tick` runs after every applied snapshot so the
    /// caller can render progress.
    ///
    /// Returns the phase the session ended in. A torn-down session is
    /// returned in whatever phase it was in; no further state is applied
    /// once cancellation is observed.
    pub async fn poll_until_terminal<F>(&mut self, mut on_tick: F) -> SessionPhase
    where
        F: FnMut(&AnalysisSession),
    {
        if self.session.phase != SessionPhase::Analyzing {
            return self.session.phase;
        }

        let backend = Arc::clone(&self.backend);
        let mut cancelled = self.cancelled.clone();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                _ = cancelled.changed() => {
                    if *cancelled.borrow() {
                        debug!("polling torn down");
                        break None;
                    }
                }
                _ = ticker.tick() => {
                    // Cancellation during an in-flight request drops the
                    // request future; its response is never applied.
                    let status = tokio::select! {
                        _ = cancelled.changed() => {
                            if *cancelled.borrow() {
                                debug!("polling torn down mid-request");
                                break None;
                            }
                            continue;
                        }
                        status = backend.get_status() => status,
                    };

                    match status {
                        Ok(snapshot) => {
                            self.apply_snapshot(&snapshot);
                            on_tick(&self.session);

                            if let Some(error) = &snapshot.error {
                                warn!(%error, "analysis failed");
                                self.session.phase = SessionPhase::Failed;
                                break Some(None);
                            }
                            if snapshot.is_complete() {
                                break Some(snapshot.result);
                            }
                        }
                        Err(err) => {
                            // Transport failure ends the session; the
                            // user retries explicitly.
                            warn!(error = %err, "status poll failed");
                            self.session.error_message = Some(err.to_string());
                            self.session.phase = SessionPhase::Failed;
                            break Some(None);
                        }
                    }
                }
            }
        };

        // The ticker is gone by this point; only the completion grace
        // delay remains, and teardown can still skip the handoff.
        if let Some(Some(result)) = outcome {
            let mut cancelled = self.cancelled.clone();
            tokio::select! {
                _ = cancelled.changed() => {
                    if *cancelled.borrow() {
                        return self.session.phase;
                    }
                }
                _ = tokio::time::sleep(self.completion_delay) => {}
            }
            info!("analysis complete");
            self.session.result = Some(result);
            self.session.phase = SessionPhase::Completed;
        }

        self.session.phase
    }

    /// Overwrite session state from a status snapshot. Last write wins;
    /// the client does not enforce monotonic progress against a
    /// misbehaving backend.
    fn apply_snapshot(&mut self, snapshot: &StatusSnapshot) {
        self.session.progress = snapshot.progress;
        self.session.current_phase_label = snapshot.current_phase.clone();
        if snapshot.start_time.is_some() {
            self.session.start_time = snapshot.start_time;
        }
        self.session.error_message = snapshot.error.clone();
    }

    /// Discard the session and return to `Input`. Valid from the
    /// terminal phases and as an explicit restart from anywhere else.
    pub fn reset(&mut self) {
        let _ = self.cancel.send(true);
        let (cancel, cancelled) = watch::channel(false);
        self.cancel = Arc::new(cancel);
        self.cancelled = cancelled;
        self.session = AnalysisSession::new("", "");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::models::AnalysisResult;

    const POLL: Duration = Duration::from_secs(2);
    const GRACE: Duration = Duration::from_secs(2);

    /// Scripted backend: pops queued status responses, repeating the
    /// last one when the script runs out.
    #[derive(Default)]
    struct ScriptedBackend {
        extract: Mutex<Option<Result<Vec<String>, ApiError>>>,
        start: Mutex<Option<Result<(), ApiError>>>,
        statuses: Mutex<VecDeque<Result<StatusSnapshot, ApiError>>>,
        status_calls: AtomicUsize,
        healthy: bool,
    }

    impl ScriptedBackend {
        fn healthy() -> Self {
            Self {
                healthy: true,
                ..Default::default()
            }
        }

        fn with_features(features: &[&str]) -> Self {
            let backend = Self::healthy();
            *backend.extract.lock().unwrap() =
                Some(Ok(features.iter().map(|s| s.to_string()).collect()));
            *backend.start.lock().unwrap() = Some(Ok(()));
            backend
        }

        fn push_status(&self, status: Result<StatusSnapshot, ApiError>) {
            self.statuses.lock().unwrap().push_back(status);
        }

        fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    fn running(progress: i64) -> StatusSnapshot {
        StatusSnapshot {
            is_running: true,
            progress,
            current_phase: format!("phase at {}", progress),
            ..Default::default()
        }
    }

    fn completed() -> StatusSnapshot {
        StatusSnapshot {
            is_running: false,
            progress: 100,
            result: Some(AnalysisResult::default()),
            ..Default::default()
        }
    }

    fn failed(message: &str) -> StatusSnapshot {
        StatusSnapshot {
            is_running: false,
            error: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[async_trait::async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn health_check(&self) -> Result<(), ApiError> {
            if self.healthy {
                Ok(())
            } else {
                Err(ApiError::Unreachable)
            }
        }

        async fn extract_features(&self, _url: &str, _name: &str) -> Result<Vec<String>, ApiError> {
            self.extract
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(ApiError::ExtractionFailed("unscripted".into())))
        }

        async fn start_analysis(
            &self,
            _url: &str,
            _name: &str,
            _selected: Option<&[String]>,
        ) -> Result<(), ApiError> {
            self.start
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(ApiError::StartFailed("unscripted".into())))
        }

        async fn get_status(&self) -> Result<StatusSnapshot, ApiError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                // ApiError is not Clone; only Ok statuses repeat.
                match statuses.front() {
                    Some(Ok(snapshot)) => Ok(snapshot.clone()),
                    Some(Err(_)) => Err(ApiError::StatusUnavailable),
                    None => Ok(running(0)),
                }
            }
        }

        async fn get_results(&self) -> Result<AnalysisResult, ApiError> {
            Err(ApiError::NotFound)
        }

        async fn download_file(&self, _filename: &str) -> Result<Vec<u8>, ApiError> {
            Err(ApiError::DownloadFailed("unscripted".into()))
        }
    }

    async fn ready_controller(
        backend: Arc<ScriptedBackend>,
    ) -> AnalysisController<ScriptedBackend> {
        let mut controller = AnalysisController::new(backend, POLL, GRACE);
        controller
            .submit("https://www.amazon.com/Wireless-Headphones-Test/dp/B000", None)
            .await
            .unwrap();
        controller
    }

    #[tokio::test]
    async fn submit_rejects_empty_and_invalid_urls() {
        let backend = Arc::new(ScriptedBackend::healthy());
        let mut controller = AnalysisController::new(backend, POLL, GRACE);

        assert!(matches!(
            controller.submit("", None).await,
            Err(FlowError::Validation(_))
        ));
        assert!(matches!(
            controller.submit("not a url", None).await,
            Err(FlowError::Validation(_))
        ));
        assert!(matches!(
            controller.submit("https://www.example-shop.com/x", None).await,
            Err(FlowError::Validation(_))
        ));
        assert_eq!(controller.session().phase, SessionPhase::Input);
    }

    #[tokio::test]
    async fn submit_blocked_when_backend_unreachable() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut controller = AnalysisController::new(backend, POLL, GRACE);

        let err = controller
            .submit("https://www.amazon.com/dp/B000", None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Api(ApiError::Unreachable)));
        assert_eq!(controller.session().phase, SessionPhase::Input);
        assert!(controller.session().error_message.is_some());
    }

    #[tokio::test]
    async fn submit_extracts_and_selects_all() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery", "Sound"]));
        let controller = ready_controller(backend).await;

        let session = controller.session();
        assert_eq!(session.phase, SessionPhase::SelectingFeatures);
        assert_eq!(session.extracted_features, vec!["Battery", "Sound"]);
        assert_eq!(session.selected_features, vec!["Battery", "Sound"]);
        assert_eq!(session.product_name, "Wireless Headphones Test");
    }

    #[tokio::test]
    async fn extraction_failure_keeps_form_open() {
        let backend = Arc::new(ScriptedBackend::healthy());
        *backend.extract.lock().unwrap() =
            Some(Err(ApiError::ExtractionFailed("no reviews found".into())));
        let mut controller = AnalysisController::new(Arc::clone(&backend), POLL, GRACE);

        let err = controller
            .submit("https://www.amazon.com/dp/B000", None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Api(ApiError::ExtractionFailed(_))));
        assert_eq!(controller.session().phase, SessionPhase::ExtractingFeatures);
        assert_eq!(
            controller.session().error_message.as_deref(),
            Some("Feature extraction failed: no reviews found")
        );

        // Resubmission works after the transient failure.
        *backend.extract.lock().unwrap() = Some(Ok(vec!["Battery".into()]));
        controller
            .submit("https://www.amazon.com/dp/B000", None)
            .await
            .unwrap();
        assert_eq!(controller.session().phase, SessionPhase::SelectingFeatures);
    }

    #[tokio::test]
    async fn confirm_rejects_empty_selection() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        let mut controller = ready_controller(backend).await;

        controller.toggle_all();
        assert!(controller.session().selected_features.is_empty());

        let err = controller.confirm().await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));
        assert_eq!(controller.session().phase, SessionPhase::SelectingFeatures);
    }

    #[tokio::test]
    async fn back_discards_extraction() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        let mut controller = ready_controller(backend).await;

        controller.back();
        assert_eq!(controller.session().phase, SessionPhase::Input);
        assert!(controller.session().extracted_features.is_empty());
    }

    #[tokio::test]
    async fn start_failure_fails_without_polling() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        *backend.start.lock().unwrap() = Some(Err(ApiError::AlreadyRunning));
        let mut controller = ready_controller(Arc::clone(&backend)).await;

        let err = controller.confirm().await.unwrap_err();
        assert!(matches!(err, FlowError::Api(ApiError::AlreadyRunning)));
        assert_eq!(controller.session().phase, SessionPhase::Failed);
        assert!(controller.session().error_message.is_some());

        // Polling refuses to run for a failed session.
        let phase = controller.poll_until_terminal(|_| {}).await;
        assert_eq!(phase, SessionPhase::Failed);
        assert_eq!(backend.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_completes_after_grace_delay() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        backend.push_status(Ok(running(30)));
        backend.push_status(Ok(running(80)));
        backend.push_status(Ok(completed()));
        let mut controller = ready_controller(Arc::clone(&backend)).await;
        controller.confirm().await.unwrap();

        let mut ticks = 0usize;
        let phase = controller.poll_until_terminal(|_| ticks += 1).await;

        assert_eq!(phase, SessionPhase::Completed);
        assert_eq!(ticks, 3);
        assert_eq!(backend.status_calls(), 3);
        assert!(controller.session().result.is_some());
        assert!(controller.session().error_message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn completion_hands_off_exactly_once() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        backend.push_status(Ok(completed()));
        let mut controller = ready_controller(Arc::clone(&backend)).await;
        controller.confirm().await.unwrap();

        let phase = controller.poll_until_terminal(|_| {}).await;
        assert_eq!(phase, SessionPhase::Completed);
        let calls_at_completion = backend.status_calls();

        // A second call is a no-op for a terminal session.
        let phase = controller.poll_until_terminal(|_| {}).await;
        assert_eq!(phase, SessionPhase::Completed);
        assert_eq!(backend.status_calls(), calls_at_completion);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_error_fails_session_and_stops_polling() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        backend.push_status(Ok(running(50)));
        backend.push_status(Ok(failed("scraper blocked")));
        backend.push_status(Ok(running(60)));
        let mut controller = ready_controller(Arc::clone(&backend)).await;
        controller.confirm().await.unwrap();

        let phase = controller.poll_until_terminal(|_| {}).await;
        assert_eq!(phase, SessionPhase::Failed);
        assert_eq!(
            controller.session().error_message.as_deref(),
            Some("scraper blocked")
        );
        assert_eq!(backend.status_calls(), 2);

        // No further polls fire even as time keeps moving.
        tokio::time::sleep(POLL * 4).await;
        assert_eq!(backend.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_fails_session_without_retry() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        backend.push_status(Err(ApiError::StatusUnavailable));
        backend.push_status(Ok(running(10)));
        let mut controller = ready_controller(Arc::clone(&backend)).await;
        controller.confirm().await.unwrap();

        let phase = controller.poll_until_terminal(|_| {}).await;
        assert_eq!(phase, SessionPhase::Failed);
        assert_eq!(
            controller.session().error_message.as_deref(),
            Some("Failed to get analysis status")
        );
        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_overwrites_are_last_write_wins() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        backend.push_status(Ok(running(60)));
        // Out-of-order decrease is accepted as an overwrite.
        backend.push_status(Ok(running(40)));
        backend.push_status(Ok(completed()));
        let mut controller = ready_controller(Arc::clone(&backend)).await;
        controller.confirm().await.unwrap();

        let mut seen = Vec::new();
        controller.poll_until_terminal(|s| seen.push(s.progress)).await;
        assert_eq!(seen, vec![60, 40, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_future_polls() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        backend.push_status(Ok(running(10)));
        let mut controller = ready_controller(Arc::clone(&backend)).await;
        controller.confirm().await.unwrap();
        let handle = controller.teardown_handle();

        let task = tokio::spawn(async move {
            controller.poll_until_terminal(|_| {}).await;
            controller
        });

        // Let a few polls land, then tear down.
        tokio::time::sleep(POLL * 2 + Duration::from_millis(100)).await;
        let calls_before = backend.status_calls();
        assert!(calls_before >= 1);
        handle.teardown();

        let controller = task.await.unwrap();
        assert_eq!(controller.session().phase, SessionPhase::Analyzing);

        // Previously scheduled ticks must not fire after disposal.
        tokio::time::sleep(POLL * 5).await;
        assert_eq!(backend.status_calls(), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_during_grace_delay_skips_handoff() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        backend.push_status(Ok(completed()));
        let mut controller = ready_controller(Arc::clone(&backend)).await;
        controller.confirm().await.unwrap();
        let handle = controller.teardown_handle();

        let task = tokio::spawn(async move {
            let phase = controller.poll_until_terminal(|_| {}).await;
            (phase, controller)
        });

        // Inside the 2s grace window after the completion snapshot.
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.teardown();

        let (phase, controller) = task.await.unwrap();
        assert_eq!(phase, SessionPhase::Analyzing);
        assert!(controller.session().result.is_none());
    }

    #[tokio::test]
    async fn reset_returns_to_input() {
        let backend = Arc::new(ScriptedBackend::with_features(&["Battery"]));
        let mut controller = ready_controller(backend).await;

        controller.reset();
        let session = controller.session();
        assert_eq!(session.phase, SessionPhase::Input);
        assert!(session.product_url.is_empty());
        assert!(session.extracted_features.is_empty());
        assert!(session.error_message.is_none());
    }
}
