//! Streaming coach analysis.

use crate::stream_client::{StreamClient, StreamOutcome, TransportProfile};
use en_buddy_core::config::Endpoints;
use en_buddy_core::error::{EnBuddyError, Result};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Recorded when analysis is requested for a blank history.
pub const EMPTY_HISTORY_MESSAGE: &str = "请粘贴聊天记录后再分析";

/// Recorded when an analysis fails without a usable message.
pub const ANALYSIS_FAILED_MESSAGE: &str = "分析失败，请重试";

/// Recorded when an analysis is stopped before it completes.
pub const ANALYSIS_CANCELLED_MESSAGE: &str = "分析已取消";

/// Recorded when the backend stops sending before the analysis completes.
pub const ANALYSIS_TIMED_OUT_MESSAGE: &str = "分析超时，请重试";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Analyzing,
    Settled,
}

/// What observers see of an analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSnapshot {
    pub analysis: String,
    pub error: Option<String>,
    pub analyzing: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    chat_history: &'a str,
}

/// Accumulates a streamed analysis report.
pub struct AnalysisAssembler {
    client: StreamClient,
    path: String,
    state: AnalysisState,
    analysis: String,
    error: Option<String>,
    snapshots: watch::Sender<AnalysisSnapshot>,
}

impl AnalysisAssembler {
    pub fn new(client: StreamClient, endpoints: &Endpoints) -> Self {
        let (snapshots, _) = watch::channel(AnalysisSnapshot::default());
        Self {
            client,
            path: endpoints.coach_analyze.clone(),
            state: AnalysisState::Idle,
            analysis: String::new(),
            error: None,
            snapshots,
        }
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    /// Text accumulated so far, partial after a failure.
    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    /// Message of the last failure, if the last analysis failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.snapshots.subscribe()
    }

    /// Streams an analysis of `chat_history`.
    ///
    /// Returns `Ok(Some(report))` on success and `Ok(None)` when the
    /// stream failed, was cancelled or timed out. In that case
    /// [`error`](Self::error) holds the reason and the partial text stays
    /// in [`analysis`](Self::analysis).
    ///
    /// # Errors
    ///
    /// A blank history fails with a validation error before any request.
    pub async fn analyze_chat(
        &mut self,
        chat_history: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        if chat_history.trim().is_empty() {
            self.error = Some(EMPTY_HISTORY_MESSAGE.to_string());
            self.publish();
            return Err(EnBuddyError::validation(EMPTY_HISTORY_MESSAGE));
        }

        self.analysis.clear();
        self.error = None;
        self.state = AnalysisState::Analyzing;
        self.publish();
        tracing::info!(chars = chat_history.chars().count(), "Coach analysis started");

        let request = AnalyzeRequest { chat_history };
        let analysis = &mut self.analysis;
        let snapshots = &self.snapshots;

        let result = self
            .client
            .stream(
                &self.path,
                &request,
                TransportProfile::COACH,
                |payload| {
                    analysis.push_str(payload);
                    snapshots.send_modify(|snapshot| snapshot.analysis.push_str(payload));
                },
                cancel,
            )
            .await;

        let error = match result {
            Ok(StreamOutcome::Completed) => None,
            Ok(StreamOutcome::Cancelled) => Some(ANALYSIS_CANCELLED_MESSAGE.to_string()),
            Ok(StreamOutcome::TimedOut) => Some(ANALYSIS_TIMED_OUT_MESSAGE.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Coach analysis failed");
                Some(failure_message(&e))
            }
        };

        self.state = AnalysisState::Settled;
        self.error = error;
        self.publish();

        match &self.error {
            None => {
                tracing::info!(chars = self.analysis.chars().count(), "Coach analysis completed");
                Ok(Some(self.analysis.clone()))
            }
            Some(_) => Ok(None),
        }
    }

    /// Clears the visible analysis and error.
    pub fn clear_analysis(&mut self) {
        self.analysis.clear();
        self.error = None;
        self.publish();
    }

    /// Replaces the visible analysis, e.g. with a stored report.
    pub fn set_analysis_content(&mut self, content: impl Into<String>) {
        self.analysis = content.into();
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(AnalysisSnapshot {
            analysis: self.analysis.clone(),
            error: self.error.clone(),
            analyzing: self.state == AnalysisState::Analyzing,
        });
    }
}

/// User-facing message for a failed analysis.
fn failure_message(error: &EnBuddyError) -> String {
    match error {
        EnBuddyError::Http { message, .. } if !message.is_empty() => message.clone(),
        _ => ANALYSIS_FAILED_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, ScriptedTransport, Step};
    use std::sync::Arc;
    use std::time::Duration;

    fn assembler(replies: Vec<Reply>) -> (AnalysisAssembler, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(replies));
        let client = StreamClient::new(transport.clone(), Some(Duration::from_millis(200)));
        (AnalysisAssembler::new(client, &Endpoints::default()), transport)
    }

    #[tokio::test]
    async fn test_analysis_accumulates_with_newlines() {
        let (mut coach, transport) = assembler(vec![Reply::ok(vec![
            Step::text("data:## Summary\ndata:\n"),
            Step::text("data:Good job"),
        ])]);

        let result = coach
            .analyze_chat("A: hi\nB: hello", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.as_deref(), Some("## Summary\nGood job"));
        assert_eq!(coach.analysis(), "## Summary\nGood job");
        assert_eq!(coach.error(), None);
        assert_eq!(coach.state(), AnalysisState::Settled);

        let (path, body) = &transport.opened()[0];
        assert_eq!(path, "/api/coach/analyze");
        assert_eq!(body["chatHistory"], "A: hi\nB: hello");
    }

    #[tokio::test]
    async fn test_blank_history_never_reaches_transport() {
        let (mut coach, transport) = assembler(vec![]);

        let err = coach.analyze_chat("", &CancellationToken::new()).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(transport.open_count(), 0);
        assert_eq!(coach.error(), Some(EMPTY_HISTORY_MESSAGE));
        assert_eq!(coach.state(), AnalysisState::Idle);
    }

    #[tokio::test]
    async fn test_error_field_is_recorded_verbatim() {
        let (mut coach, _) = assembler(vec![Reply::status(429, r#"{"error":"quota"}"#)]);

        let result = coach.analyze_chat("A: hi", &CancellationToken::new()).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(coach.error(), Some("quota"));
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_text() {
        let (mut coach, _) = assembler(vec![Reply::ok(vec![
            Step::text("data:Part one\n"),
            Step::Fail("reset".into()),
        ])]);

        let result = coach.analyze_chat("A: hi", &CancellationToken::new()).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(coach.analysis(), "Part one");
        assert_eq!(coach.error(), Some(ANALYSIS_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn test_timeout_is_recorded() {
        let (mut coach, _) = assembler(vec![Reply::ok(vec![Step::Stall])]);
        let result = coach.analyze_chat("A: hi", &CancellationToken::new()).await.unwrap();
        assert_eq!(result, None);
        assert_eq!(coach.error(), Some(ANALYSIS_TIMED_OUT_MESSAGE));
    }

    #[tokio::test]
    async fn test_cancel_keeps_partial_and_records_cancelled() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![
            Step::text("data:Part\n"),
            Step::Stall,
        ])]));
        let client = StreamClient::new(transport, None);
        let mut coach = AnalysisAssembler::new(client, &Endpoints::default());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let result = coach.analyze_chat("A: hi", &cancel).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(coach.analysis(), "Part");
        assert_eq!(coach.error(), Some(ANALYSIS_CANCELLED_MESSAGE));
        assert_eq!(coach.state(), AnalysisState::Settled);
        assert!(!coach.subscribe().borrow().analyzing);
    }

    #[tokio::test]
    async fn test_new_analysis_clears_previous_state() {
        let (mut coach, _) = assembler(vec![
            Reply::status(500, ""),
            Reply::ok(vec![Step::text("data:fresh\n")]),
        ]);
        coach.set_analysis_content("stale");

        coach.analyze_chat("A: hi", &CancellationToken::new()).await.unwrap();
        assert!(coach.error().is_some());
        assert_eq!(coach.analysis(), "");

        coach.analyze_chat("A: hi", &CancellationToken::new()).await.unwrap();
        assert_eq!(coach.error(), None);
        assert_eq!(coach.analysis(), "fresh");
    }

    #[tokio::test]
    async fn test_snapshot_tracks_progress() {
        let (mut coach, _) = assembler(vec![Reply::ok(vec![Step::text("data:a\ndata:b\n")])]);
        let snapshots = coach.subscribe();

        coach.analyze_chat("A: hi", &CancellationToken::new()).await.unwrap();

        let snapshot = snapshots.borrow().clone();
        assert_eq!(snapshot.analysis, "ab");
        assert!(!snapshot.analyzing);
    }

    #[test]
    fn test_clear_and_set_content() {
        let (mut coach, _) = assembler(vec![]);
        coach.set_analysis_content("# Stored report");
        assert_eq!(coach.analysis(), "# Stored report");

        coach.clear_analysis();
        assert_eq!(coach.analysis(), "");
        assert_eq!(coach.error(), None);
    }
}
