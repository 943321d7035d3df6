//! Research request lifecycle types.
//!
//! A request moves through a fixed stage sequence; stage payloads travel in
//! [`WorkflowState`] so an invalid state/payload combination is
//! unrepresentable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::{ExtractedContent, ExtractionFailure};
use super::paper::Paper;

/// Externally visible status of a research request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Init,
    CheckingKb,
    Discovering,
    Extracting,
    Synthesizing,
    Completed,
    Failed,
}

impl RequestStatus {
    /// Terminal states permit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    /// Human-readable step label reported to clients.
    pub fn step_label(&self) -> &'static str {
        match self {
            RequestStatus::Init => "initializing",
            RequestStatus::CheckingKb => "checking_knowledge_base",
            RequestStatus::Discovering => "discovering_papers",
            RequestStatus::Extracting => "extracting_content",
            RequestStatus::Synthesizing => "synthesizing_results",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    /// Progress percentage on entering this state.
    ///
    /// Fixed weight table (KB-check 10, discovery 30, extraction 40,
    /// synthesis 20) so progress is deterministic and monotonic even though
    /// stage durations vary. The value is the cumulative weight of the
    /// stages already completed.
    pub fn entry_progress(&self) -> u8 {
        match self {
            RequestStatus::Init | RequestStatus::CheckingKb => 0,
            RequestStatus::Discovering => 10,
            RequestStatus::Extracting => 40,
            RequestStatus::Synthesizing => 80,
            RequestStatus::Completed => 100,
            // Failed keeps whatever progress was reached; callers use
            // max(old, entry) so 0 never regresses it.
            RequestStatus::Failed => 0,
        }
    }
}

/// Opaque structured payload returned by the external synthesis service.
///
/// The engine treats it as an immutable attachment to the final request
/// state, peeking only at `summary` / `key_findings` for quality scoring.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SynthesisResult(pub serde_json::Value);

impl SynthesisResult {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Length of the `summary` field, if present.
    pub fn summary_len(&self) -> usize {
        self.0
            .get("summary")
            .and_then(|s| s.as_str())
            .map(str::len)
            .unwrap_or(0)
    }

    /// Number of entries in the `key_findings` field, if present.
    pub fn key_findings_count(&self) -> usize {
        self.0
            .get("key_findings")
            .and_then(|f| f.as_array())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Final payload of a completed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub synthesis: SynthesisResult,
    pub papers_found: usize,
    pub content_extracted: usize,
    /// 0-100 heuristic score over paper count, extraction ratio, and
    /// synthesis richness.
    pub quality_score: u8,
}

/// Internal workflow state with per-stage payloads.
///
/// The externally visible [`RequestStatus`] is a projection of this; the
/// payloads never leave the engine task.
#[derive(Debug)]
pub enum WorkflowState {
    Init,
    CheckingKb,
    Discovering,
    Extracting {
        papers: Vec<Paper>,
    },
    Synthesizing {
        papers: Vec<Paper>,
        contents: Vec<ExtractedContent>,
        failures: Vec<ExtractionFailure>,
    },
    Completed(ResearchOutcome),
    Failed {
        error: String,
    },
}

impl WorkflowState {
    pub fn status(&self) -> RequestStatus {
        match self {
            WorkflowState::Init => RequestStatus::Init,
            WorkflowState::CheckingKb => RequestStatus::CheckingKb,
            WorkflowState::Discovering => RequestStatus::Discovering,
            WorkflowState::Extracting { .. } => RequestStatus::Extracting,
            WorkflowState::Synthesizing { .. } => RequestStatus::Synthesizing,
            WorkflowState::Completed(_) => RequestStatus::Completed,
            WorkflowState::Failed { .. } => RequestStatus::Failed,
        }
    }
}

/// A tracked research request.
///
/// Owned exclusively by the engine; mutated only through its transition
/// guard, which enforces terminal immutability and monotonic progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub id: Uuid,
    pub query: String,
    pub max_items: usize,
    pub created_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub current_step: String,
    pub progress_percent: u8,
    pub error: Option<String>,
    /// Set once the request completes; immutable thereafter.
    pub outcome: Option<ResearchOutcome>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>, max_items: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            max_items,
            created_at: Utc::now(),
            status: RequestStatus::Init,
            current_step: RequestStatus::Init.step_label().to_string(),
            progress_percent: 0,
            error: None,
            outcome: None,
        }
    }

    /// Apply a status transition, keeping progress monotonic.
    ///
    /// Returns false (and leaves the record untouched) if the request is
    /// already terminal.
    pub fn transition(&mut self, next: RequestStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = next;
        self.current_step = next.step_label().to_string();
        self.progress_percent = self.progress_percent.max(next.entry_progress());
        true
    }

    /// Point-in-time view for status polling and push subscriptions.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            request_id: self.id,
            status: self.status,
            current_step: self.current_step.clone(),
            progress: self.progress_percent,
        }
    }
}

/// Snapshot returned by `get_status` and pushed to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub current_step: String,
    pub progress: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_starts_in_init() {
        let req = ResearchRequest::new("transformers", 10);
        assert_eq!(req.status, RequestStatus::Init);
        assert_eq!(req.progress_percent, 0);
        assert!(req.error.is_none());
    }

    #[test]
    fn transition_updates_step_and_progress() {
        let mut req = ResearchRequest::new("q", 10);
        assert!(req.transition(RequestStatus::CheckingKb));
        assert!(req.transition(RequestStatus::Discovering));
        assert_eq!(req.current_step, "discovering_papers");
        assert_eq!(req.progress_percent, 10);
    }

    #[test]
    fn terminal_states_are_immutable() {
        let mut req = ResearchRequest::new("q", 10);
        req.transition(RequestStatus::Completed);
        assert!(!req.transition(RequestStatus::Discovering));
        assert_eq!(req.status, RequestStatus::Completed);
    }

    #[test]
    fn progress_never_regresses() {
        let mut req = ResearchRequest::new("q", 10);
        req.transition(RequestStatus::Synthesizing);
        assert_eq!(req.progress_percent, 80);
        // Failure after synthesis keeps the progress already reached.
        req.transition(RequestStatus::Failed);
        assert_eq!(req.progress_percent, 80);
    }

    #[test]
    fn kb_sufficient_path_skips_forward_monotonically() {
        let mut req = ResearchRequest::new("q", 10);
        req.transition(RequestStatus::CheckingKb);
        req.transition(RequestStatus::Synthesizing);
        assert_eq!(req.progress_percent, 80);
        req.transition(RequestStatus::Completed);
        assert_eq!(req.progress_percent, 100);
    }

    #[test]
    fn synthesis_result_peeks_fields() {
        let result = SynthesisResult::new(serde_json::json!({
            "summary": "abcd",
            "key_findings": ["a", "b"],
        }));
        assert_eq!(result.summary_len(), 4);
        assert_eq!(result.key_findings_count(), 2);

        let empty = SynthesisResult::default();
        assert_eq!(empty.summary_len(), 0);
        assert_eq!(empty.key_findings_count(), 0);
    }
}
