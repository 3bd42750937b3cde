use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

// ============================================================================
// Citations
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub id: String,
    /// Verbatim text the citation points at, as recorded by the backend.
    pub text: String,
    pub source: CitationSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CitationSource {
    pub document_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Page-space coordinates, producer-defined; carried opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<f64>>,
    pub start_char: usize,
    pub end_char: usize,
}

// ============================================================================
// Per-jurisdiction answers
// ============================================================================

/// Per-jurisdiction pipeline status. Ordered so the reducer can enforce that
/// status only ever advances within one session.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnswerStatus {
    #[default]
    Queued,
    Processing,
    Streaming,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateAnswer {
    pub jurisdiction_code: String,
    pub answer_text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub source_count: u32,
    pub processing_time_ms: u64,
    pub status: AnswerStatus,
}

impl StateAnswer {
    pub fn new(jurisdiction_code: impl Into<String>, status: AnswerStatus) -> Self {
        Self {
            jurisdiction_code: jurisdiction_code.into(),
            answer_text: String::new(),
            citations: Vec::new(),
            source_count: 0,
            processing_time_ms: 0,
            status,
        }
    }

    /// Status never goes backwards, even if the server replays an earlier
    /// lifecycle frame after a later one.
    pub fn advance_status(&mut self, status: AnswerStatus) {
        if status > self.status {
            self.status = status;
        }
    }
}

// ============================================================================
// Aggregated results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SingleStateResult {
    pub query: String,
    pub answer_text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MultiStateResult {
    pub query: String,
    /// Unique by jurisdiction code, in arrival order.
    pub state_answers: Vec<StateAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    pub total_processing_time_ms: u64,
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading,
    Streaming,
    Done,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchSession {
    pub id: Uuid,
    /// Monotonic generation token; stale events from a superseded session are
    /// discarded by comparing against the controller's current value.
    pub generation: u64,
    pub query: String,
    pub jurisdiction_codes: Vec<String>,
    pub mode: SearchMode,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl SearchSession {
    pub fn new(generation: u64, query: impl Into<String>, jurisdiction_codes: Vec<String>) -> Self {
        let mode = if jurisdiction_codes.len() > 1 {
            SearchMode::Multi
        } else {
            SearchMode::Single
        };
        Self {
            id: Uuid::now_v7(),
            generation,
            query: query.into(),
            jurisdiction_codes,
            mode,
            status: SessionStatus::Loading,
            error_message: None,
            started_at: chrono::Utc::now(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
