use crate::models::Citation;
use serde::{Deserialize, Serialize};

/// One decoded frame from the search backend's event stream.
///
/// The wire carries newline-delimited `data: {...}` frames; the JSON object's
/// `type` field selects the variant. Per-jurisdiction frames name their
/// pipeline in `state`; the decoder performs no reordering, so variants for
/// different jurisdictions arrive arbitrarily interleaved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    // Single-jurisdiction events
    Metadata {
        query: String,
        #[serde(default)]
        citations: Vec<Citation>,
    },

    /// Overflow citation chunk for the single-jurisdiction result.
    Citations {
        citations: Vec<Citation>,
    },

    /// Answer text delta for the single-jurisdiction result.
    Content {
        content: String,
    },

    // Multi-jurisdiction events
    #[serde(rename_all = "camelCase")]
    MultiStateMetadata {
        query: String,
        state_count: usize,
    },

    StateQueued {
        state: String,
    },

    StateProcessing {
        state: String,
    },

    #[serde(rename_all = "camelCase")]
    StateHeader {
        state: String,
        source_count: u32,
        #[serde(rename = "processingTime")]
        processing_time_ms: u64,
    },

    StateCitations {
        state: String,
        citations: Vec<Citation>,
    },

    StateContent {
        state: String,
        content: String,
    },

    StateComplete {
        state: String,
    },

    // Cross-jurisdiction summary events
    SummaryHeader,

    SummaryContent {
        content: String,
    },

    SummaryComplete,

    // Terminal events
    Done,

    Error {
        error: String,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }

    /// Jurisdiction code this event targets, if it is per-jurisdiction.
    pub fn jurisdiction(&self) -> Option<&str> {
        match self {
            StreamEvent::StateQueued { state }
            | StreamEvent::StateProcessing { state }
            | StreamEvent::StateHeader { state, .. }
            | StreamEvent::StateCitations { state, .. }
            | StreamEvent::StateContent { state, .. }
            | StreamEvent::StateComplete { state } => Some(state),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
