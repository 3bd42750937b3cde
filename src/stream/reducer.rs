use crate::models::{
    AnswerStatus, Citation, MultiStateResult, SearchMode, SessionStatus, SingleStateResult,
    StateAnswer,
};
use crate::stream::events::StreamEvent;

// ============================================================================
// Aggregate State
// ============================================================================

/// Everything one session has folded out of the event stream so far.
///
/// The reducer is a pure fold: `apply` consumes the previous state and the
/// next event and returns the successor state. It never touches the network
/// or the clock, so every transition is unit-testable in isolation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateState {
    pub status: SessionStatus,
    pub mode: SearchMode,
    pub query: String,
    /// Single-jurisdiction streaming result.
    pub single: Option<SingleStateResult>,
    /// Working map for multi-jurisdiction pipelines, in arrival order,
    /// unique by jurisdiction code.
    pub working: Vec<StateAnswer>,
    /// Jurisdictions the server has explicitly finalized, unique by code.
    pub finalized: Vec<StateAnswer>,
    /// Cross-jurisdiction summary accumulator.
    pub summary: Option<String>,
    pub summary_done: bool,
    pub expected_state_count: Option<usize>,
    pub error_message: Option<String>,
}

impl AggregateState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Loading,
            mode: SearchMode::Single,
            query: query.into(),
            single: None,
            working: Vec::new(),
            finalized: Vec::new(),
            summary: None,
            summary_done: false,
            expected_state_count: None,
            error_message: None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.status, SessionStatus::Done | SessionStatus::Error)
    }

    /// Snapshot of the multi-jurisdiction result. While streaming this
    /// reflects the working map; once finalized it reflects the frozen list.
    pub fn multi_result(&self) -> Option<MultiStateResult> {
        if self.mode != SearchMode::Multi {
            return None;
        }
        let answers = if self.finalized.is_empty() {
            &self.working
        } else {
            &self.finalized
        };
        Some(MultiStateResult {
            query: self.query.clone(),
            state_answers: answers.clone(),
            summary_text: self.summary.clone(),
            total_processing_time_ms: total_processing_time(answers),
        })
    }

    pub fn single_result(&self) -> Option<&SingleStateResult> {
        self.single.as_ref()
    }
}

/// Pipelines run concurrently on the server, so the slowest one bounds the
/// whole search.
fn total_processing_time(answers: &[StateAnswer]) -> u64 {
    answers.iter().map(|a| a.processing_time_ms).max().unwrap_or(0)
}

// ============================================================================
// Reducer
// ============================================================================

/// Fold one decoded event into the session state.
///
/// Events arriving after `done` or `error` are ignored; the state is frozen.
/// Per-jurisdiction events tolerate arbitrary interleaving across codes and
/// auto-create an entry when content arrives before any lifecycle frame for
/// that code, rather than dropping the delta.
pub fn apply(mut state: AggregateState, event: StreamEvent) -> AggregateState {
    if state.is_frozen() {
        log::debug!("ignoring event after terminal state: {:?}", event);
        return state;
    }

    match event {
        StreamEvent::Metadata { query, citations } => {
            state.mode = SearchMode::Single;
            state.status = SessionStatus::Streaming;
            state.query = query.clone();
            state.single = Some(SingleStateResult {
                query,
                answer_text: String::new(),
                citations,
            });
            // A single-jurisdiction stream supersedes any multi-state leftovers.
            state.working.clear();
            state.finalized.clear();
            state.summary = None;
            state.summary_done = false;
            state.expected_state_count = None;
        }

        StreamEvent::Citations { citations } => {
            let single = ensure_single(&mut state);
            merge_citations(&mut single.citations, citations);
        }

        StreamEvent::Content { content } => {
            state.status = SessionStatus::Streaming;
            ensure_single(&mut state).answer_text.push_str(&content);
        }

        StreamEvent::MultiStateMetadata { query, state_count } => {
            state.mode = SearchMode::Multi;
            state.status = SessionStatus::Streaming;
            state.query = query;
            state.single = None;
            state.working.clear();
            state.finalized.clear();
            state.summary = None;
            state.summary_done = false;
            state.expected_state_count = Some(state_count);
        }

        StreamEvent::StateQueued { state: code } => {
            state.status = SessionStatus::Streaming;
            state.mode = SearchMode::Multi;
            ensure_entry(&mut state.working, &code, AnswerStatus::Queued);
        }

        StreamEvent::StateProcessing { state: code } => {
            state.status = SessionStatus::Streaming;
            state.mode = SearchMode::Multi;
            ensure_entry(&mut state.working, &code, AnswerStatus::Processing)
                .advance_status(AnswerStatus::Processing);
        }

        StreamEvent::StateHeader {
            state: code,
            source_count,
            processing_time_ms,
        } => {
            state.status = SessionStatus::Streaming;
            state.mode = SearchMode::Multi;
            let entry = ensure_entry(&mut state.working, &code, AnswerStatus::Streaming);
            entry.advance_status(AnswerStatus::Streaming);
            entry.answer_text.clear();
            entry.source_count = source_count;
            entry.processing_time_ms = processing_time_ms;
        }

        StreamEvent::StateCitations {
            state: code,
            citations,
        } => {
            // Server is authoritative here: replace, never merge.
            let entry = ensure_entry(&mut state.working, &code, AnswerStatus::Streaming);
            entry.citations = citations;
        }

        StreamEvent::StateContent {
            state: code,
            content,
        } => {
            state.status = SessionStatus::Streaming;
            state.mode = SearchMode::Multi;
            let entry = ensure_entry(&mut state.working, &code, AnswerStatus::Streaming);
            entry.advance_status(AnswerStatus::Streaming);
            entry.answer_text.push_str(&content);
        }

        StreamEvent::StateComplete { state: code } => {
            let entry = ensure_entry(&mut state.working, &code, AnswerStatus::Complete);
            entry.advance_status(AnswerStatus::Complete);
            let snapshot = entry.clone();
            upsert_by_code(&mut state.finalized, snapshot);
        }

        StreamEvent::SummaryHeader => {
            state.summary = Some(String::new());
            state.summary_done = false;
        }

        StreamEvent::SummaryContent { content } => {
            state.summary.get_or_insert_with(String::new).push_str(&content);
        }

        StreamEvent::SummaryComplete => {
            state.summary_done = true;
        }

        StreamEvent::Done => {
            // Recovery path: some producers never emit discrete
            // state-complete frames; synthesize the finalized list from the
            // working map so the result is not lost.
            if state.finalized.is_empty() && !state.working.is_empty() {
                state.finalized = state
                    .working
                    .iter()
                    .cloned()
                    .map(|mut answer| {
                        answer.advance_status(AnswerStatus::Complete);
                        answer
                    })
                    .collect();
            }
            state.status = SessionStatus::Done;
        }

        StreamEvent::Error { error } => {
            state.error_message = Some(error);
            state.status = SessionStatus::Error;
        }
    }

    state
}

/// Fold a batch of events in arrival order.
pub fn apply_all(state: AggregateState, events: impl IntoIterator<Item = StreamEvent>) -> AggregateState {
    events.into_iter().fold(state, apply)
}

// ============================================================================
// Helpers
// ============================================================================

fn ensure_single(state: &mut AggregateState) -> &mut SingleStateResult {
    let query = state.query.clone();
    state.single.get_or_insert_with(|| SingleStateResult {
        query,
        answer_text: String::new(),
        citations: Vec::new(),
    })
}

fn ensure_entry<'a>(
    answers: &'a mut Vec<StateAnswer>,
    code: &str,
    initial: AnswerStatus,
) -> &'a mut StateAnswer {
    let idx = match answers.iter().position(|a| a.jurisdiction_code == code) {
        Some(idx) => idx,
        None => {
            answers.push(StateAnswer::new(code, initial));
            answers.len() - 1
        }
    };
    &mut answers[idx]
}

/// Replace the entry with the same jurisdiction code, or append. Repeated
/// completion frames for one code therefore never duplicate it.
fn upsert_by_code(answers: &mut Vec<StateAnswer>, answer: StateAnswer) {
    match answers
        .iter()
        .position(|a| a.jurisdiction_code == answer.jurisdiction_code)
    {
        Some(idx) => answers[idx] = answer,
        None => answers.push(answer),
    }
}

/// Extend the citation list, dropping entries whose id is already present.
fn merge_citations(existing: &mut Vec<Citation>, incoming: Vec<Citation>) {
    for citation in incoming {
        if !existing.iter().any(|c| c.id == citation.id) {
            existing.push(citation);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
