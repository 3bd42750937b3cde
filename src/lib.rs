pub mod config;
pub mod error;
pub mod linker;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod stream;

pub use crate::config::SearchConfig;
pub use crate::error::{AppError, ErrorCode, ErrorContext, Result};
pub use crate::linker::{link_tree, linkify, AnswerSegment, Node};
pub use crate::models::{
    AnswerStatus, Citation, CitationSource, MultiStateResult, SearchMode, SearchSession,
    SessionStatus, SingleStateResult, StateAnswer,
};
pub use crate::reconcile::{reconcile, segment_paragraphs, ReconcileOutcome};
pub use crate::stream::{
    apply, apply_all, AggregateState, CancellationToken, FrameDecoder, SearchController,
    SessionUpdate, StreamEvent,
};
