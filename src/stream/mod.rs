// Public module exports
pub mod decoder;
pub mod events;
pub mod reducer;
pub mod session;

// Re-export main types for convenience
pub use decoder::FrameDecoder;
pub use events::StreamEvent;
pub use reducer::{apply, apply_all, AggregateState};
pub use session::{event_stream, update_stream, CancellationToken, SearchController, SessionUpdate};
