//! Upload server (the backend half of a session)
//!
//! This module provides the endpoint a finished session submits to:
//! - POST /upload - Store media, build the assessment report
//! - GET /health - Health check

pub mod analysis;
mod handlers;
mod routes;
mod state;

pub use analysis::{EmotionEntry, FixedAnalyzer, TranscriptAnalysis, TranscriptAnalyzer};
pub use handlers::ALLOWED_MEDIA_TYPES;
pub use routes::create_router;
pub use state::{AppState, DEFAULT_MAX_FILE_BYTES};
