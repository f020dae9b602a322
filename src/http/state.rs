use super::analysis::{FixedAnalyzer, TranscriptAnalyzer};
use std::path::PathBuf;
use std::sync::Arc;

/// Default per-file upload limit (50 MiB)
pub const DEFAULT_MAX_FILE_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Directory for received media files
    pub uploads_dir: PathBuf,

    pub max_file_bytes: usize,

    pub analyzer: Arc<dyn TranscriptAnalyzer>,
}

impl AppState {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            analyzer: Arc::new(FixedAnalyzer),
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn TranscriptAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }
}
