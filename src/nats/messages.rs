use serde::{Deserialize, Serialize};

/// Transcript message received from STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    pub confidence: f32,
}

impl TranscriptMessage {
    /// A finalized utterance addressed to `session_id`
    pub fn is_final_for(&self, session_id: &str) -> bool {
        !self.partial && self.session_id == session_id
    }
}
