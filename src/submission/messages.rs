use serde::{Deserialize, Serialize};

use crate::capture::MediaKind;
use crate::error::SubmissionError;
use crate::signals::{ExpressionSample, SpeechSummary};

pub const VIDEO_FIELD: &str = "videoFile";
pub const AUDIO_FIELD: &str = "audioFile";
pub const EMOTION_FIELD: &str = "emotionData";
pub const SPEECH_FIELD: &str = "speechData";

/// One recorded modality, concatenated from its segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl MediaBlob {
    pub fn from_chunks(kind: MediaKind, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            bytes: chunks.concat(),
            file_name: kind.file_name().to_string(),
            mime_type: kind.mime_type().to_string(),
        }
    }
}

/// Everything sent in one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub video: MediaBlob,
    pub audio: MediaBlob,
    pub emotion_data: Vec<ExpressionSample>,
    pub speech_data: SpeechSummary,
}

impl SubmissionPayload {
    pub fn emotion_json(&self) -> Result<String, SubmissionError> {
        serde_json::to_string(&self.emotion_data).map_err(|e| SubmissionError::Encode(e.to_string()))
    }

    pub fn speech_json(&self) -> Result<String, SubmissionError> {
        serde_json::to_string(&self.speech_data).map_err(|e| SubmissionError::Encode(e.to_string()))
    }
}

/// `{ success, message?, report? }` returned by the upload endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<serde_json::Value>,
}

impl ResponseEnvelope {
    pub fn success(message: impl Into<String>, report: serde_json::Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            report: Some(report),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            report: None,
        }
    }

    /// The report on success, otherwise the server's message
    pub fn into_report(self) -> Result<serde_json::Value, SubmissionError> {
        if !self.success {
            return Err(SubmissionError::Rejected(
                self.message.unwrap_or_else(|| "Processing failed".to_string()),
            ));
        }
        self.report
            .ok_or_else(|| SubmissionError::Decode("response has no report".to_string()))
    }
}
