use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{info, warn};

use super::messages::{
    MediaBlob, ResponseEnvelope, SubmissionPayload, AUDIO_FIELD, EMOTION_FIELD, SPEECH_FIELD,
    VIDEO_FIELD,
};
use crate::error::SubmissionError;

/// Remote upload and analysis step
///
/// One call per session; callers never retry.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Upload the payload and return the opaque report object
    async fn submit(&self, payload: SubmissionPayload)
        -> Result<serde_json::Value, SubmissionError>;
}

/// Multipart POST to the upload endpoint
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSubmitter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(payload: SubmissionPayload) -> Result<Form, SubmissionError> {
        let emotion_json = payload.emotion_json()?;
        let speech_json = payload.speech_json()?;

        Ok(Form::new()
            .part(VIDEO_FIELD, media_part(payload.video)?)
            .part(AUDIO_FIELD, media_part(payload.audio)?)
            .text(EMOTION_FIELD, emotion_json)
            .text(SPEECH_FIELD, speech_json))
    }
}

fn media_part(blob: MediaBlob) -> Result<Part, SubmissionError> {
    Part::bytes(blob.bytes)
        .file_name(blob.file_name)
        .mime_str(&blob.mime_type)
        .map_err(|e| SubmissionError::Encode(e.to_string()))
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(
        &self,
        payload: SubmissionPayload,
    ) -> Result<serde_json::Value, SubmissionError> {
        info!(
            "Uploading to {} (video={} bytes, audio={} bytes, {} expression samples)",
            self.endpoint,
            payload.video.bytes.len(),
            payload.audio.bytes.len(),
            payload.emotion_data.len()
        );

        let form = Self::build_form(payload)?;

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        // Error statuses still carry an envelope with the server's message
        let envelope: ResponseEnvelope = serde_json::from_slice(&body).map_err(|e| {
            warn!("Undecodable upload response (HTTP {}): {}", status, e);
            SubmissionError::Decode(format!("HTTP {}: {}", status, e))
        })?;

        info!("Upload response: HTTP {} success={}", status, envelope.success);

        envelope.into_report()
    }
}
