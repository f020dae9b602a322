use super::analysis::{build_report, EmotionEntry};
use super::state::AppState;
use crate::signals::SpeechSummary;
use crate::submission::messages::{AUDIO_FIELD, EMOTION_FIELD, SPEECH_FIELD, VIDEO_FIELD};
use crate::submission::ResponseEnvelope;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

pub const ALLOWED_MEDIA_TYPES: [&str; 4] = ["video/webm", "audio/webm", "video/mp4", "audio/mp3"];

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File upload failed: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("File too large: {field} ({size} bytes)")]
    FileTooLarge { field: String, size: usize },

    #[error("Duplicate file: {0}")]
    DuplicateFile(String),

    #[error("Missing required files")]
    MissingFiles,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {source}")]
    InvalidJson {
        field: &'static str,
        source: serde_json::Error,
    },

    #[error("Failed to store upload: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Failed to encode report: {0}")]
    Report(String),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Storage(_) | UploadError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

// ============================================================================
// Upload parsing
// ============================================================================

#[derive(Debug)]
struct ReceivedFile {
    field: &'static str,
    file_name: Option<String>,
    content_type: String,
    bytes: Bytes,
}

impl ReceivedFile {
    fn extension(&self) -> &str {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or_else(|| match self.content_type.as_str() {
                "video/mp4" => "mp4",
                "audio/mp3" => "mp3",
                _ => "webm",
            })
    }
}

#[derive(Debug, Default)]
struct UploadForm {
    video: Option<ReceivedFile>,
    audio: Option<ReceivedFile>,
    emotion_data: Option<String>,
    speech_data: Option<String>,
}

async fn read_form(state: &AppState, mut multipart: Multipart) -> Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        let (slot, field_name) = match name.as_str() {
            VIDEO_FIELD => (&mut form.video, VIDEO_FIELD),
            AUDIO_FIELD => (&mut form.audio, AUDIO_FIELD),
            EMOTION_FIELD => {
                form.emotion_data = Some(field.text().await?);
                continue;
            }
            SPEECH_FIELD => {
                form.speech_data = Some(field.text().await?);
                continue;
            }
            other => {
                debug!("Ignoring form field: {}", other);
                continue;
            }
        };

        if slot.is_some() {
            return Err(UploadError::DuplicateFile(name));
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !ALLOWED_MEDIA_TYPES.contains(&content_type.as_str()) {
            return Err(UploadError::InvalidFileType(content_type));
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.len() > state.max_file_bytes {
            return Err(UploadError::FileTooLarge {
                field: name,
                size: bytes.len(),
            });
        }

        *slot = Some(ReceivedFile {
            field: field_name,
            file_name,
            content_type,
            bytes,
        });
    }

    Ok(form)
}

async fn store_file(dir: &Path, file: &ReceivedFile) -> Result<PathBuf, UploadError> {
    let path = dir.join(format!(
        "{}-{}.{}",
        file.field,
        Utc::now().timestamp_millis(),
        file.extension()
    ));
    tokio::fs::write(&path, &file.bytes).await?;
    info!("Stored {} ({} bytes) at {:?}", file.field, file.bytes.len(), path);
    Ok(path)
}

fn parse_json<T: serde::de::DeserializeOwned>(
    field: &'static str,
    raw: Option<String>,
) -> Result<T, UploadError> {
    let raw = raw.ok_or(UploadError::MissingField(field))?;
    serde_json::from_str(&raw).map_err(|source| UploadError::InvalidJson { field, source })
}

async fn process_upload(
    state: &AppState,
    multipart: Multipart,
) -> Result<serde_json::Value, UploadError> {
    let form = read_form(state, multipart).await?;

    let (Some(video), Some(audio)) = (form.video.as_ref(), form.audio.as_ref()) else {
        return Err(UploadError::MissingFiles);
    };

    let emotions: Vec<EmotionEntry> = parse_json(EMOTION_FIELD, form.emotion_data)?;
    let speech: SpeechSummary = parse_json(SPEECH_FIELD, form.speech_data)?;

    tokio::fs::create_dir_all(&state.uploads_dir).await?;
    store_file(&state.uploads_dir, video).await?;
    store_file(&state.uploads_dir, audio).await?;

    info!(
        "Analyzing upload: {}s, {} words, {} wpm, {} expression samples",
        speech.duration,
        speech.total_words,
        speech.wpm,
        emotions.len()
    );

    let report = build_report(&speech, &emotions, state.analyzer.as_ref()).await;
    serde_json::to_value(report).map_err(|e| UploadError::Report(e.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /upload
/// Receive recorded media plus expression and speech data, return the report
pub async fn upload(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    info!("Upload request received");

    match process_upload(&state, multipart).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ResponseEnvelope::success("Upload and analysis complete", report)),
        )
            .into_response(),
        Err(e) => {
            error!("Upload failed: {}", e);
            (e.status(), Json(ResponseEnvelope::failure(e.to_string()))).into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
