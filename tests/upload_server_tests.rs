// Integration tests for the upload server and the HTTP submitter
//
// Each test binds the router to an ephemeral port and talks to it over
// real HTTP. These run on the real clock.

mod common;

use anyhow::Result;
use common::{assert_released, config, utterances, RecordingInterface};
use interview_capture::capture::MediaKind;
use interview_capture::submission::MediaBlob;
use interview_capture::{
    create_router, AppState, ExpressionLabel, ExpressionSample, FileReportStore,
    GeometricClassifier, HttpSubmitter, Notice, ResponseEnvelope, SessionController, SessionDeps,
    SessionOutcome, SpeechSummary, SubmissionError, SubmissionPayload, Submitter, SyntheticBackend,
    SyntheticScript,
};
use reqwest::multipart::{Form, Part};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn spawn_server(state: AppState) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, create_router(state)).await;
    });
    Ok(addr)
}

fn submitter(addr: SocketAddr) -> Result<HttpSubmitter> {
    HttpSubmitter::new(format!("http://{}/upload", addr), Duration::from_secs(10))
}

fn sample_payload() -> SubmissionPayload {
    SubmissionPayload {
        video: MediaBlob::from_chunks(MediaKind::Video, vec![b"video-a;".to_vec(), b"video-b;".to_vec()]),
        audio: MediaBlob::from_chunks(MediaKind::Audio, vec![b"audio-a;".to_vec()]),
        emotion_data: vec![
            ExpressionSample {
                timestamp: 1_700_000_000_000,
                emotion: ExpressionLabel::Neutral,
            },
            ExpressionSample {
                timestamp: 1_700_000_001_000,
                emotion: ExpressionLabel::Neutral,
            },
            ExpressionSample {
                timestamp: 1_700_000_002_000,
                emotion: ExpressionLabel::Speaking,
            },
            ExpressionSample {
                timestamp: 1_700_000_003_000,
                emotion: ExpressionLabel::Engaged,
            },
        ],
        speech_data: SpeechSummary {
            transcripts: vec!["hello there".to_string(), "good morning".to_string()],
            duration: 42,
            wpm: 6,
            total_words: 4,
        },
    }
}

fn stored_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

async fn post_form(addr: SocketAddr, form: Form) -> Result<(reqwest::StatusCode, ResponseEnvelope)> {
    let response = reqwest::Client::new()
        .post(format!("http://{}/upload", addr))
        .multipart(form)
        .send()
        .await?;
    let status = response.status();
    let envelope = response.json::<ResponseEnvelope>().await?;
    Ok((status, envelope))
}

fn media(bytes: &[u8], file_name: &str, mime: &str) -> Result<Part> {
    Ok(Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)?)
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let dir = TempDir::new()?;
    let addr = spawn_server(AppState::new(dir.path())).await?;

    let body = reqwest::get(format!("http://{}/health", addr))
        .await?
        .text()
        .await?;
    assert_eq!(body, "OK");

    Ok(())
}

#[tokio::test]
async fn test_submission_returns_report_and_stores_media() -> Result<()> {
    let dir = TempDir::new()?;
    let addr = spawn_server(AppState::new(dir.path())).await?;

    let report = submitter(addr)?.submit(sample_payload()).await?;

    assert_eq!(report["summary"]["totalDuration"], "42 seconds");
    assert_eq!(report["summary"]["wordsPerMinute"], 6);
    assert_eq!(report["summary"]["totalWords"], 4);
    assert_eq!(report["emotionAnalysis"]["Neutral"], "50.0");
    assert_eq!(report["emotionAnalysis"]["Speaking"], "25.0");
    assert_eq!(report["emotionAnalysis"]["Engaged"], "25.0");
    assert_eq!(report["grammarAnalysis"]["score"], 8);

    let files = stored_files(dir.path())?;
    assert_eq!(files.len(), 2);
    assert!(files[0].starts_with("audioFile-") && files[0].ends_with(".webm"));
    assert!(files[1].starts_with("videoFile-") && files[1].ends_with(".webm"));

    let video = files.iter().find(|f| f.starts_with("videoFile-")).unwrap();
    assert_eq!(std::fs::read(dir.path().join(video))?, b"video-a;video-b;");

    Ok(())
}

#[tokio::test]
async fn test_missing_audio_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let addr = spawn_server(AppState::new(dir.path())).await?;

    let form = Form::new()
        .part("videoFile", media(b"video", "recording.webm", "video/webm")?)
        .text("emotionData", "[]")
        .text("speechData", r#"{"transcripts":[],"duration":1,"wpm":0,"totalWords":0}"#);
    let (status, envelope) = post_form(addr, form).await?;

    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert!(!envelope.success);
    assert_eq!(envelope.message.as_deref(), Some("Missing required files"));
    assert!(stored_files(dir.path())?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_file_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let addr = spawn_server(AppState::new(dir.path())).await?;

    let form = Form::new()
        .part("videoFile", media(b"first", "recording.webm", "video/webm")?)
        .part("videoFile", media(b"second", "recording.webm", "video/webm")?)
        .part("audioFile", media(b"audio", "audio.webm", "audio/webm")?)
        .text("emotionData", "[]")
        .text("speechData", r#"{"transcripts":[],"duration":1,"wpm":0,"totalWords":0}"#);
    let (status, envelope) = post_form(addr, form).await?;

    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(envelope.message.as_deref(), Some("Duplicate file: videoFile"));
    assert!(stored_files(dir.path())?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unsupported_media_type_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let addr = spawn_server(AppState::new(dir.path())).await?;

    let form = Form::new()
        .part("videoFile", media(b"video", "recording.txt", "text/plain")?)
        .part("audioFile", media(b"audio", "audio.webm", "audio/webm")?)
        .text("emotionData", "[]")
        .text("speechData", r#"{"transcripts":[],"duration":1,"wpm":0,"totalWords":0}"#);
    let (status, envelope) = post_form(addr, form).await?;

    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert!(!envelope.success);
    assert!(envelope
        .message
        .unwrap_or_default()
        .contains("Invalid file type"));

    Ok(())
}

#[tokio::test]
async fn test_malformed_speech_data_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let addr = spawn_server(AppState::new(dir.path())).await?;

    let form = Form::new()
        .part("videoFile", media(b"video", "recording.webm", "video/webm")?)
        .part("audioFile", media(b"audio", "audio.webm", "audio/webm")?)
        .text("emotionData", "[]")
        .text("speechData", "not json");
    let (status, envelope) = post_form(addr, form).await?;

    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert!(envelope
        .message
        .unwrap_or_default()
        .contains("speechData"));

    Ok(())
}

#[tokio::test]
async fn test_oversized_file_surfaces_server_message() -> Result<()> {
    let dir = TempDir::new()?;
    let addr = spawn_server(AppState::new(dir.path()).with_max_file_bytes(8)).await?;

    let err = submitter(addr)?
        .submit(sample_payload())
        .await
        .unwrap_err();

    let SubmissionError::Rejected(message) = err else {
        panic!("expected rejection, got {:?}", err);
    };
    assert!(message.contains("File too large"), "{}", message);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() -> Result<()> {
    // Bind and release a port so nothing listens on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let err = submitter(addr)?
        .submit(sample_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::Transport(_)));

    Ok(())
}

#[tokio::test]
async fn test_session_end_to_end_over_http() -> Result<()> {
    let uploads = TempDir::new()?;
    let reports = TempDir::new()?;
    let addr = spawn_server(AppState::new(uploads.path())).await?;

    let backend = Arc::new(SyntheticBackend::new(SyntheticScript {
        utterances: utterances(&[(1, "hello there")]),
        ..Default::default()
    }));
    let ui = Arc::new(RecordingInterface::new(true));
    let report_path = reports.path().join("report.json");
    let store = FileReportStore::new(&report_path);

    let deps = SessionDeps {
        backend: backend.clone(),
        recognizers: backend.clone(),
        classifier: Arc::new(GeometricClassifier),
        submitter: Arc::new(submitter(addr)?),
        reports: Arc::new(FileReportStore::new(&report_path)),
        ui: ui.clone(),
    };

    let controller = SessionController::new(config(2), deps);
    controller.start().await?;
    let record = controller.wait().await?;

    let SessionOutcome::Completed { report, stored, .. } = record.outcome else {
        panic!("expected completed session, got {:?}", record.outcome);
    };
    assert!(stored);
    assert_eq!(report["summary"]["totalDuration"], "2 seconds");
    assert_eq!(report["summary"]["totalWords"], 2);
    assert_eq!(store.load()?, report);
    assert!(ui.notices().contains(&Notice::ReportReady));

    assert_eq!(stored_files(uploads.path())?.len(), 2);
    assert_released(&backend.counters().snapshot());

    Ok(())
}
