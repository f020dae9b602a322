use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AcquisitionError;
use crate::signals::Point;

/// Capture modality of a stream or recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Container produced by the platform recorder
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/webm",
            MediaKind::Audio => "audio/webm",
        }
    }

    /// File name used for the uploaded blob
    pub fn file_name(&self) -> &'static str {
        match self {
            MediaKind::Video => "recording.webm",
            MediaKind::Audio => "audio.webm",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// Which tracks a `get_user_media` request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    pub const fn video_and_audio() -> Self {
        Self { video: true, audio: true }
    }

    pub const fn only(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video => Self { video: true, audio: false },
            MediaKind::Audio => Self { video: false, audio: true },
        }
    }
}

/// Events emitted by a media recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// A recorded segment is available
    DataAvailable(Vec<u8>),
    /// The recorder has flushed its last segment after `stop()`
    Stopped,
}

/// Events emitted by a speech recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// One finalized utterance (interim results are never delivered)
    Result(String),
    /// The recognizer ended and must be started again to keep listening
    End,
}

/// Landmarks for one camera frame; `None` when no face was found
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    pub landmarks: Option<Vec<Point>>,
}

impl LandmarkFrame {
    pub fn face(landmarks: Vec<Point>) -> Self {
        Self {
            landmarks: Some(landmarks),
        }
    }

    pub fn no_face() -> Self {
        Self { landmarks: None }
    }
}

/// A live capture stream holding one or more device tracks
pub trait MediaStream: Send {
    fn id(&self) -> &str;

    /// Stop every track of the stream, releasing the device
    fn stop_tracks(&mut self);

    fn is_live(&self) -> bool;
}

/// Encodes a stream into segments
///
/// After `stop()` the recorder may still deliver `DataAvailable` before it
/// delivers `Stopped`.
pub trait MediaRecorder: Send {
    fn start(&mut self, events: mpsc::Sender<RecorderEvent>) -> Result<(), AcquisitionError>;

    fn stop(&mut self);
}

/// Speech-to-text engine that ends itself after each utterance
pub trait SpeechRecognizer: Send {
    fn start(&mut self, events: mpsc::Sender<RecognitionEvent>) -> Result<(), AcquisitionError>;

    fn stop(&mut self);
}

/// Camera loop feeding frames into the landmark detector
pub trait LandmarkCamera: Send {
    fn start(&mut self, frames: mpsc::Sender<LandmarkFrame>) -> Result<(), AcquisitionError>;

    fn stop(&mut self);
}

/// Media capture platform
///
/// Implementations:
/// - Synthetic: scripted in-process producers (CLI simulation and tests)
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire a stream matching the constraints
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquisitionError>;

    /// Construct a recorder bound to an acquired stream
    fn create_recorder(
        &self,
        kind: MediaKind,
        stream: &dyn MediaStream,
    ) -> Result<Box<dyn MediaRecorder>, AcquisitionError>;

    fn create_landmark_camera(&self) -> Result<Box<dyn LandmarkCamera>, AcquisitionError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Constructs speech recognizers
pub trait RecognizerFactory: Send + Sync {
    fn create_recognizer(&self) -> Result<Box<dyn SpeechRecognizer>, AcquisitionError>;

    fn name(&self) -> &str;
}
