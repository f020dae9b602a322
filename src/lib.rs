pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod permission;
pub mod report;
pub mod session;
pub mod signals;
pub mod submission;
pub mod ui;

pub use capture::{
    CaptureBackend, LandmarkCamera, LandmarkFrame, MediaConstraints, MediaKind, MediaRecorder,
    MediaStream, RecognitionEvent, RecognizerFactory, RecorderEvent, SpeechRecognizer,
    SyntheticBackend, SyntheticScript,
};
pub use config::Config;
pub use error::{AcquisitionError, SessionError, SubmissionError};
pub use http::{create_router, AppState};
pub use nats::{NatsClient, NatsRecognizerFactory, TranscriptMessage};
pub use report::{AssessmentReport, FileReportStore, MemoryReportStore, ReportStore};
pub use session::{
    CaptureSession, FinalizeTrigger, SessionConfig, SessionController, SessionDeps,
    SessionOutcome, SessionRecord, SessionStatus, UserCommand,
};
pub use signals::{
    ExpressionClassifier, ExpressionLabel, ExpressionReading, ExpressionSample,
    GeometricClassifier, Point, SpeechLedger, SpeechSummary,
};
pub use submission::{HttpSubmitter, ResponseEnvelope, SubmissionPayload, Submitter};
pub use ui::{ConsoleInterface, LiveUpdate, Notice, Prompt, UserInterface};
