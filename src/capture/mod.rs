pub mod backend;
pub mod synthetic;

pub use backend::{
    CaptureBackend, LandmarkCamera, LandmarkFrame, MediaConstraints, MediaKind, MediaRecorder,
    MediaStream, RecognitionEvent, RecognizerFactory, RecorderEvent, SpeechRecognizer,
};
pub use synthetic::{
    CaptureCounters, CaptureSnapshot, FaceScript, PermissionBehavior, ScriptedUtterance,
    SyntheticBackend, SyntheticScript,
};
