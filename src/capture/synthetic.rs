// Scripted in-process capture backend
//
// Every producer runs as a tokio task on the caller's runtime, so the whole
// backend follows paused test time. Counters record each construction, start
// and stop so callers can check what was left running.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

use super::backend::{
    CaptureBackend, LandmarkCamera, LandmarkFrame, MediaConstraints, MediaKind, MediaRecorder,
    MediaStream, RecognitionEvent, RecognizerFactory, RecorderEvent, SpeechRecognizer,
};
use crate::error::AcquisitionError;
use crate::signals::{landmarks, Point};

/// Number of points in a refined face mesh
pub const FACE_MESH_POINTS: usize = 478;

/// How the backend answers `get_user_media`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionBehavior {
    Grant,
    Deny,
    /// Device missing or busy
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedUtterance {
    /// Offset from recognizer construction
    pub at: Duration,
    pub text: String,
}

impl ScriptedUtterance {
    pub fn new(at: Duration, text: impl Into<String>) -> Self {
        Self {
            at,
            text: text.into(),
        }
    }
}

/// Face geometry for one synthetic frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceScript {
    Face { eye: f64, brow: f64, mouth: f64 },
    NoFace,
}

impl FaceScript {
    pub const NEUTRAL: FaceScript = FaceScript::Face {
        eye: 1.0,
        brow: 1.0,
        mouth: 0.1,
    };
    pub const SPEAKING: FaceScript = FaceScript::Face {
        eye: 1.0,
        brow: 1.0,
        mouth: 0.8,
    };

    fn frame(&self) -> LandmarkFrame {
        match *self {
            FaceScript::Face { eye, brow, mouth } => {
                LandmarkFrame::face(face_with_ratios(eye, brow, mouth))
            }
            FaceScript::NoFace => LandmarkFrame::no_face(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticScript {
    pub permission: PermissionBehavior,
    /// Fail the live (single-modality) acquisition of this kind
    pub fail_live_acquisition: Option<MediaKind>,
    pub fail_recognizer: bool,
    pub chunk_interval: Duration,
    pub frame_interval: Duration,
    pub utterances: Vec<ScriptedUtterance>,
    /// Cycled, one entry per frame
    pub faces: Vec<FaceScript>,
}

impl Default for SyntheticScript {
    fn default() -> Self {
        Self {
            permission: PermissionBehavior::Grant,
            fail_live_acquisition: None,
            fail_recognizer: false,
            chunk_interval: Duration::from_millis(250),
            frame_interval: Duration::from_millis(100),
            utterances: Vec::new(),
            faces: vec![FaceScript::NEUTRAL],
        }
    }
}

#[derive(Debug, Default)]
pub struct CaptureCounters {
    streams_acquired: AtomicUsize,
    track_stops: AtomicUsize,
    recorders_created: AtomicUsize,
    recorder_starts: AtomicUsize,
    recorder_stops: AtomicUsize,
    recognizers_created: AtomicUsize,
    recognizer_starts: AtomicUsize,
    recognizer_stops: AtomicUsize,
    recognizers_listening: AtomicUsize,
    cameras_created: AtomicUsize,
    camera_starts: AtomicUsize,
    camera_stops: AtomicUsize,
}

/// Point-in-time copy of `CaptureCounters`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub streams_acquired: usize,
    pub track_stops: usize,
    pub recorders_created: usize,
    pub recorder_starts: usize,
    pub recorder_stops: usize,
    pub recognizers_created: usize,
    pub recognizer_starts: usize,
    pub recognizer_stops: usize,
    pub recognizers_listening: usize,
    pub cameras_created: usize,
    pub camera_starts: usize,
    pub camera_stops: usize,
}

impl CaptureSnapshot {
    /// Streams acquired and not yet stopped
    pub fn live_streams(&self) -> usize {
        self.streams_acquired.saturating_sub(self.track_stops)
    }
}

impl CaptureCounters {
    pub fn snapshot(&self) -> CaptureSnapshot {
        let get = |c: &AtomicUsize| c.load(Ordering::SeqCst);
        CaptureSnapshot {
            streams_acquired: get(&self.streams_acquired),
            track_stops: get(&self.track_stops),
            recorders_created: get(&self.recorders_created),
            recorder_starts: get(&self.recorder_starts),
            recorder_stops: get(&self.recorder_stops),
            recognizers_created: get(&self.recognizers_created),
            recognizer_starts: get(&self.recognizer_starts),
            recognizer_stops: get(&self.recognizer_stops),
            recognizers_listening: get(&self.recognizers_listening),
            cameras_created: get(&self.cameras_created),
            camera_starts: get(&self.camera_starts),
            camera_stops: get(&self.camera_stops),
        }
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// Scripted implementation of every capture collaborator
pub struct SyntheticBackend {
    script: SyntheticScript,
    counters: Arc<CaptureCounters>,
}

impl SyntheticBackend {
    pub fn new(script: SyntheticScript) -> Self {
        Self {
            script,
            counters: Arc::new(CaptureCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<CaptureCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl CaptureBackend for SyntheticBackend {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquisitionError> {
        match &self.script.permission {
            PermissionBehavior::Grant => {}
            PermissionBehavior::Deny => {
                return Err(AcquisitionError::PermissionDenied(
                    "user denied camera and microphone".to_string(),
                ))
            }
            PermissionBehavior::Unavailable(reason) => {
                return Err(AcquisitionError::Unavailable(reason.clone()))
            }
        }

        let live_kind = match (constraints.video, constraints.audio) {
            (true, false) => Some(MediaKind::Video),
            (false, true) => Some(MediaKind::Audio),
            _ => None,
        };
        if live_kind.is_some() && live_kind == self.script.fail_live_acquisition {
            return Err(AcquisitionError::Unavailable(format!(
                "{} device busy",
                live_kind.map(|k| k.as_str()).unwrap_or_default()
            )));
        }

        let index = self.counters.streams_acquired.fetch_add(1, Ordering::SeqCst);
        let label = live_kind.map(|k| k.as_str()).unwrap_or("probe");
        Ok(Box::new(SyntheticStream {
            id: format!("{}-stream-{}", label, index),
            live: true,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn create_recorder(
        &self,
        kind: MediaKind,
        stream: &dyn MediaStream,
    ) -> Result<Box<dyn MediaRecorder>, AcquisitionError> {
        if !stream.is_live() {
            return Err(AcquisitionError::Recorder(format!(
                "stream {} has no live tracks",
                stream.id()
            )));
        }
        bump(&self.counters.recorders_created);
        Ok(Box::new(SyntheticRecorder {
            kind,
            chunk_interval: self.script.chunk_interval,
            stop_tx: None,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn create_landmark_camera(&self) -> Result<Box<dyn LandmarkCamera>, AcquisitionError> {
        bump(&self.counters.cameras_created);
        Ok(Box::new(SyntheticCamera {
            faces: self.script.faces.clone(),
            frame_interval: self.script.frame_interval,
            task: None,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

impl RecognizerFactory for SyntheticBackend {
    fn create_recognizer(&self) -> Result<Box<dyn SpeechRecognizer>, AcquisitionError> {
        if self.script.fail_recognizer {
            return Err(AcquisitionError::Recognizer(
                "speech recognition not supported".to_string(),
            ));
        }
        bump(&self.counters.recognizers_created);
        Ok(Box::new(SyntheticRecognizer {
            origin: Instant::now(),
            utterances: Arc::new(self.script.utterances.clone()),
            next: Arc::new(AtomicUsize::new(0)),
            listening: Arc::new(AtomicBool::new(false)),
            task: None,
            events: None,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

struct SyntheticStream {
    id: String,
    live: bool,
    counters: Arc<CaptureCounters>,
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop_tracks(&mut self) {
        if self.live {
            self.live = false;
            bump(&self.counters.track_stops);
            debug!("Tracks stopped: {}", self.id);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

struct SyntheticRecorder {
    kind: MediaKind,
    chunk_interval: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
    counters: Arc<CaptureCounters>,
}

impl MediaRecorder for SyntheticRecorder {
    fn start(&mut self, events: mpsc::Sender<RecorderEvent>) -> Result<(), AcquisitionError> {
        if self.stop_tx.is_some() {
            return Err(AcquisitionError::Recorder("recorder already started".to_string()));
        }
        bump(&self.counters.recorder_starts);

        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);
        let kind = self.kind;
        let interval = self.chunk_interval;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            let mut sequence = 0usize;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let chunk = synthetic_chunk(kind, sequence);
                        sequence += 1;
                        if events.send(RecorderEvent::DataAvailable(chunk)).await.is_err() {
                            return;
                        }
                    }
                    _ = &mut stop_rx => {
                        // Flush the partial segment, then acknowledge
                        let _ = events.send(RecorderEvent::DataAvailable(synthetic_chunk(kind, sequence))).await;
                        let _ = events.send(RecorderEvent::Stopped).await;
                        return;
                    }
                }
            }
        });

        Ok(())
    }

    fn stop(&mut self) {
        bump(&self.counters.recorder_stops);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

/// Deterministic segment payload: `<kind>-chunk-<seq>;`
pub fn synthetic_chunk(kind: MediaKind, sequence: usize) -> Vec<u8> {
    format!("{}-chunk-{:04};", kind.as_str(), sequence).into_bytes()
}

struct SyntheticRecognizer {
    origin: Instant,
    utterances: Arc<Vec<ScriptedUtterance>>,
    next: Arc<AtomicUsize>,
    listening: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    events: Option<mpsc::Sender<RecognitionEvent>>,
    counters: Arc<CaptureCounters>,
}

impl SpeechRecognizer for SyntheticRecognizer {
    fn start(&mut self, events: mpsc::Sender<RecognitionEvent>) -> Result<(), AcquisitionError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(AcquisitionError::Recognizer(
                "recognition has already started".to_string(),
            ));
        }
        bump(&self.counters.recognizer_starts);
        bump(&self.counters.recognizers_listening);

        self.events = Some(events.clone());
        let origin = self.origin;
        let utterances = Arc::clone(&self.utterances);
        let next = Arc::clone(&self.next);
        let listening = Arc::clone(&self.listening);
        let counters = Arc::clone(&self.counters);

        self.task = Some(tokio::spawn(async move {
            let index = next.load(Ordering::SeqCst);
            let Some(utterance) = utterances.get(index) else {
                // Nothing left to say: listen until stopped
                std::future::pending::<()>().await;
                return;
            };
            time::sleep_until(origin + utterance.at).await;
            next.fetch_add(1, Ordering::SeqCst);
            let _ = events.send(RecognitionEvent::Result(utterance.text.clone())).await;

            // Single-utterance engine: end after each result
            if listening.swap(false, Ordering::SeqCst) {
                counters.recognizers_listening.fetch_sub(1, Ordering::SeqCst);
            }
            let _ = events.send(RecognitionEvent::End).await;
        }));

        Ok(())
    }

    fn stop(&mut self) {
        bump(&self.counters.recognizer_stops);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.listening.swap(false, Ordering::SeqCst) {
            self.counters
                .recognizers_listening
                .fetch_sub(1, Ordering::SeqCst);
            if let Some(events) = &self.events {
                let _ = events.try_send(RecognitionEvent::End);
            }
        }
    }
}

struct SyntheticCamera {
    faces: Vec<FaceScript>,
    frame_interval: Duration,
    task: Option<JoinHandle<()>>,
    counters: Arc<CaptureCounters>,
}

impl LandmarkCamera for SyntheticCamera {
    fn start(&mut self, frames: mpsc::Sender<LandmarkFrame>) -> Result<(), AcquisitionError> {
        if self.task.is_some() {
            return Err(AcquisitionError::Unavailable("camera already running".to_string()));
        }
        bump(&self.counters.camera_starts);

        let faces = if self.faces.is_empty() {
            vec![FaceScript::NoFace]
        } else {
            self.faces.clone()
        };
        let interval = self.frame_interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            for face in faces.iter().cycle() {
                ticker.tick().await;
                if frames.send(face.frame()).await.is_err() {
                    return;
                }
            }
        }));

        Ok(())
    }

    fn stop(&mut self) {
        bump(&self.counters.camera_stops);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Build a face mesh whose classifier ratios equal the given values
pub fn face_with_ratios(eye: f64, brow: f64, mouth: f64) -> Vec<Point> {
    let mut points = vec![Point::new(0.5, 0.5); FACE_MESH_POINTS];

    // Eyes: reference gap 0.02 on the right eye
    points[landmarks::LEFT_EYE_TOP] = Point::new(0.40, 0.40);
    points[landmarks::LEFT_EYE_BOTTOM] = Point::new(0.40, 0.40 + eye * 0.02);
    points[landmarks::RIGHT_EYE_TOP] = Point::new(0.60, 0.40);
    points[landmarks::RIGHT_EYE_BOTTOM] = Point::new(0.60, 0.42);

    // Brows: reference gap 0.05 above the right eye
    points[landmarks::LEFT_BROW] = Point::new(0.40, 0.40 - brow * 0.05);
    points[landmarks::RIGHT_BROW] = Point::new(0.60, 0.35);

    // Mouth: reference width 0.1
    points[landmarks::UPPER_LIP] = Point::new(0.50, 0.70);
    points[landmarks::LOWER_LIP] = Point::new(0.50, 0.70 + mouth * 0.1);
    points[landmarks::MOUTH_LEFT] = Point::new(0.45, 0.75);
    points[landmarks::MOUTH_RIGHT] = Point::new(0.55, 0.75);

    points
}
