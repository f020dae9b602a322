// Ownership and ordered shutdown of the session's capture producers
//
// Every stop is guarded by a flag so the shutdown sequence can run from any
// exit path, more than once, without releasing anything twice.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capture::{
    LandmarkCamera, MediaKind, MediaRecorder, MediaStream, RecognitionEvent, RecorderEvent,
    SpeechRecognizer,
};
use crate::error::AcquisitionError;

/// Stream, recorder and recorded segments for one modality
pub struct MediaTrackSet {
    kind: MediaKind,
    stream: Box<dyn MediaStream>,
    recorder: Option<Box<dyn MediaRecorder>>,
    chunks: Vec<Vec<u8>>,
    recorder_started: bool,
    recorder_stopped: bool,
    acknowledged: bool,
    tracks_released: bool,
}

impl MediaTrackSet {
    pub fn new(kind: MediaKind, stream: Box<dyn MediaStream>) -> Self {
        Self {
            kind,
            stream,
            recorder: None,
            chunks: Vec::new(),
            recorder_started: false,
            recorder_stopped: false,
            acknowledged: false,
            tracks_released: false,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn stream(&self) -> &dyn MediaStream {
        self.stream.as_ref()
    }

    pub fn attach_recorder(&mut self, recorder: Box<dyn MediaRecorder>) {
        self.recorder = Some(recorder);
    }

    pub fn start_recorder(
        &mut self,
        events: mpsc::Sender<RecorderEvent>,
    ) -> Result<(), AcquisitionError> {
        let recorder = self.recorder.as_mut().ok_or_else(|| {
            AcquisitionError::Recorder(format!("no {} recorder attached", self.kind.as_str()))
        })?;
        recorder.start(events)?;
        self.recorder_started = true;
        Ok(())
    }

    pub fn on_event(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::DataAvailable(_) if self.acknowledged => {
                debug!("Dropping {} chunk after stop acknowledgment", self.kind.as_str());
            }
            RecorderEvent::DataAvailable(chunk) => {
                if !chunk.is_empty() {
                    self.chunks.push(chunk);
                }
            }
            RecorderEvent::Stopped => {
                debug!(
                    "{} recorder stopped ({} chunks)",
                    self.kind.as_str(),
                    self.chunks.len()
                );
                self.acknowledged = true;
            }
        }
    }

    pub fn stop_recorder(&mut self) {
        if self.recorder_stopped {
            return;
        }
        self.recorder_stopped = true;
        if !self.recorder_started {
            return;
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.stop();
        }
    }

    pub fn stop_tracks(&mut self) {
        if self.tracks_released {
            return;
        }
        self.tracks_released = true;
        self.stream.stop_tracks();
    }

    /// A recorder that was never started has nothing left to flush
    pub fn is_flushed(&self) -> bool {
        self.acknowledged || !self.recorder_started
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.chunks)
    }
}

/// Every producer a recording session may have started
#[derive(Default)]
pub struct Producers {
    pub video: Option<MediaTrackSet>,
    pub audio: Option<MediaTrackSet>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    recognizer_stopped: bool,
    camera: Option<Box<dyn LandmarkCamera>>,
    camera_stopped: bool,
}

impl Producers {
    pub fn set_recognizer(&mut self, recognizer: Box<dyn SpeechRecognizer>) {
        self.recognizer = Some(recognizer);
    }

    pub fn recognizer_mut(&mut self) -> Option<&mut Box<dyn SpeechRecognizer>> {
        self.recognizer.as_mut()
    }

    pub fn set_camera(&mut self, camera: Box<dyn LandmarkCamera>) {
        self.camera = Some(camera);
    }

    pub fn camera_mut(&mut self) -> Option<&mut Box<dyn LandmarkCamera>> {
        self.camera.as_mut()
    }

    /// Restart a recognizer that ended after an utterance
    pub fn resume_recognizer(&mut self, events: &mpsc::Sender<RecognitionEvent>) {
        if self.recognizer_stopped {
            return;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            if let Err(e) = recognizer.start(events.clone()) {
                warn!("Speech recognition restart failed: {}", e);
            }
        }
    }

    pub fn track_set(&mut self, kind: MediaKind) -> Option<&mut MediaTrackSet> {
        match kind {
            MediaKind::Video => self.video.as_mut(),
            MediaKind::Audio => self.audio.as_mut(),
        }
    }

    /// Stop recognizer, recorders, camera loop, then every track
    pub fn shutdown(&mut self) {
        if !self.recognizer_stopped {
            self.recognizer_stopped = true;
            if let Some(recognizer) = self.recognizer.as_mut() {
                recognizer.stop();
            }
        }

        for set in [self.video.as_mut(), self.audio.as_mut()].into_iter().flatten() {
            set.stop_recorder();
        }

        if !self.camera_stopped {
            self.camera_stopped = true;
            if let Some(camera) = self.camera.as_mut() {
                camera.stop();
            }
        }

        for set in [self.video.as_mut(), self.audio.as_mut()].into_iter().flatten() {
            set.stop_tracks();
        }

        info!("Capture producers stopped");
    }

    pub fn recorders_flushed(&self) -> bool {
        [self.video.as_ref(), self.audio.as_ref()]
            .into_iter()
            .flatten()
            .all(MediaTrackSet::is_flushed)
    }
}
