// Shared fixtures for session integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use interview_capture::capture::{CaptureSnapshot, ScriptedUtterance};
use interview_capture::{
    GeometricClassifier, LiveUpdate, MemoryReportStore, Notice, Prompt, ResponseEnvelope,
    SessionConfig, SessionDeps, SubmissionError, SubmissionPayload, Submitter, SyntheticBackend,
    SyntheticScript, UserInterface,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Interface that answers from a script and records everything shown
pub struct RecordingInterface {
    consent: bool,
    confirm_stop: bool,
    stop_prompt_delay: Duration,
    prompts: Mutex<Vec<Prompt>>,
    notices: Mutex<Vec<Notice>>,
    updates: Mutex<Vec<LiveUpdate>>,
}

impl RecordingInterface {
    pub fn new(consent: bool) -> Self {
        Self {
            consent,
            confirm_stop: true,
            stop_prompt_delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Answer the stop prompt with `confirm` after `delay`
    pub fn with_stop_answer(mut self, confirm: bool, delay: Duration) -> Self {
        self.confirm_stop = confirm;
        self.stop_prompt_delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<LiveUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn countdowns(&self) -> Vec<u64> {
        self.updates()
            .into_iter()
            .filter_map(|update| match update {
                LiveUpdate::Countdown { remaining_secs } => Some(remaining_secs),
                _ => None,
            })
            .collect()
    }

    pub fn count_notices(&self, matches: impl Fn(&Notice) -> bool) -> usize {
        self.notices().iter().filter(|n| matches(n)).count()
    }
}

#[async_trait]
impl UserInterface for RecordingInterface {
    async fn confirm(&self, prompt: Prompt) -> bool {
        self.prompts.lock().unwrap().push(prompt);
        match prompt {
            Prompt::Consent => self.consent,
            Prompt::StopRecording => {
                tokio::time::sleep(self.stop_prompt_delay).await;
                self.confirm_stop
            }
        }
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }

    fn display(&self, update: LiveUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

/// Submitter that keeps the payload and answers with a canned envelope
pub struct MockSubmitter {
    response: ResponseEnvelope,
    delay: Duration,
    calls: AtomicUsize,
    payload: Mutex<Option<SubmissionPayload>>,
}

impl MockSubmitter {
    pub fn accepting() -> Self {
        Self::responding(ResponseEnvelope::success(
            "Upload and analysis complete",
            json!({ "summary": { "totalWords": 0 } }),
        ))
    }

    pub fn responding(response: ResponseEnvelope) -> Self {
        Self {
            response,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            payload: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payload(&self) -> Option<SubmissionPayload> {
        self.payload.lock().unwrap().clone()
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit(&self, payload: SubmissionPayload) -> Result<serde_json::Value, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.payload.lock().unwrap() = Some(payload);
        tokio::time::sleep(self.delay).await;
        self.response.clone().into_report()
    }
}

/// One backend, interface, submitter and store wired together
pub struct Harness {
    pub backend: Arc<SyntheticBackend>,
    pub ui: Arc<RecordingInterface>,
    pub submitter: Arc<MockSubmitter>,
    pub reports: Arc<MemoryReportStore>,
}

impl Harness {
    pub fn new(script: SyntheticScript, ui: RecordingInterface, submitter: MockSubmitter) -> Self {
        Self {
            backend: Arc::new(SyntheticBackend::new(script)),
            ui: Arc::new(ui),
            submitter: Arc::new(submitter),
            reports: Arc::new(MemoryReportStore::new()),
        }
    }

    /// Consenting user, accepting server
    pub fn consenting(script: SyntheticScript) -> Self {
        Self::new(script, RecordingInterface::new(true), MockSubmitter::accepting())
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            backend: self.backend.clone(),
            recognizers: self.backend.clone(),
            classifier: Arc::new(GeometricClassifier),
            submitter: self.submitter.clone(),
            reports: self.reports.clone(),
            ui: self.ui.clone(),
        }
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        self.backend.counters().snapshot()
    }
}

pub fn config(budget_secs: u64) -> SessionConfig {
    SessionConfig {
        budget_secs,
        ..SessionConfig::default()
    }
}

pub fn utterances(at_secs: &[(u64, &str)]) -> Vec<ScriptedUtterance> {
    at_secs
        .iter()
        .map(|(at, text)| ScriptedUtterance::new(Duration::from_secs(*at), *text))
        .collect()
}

/// Every producer was stopped exactly once and nothing is left running
pub fn assert_released(snapshot: &CaptureSnapshot) {
    assert_eq!(snapshot.live_streams(), 0, "streams left live: {:?}", snapshot);
    assert_eq!(snapshot.recorder_stops, snapshot.recorders_created);
    assert_eq!(snapshot.camera_stops, snapshot.cameras_created);
    assert_eq!(snapshot.recognizers_listening, 0);
}
