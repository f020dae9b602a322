use super::config::SessionConfig;
use super::producers::{MediaTrackSet, Producers};
use super::state::{should_resume_recognizer, Session, SessionStatus};
use crate::capture::{
    CaptureBackend, LandmarkFrame, MediaConstraints, MediaKind, RecognitionEvent,
    RecognizerFactory, RecorderEvent,
};
use crate::error::{AcquisitionError, SubmissionError};
use crate::permission;
use crate::report::ReportStore;
use crate::signals::{ExpressionClassifier, ExpressionReading, ExpressionTracker, SpeechLedger};
use crate::submission::{MediaBlob, SubmissionPayload, Submitter};
use crate::ui::{LiveUpdate, Notice, Prompt, UserInterface};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval};
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 100;
const BUDGET_TICK: Duration = Duration::from_secs(1);
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// Commands the user can issue to a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Ask to stop early (confirmed through the UI before it takes effect)
    Stop,
    /// Leave the session: release media locally, submit nothing, ignore any
    /// in-flight upload result
    Abandon,
}

/// What moved the session out of `Recording`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeTrigger {
    UserStop,
    Timeout,
    Abandon,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    PermissionDenied(AcquisitionError),
    ConsentDeclined,
    AcquisitionFailed(AcquisitionError),
    Completed {
        trigger: FinalizeTrigger,
        report: serde_json::Value,
        /// False if the report store failed
        stored: bool,
    },
    SubmissionFailed {
        trigger: FinalizeTrigger,
        error: SubmissionError,
    },
    Abandoned {
        during: SessionStatus,
    },
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::PermissionDenied(_) => "permission denied",
            SessionOutcome::ConsentDeclined => "consent declined",
            SessionOutcome::AcquisitionFailed(_) => "acquisition failed",
            SessionOutcome::Completed { .. } => "completed",
            SessionOutcome::SubmissionFailed { .. } => "submission failed",
            SessionOutcome::Abandoned { .. } => "abandoned",
        }
    }
}

/// Final result of `CaptureSession::run`
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub outcome: SessionOutcome,
    /// Every status the session passed through, in order
    pub history: Vec<SessionStatus>,
}

/// Collaborators a session talks to
#[derive(Clone)]
pub struct SessionDeps {
    pub backend: Arc<dyn CaptureBackend>,
    pub recognizers: Arc<dyn RecognizerFactory>,
    pub classifier: Arc<dyn ExpressionClassifier>,
    pub submitter: Arc<dyn Submitter>,
    pub reports: Arc<dyn ReportStore>,
    pub ui: Arc<dyn UserInterface>,
}

struct EventSenders {
    video: mpsc::Sender<RecorderEvent>,
    audio: mpsc::Sender<RecorderEvent>,
    speech: mpsc::Sender<RecognitionEvent>,
    frames: mpsc::Sender<LandmarkFrame>,
}

impl EventSenders {
    fn recorder(&self, kind: MediaKind) -> mpsc::Sender<RecorderEvent> {
        match kind {
            MediaKind::Video => self.video.clone(),
            MediaKind::Audio => self.audio.clone(),
        }
    }
}

struct EventReceivers {
    video: mpsc::Receiver<RecorderEvent>,
    audio: mpsc::Receiver<RecorderEvent>,
    speech: mpsc::Receiver<RecognitionEvent>,
    frames: mpsc::Receiver<LandmarkFrame>,
}

fn event_channels() -> (EventSenders, EventReceivers) {
    let (video_tx, video_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (audio_tx, audio_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (speech_tx, speech_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (frames_tx, frames_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (
        EventSenders {
            video: video_tx,
            audio: audio_tx,
            speech: speech_tx,
            frames: frames_tx,
        },
        EventReceivers {
            video: video_rx,
            audio: audio_rx,
            speech: speech_rx,
            frames: frames_rx,
        },
    )
}

/// Resolves on the next tick, or never once the interval is cleared
async fn next_tick(interval: &mut Option<Interval>) -> Instant {
    match interval {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

/// One capture attempt, from permission check to terminal state
///
/// All event sources (budget timer, expression sampler, recorder segments,
/// recognition results, landmark frames, user commands) are multiplexed onto
/// the single task running `run`.
pub struct CaptureSession {
    config: SessionConfig,
    session: Session,
    deps: SessionDeps,
    status_tx: watch::Sender<SessionStatus>,
    ledger: SpeechLedger,
    expressions: ExpressionTracker,
}

impl CaptureSession {
    pub fn new(config: SessionConfig, deps: SessionDeps) -> Self {
        let session = Session::new(config.session_id.clone(), config.budget_secs);
        let (status_tx, _) = watch::channel(SessionStatus::Idle);

        Self {
            config,
            session,
            deps,
            status_tx,
            ledger: SpeechLedger::new(),
            expressions: ExpressionTracker::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.session.id
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Drive the session to completion
    ///
    /// Dropping the command sender is treated as `UserCommand::Abandon`.
    pub async fn run(mut self, mut commands: mpsc::Receiver<UserCommand>) -> SessionRecord {
        info!(
            "Starting session {} (budget {}s, backend {}, recognizer {})",
            self.session.id,
            self.session.budget_secs,
            self.deps.backend.name(),
            self.deps.recognizers.name()
        );

        let outcome = self.drive(&mut commands).await;

        info!("Session {} finished: {}", self.session.id, outcome.label());

        SessionRecord {
            session_id: self.session.id.clone(),
            outcome,
            history: self.session.history().to_vec(),
        }
    }

    async fn drive(&mut self, commands: &mut mpsc::Receiver<UserCommand>) -> SessionOutcome {
        self.transition(SessionStatus::AwaitingPermission);
        if let Err(e) =
            permission::check_permissions(self.deps.backend.as_ref(), self.deps.ui.as_ref()).await
        {
            self.transition(SessionStatus::Idle);
            return SessionOutcome::PermissionDenied(e);
        }

        self.transition(SessionStatus::AwaitingConsent);
        if !self.await_consent(commands).await {
            info!("Session {}: consent not given", self.session.id);
            self.transition(SessionStatus::Idle);
            return SessionOutcome::ConsentDeclined;
        }
        self.session.consent_given = true;

        let (senders, mut events) = event_channels();
        let mut producers = match self.start_capture(&senders).await {
            Ok(producers) => producers,
            Err(e) => {
                error!("Session {}: failed to start recording: {}", self.session.id, e);
                self.deps.ui.notify(Notice::RecordingError(e.to_string()));
                self.transition(SessionStatus::Idle);
                return SessionOutcome::AcquisitionFailed(e);
            }
        };

        self.transition(SessionStatus::Recording);
        self.deps.ui.notify(Notice::RecordingStarted);

        let trigger = self
            .record(&mut producers, &senders, &mut events, commands)
            .await;
        drop(senders);

        self.finalize(trigger, producers, events, commands).await
    }

    async fn await_consent(&self, commands: &mut mpsc::Receiver<UserCommand>) -> bool {
        let consent = self.deps.ui.confirm(Prompt::Consent);
        tokio::pin!(consent);

        loop {
            tokio::select! {
                answer = &mut consent => break answer,
                command = commands.recv() => match command {
                    Some(UserCommand::Stop) => debug!("Stop ignored before recording"),
                    Some(UserCommand::Abandon) | None => break false,
                },
            }
        }
    }

    /// Acquire streams and start every producer, or leave none running
    async fn start_capture(&self, senders: &EventSenders) -> Result<Producers, AcquisitionError> {
        let mut producers = Producers::default();

        match self.acquire(&mut producers, senders).await {
            Ok(()) => {
                info!("Session {}: all capture producers started", self.session.id);
                Ok(producers)
            }
            Err(e) => {
                warn!(
                    "Session {}: start aborted, releasing partial capture",
                    self.session.id
                );
                producers.shutdown();
                Err(e)
            }
        }
    }

    async fn acquire(
        &self,
        producers: &mut Producers,
        senders: &EventSenders,
    ) -> Result<(), AcquisitionError> {
        let backend = self.deps.backend.as_ref();

        // Live streams, distinct from the permission probe
        let video = backend
            .get_user_media(MediaConstraints::only(MediaKind::Video))
            .await?;
        producers.video = Some(MediaTrackSet::new(MediaKind::Video, video));

        let audio = backend
            .get_user_media(MediaConstraints::only(MediaKind::Audio))
            .await?;
        producers.audio = Some(MediaTrackSet::new(MediaKind::Audio, audio));

        for set in [producers.video.as_mut(), producers.audio.as_mut()]
            .into_iter()
            .flatten()
        {
            let recorder = backend.create_recorder(set.kind(), set.stream())?;
            set.attach_recorder(recorder);
        }

        for set in [producers.video.as_mut(), producers.audio.as_mut()]
            .into_iter()
            .flatten()
        {
            set.start_recorder(senders.recorder(set.kind()))?;
        }

        let mut recognizer = self.deps.recognizers.create_recognizer()?;
        recognizer.start(senders.speech.clone())?;
        producers.set_recognizer(recognizer);

        let mut camera = backend.create_landmark_camera()?;
        camera.start(senders.frames.clone())?;
        producers.set_camera(camera);

        Ok(())
    }

    /// Run the recording loop until a stop trigger fires
    ///
    /// On return the session is `Finalizing`, the timers are cleared and every
    /// producer has been told to stop.
    async fn record(
        &mut self,
        producers: &mut Producers,
        senders: &EventSenders,
        events: &mut EventReceivers,
        commands: &mut mpsc::Receiver<UserCommand>,
    ) -> FinalizeTrigger {
        let start = Instant::now();
        let mut remaining = self.session.budget_secs;
        let mut timer = Some(time::interval_at(start + BUDGET_TICK, BUDGET_TICK));
        let sample_every = self
            .config
            .expression_sample_interval
            .max(MIN_SAMPLE_INTERVAL);
        let mut sampler = Some(time::interval_at(start + sample_every, sample_every));

        let (prompt_tx, mut prompt_rx) = mpsc::channel::<bool>(1);
        let mut prompt_open = false;

        self.deps.ui.display(LiveUpdate::Countdown {
            remaining_secs: remaining,
        });

        let trigger = loop {
            tokio::select! {
                _ = next_tick(&mut timer) => {
                    remaining = remaining.saturating_sub(1);
                    self.deps.ui.display(LiveUpdate::Countdown { remaining_secs: remaining });
                    if remaining == 0 {
                        info!("Session {}: recording budget exhausted", self.session.id);
                        break FinalizeTrigger::Timeout;
                    }
                }
                _ = next_tick(&mut sampler) => self.sample_expression(),
                Some(event) = events.speech.recv() => {
                    self.on_recognition(event, producers, &senders.speech);
                }
                Some(frame) = events.frames.recv() => self.on_landmarks(frame),
                Some(event) = events.video.recv() => {
                    if let Some(set) = producers.video.as_mut() {
                        set.on_event(event);
                    }
                }
                Some(event) = events.audio.recv() => {
                    if let Some(set) = producers.audio.as_mut() {
                        set.on_event(event);
                    }
                }
                Some(confirmed) = prompt_rx.recv() => {
                    prompt_open = false;
                    if confirmed {
                        info!("Session {}: stop confirmed", self.session.id);
                        break FinalizeTrigger::UserStop;
                    }
                    debug!("Session {}: stop cancelled, continuing", self.session.id);
                }
                command = commands.recv() => match command {
                    Some(UserCommand::Stop) if prompt_open => {
                        debug!("Stop prompt already open");
                    }
                    Some(UserCommand::Stop) => {
                        prompt_open = true;
                        let ui = Arc::clone(&self.deps.ui);
                        let prompt_tx = prompt_tx.clone();
                        tokio::spawn(async move {
                            let confirmed = ui.confirm(Prompt::StopRecording).await;
                            let _ = prompt_tx.send(confirmed).await;
                        });
                    }
                    Some(UserCommand::Abandon) | None => {
                        info!("Session {}: abandoned while recording", self.session.id);
                        break FinalizeTrigger::Abandon;
                    }
                },
            }
        };

        // Clear both timers before shutdown so no tick can fire after it
        drop(timer);
        drop(sampler);

        self.transition(SessionStatus::Finalizing);
        producers.shutdown();

        trigger
    }

    fn on_recognition(
        &mut self,
        event: RecognitionEvent,
        producers: &mut Producers,
        speech_tx: &mpsc::Sender<RecognitionEvent>,
    ) {
        match event {
            RecognitionEvent::Result(transcript) => {
                if !self.session.status().accepts_signals() {
                    debug!("Ignoring utterance outside recording");
                    return;
                }
                let words = self.ledger.record_utterance(
                    &transcript,
                    self.session.elapsed(),
                    self.config.min_elapsed,
                );
                debug!(
                    "Utterance (+{} words): total={} wpm={}",
                    words,
                    self.ledger.total_words(),
                    self.ledger.wpm()
                );
                self.deps.ui.display(LiveUpdate::Speech {
                    total_words: self.ledger.total_words(),
                    wpm: self.ledger.wpm(),
                });
            }
            RecognitionEvent::End => {
                if should_resume_recognizer(self.session.status()) {
                    debug!("Recognizer ended, requesting next utterance");
                    producers.resume_recognizer(speech_tx);
                } else {
                    debug!("Recognizer ended after shutdown, not resuming");
                }
            }
        }
    }

    fn on_landmarks(&mut self, frame: LandmarkFrame) {
        if !self.session.status().accepts_signals() {
            return;
        }
        let reading = match frame.landmarks {
            Some(points) => self.deps.classifier.classify(&points),
            None => ExpressionReading::FaceNotDetected,
        };
        if self.expressions.observe(reading) {
            self.deps.ui.display(LiveUpdate::Expression(reading));
        }
    }

    fn sample_expression(&mut self) {
        if self
            .expressions
            .sample(Utc::now().timestamp_millis())
            .is_none()
        {
            debug!("Face not detected, expression sample skipped");
        }
    }

    async fn finalize(
        &mut self,
        trigger: FinalizeTrigger,
        mut producers: Producers,
        mut events: EventReceivers,
        commands: &mut mpsc::Receiver<UserCommand>,
    ) -> SessionOutcome {
        let duration_secs = self.session.elapsed().as_secs();
        info!(
            "Session {}: finalizing after {}s ({:?})",
            self.session.id, duration_secs, trigger
        );

        self.await_recorder_flush(&mut producers, &mut events).await;
        drop(events);

        if trigger == FinalizeTrigger::Abandon {
            self.clear();
            self.transition(SessionStatus::Terminated);
            return SessionOutcome::Abandoned {
                during: SessionStatus::Recording,
            };
        }

        let payload = self.assemble_payload(&mut producers, duration_secs);
        drop(producers);

        self.deps.ui.notify(Notice::Processing);
        let outcome = self.submit(trigger, payload, commands).await;

        self.clear();
        self.transition(SessionStatus::Terminated);
        outcome
    }

    /// Wait for both recorders to acknowledge stop, bounded by the flush timeout
    async fn await_recorder_flush(&self, producers: &mut Producers, events: &mut EventReceivers) {
        let deadline = time::sleep(self.config.recorder_flush_timeout);
        tokio::pin!(deadline);

        while !producers.recorders_flushed() {
            tokio::select! {
                Some(event) = events.video.recv() => {
                    if let Some(set) = producers.video.as_mut() {
                        set.on_event(event);
                    }
                }
                Some(event) = events.audio.recv() => {
                    if let Some(set) = producers.audio.as_mut() {
                        set.on_event(event);
                    }
                }
                Some(event) = events.speech.recv() => {
                    debug!("Ignoring recognition event after shutdown: {:?}", event);
                }
                Some(_) = events.frames.recv() => {}
                _ = &mut deadline => {
                    warn!(
                        "Session {}: recorders did not acknowledge stop within {:?}",
                        self.session.id, self.config.recorder_flush_timeout
                    );
                    break;
                }
            }
        }
    }

    fn assemble_payload(&mut self, producers: &mut Producers, duration_secs: u64) -> SubmissionPayload {
        let mut chunks = |kind: MediaKind| {
            producers
                .track_set(kind)
                .map(MediaTrackSet::take_chunks)
                .unwrap_or_default()
        };
        let video = MediaBlob::from_chunks(MediaKind::Video, chunks(MediaKind::Video));
        let audio = MediaBlob::from_chunks(MediaKind::Audio, chunks(MediaKind::Audio));

        SubmissionPayload {
            video,
            audio,
            emotion_data: self.expressions.take_log(),
            speech_data: self.ledger.summary(duration_secs),
        }
    }

    async fn submit(
        &mut self,
        trigger: FinalizeTrigger,
        payload: SubmissionPayload,
        commands: &mut mpsc::Receiver<UserCommand>,
    ) -> SessionOutcome {
        let submitter = Arc::clone(&self.deps.submitter);
        let mut upload = tokio::spawn(async move { submitter.submit(payload).await });

        let joined = loop {
            tokio::select! {
                joined = &mut upload => break Some(joined),
                command = commands.recv() => match command {
                    Some(UserCommand::Stop) => debug!("Stop ignored while finalizing"),
                    Some(UserCommand::Abandon) | None => break None,
                },
            }
        };

        let result = match joined {
            None => {
                // The upload keeps running detached; its result is dropped
                info!(
                    "Session {}: abandoned during upload, discarding result",
                    self.session.id
                );
                return SessionOutcome::Abandoned {
                    during: SessionStatus::Finalizing,
                };
            }
            Some(Ok(result)) => result,
            Some(Err(e)) => Err(SubmissionError::Transport(format!("upload task failed: {}", e))),
        };

        match result {
            Ok(report) => {
                let stored = match self.deps.reports.persist(&report) {
                    Ok(()) => {
                        self.deps.ui.notify(Notice::ReportReady);
                        true
                    }
                    Err(e) => {
                        error!("Session {}: failed to store report: {:#}", self.session.id, e);
                        self.deps
                            .ui
                            .notify(Notice::ProcessingFailed(format!("Report could not be saved: {}", e)));
                        false
                    }
                };
                SessionOutcome::Completed {
                    trigger,
                    report,
                    stored,
                }
            }
            Err(error) => {
                error!("Session {}: submission failed: {}", self.session.id, error);
                self.deps.ui.notify(Notice::ProcessingFailed(error.to_string()));
                SessionOutcome::SubmissionFailed { trigger, error }
            }
        }
    }

    fn clear(&mut self) {
        self.ledger.clear();
        self.expressions = ExpressionTracker::new();
    }

    fn transition(&mut self, next: SessionStatus) {
        match self.session.transition(next) {
            Ok(()) => {
                info!("Session {} -> {:?}", self.session.id, next);
                self.status_tx.send_replace(next);
            }
            Err(e) => error!("Session {}: {}", self.session.id, e),
        }
    }
}
