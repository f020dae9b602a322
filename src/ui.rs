//! User-facing prompts, notifications and live metrics

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::signals::ExpressionReading;

/// A yes/no question put to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Agree to video, audio, expression and speech capture
    Consent,
    /// Confirm ending the recording early
    StopRecording,
}

/// One-shot notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PermissionRequired { denied: bool, detail: String },
    RecordingStarted,
    RecordingError(String),
    Processing,
    ProcessingFailed(String),
    ReportReady,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::PermissionRequired { denied: true, .. } => "Permission Required",
            Notice::PermissionRequired { denied: false, .. } => "Camera or Microphone Unavailable",
            Notice::RecordingStarted => "Recording Started",
            Notice::RecordingError(_) => "Recording Error",
            Notice::Processing => "Processing",
            Notice::ProcessingFailed(_) => "Processing Failed",
            Notice::ReportReady => "Assessment Complete",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::PermissionRequired { denied: true, .. } => {
                "Please enable camera and microphone access, then try again.".to_string()
            }
            Notice::PermissionRequired { denied: false, detail } => {
                format!("Could not access camera or microphone: {}", detail)
            }
            Notice::RecordingStarted => {
                "You can stop recording at any time using the Stop button".to_string()
            }
            Notice::RecordingError(detail) => {
                format!("Failed to start recording ({}). Please try again.", detail)
            }
            Notice::Processing => "Analyzing your recording...".to_string(),
            Notice::ProcessingFailed(detail) => detail.clone(),
            Notice::ReportReady => "Your report is ready".to_string(),
        }
    }
}

/// Live metric shown while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveUpdate {
    Countdown { remaining_secs: u64 },
    Speech { total_words: usize, wpm: u32 },
    Expression(ExpressionReading),
}

#[async_trait]
pub trait UserInterface: Send + Sync {
    async fn confirm(&self, prompt: Prompt) -> bool;

    fn notify(&self, notice: Notice);

    fn display(&self, update: LiveUpdate);
}

/// `Time: m:ss`
pub fn format_countdown(remaining_secs: u64) -> String {
    format!("Time: {}:{:02}", remaining_secs / 60, remaining_secs % 60)
}

/// Headless interface that answers every prompt the same way and logs the rest
pub struct ConsoleInterface {
    answer: bool,
}

impl ConsoleInterface {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

#[async_trait]
impl UserInterface for ConsoleInterface {
    async fn confirm(&self, prompt: Prompt) -> bool {
        info!("{:?} -> {}", prompt, if self.answer { "yes" } else { "no" });
        self.answer
    }

    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::RecordingError(_) | Notice::ProcessingFailed(_) => {
                error!("{}: {}", notice.title(), notice.message())
            }
            Notice::PermissionRequired { .. } => warn!("{}: {}", notice.title(), notice.message()),
            _ => info!("{}: {}", notice.title(), notice.message()),
        }
    }

    fn display(&self, update: LiveUpdate) {
        match update {
            LiveUpdate::Countdown { remaining_secs } if remaining_secs % 10 == 0 => {
                info!("{}", format_countdown(remaining_secs))
            }
            LiveUpdate::Countdown { .. } => {}
            LiveUpdate::Speech { total_words, wpm } => {
                info!("Total words: {} | Words per minute: {}", total_words, wpm)
            }
            LiveUpdate::Expression(reading) => info!("Expression: {}", reading),
        }
    }
}
