use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SessionSettings;

/// Configuration for a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "assessment-<uuid>")
    pub session_id: String,

    /// Recording budget in whole seconds
    /// Default: 120 seconds
    pub budget_secs: u64,

    /// Cadence of the expression log
    /// Default: 1 second
    pub expression_sample_interval: Duration,

    /// Lower bound on elapsed time when computing words per minute
    pub min_elapsed: Duration,

    /// Maximum wait for recorders to acknowledge stop
    pub recorder_flush_timeout: Duration,
}

impl SessionConfig {
    /// Same settings under a new session id
    pub fn renewed(&self) -> Self {
        Self {
            session_id: new_session_id(),
            ..self.clone()
        }
    }
}

pub fn new_session_id() -> String {
    format!("assessment-{}", uuid::Uuid::new_v4())
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: new_session_id(),
            budget_secs: 120,
            expression_sample_interval: Duration::from_secs(1),
            min_elapsed: Duration::from_secs(1),
            recorder_flush_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            session_id: new_session_id(),
            budget_secs: settings.budget_secs.max(1),
            expression_sample_interval: Duration::from_millis(settings.expression_sample_ms.max(1)),
            min_elapsed: Duration::from_millis(settings.min_elapsed_ms),
            recorder_flush_timeout: Duration::from_millis(settings.recorder_flush_timeout_ms),
        }
    }
}
