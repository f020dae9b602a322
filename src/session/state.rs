use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    AwaitingPermission,
    AwaitingConsent,
    Recording,
    Finalizing,
    Terminated,
}

impl SessionStatus {
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Idle, AwaitingPermission)
                | (AwaitingPermission, AwaitingConsent)
                | (AwaitingPermission, Idle)
                | (AwaitingConsent, Recording)
                | (AwaitingConsent, Idle)
                | (Recording, Finalizing)
                | (Finalizing, Terminated)
        )
    }

    /// Recognition results and landmark frames are only taken while recording
    pub fn accepts_signals(self) -> bool {
        self == SessionStatus::Recording
    }
}

/// A recognizer that ended on its own is restarted only while still recording
///
/// A stop racing an `End` event leaves the status at `Finalizing`, so the
/// recognizer stays down.
pub fn should_resume_recognizer(status: SessionStatus) -> bool {
    status == SessionStatus::Recording
}

/// Lifecycle data for one attempt
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    status: SessionStatus,
    started_at: Option<Instant>,
    started_wall: Option<DateTime<Utc>>,
    pub budget_secs: u64,
    pub consent_given: bool,
    history: Vec<SessionStatus>,
}

impl Session {
    pub fn new(id: String, budget_secs: u64) -> Self {
        Self {
            id,
            status: SessionStatus::Idle,
            started_at: None,
            started_wall: None,
            budget_secs,
            consent_given: false,
            history: vec![SessionStatus::Idle],
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn transition(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if next == SessionStatus::Recording {
            self.started_at = Some(Instant::now());
            self.started_wall = Some(Utc::now());
        }
        self.status = next;
        self.history.push(next);
        Ok(())
    }

    /// Time since recording began, zero before that
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    pub fn started_wall(&self) -> Option<DateTime<Utc>> {
        self.started_wall
    }

    pub fn history(&self) -> &[SessionStatus] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut session = Session::new("s".to_string(), 120);
        for next in [AwaitingPermission, AwaitingConsent, Recording, Finalizing, Terminated] {
            session.transition(next).unwrap();
        }
        assert_eq!(
            session.history(),
            [Idle, AwaitingPermission, AwaitingConsent, Recording, Finalizing, Terminated]
        );
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!Idle.can_transition_to(Recording));
        assert!(!Recording.can_transition_to(Recording));
        assert!(!Finalizing.can_transition_to(Finalizing));
        assert!(!Terminated.can_transition_to(Idle));
        assert!(!Recording.can_transition_to(Idle));

        let mut session = Session::new("s".to_string(), 120);
        let err = session.transition(Finalizing).unwrap_err();
        assert_eq!(err, SessionError::InvalidTransition { from: Idle, to: Finalizing });
        assert_eq!(session.status(), Idle);
    }

    #[test]
    fn test_failures_return_to_idle() {
        assert!(AwaitingPermission.can_transition_to(Idle));
        assert!(AwaitingConsent.can_transition_to(Idle));
    }

    #[test]
    fn test_recognizer_resumes_only_while_recording() {
        assert!(should_resume_recognizer(Recording));
        for status in [Idle, AwaitingPermission, AwaitingConsent, Finalizing, Terminated] {
            assert!(!should_resume_recognizer(status));
        }
    }

    #[test]
    fn test_elapsed_zero_before_recording() {
        let session = Session::new("s".to_string(), 120);
        assert_eq!(session.elapsed(), Duration::ZERO);
    }
}
