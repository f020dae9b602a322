use super::config::SessionConfig;
use super::session::{CaptureSession, SessionDeps, SessionRecord, UserCommand};
use super::state::SessionStatus;
use crate::error::SessionError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct ActiveSession {
    session_id: String,
    status: watch::Receiver<SessionStatus>,
    commands: mpsc::Sender<UserCommand>,
    task: Option<JoinHandle<SessionRecord>>,
}

impl ActiveSession {
    /// The task has ended, or the session reached its terminal state
    fn is_settled(&self) -> bool {
        let finished = self.task.as_ref().map_or(true, |task| task.is_finished());
        finished || *self.status.borrow() == SessionStatus::Terminated
    }
}

/// Holds the single "current session" slot
///
/// Each `start()` builds a fresh `CaptureSession`; nothing carries over from
/// a previous attempt.
pub struct SessionController {
    template: SessionConfig,
    deps: SessionDeps,
    current: Mutex<Option<ActiveSession>>,
}

impl SessionController {
    pub fn new(template: SessionConfig, deps: SessionDeps) -> Self {
        Self {
            template,
            deps,
            current: Mutex::new(None),
        }
    }

    /// Start a new session unless one is still running
    pub async fn start(&self) -> Result<String, SessionError> {
        let mut current = self.current.lock().await;

        if let Some(active) = current.as_ref() {
            if !active.is_settled() {
                warn!("Rejecting start: session {} still active", active.session_id);
                return Err(SessionError::AlreadyActive(active.session_id.clone()));
            }
        }

        let session = CaptureSession::new(self.template.renewed(), self.deps.clone());
        let session_id = session.id().to_string();
        let status = session.subscribe();
        let (commands, commands_rx) = mpsc::channel(16);
        let task = tokio::spawn(session.run(commands_rx));

        info!("Session {} spawned", session_id);

        *current = Some(ActiveSession {
            session_id: session_id.clone(),
            status,
            commands,
            task: Some(task),
        });

        Ok(session_id)
    }

    /// Request a user stop (the session still asks for confirmation)
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.send(UserCommand::Stop).await
    }

    pub async fn abandon(&self) -> Result<(), SessionError> {
        self.send(UserCommand::Abandon).await
    }

    async fn send(&self, command: UserCommand) -> Result<(), SessionError> {
        let sender = {
            let current = self.current.lock().await;
            current
                .as_ref()
                .map(|active| active.commands.clone())
                .ok_or(SessionError::NoSession)?
        };
        // A session that already ended has dropped its receiver
        if sender.send(command).await.is_err() {
            warn!("{:?} not delivered: session already ended", command);
        }
        Ok(())
    }

    pub async fn status(&self) -> Option<SessionStatus> {
        let current = self.current.lock().await;
        current.as_ref().map(|active| *active.status.borrow())
    }

    /// Watch status changes of the current session
    pub async fn watch(&self) -> Option<watch::Receiver<SessionStatus>> {
        let current = self.current.lock().await;
        current.as_ref().map(|active| active.status.clone())
    }

    /// Wait for the current session to finish
    pub async fn wait(&self) -> Result<SessionRecord, SessionError> {
        let task = {
            let mut current = self.current.lock().await;
            current
                .as_mut()
                .and_then(|active| active.task.take())
                .ok_or(SessionError::NoSession)?
        };
        task.await.map_err(|_| SessionError::TaskFailed)
    }
}
