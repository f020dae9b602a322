//! Capture session management
//!
//! This module provides the `CaptureSession` state machine that manages:
//! - The permission probe and consent prompt
//! - Video and audio recorders, speech recognition and the landmark camera
//! - The recording budget timer and the expression sampler
//! - Shutdown, payload assembly and the single submission
//!
//! `SessionController` owns the one "current session" slot.

mod config;
mod controller;
mod producers;
mod session;
mod state;

pub use config::{new_session_id, SessionConfig};
pub use controller::SessionController;
pub use producers::{MediaTrackSet, Producers};
pub use session::{
    CaptureSession, FinalizeTrigger, SessionDeps, SessionOutcome, SessionRecord, UserCommand,
};
pub use state::{should_resume_recognizer, Session, SessionStatus};
