pub mod client;
pub mod messages;
pub mod recognizer;

pub use client::NatsClient;
pub use messages::TranscriptMessage;
pub use recognizer::{NatsRecognizerFactory, TranscriptSource};
