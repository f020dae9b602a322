// Speech recognizer backed by an external STT service over NATS
//
// Each start() subscribes, forwards the first finalized transcript for our
// STT session and then ends, matching single-utterance browser engines.
// Transcripts published while the session restarts the recognizer are missed.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::client::NatsClient;
use super::messages::TranscriptMessage;
use crate::capture::{RecognitionEvent, RecognizerFactory, SpeechRecognizer};
use crate::error::AcquisitionError;

/// Raw transcript payloads for one listening turn
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn subscribe(&self) -> anyhow::Result<BoxStream<'static, Vec<u8>>>;

    /// Session id the STT service tags our transcripts with
    fn session_id(&self) -> &str;
}

pub struct NatsRecognizerFactory {
    source: Arc<dyn TranscriptSource>,
}

impl NatsRecognizerFactory {
    pub fn new(client: Arc<NatsClient>) -> Self {
        Self::with_source(client)
    }

    pub fn with_source(source: Arc<dyn TranscriptSource>) -> Self {
        Self { source }
    }
}

impl RecognizerFactory for NatsRecognizerFactory {
    fn create_recognizer(&self) -> Result<Box<dyn SpeechRecognizer>, AcquisitionError> {
        Ok(Box::new(NatsRecognizer {
            source: Arc::clone(&self.source),
            listening: Arc::new(AtomicBool::new(false)),
            task: None,
        }))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

struct NatsRecognizer {
    source: Arc<dyn TranscriptSource>,
    /// Cleared by the turn before it sends `End`, so a restart on `End` is accepted
    listening: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SpeechRecognizer for NatsRecognizer {
    fn start(&mut self, events: mpsc::Sender<RecognitionEvent>) -> Result<(), AcquisitionError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(AcquisitionError::Recognizer(
                "recognition has already started".to_string(),
            ));
        }

        // A finished turn may still be unwinding after its End
        if let Some(previous) = self.task.take() {
            previous.abort();
        }

        let source = Arc::clone(&self.source);
        let listening = Arc::clone(&self.listening);

        self.task = Some(tokio::spawn(async move {
            match source.subscribe().await {
                Ok(mut payloads) => {
                    while let Some(payload) = payloads.next().await {
                        match serde_json::from_slice::<TranscriptMessage>(&payload) {
                            Ok(transcript) if transcript.is_final_for(source.session_id()) => {
                                debug!(
                                    "Final transcript (confidence={:.2}): {}",
                                    transcript.confidence, transcript.text
                                );
                                let _ = events.send(RecognitionEvent::Result(transcript.text)).await;
                                break;
                            }
                            Ok(_) => continue,
                            Err(e) => warn!("Failed to parse transcript message: {}", e),
                        }
                    }
                }
                Err(e) => warn!("Speech recognition unavailable: {:#}", e),
            }

            listening.store(false, Ordering::SeqCst);
            let _ = events.send(RecognitionEvent::End).await;
        }));

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.listening.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::AtomicUsize;

    /// Each subscription yields a partial, a foreign final, then our final
    struct ScriptedSource {
        turns: AtomicUsize,
        available: usize,
    }

    impl ScriptedSource {
        fn new(available: usize) -> Self {
            Self {
                turns: AtomicUsize::new(0),
                available,
            }
        }
    }

    fn message(session_id: &str, text: &str, partial: bool) -> Vec<u8> {
        serde_json::to_vec(&TranscriptMessage {
            session_id: session_id.to_string(),
            text: text.to_string(),
            partial,
            timestamp: "2026-03-02T09:15:05Z".to_string(),
            confidence: 0.9,
        })
        .unwrap()
    }

    #[async_trait]
    impl TranscriptSource for ScriptedSource {
        async fn subscribe(&self) -> anyhow::Result<BoxStream<'static, Vec<u8>>> {
            let turn = self.turns.fetch_add(1, Ordering::SeqCst);
            if turn >= self.available {
                return Ok(stream::pending().boxed());
            }
            let text = format!("utterance {}", turn);
            Ok(stream::iter(vec![
                message("interview", "utter", true),
                b"not json".to_vec(),
                message("standup", "someone else", false),
                message("interview", &text, false),
            ])
            .boxed())
        }

        fn session_id(&self) -> &str {
            "interview"
        }
    }

    fn recognizer(available: usize) -> Box<dyn SpeechRecognizer> {
        NatsRecognizerFactory::with_source(Arc::new(ScriptedSource::new(available)))
            .create_recognizer()
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_restart_on_end_is_accepted() {
        let mut recognizer = recognizer(3);
        let (tx, mut rx) = mpsc::channel(16);

        recognizer.start(tx.clone()).unwrap();

        let mut results = Vec::new();
        while results.len() < 3 {
            match rx.recv().await.unwrap() {
                RecognitionEvent::Result(text) => results.push(text),
                // Restart right away, as the session does while recording
                RecognitionEvent::End => recognizer.start(tx.clone()).unwrap(),
            }
        }

        assert_eq!(results, ["utterance 0", "utterance 1", "utterance 2"]);
        recognizer.stop();
    }

    #[tokio::test]
    async fn test_second_start_while_listening_is_rejected() {
        let mut recognizer = recognizer(0);
        let (tx, _rx) = mpsc::channel(16);

        recognizer.start(tx.clone()).unwrap();
        assert!(matches!(
            recognizer.start(tx.clone()),
            Err(AcquisitionError::Recognizer(_))
        ));

        // Stopping releases the turn
        recognizer.stop();
        recognizer.start(tx).unwrap();
        recognizer.stop();
    }
}
