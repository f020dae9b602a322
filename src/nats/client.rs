use anyhow::{Context, Result};
use async_nats::Client;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tracing::info;

use super::recognizer::TranscriptSource;

/// Subject the STT service publishes finalized transcripts on
pub const FINAL_TRANSCRIPT_SUBJECT: &str = "stt.text.final";

pub struct NatsClient {
    client: Client,
    stt_session_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, stt_session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            stt_session_id,
        })
    }

    /// Session id the STT service tags our transcripts with
    pub fn stt_session_id(&self) -> &str {
        &self.stt_session_id
    }

    /// Subscribe to finalized transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        // Transcripts for every session share the subject; callers filter
        // by session_id in the payload
        let subscriber = self
            .client
            .subscribe(FINAL_TRANSCRIPT_SUBJECT)
            .await
            .context("Failed to subscribe to transcripts")?;

        info!("Subscribed to {}", FINAL_TRANSCRIPT_SUBJECT);

        Ok(subscriber)
    }
}

#[async_trait]
impl TranscriptSource for NatsClient {
    async fn subscribe(&self) -> Result<BoxStream<'static, Vec<u8>>> {
        let subscriber = self.subscribe_transcripts().await?;
        Ok(subscriber.map(|msg| msg.payload.to_vec()).boxed())
    }

    fn session_id(&self) -> &str {
        self.stt_session_id()
    }
}
