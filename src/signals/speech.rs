use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Running word count and speaking rate for a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechLedger {
    total_words: usize,
    wpm: u32,
    transcripts: Vec<String>,
}

/// Speech summary sent alongside the media upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSummary {
    pub transcripts: Vec<String>,
    /// Whole seconds recorded
    pub duration: u64,
    pub wpm: u32,
    pub total_words: usize,
}

impl SpeechLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one finalized utterance and recompute the rate
    ///
    /// Returns the number of words the utterance contributed.
    pub fn record_utterance(&mut self, transcript: &str, elapsed: Duration, floor: Duration) -> usize {
        let words = count_words(transcript);
        self.total_words += words;
        self.transcripts.push(transcript.to_string());
        self.wpm = words_per_minute(self.total_words, elapsed, floor);
        words
    }

    pub fn total_words(&self) -> usize {
        self.total_words
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn transcripts(&self) -> &[String] {
        &self.transcripts
    }

    pub fn summary(&self, duration_secs: u64) -> SpeechSummary {
        SpeechSummary {
            transcripts: self.transcripts.clone(),
            duration: duration_secs,
            wpm: self.wpm,
            total_words: self.total_words,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub fn count_words(transcript: &str) -> usize {
    transcript.split_whitespace().count()
}

/// `round(words / minutes)` with elapsed time clamped to `floor`
pub fn words_per_minute(total_words: usize, elapsed: Duration, floor: Duration) -> u32 {
    let floor = floor.max(Duration::from_millis(1));
    let minutes = elapsed.max(floor).as_secs_f64() / 60.0;
    (total_words as f64 / minutes).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: Duration = Duration::from_secs(1);

    #[test]
    fn test_three_utterances_over_a_minute() {
        let mut ledger = SpeechLedger::new();
        ledger.record_utterance("hello world", Duration::from_secs(20), FLOOR);
        ledger.record_utterance("this is", Duration::from_secs(40), FLOOR);
        ledger.record_utterance("a test", Duration::from_secs(60), FLOOR);

        assert_eq!(ledger.total_words(), 6);
        assert_eq!(ledger.wpm(), 6);
        assert_eq!(ledger.transcripts(), ["hello world", "this is", "a test"]);
    }

    #[test]
    fn test_total_matches_transcript_tokens() {
        let mut ledger = SpeechLedger::new();
        let utterances = ["  leading space", "tabs\tand\nnewlines  ", "", "one"];
        for (i, text) in utterances.iter().enumerate() {
            ledger.record_utterance(text, Duration::from_secs(10 * (i as u64 + 1)), FLOOR);
        }

        let expected: usize = ledger.transcripts().iter().map(|t| count_words(t)).sum();
        assert_eq!(ledger.total_words(), expected);
        assert_eq!(ledger.total_words(), 6);
    }

    #[test]
    fn test_wpm_recomputed_each_event() {
        let mut ledger = SpeechLedger::new();
        ledger.record_utterance("one two three", Duration::from_secs(30), FLOOR);
        assert_eq!(ledger.wpm(), 6);
        ledger.record_utterance("four", Duration::from_secs(120), FLOOR);
        assert_eq!(ledger.wpm(), 2);
    }

    #[test]
    fn test_elapsed_floor_guards_division() {
        // 3 words at t=0 would divide by zero without the floor
        assert_eq!(words_per_minute(3, Duration::ZERO, FLOOR), 180);
        assert_eq!(words_per_minute(3, Duration::ZERO, Duration::ZERO), 180_000);
    }

    #[test]
    fn test_wpm_rounds_to_nearest() {
        // 5 words in 40s = 7.5 wpm
        assert_eq!(words_per_minute(5, Duration::from_secs(40), FLOOR), 8);
        // 4 words in 45s = 5.33 wpm
        assert_eq!(words_per_minute(4, Duration::from_secs(45), FLOOR), 5);
    }

    #[test]
    fn test_summary_wire_shape() {
        let mut ledger = SpeechLedger::new();
        ledger.record_utterance("hi there", Duration::from_secs(60), FLOOR);
        let json = serde_json::to_value(ledger.summary(61)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "transcripts": ["hi there"],
                "duration": 61,
                "wpm": 2,
                "totalWords": 2
            })
        );
    }
}
