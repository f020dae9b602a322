// Report assembly for received uploads
//
// Emotion percentages are computed from the uploaded samples. Transcript
// scoring goes through `TranscriptAnalyzer`; the bundled `FixedAnalyzer`
// returns constant scores.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::report::{
    AssessmentReport, GrammarAnalysis, ProfessionalAnalysis, ReportSummary, SentimentAnalysis,
};
use crate::signals::SpeechSummary;

/// Expression sample as received; labels are not restricted server-side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionEntry {
    pub timestamp: i64,
    pub emotion: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptAnalysis {
    pub grammar: GrammarAnalysis,
    pub sentiment: SentimentAnalysis,
    pub professional: ProfessionalAnalysis,
}

#[async_trait]
pub trait TranscriptAnalyzer: Send + Sync {
    async fn analyze(&self, speech: &SpeechSummary) -> TranscriptAnalysis;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FixedAnalyzer;

#[async_trait]
impl TranscriptAnalyzer for FixedAnalyzer {
    async fn analyze(&self, _speech: &SpeechSummary) -> TranscriptAnalysis {
        TranscriptAnalysis {
            grammar: GrammarAnalysis {
                score: 8,
                feedback: "Good grammar usage".to_string(),
            },
            sentiment: SentimentAnalysis {
                confidence_score: 7,
                clarity_score: 8,
                overall_impression: "Positive and clear presentation".to_string(),
                sentiment: "Positive".to_string(),
            },
            professional: ProfessionalAnalysis {
                communication_score: 8,
                organization_score: 7,
                recommendations: vec![
                    "Maintain good pace".to_string(),
                    "Continue clear articulation".to_string(),
                ],
            },
        }
    }
}

/// Share of samples per label, formatted to one decimal
pub fn emotion_breakdown(entries: &[EmotionEntry]) -> BTreeMap<String, String> {
    if entries.is_empty() {
        return BTreeMap::from([("Neutral".to_string(), "100.0".to_string())]);
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.emotion.clone()).or_default() += 1;
    }

    let total = entries.len() as f64;
    counts
        .into_iter()
        .map(|(emotion, count)| (emotion, format!("{:.1}", count as f64 * 100.0 / total)))
        .collect()
}

pub async fn build_report(
    speech: &SpeechSummary,
    emotions: &[EmotionEntry],
    analyzer: &dyn TranscriptAnalyzer,
) -> AssessmentReport {
    let analysis = analyzer.analyze(speech).await;

    AssessmentReport {
        summary: ReportSummary {
            total_duration: format!("{} seconds", speech.duration),
            words_per_minute: speech.wpm,
            total_words: speech.total_words,
        },
        grammar_analysis: analysis.grammar,
        sentiment_analysis: analysis.sentiment,
        professional_analysis: analysis.professional,
        emotion_analysis: emotion_breakdown(emotions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(labels: &[&str]) -> Vec<EmotionEntry> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| EmotionEntry {
                timestamp: i as i64 * 1000,
                emotion: label.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_breakdown_percentages() {
        let breakdown = emotion_breakdown(&entries(&["Neutral", "Neutral", "Speaking"]));
        assert_eq!(breakdown["Neutral"], "66.7");
        assert_eq!(breakdown["Speaking"], "33.3");
        assert_eq!(breakdown.len(), 2);
    }

    #[test]
    fn test_breakdown_empty_defaults_to_neutral() {
        let breakdown = emotion_breakdown(&[]);
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown["Neutral"], "100.0");
    }

    #[tokio::test]
    async fn test_report_summary_from_speech() {
        let speech = SpeechSummary {
            transcripts: vec!["hello world".to_string()],
            duration: 42,
            wpm: 3,
            total_words: 2,
        };
        let report = build_report(&speech, &entries(&["Engaged"]), &FixedAnalyzer).await;
        assert_eq!(report.summary.total_duration, "42 seconds");
        assert_eq!(report.summary.words_per_minute, 3);
        assert_eq!(report.summary.total_words, 2);
        assert_eq!(report.emotion_analysis["Engaged"], "100.0");
        assert_eq!(report.grammar_analysis.score, 8);
    }
}
