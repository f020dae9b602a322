//! Signal aggregators fed by the capture session
//!
//! - Speech: word count and words-per-minute from finalized utterances
//! - Expression: landmark classification and the 1 Hz expression log

mod expression;
mod speech;

pub use expression::{
    ExpressionClassifier, ExpressionLabel, ExpressionReading, ExpressionSample, ExpressionTracker,
    FaceRatios, GeometricClassifier, Point,
};
pub use speech::{count_words, words_per_minute, SpeechLedger, SpeechSummary};

pub mod landmarks {
    //! Face mesh landmark indices and classifier thresholds
    pub use super::expression::{
        BROW_RAISE_THRESHOLD, EYE_CLOSED_THRESHOLD, LEFT_BROW, LEFT_EYE_BOTTOM, LEFT_EYE_TOP,
        LOWER_LIP, MOUTH_LEFT, MOUTH_OPEN_THRESHOLD, MOUTH_RIGHT, RIGHT_BROW, RIGHT_EYE_BOTTOM,
        RIGHT_EYE_TOP, UPPER_LIP,
    };
}
