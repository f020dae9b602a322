// Facial expression classification and 1 Hz expression logging
//
// The classifier reduces a face-mesh frame to three distance ratios and maps
// them onto a coarse label with ordered threshold rules. The tracker keeps the
// most recent reading and appends it to the log on every sampling tick.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized 2D landmark coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

// Face mesh landmark indices
pub const LEFT_EYE_TOP: usize = 159;
pub const LEFT_EYE_BOTTOM: usize = 145;
pub const RIGHT_EYE_TOP: usize = 386;
pub const RIGHT_EYE_BOTTOM: usize = 374;
pub const LEFT_BROW: usize = 70;
pub const RIGHT_BROW: usize = 300;
pub const UPPER_LIP: usize = 13;
pub const LOWER_LIP: usize = 14;
pub const MOUTH_LEFT: usize = 61;
pub const MOUTH_RIGHT: usize = 291;

pub const MOUTH_OPEN_THRESHOLD: f64 = 0.5;
pub const BROW_RAISE_THRESHOLD: f64 = 1.2;
pub const EYE_CLOSED_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionLabel {
    Speaking,
    Engaged,
    Blinking,
    Neutral,
}

impl ExpressionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionLabel::Speaking => "Speaking",
            ExpressionLabel::Engaged => "Engaged",
            ExpressionLabel::Blinking => "Blinking",
            ExpressionLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for ExpressionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionReading {
    Face(ExpressionLabel),
    FaceNotDetected,
}

impl fmt::Display for ExpressionReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionReading::Face(label) => label.fmt(f),
            ExpressionReading::FaceNotDetected => f.write_str("Face not detected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceRatios {
    pub eye_openness: f64,
    pub brow_raise: f64,
    pub mouth_openness: f64,
}

impl FaceRatios {
    /// Compute ratios from a face-mesh frame
    ///
    /// Returns `None` if the frame is missing a required landmark or a
    /// reference distance collapses to zero.
    pub fn from_landmarks(landmarks: &[Point]) -> Option<Self> {
        Some(Self {
            eye_openness: ratio(
                landmarks,
                (LEFT_EYE_TOP, LEFT_EYE_BOTTOM),
                (RIGHT_EYE_TOP, RIGHT_EYE_BOTTOM),
            )?,
            brow_raise: ratio(
                landmarks,
                (LEFT_BROW, LEFT_EYE_TOP),
                (RIGHT_BROW, RIGHT_EYE_TOP),
            )?,
            mouth_openness: ratio(
                landmarks,
                (UPPER_LIP, LOWER_LIP),
                (MOUTH_LEFT, MOUTH_RIGHT),
            )?,
        })
    }

    /// First matching rule wins: mouth, then brow, then eyes
    pub fn label(&self) -> ExpressionLabel {
        if self.mouth_openness > MOUTH_OPEN_THRESHOLD {
            ExpressionLabel::Speaking
        } else if self.brow_raise > BROW_RAISE_THRESHOLD {
            ExpressionLabel::Engaged
        } else if self.eye_openness < EYE_CLOSED_THRESHOLD {
            ExpressionLabel::Blinking
        } else {
            ExpressionLabel::Neutral
        }
    }
}

fn ratio(landmarks: &[Point], measured: (usize, usize), reference: (usize, usize)) -> Option<f64> {
    let numerator = landmarks.get(measured.0)?.distance(landmarks.get(measured.1)?);
    let denominator = landmarks.get(reference.0)?.distance(landmarks.get(reference.1)?);
    if denominator <= f64::EPSILON {
        return None;
    }
    Some(numerator / denominator)
}

/// Pure, synchronous landmark classifier
pub trait ExpressionClassifier: Send + Sync {
    fn classify(&self, landmarks: &[Point]) -> ExpressionReading;
}

/// Threshold classifier over `FaceRatios`
#[derive(Debug, Default, Clone, Copy)]
pub struct GeometricClassifier;

impl ExpressionClassifier for GeometricClassifier {
    fn classify(&self, landmarks: &[Point]) -> ExpressionReading {
        match FaceRatios::from_landmarks(landmarks) {
            Some(ratios) => ExpressionReading::Face(ratios.label()),
            None => ExpressionReading::FaceNotDetected,
        }
    }
}

/// One logged expression sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionSample {
    /// Unix time in milliseconds
    pub timestamp: i64,
    pub emotion: ExpressionLabel,
}

/// Latest reading plus the sampled log
#[derive(Debug, Clone)]
pub struct ExpressionTracker {
    current: ExpressionReading,
    log: Vec<ExpressionSample>,
}

impl ExpressionTracker {
    pub fn new() -> Self {
        Self {
            current: ExpressionReading::Face(ExpressionLabel::Neutral),
            log: Vec::new(),
        }
    }

    /// Record a classifier result; returns true when the reading changed
    pub fn observe(&mut self, reading: ExpressionReading) -> bool {
        let changed = self.current != reading;
        self.current = reading;
        changed
    }

    pub fn current(&self) -> ExpressionReading {
        self.current
    }

    /// Append the current label, unless no face is visible
    pub fn sample(&mut self, timestamp: i64) -> Option<&ExpressionSample> {
        match self.current {
            ExpressionReading::Face(emotion) => {
                self.log.push(ExpressionSample { timestamp, emotion });
                self.log.last()
            }
            ExpressionReading::FaceNotDetected => None,
        }
    }

    pub fn log(&self) -> &[ExpressionSample] {
        &self.log
    }

    pub fn take_log(&mut self) -> Vec<ExpressionSample> {
        std::mem::take(&mut self.log)
    }
}

impl Default for ExpressionTracker {
    fn default() -> Self {
        Self::new()
    }
}
