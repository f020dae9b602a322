//! Assessment report shape and the client-side report hand-off
//!
//! The client treats the report as opaque JSON and only stores it for the
//! next step. The typed sections below are what the upload server produces.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    pub summary: ReportSummary,
    pub grammar_analysis: GrammarAnalysis,
    pub sentiment_analysis: SentimentAnalysis,
    pub professional_analysis: ProfessionalAnalysis,
    /// Label -> percentage of samples, one decimal place
    pub emotion_analysis: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// e.g. `"97 seconds"`
    pub total_duration: String,
    pub words_per_minute: u32,
    pub total_words: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarAnalysis {
    pub score: u8,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAnalysis {
    pub confidence_score: u8,
    pub clarity_score: u8,
    pub overall_impression: String,
    pub sentiment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalAnalysis {
    pub communication_score: u8,
    pub organization_score: u8,
    pub recommendations: Vec<String>,
}

/// Where a finished session leaves its report
pub trait ReportStore: Send + Sync {
    fn persist(&self, report: &serde_json::Value) -> Result<()>;
}

/// Writes the report as pretty JSON, replacing any previous one
pub struct FileReportStore {
    path: PathBuf,
}

impl FileReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<serde_json::Value> {
        let raw = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read report: {:?}", self.path))?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

impl ReportStore for FileReportStore {
    fn persist(&self, report: &serde_json::Value) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create report directory: {:?}", parent))?;
        }
        let json = serde_json::to_vec_pretty(report)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write report: {:?}", self.path))?;
        info!("Report saved to {:?}", self.path);
        Ok(())
    }
}

/// Single-slot in-memory store
#[derive(Default)]
pub struct MemoryReportStore {
    slot: Mutex<Option<serde_json::Value>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the stored report
    pub fn take(&self) -> Option<serde_json::Value> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl ReportStore for MemoryReportStore {
    fn persist(&self, report: &serde_json::Value) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("report slot poisoned"))?;
        *slot = Some(report.clone());
        Ok(())
    }
}
