use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub session: SessionSettings,
    pub submission: SubmissionConfig,
    pub uploads: UploadConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Raw session timings as written in the config file
#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub budget_secs: u64,
    pub expression_sample_ms: u64,
    pub min_elapsed_ms: u64,
    pub recorder_flush_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionConfig {
    /// Full URL of the upload endpoint
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct UploadConfig {
    /// Directory where the upload server stores received media
    pub dir: String,
    pub max_file_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    /// Where the client persists the last successful report
    pub path: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .with_context(|| format!("Failed to read config: {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}
