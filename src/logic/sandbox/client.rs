//! Sandbox Client
//!
//! HTTP client for a Cuckoo-compatible sandbox API:
//! - `POST /tasks/create/file` (multipart `file` + `unique`)
//! - `GET /files/view/sha256/{sha256}` when the sample was already analysed
//! - `GET {report_path}` polled until the report is ready

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::Instant;

use crate::constants;
use crate::logic::sample::Sample;

use super::report::{parse_report, ReportFormat};
use super::types::{BehaviorReport, CancelFlag, Sandbox, SandboxError};

/// Sandbox connection settings
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub base_url: String,
    /// Report endpoint template, `{id}` is replaced by the task id
    pub report_path: String,
    pub format: ReportFormat,
    pub poll_interval: Duration,
    /// `None` waits until the report shows up or the wait is cancelled
    pub timeout: Option<Duration>,
    pub request_timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        let format = constants::get_report_format().parse().unwrap_or_else(|e| {
            log::warn!("[Sandbox] {}, using cuckoo", e);
            ReportFormat::Cuckoo
        });

        Self {
            base_url: constants::get_sandbox_url(),
            report_path: constants::get_report_path(),
            format,
            poll_interval: Duration::from_secs(constants::get_poll_interval()),
            timeout: constants::get_sandbox_timeout().map(Duration::from_secs),
            request_timeout: Duration::from_secs(constants::DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    task_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileViewResponse {
    sample: Option<FileViewSample>,
}

#[derive(Debug, Deserialize)]
struct FileViewSample {
    id: u64,
}

pub struct SandboxClient {
    config: SandboxConfig,
    http_client: reqwest::Client,
}

impl SandboxClient {
    pub fn new(config: SandboxConfig) -> Result<Self, SandboxError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SandboxError::Network(e.to_string()))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Submit the sample, returning its task id.
    ///
    /// Byte-identical content already known to the sandbox is not detonated
    /// again: the existing task is looked up by SHA-256 instead.
    pub async fn submit(&self, sample: &Sample) -> Result<u64, SandboxError> {
        let form = Form::new()
            .part("file", Part::bytes(sample.content().to_vec()).file_name(sample.file_name()))
            .text("unique", "true");

        let response = self
            .http_client
            .post(self.url("/tasks/create/file"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let body: CreateTaskResponse =
                    response.json().await.map_err(|e| SandboxError::Parse(e.to_string()))?;
                let task_id = body.task_id.ok_or(SandboxError::MissingTaskId)?;
                log::debug!("[Sandbox] {} submitted as task {}", sample.file_name(), task_id);
                Ok(task_id)
            }
            StatusCode::BAD_REQUEST => {
                log::debug!("[Sandbox] {} already analysed, looking up by sha256", sample.file_name());
                self.lookup_existing(sample.sha256()).await
            }
            status => Err(SandboxError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn lookup_existing(&self, sha256: &str) -> Result<u64, SandboxError> {
        let response = self
            .http_client
            .get(self.url(&format!("/files/view/sha256/{}", sha256)))
            .send()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SandboxError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: FileViewResponse = response.json().await.map_err(|e| SandboxError::Parse(e.to_string()))?;
        body.sample.map(|s| s.id).ok_or(SandboxError::MissingTaskId)
    }

    /// Poll the report endpoint until the report is ready, the deadline
    /// passes, or `cancel` is raised
    pub async fn wait_for_report(&self, task_id: u64, cancel: &CancelFlag) -> Result<BehaviorReport, SandboxError> {
        let url = self.url(&self.config.report_path.replace("{id}", &task_id.to_string()));
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return Err(SandboxError::Cancelled { task_id });
            }

            let response = self
                .http_client
                .get(&url)
                .send()
                .await
                .map_err(|e| SandboxError::Network(e.to_string()))?;

            if response.status() == StatusCode::OK {
                let body = response.bytes().await.map_err(|e| SandboxError::Network(e.to_string()))?;
                log::debug!("[Sandbox] Report of task {} ready", task_id);
                return parse_report(task_id, &body, self.config.format);
            }

            let waited = started.elapsed();
            if let Some(timeout) = self.config.timeout {
                if waited >= timeout {
                    return Err(SandboxError::Timeout { task_id, waited });
                }
            }

            log::debug!("[Sandbox] Waiting for the report of task {}...", task_id);
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl Sandbox for SandboxClient {
    async fn detonate(&self, sample: &Sample, cancel: &CancelFlag) -> Result<BehaviorReport, SandboxError> {
        let task_id = self.submit(sample).await?;
        self.wait_for_report(task_id, cancel).await
    }
}
