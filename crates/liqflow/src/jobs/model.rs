use serde::{Deserialize, Serialize};

pub const MSG_PREPARING: &str = "Preparing...";
pub const MSG_PROCESSING: &str = "Processing emails...";
pub const MSG_COMPLETED: &str = "All emails sent";
pub const MSG_FAILED: &str = "Email dispatch failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Queued or processing: the remote job is still running.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Processing)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: u32,
    pub total: u32,
    pub message: String,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            current: 0,
            total: 1,
            message: String::new(),
        }
    }
}

impl Progress {
    pub fn percent(&self) -> u32 {
        (u64::from(self.current) * 100 / u64::from(self.total.max(1))) as u32
    }
}

/// Local mirror of the remote job this coordinator is tracking.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct JobState {
    pub job_id: Option<String>,
    pub status: JobStatus,
    pub progress: Progress,
    pub in_flight: bool,
    pub error: Option<String>,
    /// Number of selected settlements; push progress is scaled against it.
    pub recipients: u32,
}

impl JobState {
    pub fn tracks(&self, job_id: &str) -> bool {
        self.job_id.as_deref() == Some(job_id)
    }
}

/// Body of the job submission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub liquidacion_ids: Vec<String>,
    pub email_config: EmailConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What the status endpoint reports for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// Percentage, 0-100.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub total_emails: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusEnvelope {
    pub data: JobSnapshot,
}

/// Subject and body typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

impl Default for EmailDraft {
    fn default() -> Self {
        Self {
            subject: "Comprobante de liquidación".to_string(),
            body: "Adjunto encontrará el comprobante de su liquidación del periodo.".to_string(),
        }
    }
}
