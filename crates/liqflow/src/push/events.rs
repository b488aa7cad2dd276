//! Push-channel events.
//!
//! The backend emits JSON text frames shaped
//! `{"event": "<name>", "data": {...}}`. `connect` and `disconnect` are
//! produced locally by the channel when its connection state changes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PushEvent {
    #[serde(rename = "connect")]
    Connected,

    #[serde(rename = "disconnect")]
    Disconnected,

    #[serde(rename = "job:progress")]
    Progress(ProgressData),

    #[serde(rename = "job:completed")]
    Completed(CompletedData),

    #[serde(rename = "job:failed")]
    Failed(FailedData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    pub job_id: String,
    /// Percentage, 0-100.
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedData {
    pub job_id: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedData {
    pub job_id: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Parse a text frame. Unknown event names are errors; callers log and move on.
pub fn parse_event(text: &str) -> Result<PushEvent, serde_json::Error> {
    serde_json::from_str(text)
}
