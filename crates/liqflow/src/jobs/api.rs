//! Client for the backend's email-job endpoints.
//!
//! The [`JobsApi`] trait is the seam the coordinator depends on;
//! [`HttpJobsApi`] is the `reqwest` implementation.

use async_trait::async_trait;

use crate::jobs::model::{JobSnapshot, StatusEnvelope, SubmitRequest, SubmitResponse};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend error ({status}): {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait JobsApi: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError>;

    async fn status(&self, job_id: &str) -> Result<JobSnapshot, ApiError>;
}

#[derive(Clone)]
pub struct HttpJobsApi {
    client: reqwest::Client,
    api_url: String,
}

impl HttpJobsApi {
    /// * `api_url` - base URL of the backend API, e.g. `http://host:4000/api`.
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/email-jobs", self.api_url))
            .json(request)
            .send()
            .await?;

        parse_response(response).await
    }

    async fn status(&self, job_id: &str) -> Result<JobSnapshot, ApiError> {
        let response = self
            .client
            .get(format!("{}/email-jobs/{}", self.api_url, job_id))
            .send()
            .await?;

        let envelope: StatusEnvelope = parse_response(response).await?;
        Ok(envelope.data)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}
