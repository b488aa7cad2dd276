use serde::Deserialize;

use crate::jobs::api::{parse_response, ApiError};
use crate::settlements::model::Settlement;

#[derive(Debug, Deserialize)]
struct SettlementList {
    data: Vec<Settlement>,
}

/// Read-only access to the backend's settlement collection.
#[derive(Clone)]
pub struct SettlementsRepo {
    client: reqwest::Client,
    api_url: String,
}

impl SettlementsRepo {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    pub async fn list(&self) -> Result<Vec<Settlement>, ApiError> {
        let response = self
            .client
            .get(format!("{}/liquidaciones", self.api_url))
            .send()
            .await?;

        let list: SettlementList = parse_response(response).await?;
        Ok(list.data)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Settlement>, ApiError> {
        Ok(self.list().await?.into_iter().find(|s| s.id == id))
    }
}
