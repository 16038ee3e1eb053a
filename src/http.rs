//! HTTP client for the evolution backend
//!
//! Shared by the browser dashboard and the CLI; reqwest picks the fetch
//! API on wasm32 and hyper elsewhere.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::api::QueryParams;
use crate::core::{EvoError, InfosQuery, InfosResponse, StatisticsQuery, StatisticsResponse};

/// Backend address when nothing else is configured
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    base: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub async fn fetch_infos(&self, query: &InfosQuery) -> Result<InfosResponse, EvoError> {
        let resp: InfosResponse = self.get(&query.path(), &query.params()).await?;
        resp.into_result()
    }

    pub async fn fetch_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<StatisticsResponse, EvoError> {
        let resp: StatisticsResponse = self.get(query.path(), &query.params()).await?;
        resp.into_result()
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<T, EvoError> {
        let url = format!("{}{}", self.base, path);
        debug!(url = %url, ?params, "GET");

        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| EvoError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| EvoError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Backend request failed");
            // error responses still carry {"error": ...} most of the time
            return Err(match serde_json::from_str::<ErrorBody>(&body) {
                Ok(b) => EvoError::Backend(b.error),
                Err(_) => EvoError::Status(status.as_u16()),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
