//! Datadog synthetics API: trigger CI batches and fetch individual run results.

use crate::adapters::http::{default_client, error_for_response, trim_base};
use crate::utils::error::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SYNTHETICS_URL: &str = "https://api.datadoghq.com/api/v1/synthetics/tests";
const SERVICE: &str = "Datadog";

#[derive(Debug, Serialize)]
struct TriggerTest<'a> {
    public_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TriggerRequest<'a> {
    tests: Vec<TriggerTest<'a>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggeredResult {
    pub public_id: String,
    pub result_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerResponse {
    pub batch_id: Option<String>,
    #[serde(default)]
    pub results: Vec<TriggeredResult>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    passed: bool,
}

#[derive(Debug, Deserialize)]
struct TestResultResponse {
    result: ResultBody,
}

pub struct DatadogClient {
    client: Client,
    base_url: String,
    api_key: String,
    app_key: String,
}

impl DatadogClient {
    pub fn new(api_key: impl Into<String>, app_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, app_key, DEFAULT_SYNTHETICS_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        app_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: trim_base(base_url),
            api_key: api_key.into(),
            app_key: app_key.into(),
        })
    }

    /// Starts a batch through the CI route, which runs the tests in parallel.
    pub async fn trigger_ci(&self, public_ids: &[&str]) -> Result<TriggerResponse> {
        let url = format!("{}/trigger/ci", self.base_url);
        let body = TriggerRequest {
            tests: public_ids.iter().map(|id| TriggerTest { public_id: id }).collect(),
        };
        tracing::info!("📡 Triggering synthetic tests: {:?}", public_ids);

        let response = self
            .client
            .post(&url)
            .header("DD-API-KEY", &self.api_key)
            .header("DD-APPLICATION-KEY", &self.app_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(SERVICE, response).await);
        }
        Ok(response.json().await?)
    }

    /// `None` while the run has not reported a result yet.
    pub async fn test_result(&self, public_id: &str, result_id: &str) -> Result<Option<bool>> {
        let url = format!("{}/{}/results/{}", self.base_url, public_id, result_id);
        let response = self
            .client
            .get(&url)
            .header("DD-API-KEY", &self.api_key)
            .header("DD-APPLICATION-KEY", &self.app_key)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!("Result for {} not available yet ({})", public_id, response.status());
            return Ok(None);
        }
        let body: TestResultResponse = response.json().await?;
        Ok(Some(body.result.passed))
    }
}
