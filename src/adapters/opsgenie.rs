//! Jira Service Management (formerly Opsgenie) alerts API.

use crate::adapters::http::{default_client, error_for_response, trim_base};
use crate::utils::error::Result;
use crate::utils::retry::{retry, RetryPolicy};
use reqwest::Client;
use serde::Serialize;

pub const DEFAULT_OPSGENIE_URL: &str = "https://api.opsgenie.com";
const SERVICE: &str = "Opsgenie";

#[derive(Debug, Serialize)]
struct Responder<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateAlert<'a> {
    message: &'a str,
    description: &'a str,
    responders: Vec<Responder<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CloseAlert<'a> {
    source: &'a str,
}

pub struct OpsGenieApi {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl OpsGenieApi {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_OPSGENIE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: trim_base(base_url),
            api_key: api_key.into(),
            retry: RetryPolicy::from_env("RETRY_MAX_ATTEMPTS", 5),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn auth_header(&self) -> String {
        format!("GenieKey {}", self.api_key)
    }

    /// Opens an alert paging the `responder` team.
    pub async fn alert(
        &self,
        message: &str,
        description: &str,
        responder: &str,
        alias: Option<&str>,
    ) -> Result<()> {
        let body = CreateAlert {
            message,
            description,
            responders: vec![Responder {
                name: responder,
                kind: "team",
            }],
            alias,
        };
        let url = format!("{}/v2/alerts", self.base_url);
        let (url, body) = (&url, &body);

        retry(&self.retry, "opsgenie create alert", || async move {
            tracing::debug!("📡 POST {}", url);
            let response = self
                .client
                .post(url)
                .header("Authorization", self.auth_header())
                .json(body)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(error_for_response(SERVICE, response).await);
            }
            Ok(())
        })
        .await?;

        tracing::info!("✅ Alert created for responder {}", responder);
        Ok(())
    }

    pub async fn close_alert_by_alias(&self, alias: &str, source: &str) -> Result<()> {
        let url = format!("{}/v2/alerts/{}/close", self.base_url, alias);
        let body = CloseAlert { source };
        let (url, body) = (&url, &body);

        retry(&self.retry, "opsgenie close alert", || async move {
            tracing::debug!("📡 POST {}", url);
            let response = self
                .client
                .post(url)
                .query(&[("identifierType", "alias")])
                .header("Authorization", self.auth_header())
                .json(body)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(error_for_response(SERVICE, response).await);
            }
            Ok(())
        })
        .await?;

        tracing::info!("✅ Close requested for alert {}", alias);
        Ok(())
    }
}
