//! Cloudflare cache purging for statically hosted frontends.

use crate::adapters::http::{default_client, error_for_response, trim_base};
use crate::utils::error::{Result, TubularError};
use crate::utils::retry::{retry, RetryPolicy};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLOUDFLARE_URL: &str = "https://api.cloudflare.com";
const SERVICE: &str = "Cloudflare";

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ZoneList {
    #[serde(default)]
    result: Vec<Zone>,
}

#[derive(Debug, Serialize)]
struct PurgeRequest<'a> {
    hosts: Vec<&'a str>,
}

/// The zone a hostname belongs to: its last two labels.
pub fn zone_for_host(hostname: &str) -> String {
    let labels: Vec<&str> = hostname.trim_end_matches('.').split('.').collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}

pub struct CloudflareApi {
    client: Client,
    base_url: String,
    email: String,
    api_key: String,
    retry: RetryPolicy,
}

impl CloudflareApi {
    pub fn new(email: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(email, api_key, DEFAULT_CLOUDFLARE_URL)
    }

    pub fn with_base_url(email: impl Into<String>, api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: trim_base(base_url),
            email: email.into(),
            api_key: api_key.into(),
            retry: RetryPolicy::with_max_attempts(3),
        })
    }

    /// Reads `CF_API_EMAIL` and `CF_API_KEY`.
    pub fn from_env() -> Result<Self> {
        use crate::config::required_env;
        Self::new(required_env("CF_API_EMAIL")?, required_env("CF_API_KEY")?)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("X-Auth-Email", &self.email)
            .header("X-Auth-Key", &self.api_key)
            .header("Content-Type", "application/json")
    }

    pub async fn zone_id(&self, zone: &str) -> Result<String> {
        let url = format!("{}/client/v4/zones", self.base_url);
        let url = &url;
        let zones: ZoneList = retry(&self.retry, "cloudflare zone lookup", || async move {
            let response = self
                .request(self.client.get(url))
                .query(&[("name", zone)])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(error_for_response(SERVICE, response).await);
            }
            Ok(response.json().await?)
        })
        .await?;

        zones
            .result
            .into_iter()
            .next()
            .map(|z| z.id)
            .ok_or_else(|| TubularError::NotFoundError {
                message: format!("Cloudflare zone {} not found", zone),
            })
    }

    /// Purges everything cached for `hostname`.
    pub async fn purge_cache(&self, hostname: &str) -> Result<()> {
        let zone = zone_for_host(hostname);
        let zone_id = self.zone_id(&zone).await?;
        let url = format!("{}/client/v4/zones/{}/purge_cache", self.base_url, zone_id);
        let body = PurgeRequest { hosts: vec![hostname] };
        let (url, body) = (&url, &body);

        retry(&self.retry, "cloudflare purge", || async move {
            let response = self.request(self.client.post(url)).json(body).send().await?;
            if !response.status().is_success() {
                return Err(error_for_response(SERVICE, response).await);
            }
            Ok(())
        })
        .await?;

        tracing::info!("🧹 Purged Cloudflare cache for {}", hostname);
        Ok(())
    }
}
