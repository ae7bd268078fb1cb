//! Salesforce Marketing Cloud contact deletion.

use crate::adapters::http::{build_client, trim_base};
use crate::domain::model::LearnerRecord;
use crate::utils::error::{Result, TubularError};
use crate::utils::retry::{retry, RetryPolicy};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "SFMC";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SfmcConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_base_url: String,
    pub rest_base_url: String,
}

impl SfmcConfig {
    pub fn for_subdomain(client_id: &str, client_secret: &str, subdomain: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_base_url: format!("https://{}.auth.marketingcloudapis.com", subdomain),
            rest_base_url: format!("https://{}.rest.marketingcloudapis.com", subdomain),
        }
    }

    pub fn from_env() -> Result<Self> {
        use crate::config::required_env;
        Ok(Self::for_subdomain(
            &required_env("SFMC_CLIENT_ID")?,
            &required_env("SFMC_CLIENT_SECRET")?,
            &required_env("SFMC_SUBDOMAIN")?,
        ))
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchRequest<'a> {
    channel_address_list: Vec<&'a str>,
    maximum_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactKeyDetail {
    contact_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelAddressResponse {
    #[serde(default)]
    contact_key_details: Vec<ContactKeyDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    channel_address_response_entities: Vec<ChannelAddressResponse>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    values: &'a [String],
    #[serde(rename = "DeleteOperationType")]
    delete_operation_type: &'a str,
}

/// Maps an unsuccessful SFMC response: 429 and 5xx may be retried, anything else is final.
async fn failure(operation: &str, response: Response) -> TubularError {
    let status = response.status();
    let mut message = format!(
        "{} failed with status {}: {}",
        operation,
        status.as_u16(),
        status.canonical_reason().unwrap_or("unknown")
    );
    if let Ok(details) = response.json::<serde_json::Value>().await {
        if !details.is_null() && details != serde_json::json!({}) {
            message.push_str(&format!(" - Details: {}", details));
        }
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        tracing::warn!("{}", message);
        TubularError::RecoverableError {
            service: SERVICE.to_string(),
            message,
        }
    } else {
        tracing::error!("{}", message);
        TubularError::ApiError {
            service: SERVICE.to_string(),
            status: status.as_u16(),
            message,
        }
    }
}

/// Transport failures are worth another attempt.
fn transport(operation: &str, err: reqwest::Error) -> TubularError {
    let message = format!("{} failed with exception: {}", operation, err);
    tracing::error!("{}", message);
    TubularError::RecoverableError {
        service: SERVICE.to_string(),
        message,
    }
}

pub struct SalesforceMarketingCloudApi {
    client: Client,
    config: SfmcConfig,
    retry: RetryPolicy,
}

impl SalesforceMarketingCloudApi {
    pub fn new(config: SfmcConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(REQUEST_TIMEOUT)?,
            config,
            retry: RetryPolicy::from_env("RETRY_SFMC_MAX_ATTEMPTS", 5),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn access_token_once(&self) -> Result<String> {
        const OPERATION: &str = "SFMC token request";
        let url = format!("{}/v2/token", trim_base(&self.config.auth_base_url));
        let body = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(OPERATION, e))?;
        if response.status() != StatusCode::OK {
            return Err(failure(OPERATION, response).await);
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    pub async fn access_token(&self) -> Result<String> {
        retry(&self.retry, "sfmc token", || self.access_token_once()).await
    }

    async fn search_contacts_once(&self, token: &str, email: &str) -> Result<Vec<String>> {
        const OPERATION: &str = "SFMC contact search";
        let url = format!(
            "{}/contacts/v1/addresses/email/search",
            trim_base(&self.config.rest_base_url)
        );
        let body = SearchRequest {
            channel_address_list: vec![email],
            maximum_count: 5,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(OPERATION, e))?;
        if response.status() != StatusCode::OK {
            return Err(failure(OPERATION, response).await);
        }
        let found: SearchResponse = response.json().await?;
        Ok(found
            .channel_address_response_entities
            .into_iter()
            .flat_map(|entity| entity.contact_key_details)
            .map(|detail| detail.contact_key)
            .collect())
    }

    async fn delete_contacts_once(&self, token: &str, contact_keys: &[String]) -> Result<()> {
        const OPERATION: &str = "SFMC user deletion";
        let url = format!(
            "{}/contacts/v1/contacts/actions/delete",
            trim_base(&self.config.rest_base_url)
        );
        let body = DeleteRequest {
            values: contact_keys,
            delete_operation_type: "ContactAndAttributes",
        };
        let response = self
            .client
            .post(&url)
            .query(&[("type", "keys")])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(OPERATION, e))?;
        if response.status() != StatusCode::OK {
            return Err(failure(OPERATION, response).await);
        }
        Ok(())
    }

    /// Finds the learner's contacts by email and deletes them with their attributes.
    /// A learner without contacts is not an error.
    pub async fn delete_user(&self, learner: &LearnerRecord) -> Result<()> {
        let email = learner
            .email()
            .ok_or_else(|| TubularError::config("email is required"))?;

        let token = self.access_token().await?;
        let token = token.as_str();

        let contact_keys = retry(&self.retry, "sfmc search", || self.search_contacts_once(token, email)).await?;
        if contact_keys.is_empty() {
            tracing::info!("No contact found in SFMC for the learner's email, nothing to delete");
            return Ok(());
        }

        let keys = contact_keys.as_slice();
        retry(&self.retry, "sfmc delete", || self.delete_contacts_once(token, keys)).await?;
        tracing::info!(
            "SFMC user deletion succeeded for contact key(s): {}",
            contact_keys.join(", ")
        );
        Ok(())
    }
}
