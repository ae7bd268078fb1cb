//! Red Ventures user deletion, authenticated with an Auth0 client-credentials token.

use crate::adapters::http::{default_client, error_for_response, trim_base};
use crate::domain::model::LearnerRecord;
use crate::utils::error::{Result, TubularError};
use crate::utils::retry::{retry, RetryPolicy};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const SERVICE: &str = "Red Ventures";

#[derive(Debug, Clone)]
pub struct RedVenturesConfig {
    pub audience: String,
    pub auth_url: String,
    pub deletion_url: String,
    pub username: String,
    pub password: String,
}

impl RedVenturesConfig {
    pub fn from_env() -> Result<Self> {
        use crate::config::required_env;
        Ok(Self {
            audience: required_env("RED_VENTURES_AUDIENCE")?,
            auth_url: required_env("RED_VENTURES_AUTH_URL")?,
            deletion_url: required_env("RED_VENTURES_DELETION_URL")?,
            username: required_env("RED_VENTURES_USERNAME")?,
            password: required_env("RED_VENTURES_PASSWORD")?,
        })
    }
}

impl Validate for RedVenturesConfig {
    fn validate(&self) -> Result<()> {
        validate_url("RED_VENTURES_AUTH_URL", &self.auth_url)?;
        validate_url("RED_VENTURES_DELETION_URL", &self.deletion_url)?;
        validate_non_empty_string("RED_VENTURES_USERNAME", &self.username)?;
        validate_non_empty_string("RED_VENTURES_PASSWORD", &self.password)
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct RedVenturesApi {
    client: Client,
    config: RedVenturesConfig,
    retry: RetryPolicy,
}

impl RedVenturesApi {
    pub fn new(config: RedVenturesConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: default_client()?,
            config,
            retry: RetryPolicy::from_env("RETRY_MAX_ATTEMPTS", 5),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn get_token(&self) -> Result<String> {
        let url = format!("{}/oauth/token", trim_base(&self.config.auth_url));
        let body = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.config.username,
            client_secret: &self.config.password,
            audience: &self.config.audience,
        };
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(error_for_response(SERVICE, response).await);
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn delete_once(&self, email: &str) -> Result<()> {
        let token = self.get_token().await?;
        let response = self
            .client
            .delete(&self.config.deletion_url)
            .query(&[("email", email)])
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            tracing::info!("Red Ventures user deletion succeeded");
            return Ok(());
        }

        let message = format!(
            "Red Ventures user deletion failed with {} due to {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown")
        );
        tracing::error!("{}", message);
        if status.is_server_error() {
            Err(TubularError::RecoverableError {
                service: SERVICE.to_string(),
                message,
            })
        } else {
            Err(TubularError::ApiError {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Deletes the learner by original email; 5xx responses are retried.
    pub async fn delete_user(&self, learner: &LearnerRecord) -> Result<()> {
        let email = learner.email().ok_or_else(|| {
            TubularError::config("Expected an email address for user to delete, but received None.")
        })?;
        retry(&self.retry, "red ventures delete", || self.delete_once(email)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RedVenturesConfig {
        RedVenturesConfig {
            audience: "aud".to_string(),
            auth_url: "https://auth.example.com".to_string(),
            deletion_url: "https://rv.example.com/delete".to_string(),
            username: "client".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let bad_url = RedVenturesConfig {
            deletion_url: "not a url".to_string(),
            ..config()
        };
        assert!(matches!(
            RedVenturesApi::new(bad_url),
            Err(TubularError::InvalidConfigValueError { field, .. }) if field == "RED_VENTURES_DELETION_URL"
        ));
    }
}
