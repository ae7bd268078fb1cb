use crate::utils::error::{Result, TubularError};
use reqwest::{Client, Response};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tubular/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub fn default_client() -> Result<Client> {
    build_client(DEFAULT_TIMEOUT)
}

/// Converts a non-success response into an error, keeping the body for the log.
pub async fn error_for_response(service: &str, response: Response) -> TubularError {
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("unknown");
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        reason.to_string()
    } else {
        format!("{} - {}", reason, body.trim())
    };
    TubularError::from_status(service, status, message)
}

pub fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
