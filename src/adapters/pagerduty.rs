//! PagerDuty Events API v2.

use crate::adapters::http::{default_client, trim_base};
use crate::utils::error::{Result, TubularError};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PAGERDUTY_URL: &str = "https://events.pagerduty.com";
const SERVICE: &str = "PagerDuty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

impl FromStr for Severity {
    type Err = TubularError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(TubularError::InvalidConfigValueError {
                field: "severity".to_string(),
                value: other.to_string(),
                reason: "expected one of critical, error, warning, info".to_string(),
            }),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize)]
struct CustomDetails<'a> {
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct TriggerPayload<'a> {
    summary: &'a str,
    severity: Severity,
    source: &'a str,
    custom_details: CustomDetails<'a>,
}

#[derive(Debug, Serialize)]
struct ResolvePayload<'a> {
    source: &'a str,
}

#[derive(Debug, Serialize)]
struct Event<'a, P: Serialize> {
    routing_key: &'a str,
    event_action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dedup_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<P>,
}

pub struct PagerDutyApi {
    client: Client,
    base_url: String,
}

impl PagerDutyApi {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_PAGERDUTY_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: trim_base(base_url),
        })
    }

    async fn enqueue<P: Serialize>(&self, event: &Event<'_, P>) -> Result<()> {
        let url = format!("{}/v2/enqueue", self.base_url);
        tracing::debug!("📡 POST {}", url);
        let response = self.client.post(&url).json(event).send().await?;

        if response.status() == StatusCode::ACCEPTED {
            return Ok(());
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        tracing::error!("❌ PagerDuty rejected the event. Response: {}", text);
        Err(TubularError::from_status(SERVICE, status, text))
    }

    pub async fn trigger(
        &self,
        routing_key: &str,
        summary: &str,
        description: &str,
        severity: Severity,
        source: &str,
    ) -> Result<()> {
        tracing::info!("Creating alert on PagerDuty");
        let event = Event {
            routing_key,
            event_action: "trigger",
            dedup_key: None,
            payload: Some(TriggerPayload {
                summary,
                severity,
                source,
                custom_details: CustomDetails { description },
            }),
        };
        self.enqueue(&event).await?;
        tracing::info!("✅ Alert successfully created on PagerDuty.");
        Ok(())
    }

    pub async fn resolve(&self, routing_key: &str, dedup_key: &str, source: Option<&str>) -> Result<()> {
        tracing::info!("Closing alert with deduplication key: {}", dedup_key);
        let event = Event {
            routing_key,
            event_action: "resolve",
            dedup_key: Some(dedup_key),
            payload: source.map(|source| ResolvePayload { source }),
        };
        self.enqueue(&event).await?;
        tracing::info!("✅ Alert successfully closed in PagerDuty.");
        Ok(())
    }
}
