//! Ubuntu cloud image lookup for the latest released base AMI.

use crate::adapters::http::{build_client, error_for_response, trim_base};
use crate::utils::error::{Result, TubularError};
use crate::utils::retry::{retry, RetryPolicy};
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_UBUNTU_IMAGES_URL: &str = "https://cloud-images.ubuntu.com";
const SERVICE: &str = "Ubuntu cloud images";

pub fn codename_for_version(version: &str) -> &'static str {
    match version {
        "20.04" => "focal",
        "18.04" => "bionic",
        other => {
            tracing::warn!("Unsupported Ubuntu version {}, defaulting to focal", other);
            "focal"
        }
    }
}

/// Picks the hvm ebs-ssd amd64 image id for `region` out of a `released.current.txt` listing.
pub fn parse_ami_listing(listing: &str, region: &str) -> Result<String> {
    let pattern = format!(r"ebs-ssd(.+?)amd64(.+?){}(.+?)hvm", regex::escape(region));
    let matcher = Regex::new(&pattern)?;
    matcher
        .captures(listing)
        .and_then(|c| c.get(3))
        .map(|m| m.as_str().trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TubularError::NotFoundError {
            message: format!("No Ubuntu AMI found for region {}", region),
        })
}

pub struct UbuntuImageLocator {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl UbuntuImageLocator {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_UBUNTU_IMAGES_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(60))?,
            base_url: trim_base(base_url),
            retry: RetryPolicy::with_max_attempts(5),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn latest_ami(&self, ubuntu_version: &str, region: &str) -> Result<String> {
        let url = format!(
            "{}/query/{}/server/released.current.txt",
            self.base_url,
            codename_for_version(ubuntu_version)
        );
        let url = &url;
        tracing::debug!("Fetching Ubuntu image listing from {}", url);

        let listing = retry(&self.retry, "ubuntu image listing", || async move {
            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(error_for_response(SERVICE, response).await);
            }
            Ok(response.text().await?)
        })
        .await?;

        parse_ami_listing(&listing, region)
    }
}
