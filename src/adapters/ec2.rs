//! EC2-backed image catalog. Only built with the `aws` feature.

use crate::domain::ports::ImageCatalog;
use crate::utils::error::{Result, TubularError};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::Region;
use aws_sdk_ec2::config::http::HttpResponse;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client as Ec2Client;
use std::collections::{BTreeMap, BTreeSet};

const SERVICE: &str = "EC2";

/// EC2 error codes worth another attempt.
const TRANSIENT_CODES: &[&str] = &[
    "RequestLimitExceeded",
    "Throttling",
    "ThrottlingException",
    "InternalError",
    "Unavailable",
    "ServiceUnavailable",
];

/// Throttling, timeouts and dispatch failures are transient; auth, validation and
/// other service errors are not.
fn is_transient<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => true,
        SdkError::ServiceError(context) => context.err().code().is_some_and(|c| TRANSIENT_CODES.contains(&c)),
        _ => false,
    }
}

fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> TubularError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let transient = is_transient(&err);
    let status = err.raw_response().map(|r| r.status().as_u16()).unwrap_or_default();
    let message = DisplayErrorContext(err).to_string();
    if transient {
        TubularError::RecoverableError {
            service: SERVICE.to_string(),
            message,
        }
    } else {
        TubularError::ApiError {
            service: SERVICE.to_string(),
            status,
            message,
        }
    }
}

fn filter(name: &str, value: &str) -> Filter {
    Filter::builder().name(name).values(value).build()
}

pub struct Ec2ImageCatalog {
    client: Ec2Client,
}

impl Ec2ImageCatalog {
    pub fn new(client: Ec2Client) -> Self {
        Self { client }
    }

    pub async fn for_region(region: &str) -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let config = aws_sdk_ec2::config::Builder::from(&config)
            .region(Region::new(region.to_string()))
            .build();
        Self::new(Ec2Client::from_conf(config))
    }
}

#[async_trait]
impl ImageCatalog for Ec2ImageCatalog {
    async fn active_ami_for_edp(&self, environment: &str, deployment: &str, play: &str) -> Result<String> {
        let output = self
            .client
            .describe_instances()
            .filters(filter("tag:environment", environment))
            .filters(filter("tag:deployment", deployment))
            .filters(filter("tag:play", play))
            .filters(filter("instance-state-name", "running"))
            .send()
            .await
            .map_err(sdk_error)?;

        let image_ids: BTreeSet<String> = output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(|i| i.image_id().map(str::to_string))
            .collect();

        let edp = format!("{}-{}-{}", environment, deployment, play);
        match image_ids.len() {
            0 => Err(TubularError::NotFoundError {
                message: format!("No running instances found for {}", edp),
            }),
            1 => Ok(image_ids.into_iter().next().unwrap_or_default()),
            n => Err(TubularError::config(format!(
                "Multiple active AMIs ({}) found for {}: {}",
                n,
                edp,
                image_ids.into_iter().collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    async fn tags_for_ami(&self, ami_id: &str) -> Result<BTreeMap<String, String>> {
        let output = self
            .client
            .describe_images()
            .image_ids(ami_id)
            .send()
            .await
            .map_err(sdk_error)?;

        let image = output.images().first().ok_or_else(|| TubularError::NotFoundError {
            message: format!("AMI {} not found", ami_id),
        })?;

        Ok(image
            .tags()
            .iter()
            .filter_map(|t| Some((t.key()?.to_string(), t.value().unwrap_or_default().to_string())))
            .collect())
    }
}
