// Adapters layer: concrete clients for the external systems the commands glue together.

pub mod cloudflare;
pub mod datadog;
#[cfg(feature = "aws")]
pub mod ec2;
pub mod git;
pub mod github;
pub mod http;
pub mod opsgenie;
pub mod pagerduty;
pub mod process;
pub mod red_ventures;
pub mod sfmc;
pub mod ubuntu_images;
