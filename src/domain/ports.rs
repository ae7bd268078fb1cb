use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Looks up the AMI currently serving an environment/deployment/play and its tags.
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    async fn active_ami_for_edp(&self, environment: &str, deployment: &str, play: &str) -> Result<String>;
    async fn tags_for_ami(&self, ami_id: &str) -> Result<BTreeMap<String, String>>;
}

/// Runs an external tool (npm, aws, datadog-ci) the way a shell step would.
pub trait CommandRunner: Send + Sync {
    /// Returns the process exit code; a process killed by a signal reports `-1`.
    fn run(&self, command_line: &str, cwd: Option<&Path>, env: &[(String, String)]) -> Result<i32>;
}
