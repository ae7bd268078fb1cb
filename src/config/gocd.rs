use crate::utils::error::{Result, TubularError};

pub const DEFAULT_GOCD_BASE_URL: &str = "https://gocd.tools.edx.org";

/// Source recorded on alerts closed by the close step.
pub const CLOSE_ALERT_SOURCE: &str = "tubular.scripts.gocd_close_alert";

/// Job coordinates GoCD exports into every task's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GocdContext {
    pub pipeline: String,
    pub pipeline_counter: String,
    pub stage: String,
    pub stage_counter: String,
    pub job: String,
    pub trigger_user: String,
}

impl GocdContext {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name).ok_or_else(|| TubularError::MissingConfigError {
                field: name.to_string(),
            })
        };

        Ok(Self {
            pipeline: get("GO_PIPELINE_NAME")?,
            pipeline_counter: get("GO_PIPELINE_COUNTER")?,
            stage: get("GO_STAGE_NAME")?,
            stage_counter: get("GO_STAGE_COUNTER")?,
            job: get("GO_JOB_NAME")?,
            trigger_user: get("GO_TRIGGER_USER")?,
        })
    }

    /// The close step only needs the alias, which is built from these three names.
    pub fn alias_from_lookup<F>(lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name).ok_or_else(|| TubularError::MissingConfigError {
                field: name.to_string(),
            })
        };
        Ok(alert_alias(
            &get("GO_PIPELINE_NAME")?,
            &get("GO_STAGE_NAME")?,
            &get("GO_JOB_NAME")?,
        ))
    }

    pub fn alias(&self) -> String {
        alert_alias(&self.pipeline, &self.stage, &self.job)
    }

    pub fn job_url(&self, base_url: &str) -> String {
        format!(
            "{}/go/tab/build/detail/{}/{}/{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.pipeline,
            self.pipeline_counter,
            self.stage,
            self.stage_counter,
            self.job
        )
    }

    pub fn alert_message(&self) -> String {
        format!(
            "[GoCD] Pipeline failed: {}/{}/{}",
            self.pipeline, self.stage, self.job
        )
    }

    pub fn alert_description(&self, runbook: Option<&str>, base_url: &str) -> String {
        format!(
            "Pipeline {} failed.\n\n- Runbook: {}\n- Build logs: {}\n- Triggered by: {}\n",
            self.pipeline,
            runbook.unwrap_or("<not provided>"),
            self.job_url(base_url),
            self.trigger_user
        )
    }
}

/// The alerting integration opens alerts whose alias starts with `gocd-pipeline-`; the
/// close step finds the open alert by the same alias.
pub fn alert_alias(pipeline: &str, stage: &str, job: &str) -> String {
    format!("gocd-pipeline-{}-{}-{}", pipeline, stage, job)
}
