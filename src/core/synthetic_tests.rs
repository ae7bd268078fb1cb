use crate::adapters::datadog::{DatadogClient, TriggerResponse};
use crate::utils::error::{Result, TubularError};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Public id of the test that acts as the on/off switch for deployment testing. It is
/// edited in the Datadog UI to always pass (testing enabled) or always fail (disabled).
pub const DEPLOYMENT_TESTING_SWITCH_ID: &str = "sad-hqu-h33";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticTest {
    pub name: String,
    pub public_id: String,
    #[serde(skip)]
    pub result_id: Option<String>,
    #[serde(skip)]
    pub success: Option<bool>,
}

impl SyntheticTest {
    pub fn new(name: impl Into<String>, public_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_id: public_id.into(),
            result_id: None,
            success: None,
        }
    }

    pub fn deployment_testing_switch() -> Self {
        Self::new(
            "Deployment testing enable test governing CI/CD synthetic testing",
            DEPLOYMENT_TESTING_SWITCH_ID,
        )
    }
}

/// Parses the `--tests` argument: a JSON list of `{name, public_id}` objects.
pub fn parse_test_list(json: &str) -> Result<Vec<SyntheticTest>> {
    let tests: Vec<SyntheticTest> = serde_json::from_str(json)?;
    if tests.is_empty() {
        tracing::info!("No reportable synthetic tests given, only the switch test will run");
    }
    Ok(tests)
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The switch test failed, so results are not waited on.
    TestingDisabled,
    Completed { failed: Vec<SyntheticTest> },
}

/// One batch of synthetic tests: the switch test plus the reportable ones.
pub struct SyntheticTestRun<'a> {
    client: &'a DatadogClient,
    timeout: Duration,
    poll_interval: Duration,
    switch: SyntheticTest,
    tests: Vec<SyntheticTest>,
    batch_id: Option<String>,
    trigger_time: Option<Instant>,
}

impl<'a> SyntheticTestRun<'a> {
    pub fn new(client: &'a DatadogClient, tests: Vec<SyntheticTest>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            switch: SyntheticTest::deployment_testing_switch(),
            tests,
            batch_id: None,
            trigger_time: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn batch_id(&self) -> Option<&str> {
        self.batch_id.as_deref()
    }

    pub fn tests(&self) -> &[SyntheticTest] {
        &self.tests
    }

    pub async fn trigger(&mut self) -> Result<()> {
        let mut public_ids = vec![self.switch.public_id.as_str()];
        public_ids.extend(self.tests.iter().map(|t| t.public_id.as_str()));

        let trigger_time = Instant::now();
        self.trigger_time = Some(trigger_time);
        tracing::info!("CI batch triggered with {} test(s)", public_ids.len());

        let response = self
            .client
            .trigger_ci(&public_ids)
            .await
            .inspect_err(|e| tracing::error!("❌ Datadog error on triggering tests: {}", e))?;
        self.record_trigger_response(response);
        Ok(())
    }

    fn record_trigger_response(&mut self, response: TriggerResponse) {
        self.batch_id = response.batch_id;
        for result in response.results {
            if result.public_id == self.switch.public_id {
                self.switch.result_id = Some(result.result_id);
            } else if let Some(test) = self.tests.iter_mut().find(|t| t.public_id == result.public_id) {
                test.result_id = Some(result.result_id);
            } else {
                tracing::warn!("⚠️ Datadog reported a run for unrequested test {}", result.public_id);
            }
        }
    }

    /// Polls one test until it reports, giving up once `timeout` has passed since the
    /// batch was triggered.
    async fn poll_for_result(&self, test: &SyntheticTest) -> Result<bool> {
        let trigger_time = self
            .trigger_time
            .ok_or_else(|| TubularError::config("Synthetic tests have not been triggered"))?;
        let result_id = test.result_id.as_deref().ok_or_else(|| TubularError::NotFoundError {
            message: format!("no test run was assigned to test {}", test.public_id),
        })?;

        let mut result = None;
        while result.is_none() && trigger_time.elapsed() < self.timeout {
            tokio::time::sleep(self.poll_interval).await;
            result = self.client.test_result(&test.public_id, result_id).await?;
            tracing::debug!("Test {} result so far: {:?}", test.public_id, result);
        }

        match result {
            Some(passed) => {
                tracing::info!(
                    "Test {} finished after {:?} with passed={}",
                    test.public_id,
                    trigger_time.elapsed(),
                    passed
                );
                Ok(passed)
            }
            None => Err(TubularError::TimeoutError {
                message: format!("The test run for {} timed out.", test.public_id),
            }),
        }
    }

    pub async fn deployment_testing_enabled(&self) -> Result<bool> {
        let enabled = self.poll_for_result(&self.switch).await?;
        if !enabled {
            tracing::warn!(
                "*** Datadog Synthetic testing disabled via failing test {} ***",
                self.switch.name
            );
        }
        Ok(enabled)
    }

    pub async fn record_results(&mut self) -> Result<()> {
        let mut outcomes = Vec::with_capacity(self.tests.len());
        for test in &self.tests {
            outcomes.push(self.poll_for_result(test).await?);
        }
        for (test, passed) in self.tests.iter_mut().zip(outcomes) {
            test.success = Some(passed);
        }
        Ok(())
    }

    pub fn failed_tests(&self) -> Vec<SyntheticTest> {
        self.tests
            .iter()
            .filter(|t| t.success != Some(true))
            .cloned()
            .collect()
    }

    pub async fn run(&mut self) -> Result<RunOutcome> {
        self.trigger().await?;
        if !self.deployment_testing_enabled().await? {
            return Ok(RunOutcome::TestingDisabled);
        }
        for test in &self.tests {
            tracing::info!("\t Running test {}: {}", test.public_id, test.name);
        }
        self.record_results().await?;
        let failed = self.failed_tests();
        for test in &failed {
            tracing::warn!("Test failed: {} -- {}", test.public_id, test.name);
        }
        Ok(RunOutcome::Completed { failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_test_list() {
        let tests = parse_test_list(r#"[{"name": "Login works", "public_id": "abc-def-ghi"}]"#).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].public_id, "abc-def-ghi");
        assert!(tests[0].result_id.is_none());

        assert!(parse_test_list("[]").unwrap().is_empty());
        assert!(parse_test_list("not json").is_err());
    }
}
