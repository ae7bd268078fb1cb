use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use tubular::adapters::datadog::DatadogClient;
use tubular::core::synthetic_tests::{
    parse_test_list, RunOutcome, SyntheticTestRun, DEPLOYMENT_TESTING_SWITCH_ID,
};
use tubular::TubularError;

const TESTS: &str = r#"[
    {"name": "Learner can log in", "public_id": "abc-def-ghi"},
    {"name": "Course page renders", "public_id": "jkl-mno-pqr"}
]"#;

fn client(server: &MockServer) -> DatadogClient {
    DatadogClient::with_base_url("api-key", "app-key", &server.base_url()).unwrap()
}

async fn mock_trigger(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/trigger/ci")
                .header("DD-API-KEY", "api-key")
                .header("DD-APPLICATION-KEY", "app-key")
                .json_body(json!({"tests": [
                    {"public_id": DEPLOYMENT_TESTING_SWITCH_ID},
                    {"public_id": "abc-def-ghi"},
                    {"public_id": "jkl-mno-pqr"}
                ]}));
            then.status(200).json_body(json!({
                "batch_id": "batch-1",
                "results": [
                    {"public_id": DEPLOYMENT_TESTING_SWITCH_ID, "result_id": "r-switch"},
                    {"public_id": "abc-def-ghi", "result_id": "r-1"},
                    {"public_id": "jkl-mno-pqr", "result_id": "r-2"}
                ]
            }));
        })
        .await
}

async fn mock_result<'a>(server: &'a MockServer, public_id: &str, result_id: &str, passed: bool) -> httpmock::Mock<'a> {
    let path = format!("/{}/results/{}", public_id, result_id);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(json!({"result": {"passed": passed}}));
        })
        .await
}

#[tokio::test]
async fn test_failed_reportable_test_is_returned() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_trigger(&server).await;
    mock_result(&server, DEPLOYMENT_TESTING_SWITCH_ID, "r-switch", true).await;
    mock_result(&server, "abc-def-ghi", "r-1", true).await;
    mock_result(&server, "jkl-mno-pqr", "r-2", false).await;

    let client = client(&server);
    let mut run = SyntheticTestRun::new(&client, parse_test_list(TESTS)?, Duration::from_secs(10))
        .with_poll_interval(Duration::from_millis(10));

    match run.run().await? {
        RunOutcome::Completed { failed } => {
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].public_id, "jkl-mno-pqr");
        }
        RunOutcome::TestingDisabled => panic!("the switch test passed, testing must be enabled"),
    }
    assert_eq!(run.batch_id(), Some("batch-1"));
    Ok(())
}

#[tokio::test]
async fn test_failing_switch_disables_testing() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_trigger(&server).await;
    mock_result(&server, DEPLOYMENT_TESTING_SWITCH_ID, "r-switch", false).await;
    let reportable = mock_result(&server, "abc-def-ghi", "r-1", false).await;

    let client = client(&server);
    let mut run = SyntheticTestRun::new(&client, parse_test_list(TESTS)?, Duration::from_secs(10))
        .with_poll_interval(Duration::from_millis(10));

    assert!(matches!(run.run().await?, RunOutcome::TestingDisabled));
    reportable.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_result_not_ready_until_timeout() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_trigger(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/{}/results/r-switch", DEPLOYMENT_TESTING_SWITCH_ID));
            then.status(404);
        })
        .await;

    let client = client(&server);
    let mut run = SyntheticTestRun::new(&client, parse_test_list(TESTS)?, Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(20));

    let result = run.run().await;
    assert!(matches!(result, Err(TubularError::TimeoutError { .. })));
    Ok(())
}

#[tokio::test]
async fn test_trigger_failure_is_reported() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/trigger/ci");
            then.status(403).json_body(json!({"errors": ["Forbidden"]}));
        })
        .await;

    let client = client(&server);
    let mut run = SyntheticTestRun::new(&client, parse_test_list(TESTS)?, Duration::from_secs(1));

    assert!(matches!(run.run().await, Err(TubularError::ApiError { status: 403, .. })));
    Ok(())
}

#[tokio::test]
async fn test_empty_test_list_runs_only_the_switch() -> Result<()> {
    let server = MockServer::start_async().await;
    let trigger = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/trigger/ci")
                .json_body(json!({"tests": [{"public_id": DEPLOYMENT_TESTING_SWITCH_ID}]}));
            then.status(200).json_body(json!({
                "batch_id": "batch-2",
                "results": [{"public_id": DEPLOYMENT_TESTING_SWITCH_ID, "result_id": "r-switch"}]
            }));
        })
        .await;
    mock_result(&server, DEPLOYMENT_TESTING_SWITCH_ID, "r-switch", true).await;

    let client = client(&server);
    let mut run = SyntheticTestRun::new(&client, parse_test_list("[]")?, Duration::from_secs(10))
        .with_poll_interval(Duration::from_millis(10));

    match run.run().await? {
        RunOutcome::Completed { failed } => assert!(failed.is_empty()),
        RunOutcome::TestingDisabled => panic!("the switch test passed, testing must be enabled"),
    }
    trigger.assert_async().await;
    Ok(())
}
