use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use tubular::adapters::opsgenie::OpsGenieApi;
use tubular::adapters::pagerduty::{PagerDutyApi, Severity};
use tubular::config::gocd::CLOSE_ALERT_SOURCE;
use tubular::config::GocdContext;
use tubular::utils::retry::RetryPolicy;
use tubular::TubularError;

fn gocd_context() -> GocdContext {
    GocdContext::from_lookup(|name| {
        let value = match name {
            "GO_PIPELINE_NAME" => "edxapp-prod",
            "GO_PIPELINE_COUNTER" => "42",
            "GO_STAGE_NAME" => "deploy",
            "GO_STAGE_COUNTER" => "1",
            "GO_JOB_NAME" => "deploy_job",
            "GO_TRIGGER_USER" => "changes",
            _ => return None,
        };
        Some(value.to_string())
    })
    .unwrap()
}

#[tokio::test]
async fn test_open_alert_posts_team_responder_and_alias() -> Result<()> {
    let server = MockServer::start_async().await;
    let context = gocd_context();

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/alerts")
                .header("Authorization", "GenieKey secret")
                .json_body_partial(
                    json!({
                        "message": "[GoCD] Pipeline failed: edxapp-prod/deploy/deploy_job",
                        "alias": "gocd-pipeline-edxapp-prod-deploy-deploy_job",
                        "responders": [{"name": "SRE", "type": "team"}]
                    })
                    .to_string(),
                );
            then.status(202).json_body(json!({"result": "Request will be processed"}));
        })
        .await;

    let api = OpsGenieApi::with_base_url("secret", &server.base_url())?;
    let alias = context.alias();
    api.alert(
        &context.alert_message(),
        &context.alert_description(None, "https://gocd.example.com"),
        "SRE",
        Some(&alias),
    )
    .await?;

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_close_alert_uses_alias_identifier() -> Result<()> {
    let server = MockServer::start_async().await;
    let alias = gocd_context().alias();

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/v2/alerts/{}/close", alias))
                .query_param("identifierType", "alias")
                .json_body(json!({"source": "tubular.scripts.gocd_close_alert"}));
            then.status(202);
        })
        .await;

    OpsGenieApi::with_base_url("secret", &server.base_url())?
        .close_alert_by_alias(&alias, CLOSE_ALERT_SOURCE)
        .await?;

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_opsgenie_server_errors_are_retried() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/alerts");
            then.status(503);
        })
        .await;

    let api = OpsGenieApi::with_base_url("secret", &server.base_url())?.with_retry(RetryPolicy::immediate(3));
    let result = api.alert("message", "description", "SRE", None).await;

    assert!(matches!(result, Err(TubularError::RecoverableError { .. })));
    mock.assert_hits_async(3).await;
    Ok(())
}

#[tokio::test]
async fn test_opsgenie_auth_failure_is_not_retried() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/alerts");
            then.status(401).body("invalid key");
        })
        .await;

    let api = OpsGenieApi::with_base_url("bad", &server.base_url())?.with_retry(RetryPolicy::immediate(3));
    let result = api.alert("message", "description", "SRE", None).await;

    assert!(matches!(result, Err(TubularError::ApiError { status: 401, .. })));
    mock.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_pagerduty_trigger_event() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/enqueue").json_body(json!({
                "routing_key": "routing",
                "event_action": "trigger",
                "payload": {
                    "summary": "Deploy failed",
                    "severity": "critical",
                    "source": "custom-script",
                    "custom_details": {"description": "edxapp prod deploy failed"}
                }
            }));
            then.status(202).json_body(json!({"status": "success", "dedup_key": "abc"}));
        })
        .await;

    PagerDutyApi::with_base_url(&server.base_url())?
        .trigger(
            "routing",
            "Deploy failed",
            "edxapp prod deploy failed",
            Severity::Critical,
            "custom-script",
        )
        .await?;

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_pagerduty_resolve_with_and_without_source() -> Result<()> {
    let server = MockServer::start_async().await;
    let with_source = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/enqueue").json_body(json!({
                "routing_key": "routing",
                "event_action": "resolve",
                "dedup_key": "abc",
                "payload": {"source": "gocd"}
            }));
            then.status(202);
        })
        .await;
    let without_source = server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/enqueue").json_body(json!({
                "routing_key": "routing",
                "event_action": "resolve",
                "dedup_key": "def"
            }));
            then.status(202);
        })
        .await;

    let api = PagerDutyApi::with_base_url(&server.base_url())?;
    api.resolve("routing", "abc", Some("gocd")).await?;
    api.resolve("routing", "def", None).await?;

    with_source.assert_async().await;
    without_source.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_pagerduty_rejection_is_an_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/enqueue");
            then.status(400).body(r#"{"status":"invalid event"}"#);
        })
        .await;

    let result = PagerDutyApi::with_base_url(&server.base_url())?
        .trigger("routing", "summary", "description", Severity::Error, "custom-script")
        .await;

    match result {
        Err(TubularError::ApiError { status, message, .. }) => {
            assert_eq!(status, 400);
            assert!(message.contains("invalid event"));
        }
        other => panic!("expected an API error, got {:?}", other),
    }
    Ok(())
}
