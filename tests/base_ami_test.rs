use anyhow::Result;
use async_trait::async_trait;
use httpmock::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;
use tubular::adapters::ubuntu_images::UbuntuImageLocator;
use tubular::core::base_ami::{resolve_base_ami, BaseAmiRequest};
use tubular::domain::model::AmiInfo;
use tubular::domain::ports::ImageCatalog;
use tubular::utils::artifact::{read_yaml, write_yaml};
use tubular::utils::retry::RetryPolicy;
use tubular::TubularError;

const FOCAL_LISTING: &str = "\
focal\tserver\trelease\t20240126\tebs-ssd\tamd64\tus-east-1\tami-0focaleast\thvm\n\
focal\tserver\trelease\t20240126\tebs-ssd\tamd64\tus-west-2\tami-0focalwest\thvm\n";

struct StaticCatalog;

#[async_trait]
impl ImageCatalog for StaticCatalog {
    async fn active_ami_for_edp(&self, _: &str, _: &str, _: &str) -> tubular::Result<String> {
        Ok("ami-current".to_string())
    }

    async fn tags_for_ami(&self, ami_id: &str) -> tubular::Result<BTreeMap<String, String>> {
        assert_eq!(ami_id, "ami-current");
        Ok(BTreeMap::from([
            ("environment".to_string(), "prod".to_string()),
            ("version:edx_platform".to_string(), "master 0123abcd".to_string()),
        ]))
    }
}

fn request(ubuntu_version: Option<&str>, region: &str) -> BaseAmiRequest {
    BaseAmiRequest {
        environment: "prod".to_string(),
        deployment: "edx".to_string(),
        play: "edxapp".to_string(),
        override_ami: None,
        ubuntu_version: ubuntu_version.map(str::to_string),
        region: region.to_string(),
    }
}

#[tokio::test]
async fn test_latest_ami_from_ubuntu_listing() -> Result<()> {
    let server = MockServer::start_async().await;
    let listing = server
        .mock_async(|when, then| {
            when.method(GET).path("/query/focal/server/released.current.txt");
            then.status(200).body(FOCAL_LISTING);
        })
        .await;

    let locator = UbuntuImageLocator::with_base_url(&server.base_url())?;
    let info = resolve_base_ami(&StaticCatalog, &locator, &request(Some("20.04"), "us-west-2")).await?;

    assert_eq!(info.base_ami_id, "ami-0focalwest");
    assert_eq!(info.ami_id, "ami-0focalwest");
    assert_eq!(info.tags["version:edx_platform"], "master 0123abcd");
    listing.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_bionic_listing_is_used_for_18_04() -> Result<()> {
    let server = MockServer::start_async().await;
    let listing = server
        .mock_async(|when, then| {
            when.method(GET).path("/query/bionic/server/released.current.txt");
            then.status(200)
                .body("bionic\tserver\trelease\t20230531\tebs-ssd\tamd64\tus-east-1\tami-0bionic\thvm\n");
        })
        .await;

    let locator = UbuntuImageLocator::with_base_url(&server.base_url())?;
    assert_eq!(locator.latest_ami("18.04", "us-east-1").await?, "ami-0bionic");
    listing.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_region_without_image_is_not_found() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/query/focal/server/released.current.txt");
            then.status(200).body(FOCAL_LISTING);
        })
        .await;

    let locator = UbuntuImageLocator::with_base_url(&server.base_url())?;
    let result = locator.latest_ami("", "eu-central-1").await;
    assert!(matches!(result, Err(TubularError::NotFoundError { .. })));
    Ok(())
}

#[tokio::test]
async fn test_listing_fetch_is_retried() -> Result<()> {
    let server = MockServer::start_async().await;
    let listing = server
        .mock_async(|when, then| {
            when.method(GET).path("/query/focal/server/released.current.txt");
            then.status(503);
        })
        .await;

    let locator = UbuntuImageLocator::with_base_url(&server.base_url())?.with_retry(RetryPolicy::immediate(5));
    assert!(locator.latest_ami("20.04", "us-east-1").await.is_err());
    listing.assert_hits_async(5).await;
    Ok(())
}

#[test]
fn test_ami_info_artifact_round_trips_through_yaml() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("ami.yml");
    let info = AmiInfo {
        base_ami_id: "ami-0focalwest".to_string(),
        ami_id: "ami-0focalwest".to_string(),
        tags: BTreeMap::from([("play".to_string(), "edxapp".to_string())]),
    };

    write_yaml(Some(&path), &info)?;
    let written = std::fs::read_to_string(&path)?;
    assert!(written.starts_with("---\n"));

    let read: AmiInfo = read_yaml(&path)?;
    assert_eq!(read, info);
    Ok(())
}
