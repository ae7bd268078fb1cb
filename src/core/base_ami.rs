use crate::adapters::ubuntu_images::UbuntuImageLocator;
use crate::domain::model::AmiInfo;
use crate::domain::ports::ImageCatalog;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct BaseAmiRequest {
    pub environment: String,
    pub deployment: String,
    pub play: String,
    pub override_ami: Option<String>,
    pub ubuntu_version: Option<String>,
    pub region: String,
}

/// Picks the base AMI for the next build and carries over the tags of the AMI
/// currently running for the environment/deployment/play.
pub async fn resolve_base_ami(
    catalog: &dyn ImageCatalog,
    locator: &UbuntuImageLocator,
    request: &BaseAmiRequest,
) -> Result<AmiInfo> {
    let edp_ami_id = catalog
        .active_ami_for_edp(&request.environment, &request.deployment, &request.play)
        .await?;
    tracing::debug!("Active AMI for {}-{}-{}: {}", request.environment, request.deployment, request.play, edp_ami_id);

    let ami_id = match request.override_ami.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(ami) => {
            tracing::info!("Using override AMI {}", ami);
            ami.to_string()
        }
        None => {
            let version = request.ubuntu_version.as_deref().unwrap_or_default();
            tracing::info!("Ubuntu version requested: {}", version);
            let ami = locator.latest_ami(version, &request.region).await?;
            tracing::info!("AMI ID fetched from Ubuntu Cloud: {}", ami);
            ami
        }
    };

    let mut tags = catalog.tags_for_ami(&edp_ami_id).await?;
    tags.remove("base_ami_id");
    tags.remove("ami_id");

    tracing::info!("✅ Found latest AMI ID: {}", ami_id);
    Ok(AmiInfo {
        base_ami_id: ami_id.clone(),
        ami_id,
        tags,
    })
}
