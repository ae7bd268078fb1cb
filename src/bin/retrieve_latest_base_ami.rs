use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tubular::adapters::ec2::Ec2ImageCatalog;
use tubular::adapters::ubuntu_images::UbuntuImageLocator;
use tubular::cli::{finish, LogArgs};
use tubular::core::base_ami::{resolve_base_ami, BaseAmiRequest};
use tubular::utils::artifact::write_yaml;
use tubular::Result;

/// Finds the base AMI for the next build of an environment/deployment/play.
#[derive(Parser)]
#[command(name = "retrieve_latest_base_ami")]
struct Args {
    /// Environment for AMI, e.g. prod, stage
    #[arg(short, long)]
    environment: String,

    /// Deployment for AMI, e.g. edx, edge
    #[arg(short, long)]
    deployment: String,

    /// Play for AMI, e.g. edxapp, insights, discovery
    #[arg(short, long)]
    play: String,

    /// AMI id to use instead of the latest Ubuntu release
    #[arg(long = "override")]
    override_ami: Option<String>,

    /// 20.04 or 18.04
    #[arg(long = "ubuntu_version")]
    ubuntu_version: Option<String>,

    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Output file for the AMI information YAML; stdout when omitted
    #[arg(long = "out_file")]
    out_file: Option<PathBuf>,

    #[command(flatten)]
    log: LogArgs,
}

async fn run(args: &Args) -> Result<()> {
    let catalog = Ec2ImageCatalog::for_region(&args.region).await;
    let locator = UbuntuImageLocator::new()?;
    let request = BaseAmiRequest {
        environment: args.environment.clone(),
        deployment: args.deployment.clone(),
        play: args.play.clone(),
        override_ami: args.override_ami.clone(),
        ubuntu_version: args.ubuntu_version.clone(),
        region: args.region.clone(),
    };

    let info = resolve_base_ami(&catalog, &locator, &request).await?;
    write_yaml(args.out_file.as_deref(), &info)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish("Finding base AMI", run(&args).await)
}
