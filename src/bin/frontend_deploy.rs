use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tubular::adapters::cloudflare::CloudflareApi;
use tubular::adapters::git::head_sha;
use tubular::adapters::process::ShellRunner;
use tubular::cli::{finish, require, LogArgs};
use tubular::config::{optional_env, FrontendConfig};
use tubular::core::frontend::FrontendDeployer;
use tubular::Result;

/// Syncs a built frontend to its S3 bucket and optionally purges the CDN cache.
#[derive(Parser)]
#[command(name = "frontend_deploy")]
struct Args {
    #[arg(long)]
    common_config_file: Option<String>,

    #[arg(long)]
    env_config_file: Option<String>,

    #[arg(long)]
    app_name: Option<String>,

    /// Directory with the built app
    #[arg(long)]
    app_dist: Option<String>,

    /// Purge the Cloudflare cache of the bucket's hostname after deploying
    #[arg(long)]
    purge_cache: bool,

    #[command(flatten)]
    log: LogArgs,
}

async fn run(args: &Args) -> Result<()> {
    let app_name = require("app-name", &args.app_name)?;
    let app_dist = require("app-dist", &args.app_dist)?;
    let common = require("common-config-file", &args.common_config_file)?;
    let env = require("env-config-file", &args.env_config_file)?;

    let config = FrontendConfig::load(common, env, app_name)?;
    let app_dir = PathBuf::from(app_name);
    let sha = head_sha(&app_dir)?;

    let deployer = FrontendDeployer::new(config, app_dir, sha, ShellRunner)
        .with_datadog_api_key(optional_env("DATADOG_API_KEY"));
    let bucket_name = deployer.bucket_name()?.to_string();
    deployer.deploy_site(&bucket_name, app_dist)?;

    if args.purge_cache {
        let cloudflare = CloudflareApi::from_env()?;
        deployer.purge_cache(&cloudflare, &bucket_name).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish("Deploy frontend", run(&args).await)
}
