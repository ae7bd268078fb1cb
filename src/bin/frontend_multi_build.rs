use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tubular::adapters::git::head_sha;
use tubular::adapters::process::ShellRunner;
use tubular::cli::{finish, require, LogArgs};
use tubular::config::FrontendConfig;
use tubular::core::frontend::FrontendBuilder;
use tubular::Result;

/// Builds a multi-site frontend app once per configured site.
#[derive(Parser)]
#[command(name = "frontend_multi_build")]
struct Args {
    /// File from which common configuration variables are read
    #[arg(long)]
    common_config_file: Option<String>,

    /// File from which environment configuration variables are read
    #[arg(long)]
    env_config_file: Option<String>,

    /// Name of the frontend app, also its checkout directory
    #[arg(long)]
    app_name: Option<String>,

    /// File to which app version info is written
    #[arg(long)]
    version_file: Option<String>,

    #[command(flatten)]
    log: LogArgs,
}

fn run(args: &Args) -> Result<()> {
    let app_name = require("app-name", &args.app_name)?;
    let version_file = require("version-file", &args.version_file)?;
    let common = require("common-config-file", &args.common_config_file)?;
    let env = require("env-config-file", &args.env_config_file)?;

    let config = FrontendConfig::load(common, env, app_name)?;
    let app_dir = PathBuf::from(app_name);
    let sha = head_sha(&app_dir)?;

    FrontendBuilder::new(config, app_dir, version_file, sha, ShellRunner).build_multisite()?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish("Build frontend", run(&args))
}
