use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::ExitCode;
use tubular::adapters::github::GitHubApi;
use tubular::cli::{finish, LogArgs};
use tubular::utils::artifact::{read_yaml, write_yaml};
use tubular::{Result, TubularError};

/// Tags a commit in a GitHub repository.
#[derive(Parser)]
#[command(name = "create_tag")]
struct Args {
    #[arg(long, default_value = "edx")]
    org: String,

    #[arg(long)]
    repo: String,

    #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long = "commit_sha")]
    commit_sha: Option<String>,

    /// YAML file with a top-level `sha`, used when --commit_sha is absent
    #[arg(long = "input_file")]
    input_file: Option<PathBuf>,

    #[arg(long)]
    tag: String,

    /// Where to write the created tag name and sha
    #[arg(long = "out_file")]
    out_file: Option<PathBuf>,

    #[command(flatten)]
    log: LogArgs,
}

#[derive(Deserialize)]
struct ShaInput {
    sha: String,
}

#[derive(Serialize)]
struct TagOutput<'a> {
    tag_name: &'a str,
    sha: &'a str,
}

async fn run(args: &Args) -> Result<()> {
    let sha = match (&args.commit_sha, &args.input_file) {
        (Some(sha), _) => sha.clone(),
        (None, Some(path)) => read_yaml::<ShaInput>(path)?.sha,
        (None, None) => {
            return Err(TubularError::config("Either --commit_sha or --input_file is required"));
        }
    };

    let github = GitHubApi::new(&args.org, &args.repo, args.token.clone())?;
    github.create_tag(&sha, &args.tag).await?;

    if let Some(path) = &args.out_file {
        write_yaml(
            Some(path.as_path()),
            &TagOutput {
                tag_name: &args.tag,
                sha: &sha,
            },
        )?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish("Creating tag", run(&args).await)
}
