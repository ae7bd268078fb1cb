use clap::Parser;
use std::process::ExitCode;
use tubular::adapters::github::{GitHubApi, MessageType};
use tubular::cli::{finish, LogArgs};
use tubular::Result;

/// Leaves a release notice on a pull request.
#[derive(Parser)]
#[command(name = "message_pr")]
struct Args {
    #[arg(long, default_value = "edx")]
    org: String,

    #[arg(long)]
    repo: String,

    #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long = "pr_number")]
    pr_number: u64,

    /// stage, prod, prod_rollback, broke_vagrant or e2e_failed
    #[arg(long = "type")]
    message_type: MessageType,

    #[arg(long = "extra_text", default_value = "")]
    extra_text: String,

    /// Post even when the same notice is already on the PR
    #[arg(long)]
    force: bool,

    #[command(flatten)]
    log: LogArgs,
}

async fn run(args: &Args) -> Result<()> {
    let github = GitHubApi::new(&args.org, &args.repo, args.token.clone())?;
    github
        .message_pr_with_type(args.pr_number, args.message_type, &args.extra_text, None, args.force)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish("Messaging PR", run(&args).await)
}
