use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tubular::adapters::github::{GitHubApi, DEFAULT_EXCLUDE_CONTEXTS};
use tubular::cli::{report_failure, LogArgs};
use tubular::core::test_gate::{evaluate, status_artifact, GateOptions};
use tubular::utils::artifact::{read_yaml, write_yaml};
use tubular::utils::validation::{validate_exactly_one, Validate};
use tubular::{Result, TubularError};

/// Checks the combined CI status of a PR or commit once and gates deployment on it.
#[derive(Parser)]
#[command(name = "check_pr_tests_status")]
struct Args {
    /// Org from https://github.com/<org>/<repo>
    #[arg(long, default_value = "edx")]
    org: String,

    /// Repo from https://github.com/<org>/<repo>
    #[arg(long)]
    repo: String,

    #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// YAML file with a top-level `pr_number`
    #[arg(long = "input_file")]
    input_file: Option<PathBuf>,

    #[arg(long = "pr_number")]
    pr_number: Option<u64>,

    #[arg(long = "commit_hash")]
    commit_hash: Option<String>,

    /// Where to write the status of each check; stdout when omitted
    #[arg(long = "out_file")]
    out_file: Option<PathBuf>,

    /// Only consider the contexts required by branch protection
    #[arg(long)]
    required_only: bool,

    /// Regex of contexts to leave out
    #[arg(long, default_value = DEFAULT_EXCLUDE_CONTEXTS)]
    exclude_contexts: String,

    /// Regex of contexts to keep even when excluded
    #[arg(long)]
    include_contexts: Option<String>,

    /// Minimum number of checks that must be present; 0 disables the check
    #[arg(long, default_value_t = 1)]
    min_checks: usize,

    /// Pass the gate while checks are still running
    #[arg(long)]
    allow_pending: bool,

    #[command(flatten)]
    log: LogArgs,
}

#[derive(Deserialize)]
struct PrInput {
    pr_number: u64,
}

async fn run(args: &Args) -> Result<bool> {
    validate_exactly_one(
        &["input_file", "pr_number", "commit_hash"],
        &[
            args.input_file.is_some(),
            args.pr_number.is_some(),
            args.commit_hash.is_some(),
        ],
    )?;
    let options = GateOptions {
        min_checks: args.min_checks,
        fail_on_pending: !args.allow_pending,
    };
    options.validate()?;

    let github = GitHubApi::new(&args.org, &args.repo, args.token.clone())?
        .with_context_filters(Some(args.exclude_contexts.as_str()), args.include_contexts.as_deref())?
        .with_all_checks(!args.required_only);

    let pr_number = match &args.input_file {
        Some(path) => Some(read_yaml::<PrInput>(path)?.pr_number),
        None => args.pr_number,
    };
    let (combined, statuses, subject) = match (pr_number, &args.commit_hash) {
        (Some(number), _) => {
            let (ok, statuses) = github.check_combined_status_pull_request(number).await?;
            (ok, statuses, format!("PR #{}", number))
        }
        (None, Some(sha)) => {
            let (ok, statuses) = github.check_combined_status_commit(sha).await?;
            (ok, statuses, format!("commit hash {}", sha))
        }
        (None, None) => return Err(TubularError::config("No PR number or commit hash to check")),
    };
    tracing::info!(
        "Combined status of {} is {}.",
        subject,
        if combined { "success" } else { "failed" }
    );

    let report = evaluate(&statuses, &options, &subject);
    write_yaml(args.out_file.as_deref(), &status_artifact(&statuses))?;
    Ok(report.success)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            report_failure("Checking test status", &e);
            ExitCode::FAILURE
        }
    }
}
