use clap::Parser;
use std::process::ExitCode;
use tubular::adapters::opsgenie::OpsGenieApi;
use tubular::cli::{finish, LogArgs};
use tubular::config::gocd::DEFAULT_GOCD_BASE_URL;
use tubular::config::{optional_env, GocdContext};
use tubular::utils::validation::validate_non_empty_string;
use tubular::Result;

/// Opens an Opsgenie alert for the failing GoCD job this runs in.
#[derive(Parser)]
#[command(name = "gocd_open_alert")]
struct Args {
    /// Opsgenie API key
    #[arg(long, env = "OPSGENIE_API_KEY")]
    auth_token: String,

    /// Team paged by the alert
    #[arg(long)]
    responder: String,

    /// Runbook link added to the alert description
    #[arg(long)]
    runbook: Option<String>,

    #[command(flatten)]
    log: LogArgs,
}

async fn run(args: &Args) -> Result<()> {
    validate_non_empty_string("responder", &args.responder)?;

    let context = GocdContext::from_env()?;
    let gocd_base = optional_env("GOCD_BASE_URL").unwrap_or_else(|| DEFAULT_GOCD_BASE_URL.to_string());
    let alias = context.alias();

    tracing::info!("🚨 Opening alert {} for {}", alias, context.job_url(&gocd_base));
    OpsGenieApi::new(args.auth_token.as_str())?
        .alert(
            &context.alert_message(),
            &context.alert_description(args.runbook.as_deref(), &gocd_base),
            &args.responder,
            Some(alias.as_str()),
        )
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish("Opening GoCD alert", run(&args).await)
}
