use clap::Parser;
use std::process::ExitCode;
use tubular::adapters::opsgenie::OpsGenieApi;
use tubular::cli::{finish, LogArgs};
use tubular::config::gocd::CLOSE_ALERT_SOURCE;
use tubular::config::GocdContext;
use tubular::Result;

/// Closes the Opsgenie alert opened for this GoCD job, if any.
#[derive(Parser)]
#[command(name = "gocd_close_alert")]
struct Args {
    /// Opsgenie API key
    #[arg(long, env = "OPSGENIE_API_KEY")]
    auth_token: String,

    #[command(flatten)]
    log: LogArgs,
}

async fn run(args: &Args) -> Result<()> {
    let alias = GocdContext::alias_from_lookup(|name| std::env::var(name).ok())?;
    tracing::info!("Closing alert {}", alias);
    OpsGenieApi::new(args.auth_token.as_str())?
        .close_alert_by_alias(&alias, CLOSE_ALERT_SOURCE)
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish("Closing GoCD alert", run(&args).await)
}
