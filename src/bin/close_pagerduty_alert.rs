use clap::Parser;
use std::process::ExitCode;
use tubular::adapters::pagerduty::PagerDutyApi;
use tubular::cli::{finish_strict, LogArgs};
use tubular::Result;

/// Resolves a PagerDuty incident by its deduplication key.
#[derive(Parser)]
#[command(name = "close_pagerduty_alert")]
struct Args {
    #[arg(long = "routing_key", env = "PAGERDUTY_ROUTING_KEY")]
    routing_key: String,

    #[arg(long = "dedup_key")]
    dedup_key: String,

    #[arg(long)]
    source: Option<String>,

    #[command(flatten)]
    log: LogArgs,
}

async fn run(args: &Args) -> Result<()> {
    PagerDutyApi::new()?
        .resolve(&args.routing_key, &args.dedup_key, args.source.as_deref())
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish_strict("Closing PagerDuty alert", run(&args).await)
}
