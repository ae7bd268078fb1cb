use clap::Parser;
use std::process::ExitCode;
use tubular::adapters::pagerduty::{PagerDutyApi, Severity};
use tubular::cli::{finish_strict, LogArgs};
use tubular::Result;

/// Triggers a PagerDuty incident through the Events API.
#[derive(Parser)]
#[command(name = "alert_pagerduty")]
struct Args {
    /// Integration routing key of the PagerDuty service
    #[arg(long = "routing_key", env = "PAGERDUTY_ROUTING_KEY")]
    routing_key: String,

    /// Incident summary
    #[arg(long)]
    message: String,

    /// Incident details
    #[arg(long)]
    description: String,

    /// critical, error, warning or info
    #[arg(long, default_value = "error")]
    severity: Severity,

    #[arg(long, default_value = "custom-script")]
    source: String,

    #[command(flatten)]
    log: LogArgs,
}

async fn run(args: &Args) -> Result<()> {
    PagerDutyApi::new()?
        .trigger(
            &args.routing_key,
            &args.message,
            &args.description,
            args.severity,
            &args.source,
        )
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish_strict("PagerDuty alert", run(&args).await)
}
