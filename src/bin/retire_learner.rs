use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tubular::adapters::red_ventures::{RedVenturesApi, RedVenturesConfig};
use tubular::adapters::sfmc::{SalesforceMarketingCloudApi, SfmcConfig};
use tubular::cli::{finish, LogArgs};
use tubular::domain::model::{LearnerRecord, LearnerUser};
use tubular::Result;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Service {
    RedVentures,
    Sfmc,
}

/// Deletes a retired learner from a third-party marketing service.
#[derive(Parser)]
#[command(name = "retire_learner")]
struct Args {
    #[arg(long, value_enum)]
    service: Service,

    /// YAML or JSON learner record with `original_email`
    #[arg(long = "learner_file", conflicts_with = "email")]
    learner_file: Option<PathBuf>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long = "user_id")]
    user_id: Option<String>,

    #[command(flatten)]
    log: LogArgs,
}

fn learner(args: &Args) -> Result<LearnerRecord> {
    match &args.learner_file {
        // YAML is a superset of JSON, so one parser covers both
        Some(path) => tubular::utils::artifact::read_yaml(path),
        None => Ok(LearnerRecord {
            original_email: args.email.clone(),
            user: Some(LearnerUser {
                id: args.user_id.clone().map(serde_json::Value::String),
                original_email: None,
            }),
        }),
    }
}

async fn run(args: &Args) -> Result<()> {
    let learner = learner(args)?;
    match args.service {
        Service::RedVentures => {
            RedVenturesApi::new(RedVenturesConfig::from_env()?)?
                .delete_user(&learner)
                .await
        }
        Service::Sfmc => {
            SalesforceMarketingCloudApi::new(SfmcConfig::from_env()?)?
                .delete_user(&learner)
                .await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init();
    finish("Retiring learner", run(&args).await)
}
