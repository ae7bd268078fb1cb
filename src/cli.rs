//! Plumbing shared by the command-line entry points.

use crate::utils::error::{Result, TubularError};
use crate::utils::logger;
use clap::Args;
use std::process::ExitCode;

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long = "log-json", global = true, env = "TUBULAR_LOG_JSON")]
    pub log_json: bool,
}

impl LogArgs {
    pub fn init(&self) {
        logger::init(self.verbose, self.log_json);
    }
}

/// Logs a failed step and picks the exit code from the error's severity.
pub fn report_failure(step: &str, e: &TubularError) -> ExitCode {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        step,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    ExitCode::from(e.exit_code())
}

pub fn finish(step: &str, result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(step, &e),
    }
}

/// Like [`finish`], but every failure exits 1 for steps whose pipelines only look for 1.
pub fn finish_strict(step: &str, result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(step, &e);
            ExitCode::FAILURE
        }
    }
}

/// A required option that clap cannot enforce because it is only conditionally required.
pub fn require<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| TubularError::MissingConfigError {
            field: name.to_string(),
        })
}
