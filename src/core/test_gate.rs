use crate::domain::model::ValidationStatus;
use crate::utils::error::Result;
use crate::utils::validation::{validate_range, Validate};
use std::collections::BTreeMap;

/// Contexts whose failures never block a deployment.
pub const IGNORED_FAILURES: &[&str] = &["GitHub Actions"];

const PENDING_STATES: &[&str] = &["pending", "in_progress", "queued", "waiting", "requested", "none"];
const SUCCESS_STATES: &[&str] = &["success", "skipped", "neutral"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Pending,
    Passed,
    Failed,
}

pub fn classify(context: &str, state: &str) -> CheckOutcome {
    let state = state.to_ascii_lowercase();
    if PENDING_STATES.contains(&state.as_str()) {
        CheckOutcome::Pending
    } else if SUCCESS_STATES.contains(&state.as_str()) || IGNORED_FAILURES.contains(&context) {
        CheckOutcome::Passed
    } else {
        CheckOutcome::Failed
    }
}

#[derive(Debug, Clone)]
pub struct GateOptions {
    pub min_checks: usize,
    pub fail_on_pending: bool,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            min_checks: 1,
            fail_on_pending: true,
        }
    }
}

/// Check runs are read one page of 100 at a time.
pub const MAX_MIN_CHECKS: usize = 100;

impl Validate for GateOptions {
    fn validate(&self) -> Result<()> {
        validate_range("min_checks", self.min_checks, 0, MAX_MIN_CHECKS)
    }
}

#[derive(Debug, Default, Clone)]
pub struct GateReport {
    pub passed: Vec<String>,
    pub pending: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
    pub success: bool,
}

/// Decides whether a PR or commit may proceed to deployment.
pub fn evaluate(statuses: &BTreeMap<String, ValidationStatus>, options: &GateOptions, subject: &str) -> GateReport {
    let mut report = GateReport::default();
    tracing::info!("Found {} check(s) for {}.", statuses.len(), subject);

    if statuses.len() < options.min_checks {
        tracing::error!(
            "DEPLOYMENT GATE FAILURE: Only {} check(s) found, but minimum of {} required. \
             This may indicate checks haven't started yet or a configuration issue.",
            statuses.len(),
            options.min_checks
        );
        return report;
    }

    for (context, status) in statuses {
        match classify(context, &status.state) {
            CheckOutcome::Pending => {
                tracing::info!("Check \"{}\" is still running: {}", context, status.state);
                report.pending.push((context.clone(), status.state.clone()));
            }
            CheckOutcome::Passed => {
                if IGNORED_FAILURES.contains(&context.as_str())
                    && !SUCCESS_STATES.contains(&status.state.to_ascii_lowercase().as_str())
                {
                    tracing::info!("Ignoring failure of \"{}\" because it is in the ignore list", context);
                } else {
                    tracing::info!("Check \"{}\" passed: {}", context, status.state);
                }
                report.passed.push(context.clone());
            }
            CheckOutcome::Failed => {
                tracing::error!("Check \"{}\" FAILED: {}", context, status.details());
                report.failed.push((context.clone(), status.state.clone()));
            }
        }
    }

    tracing::info!(
        "Check summary: {} successful, {} pending, {} failed",
        report.passed.len(),
        report.pending.len(),
        report.failed.len()
    );

    let names = |list: &[(String, String)]| list.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>();
    report.success = if !report.failed.is_empty() {
        tracing::error!(
            "DEPLOYMENT GATE FAILURE: {} check(s) failed: {:?}",
            report.failed.len(),
            names(&report.failed)
        );
        false
    } else if !report.pending.is_empty() && options.fail_on_pending {
        tracing::error!(
            "DEPLOYMENT GATE FAILURE: {} check(s) still pending/in-progress: {:?}. \
             Cannot proceed to deployment while checks are running.",
            report.pending.len(),
            names(&report.pending)
        );
        false
    } else if !report.pending.is_empty() {
        tracing::warn!(
            "⚠️ {} check(s) still pending but pending checks are allowed: {:?}",
            report.pending.len(),
            names(&report.pending)
        );
        true
    } else {
        tracing::info!("✅ All checks passed successfully.");
        true
    };
    report
}

/// The artifact form: context → `"<url> <state>"`.
pub fn status_artifact(statuses: &BTreeMap<String, ValidationStatus>) -> BTreeMap<String, String> {
    statuses
        .iter()
        .map(|(context, status)| (context.clone(), status.details()))
        .collect()
}
