use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Reads the attempt count from `var`, falling back to `default_attempts` when unset
    /// or unparsable.
    pub fn from_env(var: &str, default_attempts: u32) -> Self {
        let attempts = std::env::var(var)
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(default_attempts);
        Self::with_max_attempts(attempts)
    }

    /// No waiting between attempts; used by tests against mock servers.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let multiplier = self.factor.saturating_pow(exponent);
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, fails with a terminal error, or `max_attempts` runs are used up.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_recoverable() && attempt < max_attempts => {
                let wait = policy.delay_for(attempt);
                tracing::warn!(
                    "🔄 {}: backing off {:.1}s after {} attempt(s): {}",
                    label,
                    wait.as_secs_f64(),
                    attempt,
                    e
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_recoverable() {
                    tracing::error!("❌ {}: giving up after {} attempt(s)", label, attempt);
                }
                return Err(e);
            }
        }
    }
}
