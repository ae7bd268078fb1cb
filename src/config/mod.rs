pub mod frontend;
pub mod gocd;

use crate::utils::error::{Result, TubularError};

pub use frontend::{FrontendConfig, SiteConfig};
pub use gocd::GocdContext;

/// Reads a required environment variable, treating an empty value as missing.
pub fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(TubularError::MissingConfigError {
            field: name.to_string(),
        }),
    }
}

pub fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
