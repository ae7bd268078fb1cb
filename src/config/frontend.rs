use crate::utils::error::{Result, TubularError};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub type AppConfig = BTreeMap<String, serde_yaml::Value>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrontendConfigFile {
    #[serde(rename = "APP_CONFIG")]
    pub app_config: AppConfig,
    #[serde(rename = "NPM_ALIASES")]
    pub npm_aliases: BTreeMap<String, String>,
    #[serde(rename = "NPM_PRIVATE")]
    pub npm_private: Vec<String>,
    #[serde(rename = "MULTISITE")]
    pub multisite: Vec<SiteConfig>,
    #[serde(rename = "BUCKET_NAME")]
    pub bucket_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    #[serde(rename = "HOSTNAME")]
    pub hostname: Option<String>,
    #[serde(rename = "APP_CONFIG")]
    pub app_config: AppConfig,
}

impl FrontendConfigFile {
    pub fn from_file<P: AsRef<Path>>(path: P, label: &str) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            TubularError::config(format!(
                "{} config file {} could not be opened: {}",
                label,
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// The common and the environment-specific config for one frontend app. Environment
/// values win over common ones.
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub app_name: String,
    pub common: FrontendConfigFile,
    pub env: FrontendConfigFile,
}

impl FrontendConfig {
    pub fn new(app_name: impl Into<String>, common: FrontendConfigFile, env: FrontendConfigFile) -> Self {
        Self {
            app_name: app_name.into(),
            common,
            env,
        }
    }

    pub fn load<P: AsRef<Path>>(common_path: P, env_path: P, app_name: &str) -> Result<Self> {
        let common = FrontendConfigFile::from_file(common_path, "Common")?;
        let env = FrontendConfigFile::from_file(env_path, "Environment")?;
        Ok(Self::new(app_name, common, env))
    }

    pub fn app_config(&self, version_sha: &str) -> AppConfig {
        let mut merged = self.common.app_config.clone();
        merged.extend(self.env.app_config.clone());
        merged.insert(
            "APP_VERSION".to_string(),
            serde_yaml::Value::String(version_sha.to_string()),
        );
        merged
    }

    pub fn npm_aliases(&self) -> BTreeMap<String, String> {
        let mut aliases = self.common.npm_aliases.clone();
        aliases.extend(self.env.npm_aliases.clone());
        if aliases.is_empty() {
            tracing::info!("No NPM package aliases defined in config.");
        }
        aliases
    }

    pub fn npm_private(&self) -> Vec<String> {
        let packages: BTreeSet<String> = self
            .common
            .npm_private
            .iter()
            .chain(self.env.npm_private.iter())
            .cloned()
            .collect();
        if packages.is_empty() {
            tracing::info!("No NPM private packages defined in config.");
        }
        packages.into_iter().collect()
    }

    pub fn multisite(&self) -> &[SiteConfig] {
        &self.env.multisite
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.env
            .bucket_name
            .as_deref()
            .or(self.common.bucket_name.as_deref())
    }
}

/// Renders a config value the way it is handed to the build as an environment variable.
pub fn value_to_env_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

pub fn config_str<'a>(config: &'a AppConfig, key: &str) -> Option<&'a str> {
    config
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMON: &str = r#"
APP_CONFIG:
  BASE_URL: https://test.example.com
  SEGMENT_KEY: test-segment-key
NPM_ALIASES:
  "@edx/brand": "npm:@edx/brand-edx.org@1.x"
NPM_PRIVATE:
  - "@edx/frontend-logging@^4.0.2"
"#;

    const ENV: &str = r#"
BUCKET_NAME: test-bucket
APP_CONFIG:
  BASE_URL: https://stage.example.com
  DATADOG_SERVICE: test-frontend-app
  DATADOG_SESSION_SAMPLE_RATE: 20
NPM_PRIVATE:
  - "@edx/frontend-logging@^4.0.2"
  - "@edx/other@1.0.0"
MULTISITE:
  - HOSTNAME: site1
    APP_CONFIG:
      IDP_SLUG: saml-site1
  - HOSTNAME: site2
    APP_CONFIG:
      DATADOG_SESSION_SAMPLE_RATE: 50
"#;

    fn config() -> FrontendConfig {
        FrontendConfig::new(
            "frontend-app-test",
            FrontendConfigFile::from_yaml_str(COMMON).unwrap(),
            FrontendConfigFile::from_yaml_str(ENV).unwrap(),
        )
    }

    #[test]
    fn test_env_overrides_common_app_config() {
        let app_config = config().app_config("abc123");
        assert_eq!(config_str(&app_config, "BASE_URL"), Some("https://stage.example.com"));
        assert_eq!(config_str(&app_config, "SEGMENT_KEY"), Some("test-segment-key"));
        assert_eq!(config_str(&app_config, "APP_VERSION"), Some("abc123"));
        assert_eq!(
            value_to_env_string(app_config.get("DATADOG_SESSION_SAMPLE_RATE").unwrap()),
            "20"
        );
    }

    #[test]
    fn test_npm_private_is_deduplicated() {
        let packages = config().npm_private();
        assert_eq!(packages, vec!["@edx/frontend-logging@^4.0.2", "@edx/other@1.0.0"]);
    }

    #[test]
    fn test_multisite_and_bucket() {
        let cfg = config();
        assert_eq!(cfg.multisite().len(), 2);
        assert_eq!(cfg.multisite()[0].hostname.as_deref(), Some("site1"));
        assert_eq!(cfg.bucket_name(), Some("test-bucket"));
        assert_eq!(cfg.npm_aliases().len(), 1);
    }

    #[test]
    fn test_empty_file_is_default() {
        let empty = FrontendConfigFile::from_yaml_str("").unwrap();
        assert!(empty.app_config.is_empty());
        assert!(empty.multisite.is_empty());
    }
}
