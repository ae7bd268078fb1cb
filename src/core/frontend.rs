//! Building and deploying micro-frontends from their common/environment YAML configs.
//!
//! All external tools (npm, the aws cli, datadog-ci) go through a [`CommandRunner`],
//! so the orchestration here can be exercised without them installed.

use crate::adapters::cloudflare::CloudflareApi;
use crate::config::frontend::{config_str, value_to_env_string, AppConfig, FrontendConfig, SiteConfig};
use crate::domain::ports::CommandRunner;
use crate::utils::artifact::write_json;
use crate::utils::error::{Result, TubularError};
use crate::utils::validation::validate_required_field;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const MULTISITE_PATH: &str = "multisite/dist";
pub const DEFAULT_JS_CONFIG_FILENAME: &str = "env.config.js";
pub const FRONTEND_LOGGING_PACKAGE: &str = "@edx/frontend-logging";
pub const REQUIRED_DATADOG_VARS: &[&str] = &[
    "DATADOG_APPLICATION_ID",
    "DATADOG_CLIENT_TOKEN",
    "DATADOG_SITE",
    "DATADOG_SERVICE",
    "DATADOG_ENV",
];

fn command_failed(command: &str, message: String) -> TubularError {
    tracing::error!("{}", message);
    TubularError::CommandError {
        command: command.to_string(),
        message,
    }
}

#[derive(Debug, Serialize)]
struct VersionInfo<'a> {
    repo: &'a str,
    commit: &'a str,
    created: String,
}

/// Suffixes `DATADOG_SERVICE` with the site hostname so each site reports separately,
/// and warns when the RUM settings are incomplete.
pub fn ensure_datadog_config_for_site(mut config: AppConfig, hostname: &str) -> AppConfig {
    let suffix = format!("-{}", hostname);
    if let Some(service) = config_str(&config, "DATADOG_SERVICE").map(str::to_string) {
        if !service.ends_with(&suffix) {
            let site_service = format!("{}{}", service, suffix);
            tracing::info!("Datadog service for site {}: {}", hostname, site_service);
            config.insert("DATADOG_SERVICE".to_string(), serde_yaml::Value::String(site_service));
        }
    }

    let missing: Vec<&str> = REQUIRED_DATADOG_VARS
        .iter()
        .copied()
        .filter(|var| config.get(*var).map(value_to_env_string).unwrap_or_default().is_empty())
        .collect();
    if !missing.is_empty() {
        tracing::warn!(
            "⚠️ Site {} is missing Datadog configuration: {}",
            hostname,
            missing.join(", ")
        );
    }
    config
}

/// The build environment for one site: app config, then site overrides, then `HOSTNAME`.
pub fn site_app_config(app_config: &AppConfig, site: &SiteConfig, hostname: &str) -> AppConfig {
    let mut merged = app_config.clone();
    merged.extend(site.app_config.clone());
    merged.insert(
        "HOSTNAME".to_string(),
        serde_yaml::Value::String(hostname.to_string()),
    );
    ensure_datadog_config_for_site(merged, hostname)
}

pub fn env_assignments(config: &AppConfig) -> Vec<(String, String)> {
    config
        .iter()
        .map(|(key, value)| (key.clone(), value_to_env_string(value)))
        .collect()
}

fn move_dir(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(from, to)?;
    Ok(())
}

pub struct FrontendBuilder<R: CommandRunner> {
    config: FrontendConfig,
    app_dir: PathBuf,
    version_file: PathBuf,
    version_sha: String,
    runner: R,
}

impl<R: CommandRunner> FrontendBuilder<R> {
    /// `app_dir` is the checkout of the app, `version_sha` its HEAD commit.
    pub fn new(
        config: FrontendConfig,
        app_dir: impl Into<PathBuf>,
        version_file: impl Into<PathBuf>,
        version_sha: impl Into<String>,
        runner: R,
    ) -> Self {
        Self {
            config,
            app_dir: app_dir.into(),
            version_file: version_file.into(),
            version_sha: version_sha.into(),
            runner,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.config.app_name
    }

    pub fn app_config(&self) -> AppConfig {
        let config = self.config.app_config(&self.version_sha);
        if self.config.common.app_config.is_empty() && self.config.env.app_config.is_empty() {
            tracing::info!("Config variables do not exist for app {}.", self.app_name());
        }
        config
    }

    fn run_in_app(&self, command: &str, env: &[(String, String)], failure: impl FnOnce() -> String) -> Result<()> {
        match self.runner.run(command, Some(&self.app_dir), env)? {
            0 => Ok(()),
            code => {
                tracing::debug!("`{}` exited with {}", command, code);
                Err(command_failed(command, failure()))
            }
        }
    }

    pub fn install_requirements(&self) -> Result<()> {
        self.run_in_app("npm install", &[], || {
            format!("Could not run `npm install` for app {}.", self.app_name())
        })?;
        self.install_requirements_npm_aliases()?;
        self.install_requirements_npm_private()
    }

    pub fn install_requirements_npm_aliases(&self) -> Result<()> {
        let aliases = self.config.npm_aliases();
        if aliases.is_empty() {
            return Ok(());
        }

        // the aliased installs need npm 8, installed locally
        self.run_in_app("npm install npm@8", &[], || {
            format!("Could not run `npm install npm@8` for app {}.", self.app_name())
        })?;

        let aliased_installs = aliases
            .iter()
            .map(|(name, target)| format!("{}@{}", name, target))
            .collect::<Vec<_>>()
            .join(" ");
        let command = format!("./node_modules/.bin/npm install {}", aliased_installs);
        self.run_in_app(&command, &[], || {
            format!(
                "Could not run `npm install` aliases {} for app {}.",
                aliased_installs,
                self.app_name()
            )
        })
    }

    pub fn install_requirements_npm_private(&self) -> Result<()> {
        let packages = self.config.npm_private();
        if packages.is_empty() {
            return Ok(());
        }
        let install_list = packages.join(" ");
        let command = format!("npm install {}", install_list);
        self.run_in_app(&command, &[], || {
            format!("Could not run `npm install {}` for app {}.", install_list, self.app_name())
        })
    }

    /// Copies `JS_CONFIG_FILEPATH` into the app root; a config without one is left alone.
    pub fn copy_js_config_file_to_app_root(&self, app_config: &AppConfig) -> Result<()> {
        let Some(source) = config_str(app_config, "JS_CONFIG_FILEPATH") else {
            return Ok(());
        };
        let filename = config_str(app_config, "LOCAL_JS_CONFIG_FILENAME").unwrap_or(DEFAULT_JS_CONFIG_FILENAME);
        let destination = self.app_dir.join(filename);

        fs::copy(source, &destination).map_err(|e| {
            let message = if e.kind() == std::io::ErrorKind::NotFound {
                format!("Could not find '{}' for copying for app {}.", source, self.app_name())
            } else {
                format!(
                    "Could not copy '{}' to '{}', due to destination not writable.",
                    source,
                    destination.display()
                )
            };
            TubularError::config(message)
        })?;
        Ok(())
    }

    /// Warns when a JS config is expected but missing, or Datadog logging is not installed.
    pub fn validate_js_config_and_logging(&self, app_config: &AppConfig) {
        if config_str(app_config, "JS_CONFIG_FILEPATH").is_some() {
            let filename = config_str(app_config, "LOCAL_JS_CONFIG_FILENAME").unwrap_or(DEFAULT_JS_CONFIG_FILENAME);
            if !self.app_dir.join(filename).is_file() {
                tracing::warn!("⚠️ {} not found in app {}", filename, self.app_name());
            }
        }
        let has_logging = self
            .config
            .npm_private()
            .iter()
            .any(|package| package.starts_with(FRONTEND_LOGGING_PACKAGE));
        if config_str(app_config, "DATADOG_SERVICE").is_some() && !has_logging {
            tracing::warn!(
                "⚠️ Datadog is configured for app {} but {} is not in NPM_PRIVATE",
                self.app_name(),
                FRONTEND_LOGGING_PACKAGE
            );
        }
    }

    pub fn build_app(&self, env: &[(String, String)], failure: impl FnOnce() -> String) -> Result<()> {
        self.run_in_app("npm run build", env, failure)
    }

    pub fn create_version_file(&self) -> Result<()> {
        let version = VersionInfo {
            repo: self.app_name(),
            commit: &self.version_sha,
            created: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        write_json(&self.version_file, &version).map_err(|e| {
            TubularError::config(format!(
                "Could not write to version file for app {}: {}",
                self.app_name(),
                e
            ))
        })
    }

    /// Builds every `MULTISITE` entry into `dist/<hostname>` and writes the version file.
    /// Returns the hostnames built, in config order.
    pub fn build_multisite(&self) -> Result<Vec<String>> {
        self.install_requirements()?;
        let app_config = self.app_config();

        let multisite_dir = self.app_dir.join(MULTISITE_PATH);
        if multisite_dir.is_dir() {
            fs::remove_dir_all(&multisite_dir)?;
        }
        fs::create_dir_all(&multisite_dir)?;

        let sites = self.config.multisite();
        tracing::info!(
            "🏗️ Building {} sites for multi-site application {}",
            sites.len(),
            self.app_name()
        );

        let mut built = Vec::with_capacity(sites.len());
        for site in sites {
            let hostname = site.hostname.as_deref().filter(|h| !h.trim().is_empty()).ok_or_else(|| {
                TubularError::config(format!("HOSTNAME is not set for a site in app {}.", self.app_name()))
            })?;
            tracing::info!("Building site: {} for app {}", hostname, self.app_name());

            let site_config = site_app_config(&app_config, site, hostname);
            self.copy_js_config_file_to_app_root(&site_config)?;
            self.install_requirements_npm_private()?;
            self.validate_js_config_and_logging(&site_config);

            self.build_app(&env_assignments(&site_config), || {
                format!(
                    "Could not run `npm run build` for site {} in app {}.",
                    hostname,
                    self.app_name()
                )
            })?;

            tracing::info!("Moving build output for site {}", hostname);
            move_dir(&self.app_dir.join("dist"), &multisite_dir.join(hostname))?;
            built.push(hostname.to_string());
        }

        tracing::info!("Finalizing multi-site build for {}", self.app_name());
        let dist = self.app_dir.join("dist");
        if dist.exists() {
            fs::remove_dir_all(&dist)?;
        }
        move_dir(&multisite_dir, &dist)?;
        self.create_version_file()?;

        tracing::info!(
            "✅ Successfully completed multi-site build for {} with {} sites: {:?}",
            self.app_name(),
            built.len(),
            built
        );
        Ok(built)
    }
}

pub struct FrontendDeployer<R: CommandRunner> {
    config: FrontendConfig,
    app_dir: PathBuf,
    version_sha: String,
    datadog_api_key: Option<String>,
    runner: R,
}

impl<R: CommandRunner> FrontendDeployer<R> {
    pub fn new(config: FrontendConfig, app_dir: impl Into<PathBuf>, version_sha: impl Into<String>, runner: R) -> Self {
        Self {
            config,
            app_dir: app_dir.into(),
            version_sha: version_sha.into(),
            datadog_api_key: None,
            runner,
        }
    }

    /// Enables the sourcemap upload; `datadog-ci` reads the key from `DATADOG_API_KEY`.
    pub fn with_datadog_api_key(mut self, key: Option<String>) -> Self {
        self.datadog_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn app_name(&self) -> &str {
        &self.config.app_name
    }

    pub fn bucket_name(&self) -> Result<&str> {
        let bucket_name = self.config.bucket_name();
        validate_required_field("BUCKET_NAME", &bucket_name).copied()
    }

    fn deploy_to_s3(&self, bucket_name: &str, app_path: &str) -> Result<()> {
        let bucket_uri = format!("s3://{}", bucket_name);
        let command = format!("aws s3 sync {} {} --delete", app_path, bucket_uri);
        match self.runner.run(&command, None, &[])? {
            0 => Ok(()),
            _ => Err(command_failed(
                &command,
                format!("Could not sync app {} with S3 bucket {}.", self.app_name(), bucket_uri),
            )),
        }
    }

    /// Upload failures are logged and never fail the deployment.
    pub fn upload_js_sourcemaps(&self, app_path: &str) -> Result<()> {
        let Some(api_key) = self.datadog_api_key.as_deref() else {
            tracing::info!("Could not find DATADOG_API_KEY environment variable while uploading source maps.");
            return Ok(());
        };

        let app_config = self.config.app_config(&self.version_sha);
        let service = config_str(&app_config, "DATADOG_SERVICE").unwrap_or_default();
        if service.is_empty() {
            tracing::info!(
                "Could not find DATADOG_SERVICE for app {} while uploading source maps.",
                self.app_name()
            );
        }
        let Some(version) = config_str(&app_config, "DATADOG_VERSION").or(config_str(&app_config, "APP_VERSION")) else {
            tracing::info!("Could not find version for app {} while uploading source maps.", self.app_name());
            return Ok(());
        };

        let command = format!(
            "./node_modules/.bin/datadog-ci sourcemaps upload {} --service=\"{}\" --release-version=\"{}\" --minified-path-prefix=\"/\"",
            app_path, service, version
        );
        tracing::info!("Uploading source maps to Datadog for app {}.", self.app_name());
        let env = [("DATADOG_API_KEY".to_string(), api_key.to_string())];
        if !matches!(self.runner.run(&command, Some(&self.app_dir), &env), Ok(0)) {
            tracing::warn!("Could not upload source maps to Datadog for app {}.", self.app_name());
        }
        Ok(())
    }

    pub fn deploy_site(&self, bucket_name: &str, app_path: &str) -> Result<()> {
        self.deploy_to_s3(bucket_name, app_path)?;
        self.upload_js_sourcemaps(app_path)?;
        tracing::info!(
            "🚀 Frontend application {} successfully deployed to {}.",
            self.app_name(),
            bucket_name
        );
        Ok(())
    }

    /// Frontend buckets are named after the hostname they serve.
    pub async fn purge_cache(&self, cloudflare: &CloudflareApi, bucket_name: &str) -> Result<()> {
        cloudflare.purge_cache(bucket_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::frontend::FrontendConfigFile;

    #[test]
    fn test_datadog_service_gets_site_suffix() {
        let mut config = AppConfig::new();
        config.insert("DATADOG_SERVICE".to_string(), "frontend-app".into());
        let config = ensure_datadog_config_for_site(config, "site1");
        assert_eq!(config_str(&config, "DATADOG_SERVICE"), Some("frontend-app-site1"));

        // applying twice keeps a single suffix
        let config = ensure_datadog_config_for_site(config, "site1");
        assert_eq!(config_str(&config, "DATADOG_SERVICE"), Some("frontend-app-site1"));
    }

    #[test]
    fn test_site_config_overrides_and_hostname() {
        let mut app_config = AppConfig::new();
        app_config.insert("DATADOG_SESSION_SAMPLE_RATE".to_string(), 20.into());
        app_config.insert("BASE_URL".to_string(), "https://example.com".into());

        let site: SiteConfig = serde_yaml::from_str(
            "HOSTNAME: site2\nAPP_CONFIG:\n  DATADOG_SESSION_SAMPLE_RATE: 50\n  UNBRANDED_LANDING_PAGE: true\n",
        )
        .unwrap();
        let merged = site_app_config(&app_config, &site, "site2");
        let env = env_assignments(&merged);

        assert!(env.contains(&("HOSTNAME".to_string(), "site2".to_string())));
        assert!(env.contains(&("DATADOG_SESSION_SAMPLE_RATE".to_string(), "50".to_string())));
        assert!(env.contains(&("UNBRANDED_LANDING_PAGE".to_string(), "true".to_string())));
        assert!(env.contains(&("BASE_URL".to_string(), "https://example.com".to_string())));
    }

    #[test]
    fn test_bucket_name_required_for_deploy() {
        let config = FrontendConfig::new("app", FrontendConfigFile::default(), FrontendConfigFile::default());
        let deployer = FrontendDeployer::new(config, "app", "abc", crate::adapters::process::ShellRunner);
        assert!(matches!(
            deployer.bucket_name(),
            Err(TubularError::MissingConfigError { .. })
        ));
    }
}
