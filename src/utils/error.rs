use thiserror::Error;

#[derive(Error, Debug)]
pub enum TubularError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid regular expression: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Git error: {0}")]
    GitError(#[from] git2::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{service} API error ({status}): {message}")]
    ApiError {
        service: String,
        status: u16,
        message: String,
    },

    #[error("{service} request failed: {message}")]
    RecoverableError { service: String, message: String },

    #[error("Not found: {message}")]
    NotFoundError { message: String },

    #[error("Timed out: {message}")]
    TimeoutError { message: String },

    #[error("Command `{command}` failed: {message}")]
    CommandError { command: String, message: String },

    #[error("Tag {tag} already exists and points at {existing_sha}, not {requested_sha}")]
    TagMismatchError {
        tag: String,
        existing_sha: String,
        requested_sha: String,
    },

    #[error("Pull request #{number} does not exist")]
    InvalidPullRequestError { number: u64 },

    #[error("Invalid URL: {url}")]
    InvalidUrlError { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Remote,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl TubularError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Builds an `ApiError` for a non-success HTTP status, promoting 429 and 5xx to
    /// `RecoverableError` so the retry loop will try again.
    pub fn from_status(service: &str, status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if status.as_u16() == 429 || status.is_server_error() {
            Self::RecoverableError {
                service: service.to_string(),
                message: format!("status {}: {}", status.as_u16(), message),
            }
        } else {
            Self::ApiError {
                service: service.to_string(),
                status: status.as_u16(),
                message,
            }
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RecoverableError { .. } => true,
            Self::HttpError(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status()
                        .map(|s| s.as_u16() == 429 || s.is_server_error())
                        .unwrap_or(false)
            }
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::RegexError(_)
            | Self::InvalidUrlError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::GitError(_) | Self::CommandError { .. } => ErrorCategory::Local,
            _ => ErrorCategory::Remote,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RecoverableError { .. } | Self::TimeoutError { .. } => ErrorSeverity::Medium,
            Self::HttpError(_) if self.is_recoverable() => ErrorSeverity::Medium,
            Self::IoError(_) | Self::GitError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Remote => format!("Remote service call failed: {}", self),
            ErrorCategory::Local => format!("Local operation failed: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingConfigError { .. } => "Set the missing flag or environment variable and re-run the step",
            Self::RecoverableError { .. } | Self::TimeoutError { .. } => {
                "The remote service looks unhealthy; re-run the step once it recovers"
            }
            Self::TagMismatchError { .. } => "Pick a new tag name or delete the stale tag first",
            _ => match self.category() {
                ErrorCategory::Configuration => "Check the command-line options and config files",
                ErrorCategory::Remote => "Check credentials and the state of the remote resource",
                ErrorCategory::Local => "Check file paths and permissions on the agent",
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, TubularError>;
