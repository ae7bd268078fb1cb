use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A learner record as handed over by the retirement driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerRecord {
    #[serde(default)]
    pub original_email: Option<String>,
    #[serde(default)]
    pub user: Option<LearnerUser>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerUser {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub original_email: Option<String>,
}

impl LearnerRecord {
    pub fn email(&self) -> Option<&str> {
        self.original_email
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|u| u.original_email.as_deref()))
            .filter(|e| !e.trim().is_empty())
    }
}

/// The YAML artifact consumed by the AMI build play and release page writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmiInfo {
    pub base_ami_id: String,
    pub ami_id: String,
    #[serde(flatten)]
    pub tags: BTreeMap<String, String>,
}

/// One commit status or check run, keyed by its context/name elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStatus {
    pub url: String,
    pub state: String,
}

impl ValidationStatus {
    pub fn new(url: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: state.into(),
        }
    }

    /// `"<url> <state>"`, the form written to the status artifact.
    pub fn details(&self) -> String {
        format!("{} {}", self.url, self.state)
    }
}
