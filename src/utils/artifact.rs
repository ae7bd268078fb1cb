//! Small files handed from one pipeline step to the next.

use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// YAML with an explicit `---` document start.
pub fn to_yaml_document<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let body = serde_yaml::to_string(value)?;
    Ok(format!("---\n{}", body))
}

/// Writes `value` as YAML to `path`, or to stdout when no path is given.
pub fn write_yaml<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
    let document = to_yaml_document(value)?;
    match path {
        Some(path) => {
            ensure_parent(path)?;
            fs::write(path, document)?;
            tracing::debug!("Wrote artifact {}", path.display());
        }
        None => print!("{}", document),
    }
    Ok(())
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, serde_json::to_string(value)?)?;
    Ok(())
}
