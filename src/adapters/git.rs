use crate::utils::error::Result;
use std::path::Path;

/// The commit sha `HEAD` points at in the repository rooted at `path`. Parent
/// directories are not searched.
pub fn head_sha<P: AsRef<Path>>(path: P) -> Result<String> {
    let repo = git2::Repository::open(path.as_ref())?;
    tracing::debug!("Reading HEAD of {}", repo.path().display());
    let commit = repo.head()?.peel_to_commit()?;
    Ok(commit.id().to_string())
}
