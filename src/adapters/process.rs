use crate::domain::ports::CommandRunner;
use crate::utils::error::{Result, TubularError};
use std::path::Path;
use std::process::Command;

/// Runs command lines through `sh -c`, inheriting stdout/stderr.
#[derive(Debug, Default, Clone)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command_line: &str, cwd: Option<&Path>, env: &[(String, String)]) -> Result<i32> {
        tracing::info!("▶️ {}", command_line);
        let mut command = Command::new("sh");
        command.arg("-c").arg(command_line);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let status = command.status().map_err(|e| TubularError::CommandError {
            command: command_line.to_string(),
            message: e.to_string(),
        })?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_and_env() {
        let runner = ShellRunner;
        assert_eq!(runner.run("true", None, &[]).unwrap(), 0);
        assert_eq!(runner.run("exit 3", None, &[]).unwrap(), 3);
        let env = vec![("TUBULAR_RUNNER_ENV".to_string(), "yes".to_string())];
        assert_eq!(runner.run("test \"$TUBULAR_RUNNER_ENV\" = yes", None, &env).unwrap(), 0);
    }

    #[test]
    fn test_runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        ShellRunner.run("touch marker", Some(dir.path()), &[]).unwrap();
        assert!(dir.path().join("marker").exists());
    }
}
