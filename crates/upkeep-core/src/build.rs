//! Build step: runs a module's build command in its workspace.

use std::path::Path;

use crate::error::UpgradeError;
use crate::process::{ProcessError, run_captured, shell_command};

/// Runs `sh -c <build command>` with bounded output capture.
#[derive(Debug, Clone)]
pub struct Builder {
    max_output: usize,
}

impl Builder {
    pub fn new(max_output: usize) -> Self {
        Self { max_output }
    }

    pub fn max_output(&self) -> usize {
        self.max_output
    }

    /// Exceeding the output cap kills the build and fails it.
    pub fn build(&self, workspace: &Path, command: &str) -> Result<(), UpgradeError> {
        let mut cmd = shell_command(command, workspace);
        let output = run_captured(&mut cmd, self.max_output).map_err(|err| match err {
            ProcessError::OutputLimitExceeded { limit, .. } => {
                UpgradeError::Build(format!("build output exceeded {} bytes", limit))
            }
            other => UpgradeError::Build(other.to_string()),
        })?;

        if !output.success() {
            return Err(UpgradeError::Build(output.failure_summary(command)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn build_runs_in_workspace() {
        let tmp = TempDir::new().unwrap();
        Builder::new(1024 * 1024)
            .build(tmp.path(), "mkdir dist && echo ok > dist/index.html")
            .unwrap();
        assert!(tmp.path().join("dist").join("index.html").is_file());
    }

    #[test]
    fn failing_build_reports_stderr_tail() {
        let tmp = TempDir::new().unwrap();
        let err = Builder::new(1024 * 1024)
            .build(tmp.path(), "echo 'Module not found: ./App' >&2; exit 2")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
        assert!(err.to_string().contains("Module not found: ./App"));
        assert!(err.to_string().contains("exit code 2"));
    }

    #[test]
    fn runaway_output_fails_the_build() {
        let tmp = TempDir::new().unwrap();
        let err = Builder::new(64 * 1024)
            .build(tmp.path(), "yes building")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
        assert!(err.to_string().contains("build output exceeded 65536 bytes"));
    }

    #[cfg(unix)]
    #[test]
    fn backgrounded_job_does_not_outlive_the_build() {
        let tmp = TempDir::new().unwrap();
        let started = std::time::Instant::now();
        Builder::new(1024 * 1024)
            .build(tmp.path(), "(sleep 6) & echo built")
            .unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(3));
    }

    #[test]
    fn output_under_cap_is_fine() {
        let tmp = TempDir::new().unwrap();
        Builder::new(64 * 1024)
            .build(tmp.path(), "seq 1 100")
            .unwrap();
        assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());
    }
}
