//! External command execution with a bounded output buffer.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Time a process group gets to exit after SIGTERM before SIGKILL.
const KILL_GRACE: Duration = Duration::from_millis(200);

/// Bytes of diagnostics kept in error messages.
const DIAGNOSTIC_TAIL: usize = 4096;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` produced more than {limit} bytes of output")]
    OutputLimitExceeded { program: String, limit: usize },

    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Tail of stderr, or of stdout when stderr is empty.
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        let text = if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        };
        tail(text, DIAGNOSTIC_TAIL).to_string()
    }

    /// One-line description of a failed run.
    pub fn failure_summary(&self, what: &str) -> String {
        let code = self
            .exit_code()
            .map(|c| format!("exit code {}", c))
            .unwrap_or_else(|| "terminated by signal".to_string());
        let diagnostics = self.diagnostics();
        if diagnostics.is_empty() {
            format!("`{}` failed with {}", what, code)
        } else {
            format!("`{}` failed with {}: {}", what, code, diagnostics)
        }
    }
}

/// `sh -c <script>` in `cwd`.
pub fn shell_command(script: &str, cwd: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script).current_dir(cwd);
    cmd
}

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// The command runs in its own process group. Whatever it started in that
/// group is terminated once it exits, so nothing it left behind can hold the
/// output pipes open. The combined captured output may not exceed
/// `max_output` bytes; when it does the whole group is killed and
/// [`ProcessError::OutputLimitExceeded`] is returned.
pub fn run_captured(cmd: &mut Command, max_output: usize) -> Result<CapturedOutput, ProcessError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    debug!(program = %program, args = ?cmd.get_args().collect::<Vec<_>>(), "running command");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    let used = Arc::new(AtomicUsize::new(0));
    let overflow = Arc::new(AtomicBool::new(false));
    let stdout = child
        .stdout
        .take()
        .map(|pipe| spawn_reader(pipe, max_output, used.clone(), overflow.clone()));
    let stderr = child
        .stderr
        .take()
        .map(|pipe| spawn_reader(pipe, max_output, used.clone(), overflow.clone()));

    let status = loop {
        if overflow.load(Ordering::SeqCst) {
            terminate_group(&mut child);
            let _ = child.wait();
            join_reader(stdout);
            join_reader(stderr);
            return Err(ProcessError::OutputLimitExceeded {
                program,
                limit: max_output,
            });
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                terminate_group(&mut child);
                let _ = child.wait();
                return Err(ProcessError::Wait { program, source });
            }
        }
    };

    // Leftover background jobs would keep the pipes open.
    terminate_group(&mut child);
    let stdout = join_reader(stdout);
    let stderr = join_reader(stderr);
    if overflow.load(Ordering::SeqCst) {
        return Err(ProcessError::OutputLimitExceeded {
            program,
            limit: max_output,
        });
    }

    Ok(CapturedOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// SIGTERM the child's process group, escalating to SIGKILL after
/// [`KILL_GRACE`]. An already empty group is left alone.
#[cfg(unix)]
fn terminate_group(child: &mut Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    let pgid = Pid::from_raw(raw);

    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => debug!(pgid = raw, "sent SIGTERM to process group"),
        Err(Errno::ESRCH) => return,
        Err(e) => {
            warn!(pgid = raw, error = %e, "failed to signal process group, killing child only");
            let _ = child.kill();
            return;
        }
    }

    let deadline = Instant::now() + KILL_GRACE;
    while Instant::now() < deadline {
        // Reap the leader so its zombie does not keep the group alive.
        let _ = child.try_wait();
        if killpg(pgid, None) == Err(Errno::ESRCH) {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }

    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) => debug!(pgid = raw, "sent SIGKILL to process group"),
        Err(Errno::ESRCH) => {}
        Err(e) => {
            warn!(pgid = raw, error = %e, "failed to SIGKILL process group");
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn terminate_group(child: &mut Child) {
    let _ = child.kill();
}

fn spawn_reader<R>(
    mut pipe: R,
    limit: usize,
    used: Arc<AtomicUsize>,
    overflow: Arc<AtomicBool>,
) -> JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut captured = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    let total = used.fetch_add(n, Ordering::SeqCst) + n;
                    if total > limit {
                        overflow.store(true, Ordering::SeqCst);
                        break;
                    }
                    captured.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        captured
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LIMIT: usize = 1024 * 1024;

    #[test]
    fn captures_stdout_and_stderr() {
        let temp = TempDir::new().unwrap();
        let mut cmd = shell_command("echo out; echo err >&2", temp.path());
        let output = run_captured(&mut cmd, LIMIT).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn runs_in_working_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "here").unwrap();
        let mut cmd = shell_command("cat marker.txt", temp.path());
        let output = run_captured(&mut cmd, LIMIT).unwrap();
        assert_eq!(output.stdout, "here");
    }

    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let temp = TempDir::new().unwrap();
        let mut cmd = shell_command("echo broken >&2; exit 3", temp.path());
        let output = run_captured(&mut cmd, LIMIT).unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code(), Some(3));
        let summary = output.failure_summary("make");
        assert!(summary.contains("exit code 3"));
        assert!(summary.contains("broken"));
    }

    #[test]
    fn diagnostics_fall_back_to_stdout() {
        let temp = TempDir::new().unwrap();
        let mut cmd = shell_command("echo only-stdout; exit 1", temp.path());
        let output = run_captured(&mut cmd, LIMIT).unwrap();
        assert_eq!(output.diagnostics(), "only-stdout");
    }

    #[test]
    fn output_over_limit_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut cmd = shell_command("head -c 200000 /dev/zero", temp.path());
        let err = run_captured(&mut cmd, 1000).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::OutputLimitExceeded { limit: 1000, .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn output_over_limit_kills_background_jobs() {
        let temp = TempDir::new().unwrap();
        let mut cmd = shell_command(
            "(sleep 1; touch late-marker) & head -c 200000 /dev/zero",
            temp.path(),
        );
        let err = run_captured(&mut cmd, 1000).unwrap_err();
        assert!(matches!(err, ProcessError::OutputLimitExceeded { .. }));

        thread::sleep(Duration::from_secs(2));
        assert!(!temp.path().join("late-marker").exists());
    }

    #[cfg(unix)]
    #[test]
    fn background_jobs_do_not_hold_the_run_open() {
        let temp = TempDir::new().unwrap();
        let mut cmd = shell_command("(sleep 6; touch late-marker) & echo built", temp.path());

        let started = Instant::now();
        let output = run_captured(&mut cmd, LIMIT).unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "built");
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!temp.path().join("late-marker").exists());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let mut cmd = Command::new("upkeep-definitely-not-a-real-binary");
        let err = run_captured(&mut cmd, LIMIT).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let text = "ééééé";
        let t = tail(text, 3);
        assert!(text.ends_with(t));
        assert!(t.len() <= 3);
    }
}
