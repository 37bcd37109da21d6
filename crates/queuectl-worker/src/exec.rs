//! Subprocess execution with a wall-clock timeout.
//!
//! The command runs verbatim through `sh -c` — shell interpolation is
//! intentionally unsanitized. This is a local developer tool, not a
//! multi-tenant service.

use std::process::Stdio;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use tokio::process::Command;
use tokio::time::timeout;

use crate::process_group;

#[derive(Debug)]
pub enum ExecOutcome {
    /// Exit code 0.
    Success { stdout: Vec<u8>, stderr: Vec<u8> },
    /// Non-zero exit code.
    NonZeroExit {
        code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    /// Exceeded `timeout_seconds`; process group was killed.
    Timeout,
    /// The command could not even be spawned.
    SpawnError { message: String },
}

pub async fn run_with_timeout(command: &str, timeout_duration: Duration) -> ExecOutcome {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| process_group::set_process_group());
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecOutcome::SpawnError {
                message: e.to_string(),
            }
        }
    };

    let pid = child.id();

    match timeout(timeout_duration, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            if output.status.success() {
                ExecOutcome::Success {
                    stdout: output.stdout,
                    stderr: output.stderr,
                }
            } else {
                ExecOutcome::NonZeroExit {
                    code: output.status.code().unwrap_or(-1),
                    stdout: output.stdout,
                    stderr: output.stderr,
                }
            }
        }
        Ok(Err(e)) => ExecOutcome::SpawnError {
            message: e.to_string(),
        },
        Err(_elapsed) => {
            if let Some(pid) = pid {
                if let Err(e) = process_group::kill_process_group_by_pid(pid) {
                    tracing::warn!(pid, error = %e, "failed to kill timed-out process group");
                }
            }
            ExecOutcome::Timeout
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_captures_stdout() {
        match run_with_timeout("echo hi", Duration::from_secs(5)).await {
            ExecOutcome::Success { stdout, .. } => {
                assert_eq!(String::from_utf8(stdout).unwrap().trim(), "hi");
            }
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_zero_exit_is_captured_with_its_code() {
        match run_with_timeout("exit 7", Duration::from_secs(5)).await {
            ExecOutcome::NonZeroExit { code, .. } => assert_eq!(code, 7),
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_running_command_is_killed_on_timeout() {
        match run_with_timeout("sleep 10", Duration::from_millis(200)).await {
            ExecOutcome::Timeout => {}
            other => panic!("expected Timeout, got {other:?}"),
        }
    }
}
