//! Shell command runner bound to a cancellation token.

use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::jobs::error::JobError;

const READ_CHUNK: usize = 4096;

/// Run `command` through `shell -c` and capture stdout and stderr into one buffer.
///
/// Returns the captured bytes and the run's error, if any. When `cancel` fires
/// the whole process group is killed, so the call returns even if the command
/// ignores signals or leaves children behind.
pub async fn run_shell(
    shell: &str,
    command: &str,
    cancel: &CancellationToken,
) -> (Vec<u8>, Option<JobError>) {
    if cancel.is_cancelled() {
        return (Vec::new(), Some(JobError::Cancelled));
    }

    let mut cmd = Command::new(shell);
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return (Vec::new(), Some(JobError::Spawn(e.to_string()))),
    };

    let mut output = Vec::new();
    let finished = tokio::select! {
        status = collect(&mut child, &mut output) => Some(status),
        _ = cancel.cancelled() => None,
    };

    let error = match finished {
        Some(Ok(status)) if status.success() => None,
        Some(Ok(status)) => Some(JobError::ExecutionFailed(status.to_string())),
        Some(Err(e)) => Some(JobError::ExecutionFailed(e.to_string())),
        None => {
            terminate(&mut child).await;
            Some(JobError::Cancelled)
        }
    };

    (output, error)
}

/// Drain both pipes into `output` in arrival order, then reap the child.
async fn collect(child: &mut Child, output: &mut Vec<u8>) -> io::Result<ExitStatus> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_buf = [0u8; READ_CHUNK];
    let mut err_buf = [0u8; READ_CHUNK];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf) => {
                match read? {
                    0 => stdout = None,
                    n => output.extend_from_slice(&out_buf[..n]),
                }
            }
            read = read_chunk(&mut stderr, &mut err_buf) => {
                match read? {
                    0 => stderr = None,
                    n => output.extend_from_slice(&err_buf[..n]),
                }
            }
        }
    }

    child.wait().await
}

async fn read_chunk<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            tracing::debug!(pid, error = %e, "Failed to kill job process group");
        }
    }

    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "Failed to kill job process");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    const SH: &str = "/bin/sh";

    #[tokio::test]
    async fn test_captures_stdout() {
        let (output, error) = run_shell(SH, "echo hello", &CancellationToken::new()).await;
        assert!(error.is_none());
        assert_eq!(output, b"hello\n");
    }

    #[tokio::test]
    async fn test_captures_stderr_into_same_buffer() {
        let (output, error) =
            run_shell(SH, "echo out; echo err 1>&2", &CancellationToken::new()).await;
        assert!(error.is_none());
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_execution_error() {
        let (output, error) = run_shell(SH, "echo partial; exit 3", &CancellationToken::new()).await;
        assert_eq!(output, b"partial\n");
        match error {
            Some(JobError::ExecutionFailed(reason)) => assert!(reason.contains('3'), "{reason}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_shell_is_a_spawn_error() {
        let (_, error) = run_shell("/nonexistent/shell", "true", &CancellationToken::new()).await;
        assert!(matches!(error, Some(JobError::Spawn(_))));
    }

    #[tokio::test]
    async fn test_cancel_terminates_long_running_command() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let (_, error) = run_shell(SH, "sleep 30", &cancel).await;
        assert!(matches!(error, Some(JobError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_reaches_background_children() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let (_, error) = run_shell(SH, "sleep 30 & sleep 30; wait", &cancel).await;
        assert!(matches!(error, Some(JobError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_spawns_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (output, error) = run_shell(SH, "echo never", &cancel).await;
        assert!(output.is_empty());
        assert!(matches!(error, Some(JobError::Cancelled)));
    }
}
