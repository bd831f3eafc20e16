//! # Command Execution Module / 命令执行模块
//!
//! Spawns child processes with a stdin payload and captures stdout and
//! stderr separately, bounded by an optional timeout and a cancellation
//! token. Execution engines use this to talk to kernels and interpreters.
//!
//! 派生子进程，向其 stdin 写入数据，并分别捕获 stdout 和 stderr，
//! 受可选的超时和取消令牌约束。

use anyhow::{Context, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Output of a process that ran to completion.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// How a spawned process ended.
#[derive(Debug)]
pub enum CommandOutcome {
    Completed(CapturedOutput),
    /// The timeout elapsed; the process was killed.
    TimedOut,
    /// The cancellation token fired; the process was killed.
    Cancelled,
}

/// Splits a shell-style command line into a program and its arguments,
/// expanding `~` and environment variables first.
///
/// # Arguments
/// * `command_line` - e.g. `"python3 -"` or `"~/bin/jupyter"`
///
/// # Returns
/// The program and its arguments, or an error for an unparsable or empty line.
pub fn parse_command_line(command_line: &str) -> Result<(String, Vec<String>)> {
    let expanded = shellexpand::full(command_line)
        .with_context(|| format!("Failed to expand command: {command_line}"))?
        .to_string();

    let mut parts = shlex::split(&expanded)
        .ok_or_else(|| anyhow::anyhow!("Failed to parse command: {}", expanded))?;

    if parts.is_empty() {
        anyhow::bail!("Empty command after parsing.");
    }

    let program = parts.remove(0);
    Ok((program, parts))
}

/// Spawns `cmd`, writes `input` to its stdin and captures stdout and stderr.
///
/// `timeout` bounds the whole exchange: the process exiting and both output
/// pipes closing. A process that exits but leaves a background child holding
/// its pipes still times out. On timeout or cancellation the process group is
/// killed. Spawn failures are returned as `Err`; a non-zero exit is a normal
/// [`CommandOutcome::Completed`].
///
/// 派生 `cmd`，将 `input` 写入其 stdin 并捕获 stdout 和 stderr。
/// 超时覆盖进程退出及输出管道关闭的全过程；超时或取消时终止整个进程组。
pub async fn run_with_input(
    mut cmd: Command,
    input: Vec<u8>,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> std::io::Result<CommandOutcome> {
    let deadline = timeout.map(|duration| Instant::now() + duration);

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    let mut child = cmd.spawn()?;
    // The child leads its own group; the id is gone once it has been reaped.
    let pid = child.id();

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("Failed to capture stdin"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("Failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("Failed to capture stderr"))?;

    // A process that never reads stdin closes the pipe early; that is not an error.
    let writer = tokio::spawn(async move {
        let mut stdin = stdin;
        let _ = stdin.write_all(&input).await;
        let _ = stdin.shutdown().await;
    });
    let mut stdout_handle = read_to_string(stdout);
    let mut stderr_handle = read_to_string(stderr);

    enum Waited {
        Finished(std::io::Result<CapturedOutput>),
        TimedOut,
        Cancelled,
    }

    let waited = {
        let finished = async {
            let status = child.wait().await?;
            let stdout = (&mut stdout_handle).await.unwrap_or_default();
            let stderr = (&mut stderr_handle).await.unwrap_or_default();
            Ok::<_, std::io::Error>(CapturedOutput {
                status,
                stdout,
                stderr,
            })
        };
        tokio::select! {
            result = finished => Waited::Finished(result),
            _ = wait_until(deadline) => Waited::TimedOut,
            _ = cancel.cancelled() => Waited::Cancelled,
        }
    };

    writer.abort();
    let outcome = match waited {
        Waited::Finished(result) => return result.map(CommandOutcome::Completed),
        Waited::TimedOut => CommandOutcome::TimedOut,
        Waited::Cancelled => CommandOutcome::Cancelled,
    };
    kill_process_group(&mut child, pid).await;
    stdout_handle.abort();
    stderr_handle.abort();
    Ok(outcome)
}

/// Kills the child and, on unix, every process left in its group.
async fn kill_process_group(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        kill_group(pid).await;
    }
    let _ = child.kill().await;
}

#[cfg(unix)]
async fn kill_group(pgid: u32) {
    let _ = Command::new("kill")
        .args(["-s", "KILL", "--", &format!("-{pgid}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
}

#[cfg(not(unix))]
async fn kill_group(_pgid: u32) {}

fn read_to_string<R>(mut reader: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    })
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
