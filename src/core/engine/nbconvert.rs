//! # nbconvert Engine / nbconvert 引擎
//!
//! Delegates execution to `jupyter nbconvert --execute`, which talks to a
//! real Jupyter kernel. The document goes in on stdin and the executed
//! document comes back on stdout; per-cell timeout, kernel name and
//! error policy are passed as `ExecutePreprocessor` options.
//!
//! 将执行委托给 `jupyter nbconvert --execute`，由它与真实的 Jupyter 内核通信。

use tokio::process::Command;

use crate::{
    core::{
        engine::{ExecutionContext, ExecutionEngine},
        error::ExecutionError,
        notebook::Notebook,
    },
    infra::command::{self, CommandOutcome},
};

#[derive(Debug, Clone)]
pub struct NbconvertEngine {
    program: String,
    args: Vec<String>,
}

impl NbconvertEngine {
    /// `jupyter` may be a plain executable name or a command line such as
    /// `"python3 -m jupyter"`.
    pub fn from_command_line(jupyter: &str) -> anyhow::Result<Self> {
        let (program, args) = command::parse_command_line(jupyter)?;
        Ok(Self { program, args })
    }

    fn command(&self, ctx: &ExecutionContext) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args([
                "nbconvert",
                "--to",
                "notebook",
                "--execute",
                "--stdin",
                "--stdout",
            ])
            .arg(format!(
                "--ExecutePreprocessor.timeout={}",
                ctx.timeout.as_secs()
            ))
            .arg(format!(
                "--ExecutePreprocessor.kernel_name={}",
                ctx.kernel_name
            ))
            .arg(format!(
                "--ExecutePreprocessor.allow_errors={}",
                python_bool(ctx.allow_errors)
            ))
            .arg(format!(
                "--ExecutePreprocessor.record_timing={}",
                python_bool(ctx.record_timing)
            ))
            .current_dir(&ctx.working_dir);
        cmd
    }
}

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

impl ExecutionEngine for NbconvertEngine {
    fn name(&self) -> &str {
        "nbconvert"
    }

    async fn execute(
        &self,
        notebook: Notebook,
        ctx: &ExecutionContext,
    ) -> Result<Notebook, ExecutionError> {
        let expected_cells = notebook.cells.len();
        let input = notebook
            .to_json_bytes()
            .map_err(|e| ExecutionError::EngineFailed(e.to_string()))?;

        // nbconvert enforces the per-cell timeout itself.
        let outcome = command::run_with_input(self.command(ctx), input, None, &ctx.cancel)
            .await
            .map_err(|source| ExecutionError::EngineUnavailable {
                engine: self.program.clone(),
                source,
            })?;

        let captured = match outcome {
            CommandOutcome::Completed(captured) => captured,
            CommandOutcome::TimedOut => {
                return Err(ExecutionError::Timeout {
                    cell_index: None,
                    timeout: ctx.timeout,
                });
            }
            CommandOutcome::Cancelled => return Err(ExecutionError::Interrupted),
        };

        if !captured.status.success() {
            return Err(classify_failure(&captured.stderr, ctx));
        }

        let mut executed: Notebook =
            serde_json::from_str(&captured.stdout).map_err(ExecutionError::InvalidOutput)?;
        if executed.cells.len() != expected_cells {
            return Err(ExecutionError::EngineFailed(format!(
                "engine returned {} cells, expected {}",
                executed.cells.len(),
                expected_cells
            )));
        }
        executed.set_kernel_name(&ctx.kernel_name);
        Ok(executed)
    }
}

/// Maps nbconvert's stderr diagnostics onto an [`ExecutionError`].
pub fn classify_failure(stderr: &str, ctx: &ExecutionContext) -> ExecutionError {
    let last_line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("nbconvert exited with an error")
        .to_string();

    // Cell errors echo the cell source, so they are checked before the
    // timeout markers a cell might print or raise itself.
    if stderr.contains("CellExecutionError") {
        let (ename, evalue) = split_exception_line(&last_line);
        return ExecutionError::CellFailed {
            cell_index: None,
            ename,
            evalue,
            traceback: stderr.lines().map(str::to_string).collect(),
        };
    }

    if stderr.contains("CellTimeoutError")
        || stderr.contains("timed out while it was being executed")
    {
        return ExecutionError::Timeout {
            cell_index: None,
            timeout: ctx.timeout,
        };
    }

    if stderr.contains("NoSuchKernel") {
        return ExecutionError::KernelUnavailable {
            kernel: ctx.kernel_name.clone(),
            detail: last_line,
        };
    }

    ExecutionError::EngineFailed(last_line)
}

/// Splits `"NameError: name 'x' is not defined"` into its name and value.
fn split_exception_line(line: &str) -> (String, String) {
    match line.split_once(": ") {
        Some((ename, evalue)) if !ename.contains(char::is_whitespace) => {
            (ename.to_string(), evalue.to_string())
        }
        _ => ("CellExecutionError".to_string(), line.to_string()),
    }
}
