//! # Script Engine / 脚本引擎
//!
//! Executes each code cell by piping its source to a fresh interpreter
//! process, for languages that have no Jupyter kernel installed. Cells do
//! not share state: every cell starts from a clean interpreter.
//!
//! 通过将每个代码单元的源代码传给一个新的解释器进程来执行它。
//! 单元之间不共享状态。

use chrono::Utc;
use colored::*;
use std::time::Instant;
use tokio::process::Command;

use crate::{
    core::{
        engine::{ExecutionContext, ExecutionEngine},
        error::ExecutionError,
        notebook::{Cell, CodeCell, Notebook, Output, RAISES_EXCEPTION_TAG, SKIP_EXECUTION_TAG},
    },
    infra::{
        command::{self, CapturedOutput, CommandOutcome},
        t,
    },
};

/// `ename` of the error output recorded for a non-zero exit.
pub const PROCESS_EXIT_ENAME: &str = "ProcessExit";

#[derive(Debug, Clone)]
pub struct ScriptEngine {
    program: String,
    args: Vec<String>,
}

impl ScriptEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds the engine from a shell-style command line such as `"python3 -"`.
    pub fn from_command_line(command_line: &str) -> anyhow::Result<Self> {
        let (program, args) = command::parse_command_line(command_line)?;
        Ok(Self::new(program, args))
    }

    /// Runs one cell's source; `Ok` carries the captured output even for a non-zero exit.
    async fn run_source(
        &self,
        index: usize,
        source: &str,
        ctx: &ExecutionContext,
    ) -> Result<CapturedOutput, ExecutionError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&ctx.working_dir);

        let outcome = command::run_with_input(
            cmd,
            source.as_bytes().to_vec(),
            Some(ctx.timeout),
            &ctx.cancel,
        )
        .await
        .map_err(|source| ExecutionError::EngineUnavailable {
            engine: self.program.clone(),
            source,
        })?;

        match outcome {
            CommandOutcome::Completed(output) => Ok(output),
            CommandOutcome::TimedOut => Err(ExecutionError::Timeout {
                cell_index: Some(index),
                timeout: ctx.timeout,
            }),
            CommandOutcome::Cancelled => Err(ExecutionError::Interrupted),
        }
    }
}

/// Turns captured process output into cell outputs. Returns the error output
/// (if any) separately so the caller can decide whether it fails the run.
fn outputs_from(captured: CapturedOutput) -> (Vec<Output>, Option<(String, Vec<String>)>) {
    let mut outputs = Vec::new();
    if !captured.stdout.is_empty() {
        outputs.push(Output::stream("stdout", captured.stdout));
    }

    if captured.status.success() {
        if !captured.stderr.is_empty() {
            outputs.push(Output::stream("stderr", captured.stderr));
        }
        return (outputs, None);
    }

    let evalue = captured.status.to_string();
    let traceback: Vec<String> = captured.stderr.lines().map(str::to_string).collect();
    outputs.push(Output::Error {
        ename: PROCESS_EXIT_ENAME.to_string(),
        evalue: evalue.clone(),
        traceback: traceback.clone(),
    });
    (outputs, Some((evalue, traceback)))
}

impl ExecutionEngine for ScriptEngine {
    fn name(&self) -> &str {
        &self.program
    }

    async fn execute(
        &self,
        mut notebook: Notebook,
        ctx: &ExecutionContext,
    ) -> Result<Notebook, ExecutionError> {
        let mut execution_count = 0;

        for (index, cell) in notebook.cells.iter_mut().enumerate() {
            if cell.has_tag(SKIP_EXECUTION_TAG) {
                continue;
            }
            let may_raise = ctx.allow_errors || cell.has_tag(RAISES_EXCEPTION_TAG);
            let Cell::Code(code) = cell else {
                continue;
            };
            if code.source.is_blank() {
                continue;
            }

            execution_count += 1;
            println!("{}", t!("engine.running_cell", index = index).blue());

            let started_at = Utc::now();
            let start = Instant::now();
            code.reset();
            let captured = self.run_source(index, code.source.as_str(), ctx).await?;
            let (outputs, failure) = outputs_from(captured);
            finish_cell(code, execution_count, outputs, ctx, started_at);

            if let Some((evalue, traceback)) = failure {
                if !may_raise {
                    println!(
                        "{}",
                        t!("engine.cell_failed", index = index, error = &evalue).red()
                    );
                    return Err(ExecutionError::CellFailed {
                        cell_index: Some(index),
                        ename: PROCESS_EXIT_ENAME.to_string(),
                        evalue,
                        traceback,
                    });
                }
            }

            println!(
                "{}",
                t!(
                    "engine.cell_finished",
                    index = index,
                    duration = format!("{:.2?}", start.elapsed())
                )
                .green()
            );
        }

        notebook.set_kernel_name(&ctx.kernel_name);
        Ok(notebook)
    }
}

fn finish_cell(
    code: &mut CodeCell,
    execution_count: u64,
    outputs: Vec<Output>,
    ctx: &ExecutionContext,
    started_at: chrono::DateTime<Utc>,
) {
    code.outputs = outputs;
    code.execution_count = Some(execution_count);
    if ctx.record_timing {
        code.record_timing(started_at, Utc::now());
    }
}
