//! # Notebook Runner Module / 笔记本运行器模块
//!
//! The load → execute → write pipeline. A run either completes and writes
//! `executed-<name>` into the output directory, or fails with a
//! [`RunnerError`] and leaves the output directory untouched.
//!
//! 加载 → 执行 → 写出 的流程。一次运行要么完成并写出 `executed-<name>`，
//! 要么以 [`RunnerError`] 失败且不修改输出目录。

use colored::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::RunnerConfig,
        engine::{ExecutionContext, ExecutionEngine},
        error::{ExecutionError, RunnerError, WriteError},
        notebook::Notebook,
    },
    infra::{fs, t},
};

/// Summary of a successful run.
/// 一次成功运行的摘要。
#[derive(Debug, Clone)]
pub struct RunReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Kernel recorded in the executed notebook's metadata.
    pub kernel: Option<String>,
    pub total_cells: usize,
    pub code_cells: usize,
    /// Code cells that carry an execution count after the run.
    pub executed_cells: usize,
    pub duration: Duration,
}

/// Runs notebooks with one engine and one configuration.
pub struct NotebookRunner<E> {
    engine: E,
    config: RunnerConfig,
    cancel: CancellationToken,
}

impl<E: ExecutionEngine> NotebookRunner<E> {
    pub fn new(engine: E, config: RunnerConfig) -> Self {
        Self {
            engine,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Lets an external signal (e.g. Ctrl-C) interrupt execution.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Loads `directory/notebook_file_name`, executes it, and writes the result
    /// to `<output_dir>/executed-<notebook_file_name>`.
    ///
    /// `directory` may or may not end with a path separator. The engine runs
    /// with `directory` as its working directory.
    ///
    /// # Errors
    /// `RunnerError::Load`, `RunnerError::Execution` or `RunnerError::Write`
    /// for the step that failed. Nothing is written unless every step succeeds.
    pub async fn run(
        &self,
        directory: &str,
        notebook_file_name: &str,
    ) -> Result<RunReport, RunnerError> {
        let start = Instant::now();
        let directory = fs::normalize_directory(directory);
        let input_path = PathBuf::from(format!("{directory}{notebook_file_name}"));

        println!(
            "{}",
            t!("run.loading", path = input_path.display()).blue()
        );
        let notebook = Notebook::read_from(&input_path)?;
        let total_cells = notebook.cells.len();
        let code_cells = notebook.code_cells().count();

        println!(
            "{}",
            t!(
                "run.executing",
                cells = code_cells,
                kernel = &self.config.kernel_name,
                engine = self.engine.name()
            )
            .blue()
        );
        let ctx = ExecutionContext::new(directory.as_str(), &self.config)
            .with_cancellation(self.cancel.clone());
        let executed = self.engine.execute(notebook, &ctx).await?;

        if executed.cells.len() != total_cells {
            return Err(ExecutionError::EngineFailed(format!(
                "engine returned {} cells, expected {}",
                executed.cells.len(),
                total_cells
            ))
            .into());
        }

        let output_path = fs::executed_output_path(&self.config.output_dir, notebook_file_name);
        println!(
            "{}",
            t!("run.writing", path = output_path.display()).blue()
        );
        let bytes = executed.to_json_bytes().map_err(WriteError::Serialize)?;
        fs::write_atomically(&output_path, &bytes)?;

        Ok(RunReport {
            input_path,
            output_path,
            kernel: executed.kernel_name().map(str::to_string),
            total_cells,
            code_cells,
            executed_cells: executed
                .code_cells()
                .filter(|cell| cell.execution_count.is_some())
                .count(),
            duration: start.elapsed(),
        })
    }
}
