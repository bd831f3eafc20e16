//! # Execution Engine Module / 执行引擎模块
//!
//! The runner does not execute code itself. It hands the loaded document to
//! an [`ExecutionEngine`], which runs the code cells against a kernel and
//! returns the document with outputs filled in. Engines are interchangeable:
//! the runner is generic over the trait, and [`Engine`] dispatches to the
//! engine selected in the configuration.
//!
//! 运行器本身不执行代码。它把加载的文档交给 [`ExecutionEngine`]，
//! 由引擎针对内核执行代码单元，并返回填充了输出的文档。

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::{
    config::{EngineConfig, RunnerConfig},
    error::ExecutionError,
    notebook::Notebook,
};

pub mod nbconvert;
pub mod script;

pub use nbconvert::NbconvertEngine;
pub use script::ScriptEngine;

/// Everything an engine needs to know about one execution pass.
/// 引擎执行一次所需的全部信息。
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Directory the kernel runs in, so relative paths in the notebook resolve.
    pub working_dir: PathBuf,
    pub kernel_name: String,
    /// Upper bound for each cell.
    pub timeout: Duration,
    pub allow_errors: bool,
    pub record_timing: bool,
    pub cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(working_dir: impl Into<PathBuf>, config: &RunnerConfig) -> Self {
        Self {
            working_dir: working_dir.into(),
            kernel_name: config.kernel_name.clone(),
            timeout: config.timeout(),
            allow_errors: config.allow_errors,
            record_timing: config.record_timing,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Runs a notebook's code cells and captures their outputs.
pub trait ExecutionEngine {
    /// A short name used in messages.
    fn name(&self) -> &str;

    /// Executes `notebook` in document order and returns it with outputs populated.
    fn execute(
        &self,
        notebook: Notebook,
        ctx: &ExecutionContext,
    ) -> impl Future<Output = Result<Notebook, ExecutionError>> + Send;
}

/// The engines that can be selected from configuration.
#[derive(Debug, Clone)]
pub enum Engine {
    Nbconvert(NbconvertEngine),
    Script(ScriptEngine),
}

impl Engine {
    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(match config {
            EngineConfig::Nbconvert { jupyter } => {
                Engine::Nbconvert(NbconvertEngine::from_command_line(jupyter)?)
            }
            EngineConfig::Script { command } => {
                Engine::Script(ScriptEngine::from_command_line(command)?)
            }
        })
    }
}

impl ExecutionEngine for Engine {
    fn name(&self) -> &str {
        match self {
            Engine::Nbconvert(engine) => engine.name(),
            Engine::Script(engine) => engine.name(),
        }
    }

    async fn execute(
        &self,
        notebook: Notebook,
        ctx: &ExecutionContext,
    ) -> Result<Notebook, ExecutionError> {
        match self {
            Engine::Nbconvert(engine) => engine.execute(notebook, ctx).await,
            Engine::Script(engine) => engine.execute(notebook, ctx).await,
        }
    }
}
