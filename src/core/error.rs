//! # Error Kinds Module / 错误类型模块
//!
//! The three failure kinds of a notebook run: the document could not be
//! loaded, its execution failed, or the executed document could not be
//! written. None of them are retried; all propagate to the caller.
//!
//! 一次笔记本运行的三种失败类型：无法加载文档、执行失败、无法写出执行结果。
//! 它们都不会被重试，而是直接传递给调用方。

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The notebook document could not be read or is not a valid nbformat 4 document.
/// 无法读取笔记本文档，或者它不是有效的 nbformat 4 文档。
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("notebook not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read notebook {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed notebook {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported notebook format in {}: nbformat {found}, expected 4", path.display())]
    UnsupportedFormat { path: PathBuf, found: String },
}

/// Executing the notebook's code cells failed.
/// 执行笔记本代码单元失败。
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("execution engine `{engine}` could not be started: {source}")]
    EngineUnavailable {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    #[error("kernel `{kernel}` is not available: {detail}")]
    KernelUnavailable { kernel: String, detail: String },

    #[error("{} raised {ename}: {evalue}", describe_cell(*cell_index))]
    CellFailed {
        cell_index: Option<usize>,
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },

    #[error("{} timed out after {}s", describe_cell(*cell_index), timeout.as_secs())]
    Timeout {
        cell_index: Option<usize>,
        timeout: Duration,
    },

    #[error("execution was interrupted")]
    Interrupted,

    #[error("execution engine failed: {0}")]
    EngineFailed(String),

    #[error("execution engine returned an invalid notebook: {0}")]
    InvalidOutput(#[source] serde_json::Error),
}

impl ExecutionError {
    /// Returns `true` if the failure was caused by the per-cell timeout elapsing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }

    /// The index (in document order) of the cell that failed, when the engine reports it.
    pub fn cell_index(&self) -> Option<usize> {
        match self {
            ExecutionError::CellFailed { cell_index, .. }
            | ExecutionError::Timeout { cell_index, .. } => *cell_index,
            _ => None,
        }
    }
}

fn describe_cell(cell_index: Option<usize>) -> String {
    match cell_index {
        Some(index) => format!("cell {index}"),
        None => "a cell".to_string(),
    }
}

/// The executed notebook could not be written to its destination.
/// 无法将执行后的笔记本写入目标位置。
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize notebook: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The kind of a [`RunnerError`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Load,
    Execution,
    Write,
}

/// Any failure of a notebook run.
/// 笔记本运行中的任何失败。
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl RunnerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::Load(_) => ErrorKind::Load,
            RunnerError::Execution(_) => ErrorKind::Execution,
            RunnerError::Write(_) => ErrorKind::Write,
        }
    }
}
