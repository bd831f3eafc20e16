//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Notebook Runner:
//! the notebook document model, configuration, error kinds, execution
//! engines and the run pipeline.
//!
//! 此模块包含 Notebook Runner 的核心功能：
//! 笔记本文档模型、配置、错误类型、执行引擎和运行流程。

pub mod config;
pub mod engine;
pub mod error;
pub mod notebook;
pub mod runner;

// Re-exports
pub use config::RunnerConfig;
pub use engine::{Engine, ExecutionContext, ExecutionEngine};
pub use error::{ExecutionError, LoadError, RunnerError, WriteError};
pub use notebook::Notebook;
pub use runner::{NotebookRunner, RunReport};
