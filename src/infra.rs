//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Notebook Runner,
//! namely process execution and file system operations. It also re-exports
//! the `t!` translation macro so callers have one import path for it.
//!
//! 此模块为 Notebook Runner 提供基础设施服务，即进程执行和文件系统操作，
//! 并重新导出 `t!` 翻译宏。

pub mod command;
pub mod fs;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
