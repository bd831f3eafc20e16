//! # Reporting Module / 报告模块
//!
//! This module handles the display of notebook run results in the console,
//! with colorful, formatted, internationalized output.
//!
//! 此模块处理笔记本运行结果在控制台中的显示，支持彩色格式化和国际化输出。

pub mod console;

// Re-export common reporting functions
pub use console::{print_failure_details, print_run_summary};
