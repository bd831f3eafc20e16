//! # Notebook Runner Library / Notebook Runner 库
//!
//! This library provides the core functionality for the Notebook Runner tool,
//! which executes Jupyter notebooks against a named kernel and writes the
//! executed documents to an output directory.
//!
//! 此库为 Notebook Runner 工具提供核心功能，
//! 它针对指定内核执行 Jupyter 笔记本，并将执行后的文档写入输出目录。
//!
//! ## Modules / 模块
//!
//! - `core` - Notebook model, configuration, execution engines and the run pipeline
//! - `infra` - Infrastructure services like process execution and file system operations
//! - `reporting` - Console reporting of run results
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 笔记本模型、配置、执行引擎和运行流程
//! - `infra` - 基础设施服务，如进程执行和文件系统操作
//! - `reporting` - 运行结果的控制台报告
//! - `cli` - 命令行接口和命令
//!
//! ## Example
//!
//! ```no_run
//! use notebook_runner::core::{Engine, NotebookRunner, RunnerConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RunnerConfig::default();
//! let engine = Engine::from_config(&config.engine)?;
//! let report = NotebookRunner::new(engine, config)
//!     .run("Minis", "ndvi-scala.ipynb")
//!     .await?;
//! println!("wrote {}", report.output_path.display());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::{config, notebook, runner};

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

/// Picks the supported locale closest to `requested`.
///
/// Tries the full locale first (e.g., "zh-CN"), then just the language code
/// (e.g., "en" from "en-US"), and finally falls back to "en".
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();

    if available_locales.contains(&requested) {
        return requested.to_string();
    }
    requested
        .split(['-', '_'])
        .next()
        .and_then(|lang_code| {
            available_locales
                .iter()
                .find(|locale| locale.split('-').next() == Some(lang_code))
        })
        .map(|locale| locale.to_string())
        .unwrap_or_else(|| "en".to_string())
}

/// Sets the console language: `requested` if given, otherwise the system locale.
pub fn init(requested: Option<&str>) -> String {
    let locale = requested
        .map(str::to_string)
        .or_else(sys_locale::get_locale)
        .unwrap_or_else(|| "en".to_string());
    let lang = resolve_locale(&locale);
    rust_i18n::set_locale(&lang);
    lang
}
