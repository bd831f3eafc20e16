//! # Configuration Module / 配置模块
//!
//! Runner settings loaded from `NotebookRunner.toml`. Every field is optional;
//! an absent file yields the reference configuration (kernel `spylon-kernel`,
//! 600 second timeout, output under `executed/`).
//!
//! 从 `NotebookRunner.toml` 加载的运行器设置。所有字段都是可选的；
//! 缺少配置文件时使用参考配置。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The file name looked up by default in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "NotebookRunner.toml";

/// Selects and configures the execution engine.
/// 选择并配置执行引擎。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EngineConfig {
    /// Delegate to `jupyter nbconvert --execute`.
    Nbconvert {
        /// The `jupyter` executable to invoke.
        #[serde(default = "default_jupyter")]
        jupyter: String,
    },
    /// Pipe each code cell to a fresh process started from `command`.
    Script {
        /// A shell-style command line, e.g. `"python3 -"`.
        command: String,
    },
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::Nbconvert {
            jupyter: default_jupyter(),
        }
    }
}

/// The complete runner configuration.
/// 完整的运行器配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Where executed notebooks are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// The kernel the engine executes cells with.
    #[serde(default = "default_kernel_name")]
    pub kernel_name: String,

    /// Per-cell execution timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Keep going when a cell raises an error; the error is recorded as an output.
    #[serde(default)]
    pub allow_errors: bool,

    /// Record execution timestamps in each executed cell's metadata.
    #[serde(default = "default_record_timing")]
    pub record_timing: bool,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_jupyter() -> String {
    "jupyter".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("executed")
}

fn default_kernel_name() -> String {
    "spylon-kernel".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_record_timing() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            language: None,
            output_dir: default_output_dir(),
            kernel_name: default_kernel_name(),
            timeout_secs: default_timeout_secs(),
            allow_errors: false,
            record_timing: default_record_timing(),
            engine: EngineConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Rejects settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.kernel_name.trim().is_empty() {
            anyhow::bail!("kernel_name must not be empty");
        }
        if let EngineConfig::Script { command } = &self.engine {
            if command.trim().is_empty() {
                anyhow::bail!("engine.command must not be empty for the script engine");
            }
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Parses configuration from TOML text and validates it.
pub fn parse_config(content: &str) -> Result<RunnerConfig> {
    let config: RunnerConfig = toml::from_str(content).context("Failed to parse configuration")?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration file at `path`.
///
/// When `required` is `false` and the file does not exist, the default
/// configuration is returned instead.
pub fn load_config(path: &Path, required: bool) -> Result<RunnerConfig> {
    if !required && !path.exists() {
        return Ok(RunnerConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}
