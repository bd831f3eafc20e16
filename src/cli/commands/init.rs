//! # Init Command Module / 初始化命令模块
//!
//! This module implements the `init` command, which creates a
//! `NotebookRunner.toml` either from defaults or through an interactive
//! wizard.
//!
//! 此模块实现了 `init` 命令，它使用默认值或通过交互式向导
//! 创建 `NotebookRunner.toml`。
//!
//! ## Features / 功能特性
//!
//! - **Interactive Wizard**: kernel, timeout, output directory and engine prompts
//! - **Overwrite Protection**: confirmation before replacing an existing file
//!
//! - **交互式向导**: 内核、超时、输出目录和引擎的提示
//! - **覆盖保护**: 覆盖现有文件前的确认提示

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::{EngineConfig, RunnerConfig};
use crate::infra::t;

const CONFIG_HEADER: &str = "# Notebook Runner configuration / Notebook Runner 配置\n\n";

/// Runs the `init` command, writing the configuration to `config_path`.
///
/// With `non_interactive`, the reference configuration is written without
/// prompts, replacing any existing file.
///
/// 运行 `init` 命令，将配置写入 `config_path`。
pub fn run_init_wizard(config_path: &Path, locale: &str, non_interactive: bool) -> Result<()> {
    if non_interactive {
        return write_config(config_path, &RunnerConfig::default(), locale);
    }

    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init.wizard_welcome", locale = locale).cyan().bold());
    println!("{}", t!("init.wizard_description", locale = locale));

    if config_path.exists() {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!(
                "init.overwrite_prompt",
                locale = locale,
                path = config_path.display()
            ))
            .default(false)
            .interact()
            .context(t!("init.user_confirmation_failed", locale = locale).to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted", locale = locale));
            return Ok(());
        }
    }

    let defaults = RunnerConfig::default();

    let kernel_name: String = Input::with_theme(&theme)
        .with_prompt(t!("init.kernel_prompt", locale = locale))
        .default(defaults.kernel_name.clone())
        .interact_text()
        .context(t!("init.user_confirmation_failed", locale = locale).to_string())?;

    let timeout_secs: u64 = Input::with_theme(&theme)
        .with_prompt(t!("init.timeout_prompt", locale = locale))
        .default(defaults.timeout_secs)
        .validate_with(|value: &u64| {
            if *value > 0 {
                Ok(())
            } else {
                Err("timeout must be greater than zero")
            }
        })
        .interact_text()
        .context(t!("init.user_confirmation_failed", locale = locale).to_string())?;

    let output_dir: String = Input::with_theme(&theme)
        .with_prompt(t!("init.output_dir_prompt", locale = locale))
        .default(defaults.output_dir.display().to_string())
        .interact_text()
        .context(t!("init.user_confirmation_failed", locale = locale).to_string())?;

    let engine_items = [
        t!("init.engine_nbconvert", locale = locale).to_string(),
        t!("init.engine_script", locale = locale).to_string(),
    ];
    let engine_choice = Select::with_theme(&theme)
        .with_prompt(t!("init.engine_prompt", locale = locale))
        .items(&engine_items)
        .default(0)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = locale).to_string())?;

    let engine = if engine_choice == 1 {
        let command: String = Input::with_theme(&theme)
            .with_prompt(t!("init.script_command_prompt", locale = locale))
            .default("python3 -".to_string())
            .interact_text()
            .context(t!("init.user_confirmation_failed", locale = locale).to_string())?;
        EngineConfig::Script { command }
    } else {
        EngineConfig::default()
    };

    let allow_errors = Confirm::with_theme(&theme)
        .with_prompt(t!("init.allow_errors_prompt", locale = locale))
        .default(false)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = locale).to_string())?;

    let config = RunnerConfig {
        language: Some(locale.to_string()),
        output_dir: PathBuf::from(output_dir),
        kernel_name,
        timeout_secs,
        allow_errors,
        engine,
        ..defaults
    };

    write_config(config_path, &config, locale)
}

/// Validates and writes `config` as TOML.
fn write_config(config_path: &Path, config: &RunnerConfig, locale: &str) -> Result<()> {
    config.validate()?;
    let content = format!("{CONFIG_HEADER}{}", config.to_toml()?);

    fs::write(config_path, content).with_context(|| {
        t!("init.write_failed", locale = locale, path = config_path.display()).to_string()
    })?;

    println!(
        "{}",
        t!("init.config_written", locale = locale, path = config_path.display()).green()
    );
    Ok(())
}
