//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command: resolve the configuration,
//! build the execution engine, execute the notebook and report the result.
//!
//! 此模块实现了 `run` 命令：解析配置、构建执行引擎、执行笔记本并报告结果。

use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{self, RunnerConfig},
        engine::Engine,
        runner::NotebookRunner,
    },
    infra::t,
    reporting::console::{print_failure_details, print_run_summary},
};

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub directory: String,
    pub notebook: String,
    pub config: PathBuf,
    /// Whether `--config` was given explicitly; an explicit file must exist.
    pub config_required: bool,
    pub kernel: Option<String>,
    pub timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub allow_errors: bool,
    /// Language given with `--lang`; takes precedence over the config file.
    pub lang: Option<String>,
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// `Ok` once the executed notebook has been written; an error otherwise,
/// after the failure details have been printed.
pub async fn execute(args: RunArgs, locale: &str) -> Result<()> {
    let config = resolve_config(&args, locale)?;

    let locale = match (&args.lang, &config.language) {
        (None, Some(configured)) => crate::resolve_locale(configured),
        _ => locale.to_string(),
    };
    rust_i18n::set_locale(&locale);

    let engine = Engine::from_config(&config.engine)
        .with_context(|| t!("engine_setup_failed", locale = &locale).to_string())?;

    let stop_token = setup_signal_handler(&locale);
    let runner = NotebookRunner::new(engine, config).with_cancellation(stop_token);

    match runner.run(&args.directory, &args.notebook).await {
        Ok(report) => {
            print_run_summary(&report, &locale);
            Ok(())
        }
        Err(e) => {
            print_failure_details(&e, &locale);
            Err(e.into())
        }
    }
}

/// Loads the config file and applies command-line overrides.
fn resolve_config(args: &RunArgs, locale: &str) -> Result<RunnerConfig> {
    let mut config = if args.config_required || args.config.exists() {
        println!(
            "{}",
            t!("loading_config", locale = locale, path = args.config.display())
        );
        config::load_config(&args.config, true).with_context(|| {
            t!("config_read_failed", locale = locale, path = args.config.display()).to_string()
        })?
    } else {
        println!("{}", t!("using_default_config", locale = locale).dimmed());
        RunnerConfig::default()
    };

    if let Some(kernel) = &args.kernel {
        config.kernel_name = kernel.clone();
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if args.allow_errors {
        config.allow_errors = true;
    }

    config.validate()?;
    Ok(config)
}

/// Sets up a signal handler that stops the kernel on Ctrl-C.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
            token_clone.cancel();
        }
    });

    token
}
