// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, parser::ValueSource};
use std::{env, path::PathBuf};

use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::infra::t;

pub mod commands;

use commands::run::RunArgs;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("notebook-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cmd_run_about", locale = locale).to_string())
                .arg(
                    Arg::new("directory")
                        .help(t!("arg_directory", locale = locale).to_string())
                        .value_name("DIRECTORY")
                        .required(true),
                )
                .arg(
                    Arg::new("notebook")
                        .help(t!("arg_notebook", locale = locale).to_string())
                        .value_name("NOTEBOOK")
                        .required(true),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("arg_config", locale = locale).to_string())
                        .value_name("CONFIG")
                        .default_value(DEFAULT_CONFIG_FILE)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("kernel")
                        .short('k')
                        .long("kernel")
                        .help(t!("arg_kernel", locale = locale).to_string())
                        .value_name("KERNEL")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .help(t!("arg_timeout", locale = locale).to_string())
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("output-dir")
                        .short('o')
                        .long("output-dir")
                        .help(t!("arg_output_dir", locale = locale).to_string())
                        .value_name("OUTPUT_DIR")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("allow-errors")
                        .long("allow-errors")
                        .help(t!("arg_allow_errors", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn run_args(matches: &ArgMatches, lang: Option<String>) -> RunArgs {
    let directory = matches
        .get_one::<String>("directory")
        .cloned()
        .unwrap_or_default();
    RunArgs {
        directory: shellexpand::tilde(&directory).into_owned(),
        notebook: matches
            .get_one::<String>("notebook")
            .cloned()
            .unwrap_or_default(),
        config: matches
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        config_required: matches.value_source("config") == Some(ValueSource::CommandLine),
        kernel: matches.get_one::<String>("kernel").cloned(),
        timeout_secs: matches.get_one::<u64>("timeout").copied(),
        output_dir: matches.get_one::<PathBuf>("output-dir").cloned(),
        allow_errors: matches.get_flag("allow-errors"),
        lang,
    }
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let requested = pre_parse_language();
    let language = crate::init(requested.as_deref());

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(run_args(run_matches, requested), &language).await?;
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");

            // Show language detection message if it was auto-detected
            if requested.is_none() && !non_interactive {
                println!(
                    "{}",
                    t!("system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::run_init_wizard(
                std::path::Path::new(DEFAULT_CONFIG_FILE),
                &language,
                non_interactive,
            )?;
        }
        _ => {
            // subcommand_required: clap has already printed help and exited.
        }
    }
    Ok(())
}
