//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the outcome of a notebook run to the console: a
//! summary for a successful run, and the error kind, failing cell and
//! traceback for a failed one.
//!
//! 此模块在控制台打印笔记本运行的结果：成功时打印摘要，
//! 失败时打印错误类型、失败的单元和回溯信息。

use colored::*;

use crate::core::{
    error::{ErrorKind, ExecutionError, RunnerError},
    runner::RunReport,
};
use crate::infra::t;

/// Prints a formatted summary of a successful run.
///
/// 在控制台打印成功运行的格式化摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Run Summary ---
///   - Input     | Minis/ndvi-scala.ipynb
///   - Output    | executed/executed-ndvi-scala.ipynb
///   - Kernel    | spylon-kernel
///   - Cells     | 12 total, 8 code, 8 executed
///   - Duration  | 41.20s
/// ```
pub fn print_run_summary(report: &RunReport, locale: &str) {
    println!("\n{}", t!("summary.banner", locale = locale).bold());

    let rows = [
        (
            t!("summary.input", locale = locale),
            report.input_path.display().to_string(),
        ),
        (
            t!("summary.output", locale = locale),
            report.output_path.display().to_string(),
        ),
        (
            t!("summary.kernel", locale = locale),
            report.kernel.clone().unwrap_or_else(|| "-".to_string()),
        ),
        (
            t!("summary.cells", locale = locale),
            t!(
                "summary.cells_detail",
                locale = locale,
                total = report.total_cells,
                code = report.code_cells,
                executed = report.executed_cells
            )
            .to_string(),
        ),
        (
            t!("summary.duration", locale = locale),
            format!("{:.2?}", report.duration),
        ),
    ];

    for (label, value) in rows {
        println!("  - {:<10} | {}", label.cyan(), value);
    }

    println!("\n{}", t!("summary.success", locale = locale).green().bold());
}

/// Returns the localized heading for an error kind.
pub fn error_kind_label(kind: ErrorKind, locale: &str) -> String {
    let label = match kind {
        ErrorKind::Load => t!("failure.load", locale = locale),
        ErrorKind::Execution => t!("failure.execution", locale = locale),
        ErrorKind::Write => t!("failure.write", locale = locale),
    };
    label.to_string()
}

/// Prints the details of a failed run.
///
/// 打印失败运行的详细信息。
///
/// # Behavior / 行为
/// - Names the error kind and message
/// - For cell failures, names the cell and prints its traceback
/// - Always states that no output file was written
pub fn print_failure_details(error: &RunnerError, locale: &str) {
    println!("\n{}", t!("failure.banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));
    println!(
        "{}: {}",
        error_kind_label(error.kind(), locale).red(),
        error
    );

    if let RunnerError::Execution(execution) = error {
        if let Some(index) = execution.cell_index() {
            println!("{}: {}", t!("failure.cell", locale = locale).yellow(), index);
        }
        match execution {
            ExecutionError::Timeout { .. } => {
                println!("{}", t!("failure.timeout", locale = locale).yellow());
            }
            ExecutionError::CellFailed { traceback, .. } if !traceback.is_empty() => {
                println!("\n--- {} ---\n", t!("failure.traceback", locale = locale).yellow());
                for line in traceback {
                    println!("{line}");
                }
            }
            _ => {}
        }
    }

    println!("{}", "-".repeat(80));
    println!("{}", t!("failure.no_output_written", locale = locale).dimmed());
}
