//! # Runner Integration Tests / 运行器集成测试
//!
//! These tests drive the full load → execute → write pipeline with the
//! script engine (using `sh` as the interpreter), a fake `jupyter` for the
//! nbconvert engine, and custom engines implemented in the test itself.
//!
//! 这些测试使用脚本引擎（以 `sh` 作为解释器）、伪造的 `jupyter`
//! 以及测试中自定义的引擎，驱动完整的 加载 → 执行 → 写出 流程。

#![cfg(unix)]

mod common;

use common::*;
use notebook_runner::core::{
    Engine, ExecutionContext, ExecutionEngine, ExecutionError, LoadError, Notebook,
    NotebookRunner, RunnerError,
    config::{EngineConfig, RunnerConfig},
    notebook::{Cell, Output},
};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

fn sh_runner(ws: &Workspace) -> NotebookRunner<Engine> {
    let config = ws.sh_config();
    let engine = Engine::from_config(&config.engine).unwrap();
    NotebookRunner::new(engine, config)
}

fn runner_with(config: RunnerConfig) -> NotebookRunner<Engine> {
    let engine = Engine::from_config(&config.engine).unwrap();
    NotebookRunner::new(engine, config)
}

#[tokio::test]
async fn executes_cells_in_order_and_keeps_cell_count() {
    let ws = Workspace::new();
    ws.add_notebook(
        "order.ipynb",
        &notebook(vec![
            markdown_cell("# Heading"),
            code_cell("echo one"),
            markdown_cell("between"),
            code_cell("echo two\necho warn >&2"),
        ]),
    );

    let report = sh_runner(&ws)
        .run(&ws.notebooks_arg(), "order.ipynb")
        .await
        .unwrap();
    assert_eq!(report.total_cells, 4);
    assert_eq!(report.code_cells, 2);
    assert_eq!(report.executed_cells, 2);
    assert_eq!(report.kernel.as_deref(), Some("sh"));
    assert_eq!(report.output_path, ws.output_dir().join("executed-order.ipynb"));

    let out = ws.read_output("order.ipynb");
    let cells = out["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 4);
    assert_eq!(cells[0]["cell_type"], "markdown");
    assert_eq!(cells[0]["source"], json!(["# Heading"]));
    assert_eq!(cells[1]["execution_count"], 1);
    assert_eq!(
        cells[1]["outputs"],
        json!([{"output_type": "stream", "name": "stdout", "text": ["one\n"]}])
    );
    assert_eq!(cells[2]["source"], json!(["between"]));
    assert_eq!(cells[3]["execution_count"], 2);
    assert_eq!(cells[3]["outputs"][0]["text"], json!(["two\n"]));
    assert_eq!(cells[3]["outputs"][1]["name"], "stderr");
    assert_eq!(cells[3]["outputs"][1]["text"], json!(["warn\n"]));
    assert!(cells[1]["metadata"]["execution"]["iopub.execute_input"].is_string());
    assert_eq!(out["metadata"]["kernelspec"]["name"], "sh");
}

#[tokio::test]
async fn notebook_without_code_cells_round_trips() {
    let ws = Workspace::new();
    let input = notebook(vec![markdown_cell("# Title\n\nSome text"), markdown_cell("")]);
    let path = ws.add_notebook("prose.ipynb", &input);

    sh_runner(&ws)
        .run(&ws.notebooks_arg(), "prose.ipynb")
        .await
        .unwrap();

    let original = Notebook::read_from(&path).unwrap();
    let executed =
        Notebook::read_from(&ws.output_dir().join("executed-prose.ipynb")).unwrap();
    assert_eq!(original.cells, executed.cells);
    assert_eq!(original.nbformat_minor, executed.nbformat_minor);
}

#[tokio::test]
async fn missing_notebook_is_a_load_error_and_writes_nothing() {
    let ws = Workspace::new();

    let err = sh_runner(&ws)
        .run(&ws.notebooks_arg(), "absent.ipynb")
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Load(LoadError::NotFound { .. })));
    assert!(!ws.output_dir().exists());
}

#[tokio::test]
async fn malformed_notebook_is_a_load_error() {
    let ws = Workspace::new();
    fs::write(ws.notebooks_dir().join("broken.ipynb"), "{\"cells\": [").unwrap();

    let err = sh_runner(&ws)
        .run(&ws.notebooks_arg(), "broken.ipynb")
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Load(LoadError::Malformed { .. })));
    assert!(!ws.output_dir().exists());
}

#[tokio::test]
async fn failing_cell_is_an_execution_error_and_writes_nothing() {
    let ws = Workspace::new();
    ws.add_notebook(
        "fails.ipynb",
        &notebook(vec![
            code_cell("echo fine"),
            code_cell("echo before\necho 'something broke' >&2\nexit 3"),
            code_cell("echo never"),
        ]),
    );

    let err = sh_runner(&ws)
        .run(&ws.notebooks_arg(), "fails.ipynb")
        .await
        .unwrap_err();

    match err {
        RunnerError::Execution(ExecutionError::CellFailed {
            cell_index,
            ename,
            evalue,
            traceback,
        }) => {
            assert_eq!(cell_index, Some(1));
            assert_eq!(ename, "ProcessExit");
            assert!(evalue.contains('3'), "unexpected evalue: {evalue}");
            assert_eq!(traceback, vec!["something broke".to_string()]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!ws.output_dir().join("executed-fails.ipynb").exists());
}

#[tokio::test]
async fn trailing_separator_makes_no_difference() {
    let ws = Workspace::new();
    ws.add_notebook("sep.ipynb", &notebook(vec![code_cell("pwd")]));
    let runner = sh_runner(&ws);

    runner.run(&ws.notebooks_arg(), "sep.ipynb").await.unwrap();
    let without = ws.read_output("sep.ipynb");

    runner
        .run(&format!("{}/", ws.notebooks_arg()), "sep.ipynb")
        .await
        .unwrap();
    let with = ws.read_output("sep.ipynb");

    assert_eq!(without["cells"][0]["outputs"], with["cells"][0]["outputs"]);
}

#[tokio::test]
async fn cells_run_inside_the_notebook_directory() {
    let ws = Workspace::new();
    fs::write(ws.notebooks_dir().join("data.txt"), "relative data\n").unwrap();
    ws.add_notebook("relative.ipynb", &notebook(vec![code_cell("cat data.txt")]));

    sh_runner(&ws)
        .run(&ws.notebooks_arg(), "relative.ipynb")
        .await
        .unwrap();

    let out = ws.read_output("relative.ipynb");
    assert_eq!(out["cells"][0]["outputs"][0]["text"], json!(["relative data\n"]));
}

#[tokio::test]
async fn slow_cell_times_out() {
    let ws = Workspace::new();
    ws.add_notebook(
        "slow.ipynb",
        &notebook(vec![code_cell("echo quick"), code_cell("sleep 10")]),
    );
    let config = RunnerConfig {
        timeout_secs: 1,
        ..ws.sh_config()
    };

    let err = runner_with(config)
        .run(&ws.notebooks_arg(), "slow.ipynb")
        .await
        .unwrap_err();

    match err {
        RunnerError::Execution(e) => {
            assert!(e.is_timeout(), "expected a timeout, got {e:?}");
            assert_eq!(e.cell_index(), Some(1));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!ws.output_dir().exists());
}

/// A background job that keeps the cell's pipes open is still bounded by
/// the timeout, even though the interpreter itself exits at once.
#[tokio::test]
async fn background_job_holding_output_open_times_out() {
    let ws = Workspace::new();
    ws.add_notebook(
        "background.ipynb",
        &notebook(vec![code_cell("sleep 8 &\necho started")]),
    );
    let config = RunnerConfig {
        timeout_secs: 1,
        ..ws.sh_config()
    };

    let start = std::time::Instant::now();
    let err = runner_with(config)
        .run(&ws.notebooks_arg(), "background.ipynb")
        .await
        .unwrap_err();

    assert!(
        start.elapsed() < std::time::Duration::from_secs(5),
        "run took {:?}",
        start.elapsed()
    );
    match err {
        RunnerError::Execution(e) => {
            assert!(e.is_timeout(), "expected a timeout, got {e:?}");
            assert_eq!(e.cell_index(), Some(0));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!ws.output_dir().exists());
}

#[tokio::test]
async fn previous_outputs_are_replaced_not_appended() {
    let ws = Workspace::new();
    let mut cell = code_cell("echo fresh");
    cell["execution_count"] = json!(41);
    cell["outputs"] = json!([
        {"output_type": "stream", "name": "stdout", "text": "stale\n"},
        {"output_type": "error", "ename": "Old", "evalue": "old", "traceback": []}
    ]);
    ws.add_notebook("rerun.ipynb", &notebook(vec![cell]));

    sh_runner(&ws)
        .run(&ws.notebooks_arg(), "rerun.ipynb")
        .await
        .unwrap();

    let out = ws.read_output("rerun.ipynb");
    assert_eq!(out["cells"][0]["execution_count"], 1);
    assert_eq!(
        out["cells"][0]["outputs"],
        json!([{"output_type": "stream", "name": "stdout", "text": ["fresh\n"]}])
    );
}

#[tokio::test]
async fn blank_and_skipped_cells_are_left_untouched() {
    let ws = Workspace::new();
    let mut skipped = tagged_code_cell("exit 1", &["skip-execution"]);
    skipped["execution_count"] = json!(7);
    ws.add_notebook(
        "skips.ipynb",
        &notebook(vec![code_cell("   \n"), skipped, code_cell("echo ran")]),
    );

    let report = sh_runner(&ws)
        .run(&ws.notebooks_arg(), "skips.ipynb")
        .await
        .unwrap();
    assert_eq!(report.executed_cells, 2);

    let out = ws.read_output("skips.ipynb");
    assert_eq!(out["cells"][0]["execution_count"], Value::Null);
    assert_eq!(out["cells"][1]["execution_count"], 7);
    assert_eq!(out["cells"][2]["execution_count"], 1);
}

#[tokio::test]
async fn raises_exception_tag_allows_a_failing_cell() {
    let ws = Workspace::new();
    ws.add_notebook(
        "expected.ipynb",
        &notebook(vec![
            tagged_code_cell("echo nope >&2; exit 2", &["raises-exception"]),
            code_cell("echo after"),
        ]),
    );

    sh_runner(&ws)
        .run(&ws.notebooks_arg(), "expected.ipynb")
        .await
        .unwrap();

    let out = ws.read_output("expected.ipynb");
    let error = &out["cells"][0]["outputs"][0];
    assert_eq!(error["output_type"], "error");
    assert_eq!(error["ename"], "ProcessExit");
    assert_eq!(error["traceback"], json!(["nope"]));
    assert_eq!(out["cells"][1]["outputs"][0]["text"], json!(["after\n"]));
}

#[tokio::test]
async fn allow_errors_keeps_going_past_failures() {
    let ws = Workspace::new();
    ws.add_notebook(
        "lenient.ipynb",
        &notebook(vec![code_cell("exit 1"), code_cell("echo still here")]),
    );
    let config = RunnerConfig {
        allow_errors: true,
        ..ws.sh_config()
    };

    runner_with(config)
        .run(&ws.notebooks_arg(), "lenient.ipynb")
        .await
        .unwrap();

    let out = ws.read_output("lenient.ipynb");
    assert_eq!(out["cells"][0]["outputs"][0]["output_type"], "error");
    assert_eq!(out["cells"][1]["outputs"][0]["text"], json!(["still here\n"]));
}

#[tokio::test]
async fn missing_interpreter_is_reported_as_unavailable_engine() {
    let ws = Workspace::new();
    ws.add_notebook("x.ipynb", &notebook(vec![code_cell("1 + 1")]));
    let config = RunnerConfig {
        engine: EngineConfig::Script {
            command: "this_interpreter_definitely_does_not_exist_12345".to_string(),
        },
        ..ws.sh_config()
    };

    let err = runner_with(config)
        .run(&ws.notebooks_arg(), "x.ipynb")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RunnerError::Execution(ExecutionError::EngineUnavailable { .. })
    ));
}

#[tokio::test]
async fn unwritable_output_is_a_write_error() {
    let ws = Workspace::new();
    ws.add_notebook("w.ipynb", &notebook(vec![code_cell("echo hi")]));
    // A regular file where the output directory should be.
    fs::write(ws.output_dir(), "not a directory").unwrap();

    let err = sh_runner(&ws)
        .run(&ws.notebooks_arg(), "w.ipynb")
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Write(_)));
}

/// Writes a stand-in for `jupyter` that records its arguments in the working
/// directory and then runs `body`.
fn fake_jupyter(ws: &Workspace, body: &str) -> EngineConfig {
    let script = ws.root.path().join("fake_jupyter.sh");
    fs::write(
        &script,
        format!("printf '%s\\n' \"$@\" > args.txt\n{body}\n"),
    )
    .unwrap();
    EngineConfig::Nbconvert {
        jupyter: format!("sh '{}'", script.display()),
    }
}

#[tokio::test]
async fn nbconvert_engine_round_trips_through_the_subprocess() {
    let ws = Workspace::new();
    ws.add_notebook("nb.ipynb", &notebook(vec![code_cell("println(1)")]));
    let config = RunnerConfig {
        engine: fake_jupyter(&ws, "cat"),
        kernel_name: "spylon-kernel".to_string(),
        ..ws.sh_config()
    };

    runner_with(config)
        .run(&ws.notebooks_arg(), "nb.ipynb")
        .await
        .unwrap();

    let args = fs::read_to_string(ws.notebooks_dir().join("args.txt")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(args[0], "nbconvert");
    assert!(args.contains(&"--execute"));
    assert!(args.contains(&"--stdin"));
    assert!(args.contains(&"--stdout"));
    assert!(args.contains(&"--ExecutePreprocessor.timeout=30"));
    assert!(args.contains(&"--ExecutePreprocessor.kernel_name=spylon-kernel"));

    let out = ws.read_output("nb.ipynb");
    assert_eq!(out["cells"][0]["source"], json!(["println(1)"]));
    assert_eq!(out["metadata"]["kernelspec"]["name"], "spylon-kernel");
}

#[tokio::test]
async fn nbconvert_timeout_is_classified() {
    let ws = Workspace::new();
    ws.add_notebook("nb.ipynb", &notebook(vec![code_cell("Thread.sleep(999999)")]));
    let config = RunnerConfig {
        engine: fake_jupyter(
            &ws,
            "cat > /dev/null\necho 'nbclient.exceptions.CellTimeoutError: A cell timed out while it was being executed, after 30 seconds.' >&2\nexit 1",
        ),
        ..ws.sh_config()
    };

    let err = runner_with(config)
        .run(&ws.notebooks_arg(), "nb.ipynb")
        .await
        .unwrap_err();

    match err {
        RunnerError::Execution(e) => assert!(e.is_timeout(), "expected a timeout, got {e:?}"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!ws.output_dir().exists());
}

#[tokio::test]
async fn nbconvert_garbage_output_is_rejected() {
    let ws = Workspace::new();
    ws.add_notebook("nb.ipynb", &notebook(vec![code_cell("1")]));
    let config = RunnerConfig {
        engine: fake_jupyter(&ws, "cat > /dev/null\necho 'this is not json'"),
        ..ws.sh_config()
    };

    let err = runner_with(config)
        .run(&ws.notebooks_arg(), "nb.ipynb")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RunnerError::Execution(ExecutionError::InvalidOutput(_))
    ));
}

/// Echoes each code cell's source back as its output.
struct EchoEngine;

impl ExecutionEngine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(
        &self,
        mut notebook: Notebook,
        ctx: &ExecutionContext,
    ) -> Result<Notebook, ExecutionError> {
        assert!(ctx.working_dir.to_string_lossy().ends_with('/'));
        for cell in notebook.cells.iter_mut() {
            if let Cell::Code(code) = cell {
                code.outputs = vec![Output::stream("stdout", code.source.as_str().to_string())];
                code.execution_count = Some(1);
            }
        }
        Ok(notebook)
    }
}

/// Loses the last cell, which the runner must not accept.
struct LossyEngine;

impl ExecutionEngine for LossyEngine {
    fn name(&self) -> &str {
        "lossy"
    }

    async fn execute(
        &self,
        mut notebook: Notebook,
        _ctx: &ExecutionContext,
    ) -> Result<Notebook, ExecutionError> {
        notebook.cells.pop();
        Ok(notebook)
    }
}

#[tokio::test]
async fn alternate_engines_can_be_substituted() {
    let ws = Workspace::new();
    ws.add_notebook("echo.ipynb", &notebook(vec![code_cell("val x = 42")]));

    NotebookRunner::new(EchoEngine, ws.sh_config())
        .run(&ws.notebooks_arg(), "echo.ipynb")
        .await
        .unwrap();

    let out = ws.read_output("echo.ipynb");
    assert_eq!(out["cells"][0]["outputs"][0]["text"], json!(["val x = 42"]));
}

#[tokio::test]
async fn engine_that_drops_cells_is_rejected() {
    let ws = Workspace::new();
    ws.add_notebook(
        "lossy.ipynb",
        &notebook(vec![code_cell("a"), markdown_cell("b")]),
    );

    let err = NotebookRunner::new(LossyEngine, ws.sh_config())
        .run(&ws.notebooks_arg(), "lossy.ipynb")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RunnerError::Execution(ExecutionError::EngineFailed(_))
    ));
    assert!(!Path::new(&ws.output_dir()).exists());
}
