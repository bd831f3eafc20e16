// Shared test helpers for integration tests
#![allow(dead_code)]

use notebook_runner::config::{EngineConfig, RunnerConfig};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// A code cell in nbformat 4 JSON.
pub fn code_cell(source: &str) -> Value {
    json!({
        "cell_type": "code",
        "execution_count": null,
        "metadata": {},
        "outputs": [],
        "source": source
    })
}

/// A code cell carrying `tags` in its metadata.
pub fn tagged_code_cell(source: &str, tags: &[&str]) -> Value {
    json!({
        "cell_type": "code",
        "execution_count": null,
        "metadata": {"tags": tags},
        "outputs": [],
        "source": source
    })
}

pub fn markdown_cell(source: &str) -> Value {
    json!({
        "cell_type": "markdown",
        "metadata": {},
        "source": source
    })
}

pub fn notebook(cells: Vec<Value>) -> Value {
    json!({
        "cells": cells,
        "metadata": {
            "kernelspec": {"display_name": "spylon-kernel", "language": "scala", "name": "spylon-kernel"}
        },
        "nbformat": 4,
        "nbformat_minor": 5
    })
}

/// Writes `notebook` as `<dir>/<name>` and returns its path.
pub fn write_notebook(dir: &Path, name: &str, notebook: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(notebook).unwrap()).expect("Failed to write notebook");
    path
}

/// A workspace with a `notebooks/` directory and an `executed/` output path
/// that does not exist yet.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempdir().expect("Failed to create temporary directory");
        fs::create_dir_all(root.path().join("notebooks")).expect("Failed to create notebooks dir");
        Workspace { root }
    }

    pub fn notebooks_dir(&self) -> PathBuf {
        self.root.path().join("notebooks")
    }

    /// The notebooks directory as a string without a trailing separator.
    pub fn notebooks_arg(&self) -> String {
        self.notebooks_dir().display().to_string()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("executed")
    }

    pub fn add_notebook(&self, name: &str, notebook: &Value) -> PathBuf {
        write_notebook(&self.notebooks_dir(), name, notebook)
    }

    /// Runner configuration using `sh` as the script engine interpreter.
    pub fn sh_config(&self) -> RunnerConfig {
        RunnerConfig {
            output_dir: self.output_dir(),
            kernel_name: "sh".to_string(),
            timeout_secs: 30,
            engine: EngineConfig::Script {
                command: "sh".to_string(),
            },
            ..RunnerConfig::default()
        }
    }

    pub fn read_output(&self, name: &str) -> Value {
        let path = self.output_dir().join(format!("executed-{name}"));
        let content = fs::read_to_string(&path).expect("Failed to read executed notebook");
        serde_json::from_str(&content).expect("Executed notebook is not valid JSON")
    }
}
