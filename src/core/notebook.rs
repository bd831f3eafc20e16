//! # Notebook Document Module / 笔记本文档模块
//!
//! This module defines the nbformat 4 document model: an ordered list of
//! code, markdown and raw cells plus free-form metadata. Documents are read
//! from and written to the JSON layout Jupyter itself produces, so a
//! notebook that goes through load → write unchanged is byte-compatible with
//! files written by Jupyter tools.
//!
//! 此模块定义 nbformat 4 文档模型：有序的代码、Markdown 和原始单元列表，
//! 以及自由格式的元数据。文档的读写使用与 Jupyter 相同的 JSON 布局。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::core::error::LoadError;

/// The only major format version this crate reads and writes.
pub const NBFORMAT_MAJOR: u64 = 4;

/// Cell tag that excludes a cell from execution.
pub const SKIP_EXECUTION_TAG: &str = "skip-execution";

/// Cell tag that allows a cell to fail without failing the run.
pub const RAISES_EXCEPTION_TAG: &str = "raises-exception";

/// A free-form JSON object, kept with sorted keys.
pub type Metadata = Map<String, Value>;

/// A notebook document.
/// 一个笔记本文档。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: Metadata,
    pub nbformat: u64,
    pub nbformat_minor: u64,
}

/// A single cell, tagged by `cell_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Code(CodeCell),
    Markdown(TextCell),
    Raw(TextCell),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeCell {
    #[serde(default)]
    pub execution_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub outputs: Vec<Output>,
    pub source: MultilineString,
}

/// Markdown and raw cells share the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub source: MultilineString,
}

/// One output record of a code cell, tagged by `output_type`.
/// 代码单元的一条输出记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        name: String,
        text: MultilineString,
    },
    DisplayData {
        data: MimeBundle,
        #[serde(default)]
        metadata: Metadata,
    },
    ExecuteResult {
        data: MimeBundle,
        execution_count: Option<u64>,
        #[serde(default)]
        metadata: Metadata,
    },
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

impl Output {
    pub fn stream(name: &str, text: impl Into<String>) -> Self {
        Output::Stream {
            name: name.to_string(),
            text: MultilineString(text.into()),
        }
    }
}

/// Text that nbformat stores either as one string or as a list of lines.
///
/// Always read into a single string; always written as a list of lines that
/// keep their `\n` terminators, the empty string becoming `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultilineString(pub String);

impl MultilineString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn lines(&self) -> Vec<&str> {
        self.0.split_inclusive('\n').collect()
    }
}

impl From<&str> for MultilineString {
    fn from(s: &str) -> Self {
        MultilineString(s.to_string())
    }
}

impl From<String> for MultilineString {
    fn from(s: String) -> Self {
        MultilineString(s)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMultiline {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for MultilineString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawMultiline::deserialize(deserializer)? {
            RawMultiline::One(s) => MultilineString(s),
            RawMultiline::Many(parts) => MultilineString(parts.concat()),
        })
    }
}

impl Serialize for MultilineString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.lines())
    }
}

/// A mime-type keyed output payload.
///
/// JSON mime types (`application/json`, `*+json`) hold structured values and
/// are kept as-is; every other mime type holds text and follows the
/// [`MultilineString`] conventions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MimeBundle(pub Map<String, Value>);

fn is_json_mime(mime: &str) -> bool {
    mime == "application/json" || mime.ends_with("+json")
}

impl MimeBundle {
    pub fn text(&self, mime: &str) -> Option<&str> {
        self.0.get(mime).and_then(Value::as_str)
    }
}

impl<'de> Deserialize<'de> for MimeBundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        for (mime, value) in map.iter_mut() {
            if is_json_mime(mime) {
                continue;
            }
            if let Value::Array(parts) = value {
                if parts.iter().all(Value::is_string) {
                    let joined: String = parts.iter().filter_map(Value::as_str).collect();
                    *value = Value::String(joined);
                }
            }
        }
        Ok(MimeBundle(map))
    }
}

impl Serialize for MimeBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let split: Map<String, Value> = self
            .0
            .iter()
            .map(|(mime, value)| {
                let value = match value {
                    Value::String(text) if !is_json_mime(mime) => Value::Array(
                        text.split_inclusive('\n')
                            .map(|line| Value::String(line.to_string()))
                            .collect(),
                    ),
                    other => other.clone(),
                };
                (mime.clone(), value)
            })
            .collect();
        split.serialize(serializer)
    }
}

impl Cell {
    pub fn metadata(&self) -> &Metadata {
        match self {
            Cell::Code(cell) => &cell.metadata,
            Cell::Markdown(cell) | Cell::Raw(cell) => &cell.metadata,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Cell::Code(cell) => cell.source.as_str(),
            Cell::Markdown(cell) | Cell::Raw(cell) => cell.source.as_str(),
        }
    }

    /// Returns `true` if `metadata.tags` contains `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata()
            .get("tags")
            .and_then(Value::as_array)
            .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(tag)))
    }

    pub fn as_code(&self) -> Option<&CodeCell> {
        match self {
            Cell::Code(cell) => Some(cell),
            _ => None,
        }
    }
}

impl CodeCell {
    pub fn new(source: &str) -> Self {
        CodeCell {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Clears outputs and the execution count ahead of a new execution.
    pub fn reset(&mut self) {
        self.outputs.clear();
        self.execution_count = None;
    }

    /// Records execution timestamps under `metadata.execution`.
    pub fn record_timing(&mut self, started: DateTime<Utc>, finished: DateTime<Utc>) {
        let mut timing = Map::new();
        timing.insert(
            "iopub.execute_input".to_string(),
            Value::String(started.to_rfc3339()),
        );
        timing.insert(
            "shell.execute_reply".to_string(),
            Value::String(finished.to_rfc3339()),
        );
        self.metadata
            .insert("execution".to_string(), Value::Object(timing));
    }
}

impl Notebook {
    /// An empty nbformat 4.5 document.
    pub fn new() -> Self {
        Notebook {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: NBFORMAT_MAJOR,
            nbformat_minor: 5,
        }
    }

    /// Reads and validates a notebook file.
    ///
    /// # Errors
    /// [`LoadError::NotFound`] for a missing file, [`LoadError::Io`] for any
    /// other read failure, [`LoadError::Malformed`] for invalid JSON or
    /// structure, [`LoadError::UnsupportedFormat`] for a non-4 `nbformat`.
    pub fn read_from(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::parse(&content, path)
    }

    /// Parses notebook JSON; `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, LoadError> {
        let malformed = |source| LoadError::Malformed {
            path: origin.to_path_buf(),
            source,
        };
        let value: Value = serde_json::from_str(content).map_err(malformed)?;

        match value.get("nbformat") {
            Some(Value::Number(n)) if n.as_u64() == Some(NBFORMAT_MAJOR) => {}
            Some(other) => {
                return Err(LoadError::UnsupportedFormat {
                    path: origin.to_path_buf(),
                    found: other.to_string(),
                });
            }
            None => {
                return Err(LoadError::UnsupportedFormat {
                    path: origin.to_path_buf(),
                    found: "missing".to_string(),
                });
            }
        }

        serde_json::from_value(value).map_err(malformed)
    }

    /// Serializes the document the way Jupyter writes it: one-space indent,
    /// non-ASCII kept verbatim, trailing newline.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }

    pub fn code_cells(&self) -> impl Iterator<Item = &CodeCell> {
        self.cells.iter().filter_map(Cell::as_code)
    }

    /// Records the kernel that executed this document in `metadata.kernelspec.name`.
    pub fn set_kernel_name(&mut self, kernel: &str) {
        let kernelspec = self
            .metadata
            .entry("kernelspec")
            .or_insert_with(|| Value::Object(Map::new()));
        if !kernelspec.is_object() {
            *kernelspec = Value::Object(Map::new());
        }
        if let Value::Object(spec) = kernelspec {
            spec.insert("name".to_string(), Value::String(kernel.to_string()));
        }
    }

    pub fn kernel_name(&self) -> Option<&str> {
        self.metadata
            .get("kernelspec")
            .and_then(|spec| spec.get("name"))
            .and_then(Value::as_str)
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}
