//! # File System Operations Module / 文件系统操作模块
//!
//! Path normalization for notebook directories and atomic writes for
//! executed notebooks.
//!
//! 笔记本目录的路径规范化，以及执行结果的原子写入。

use std::fs;
use std::io::Write;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::core::error::WriteError;

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Normalizes `directory` so it ends with exactly one path separator.
///
/// An empty string means the current directory (`./`). A path made only of
/// separators is the filesystem root.
///
/// # Examples
/// ```
/// use notebook_runner::infra::fs::normalize_directory;
/// assert_eq!(normalize_directory("Minis"), normalize_directory("Minis/"));
/// ```
pub fn normalize_directory(directory: &str) -> String {
    if directory.is_empty() {
        return format!(".{MAIN_SEPARATOR}");
    }
    let trimmed = directory.trim_end_matches(is_separator);
    format!("{trimmed}{MAIN_SEPARATOR}")
}

/// Returns `<output_dir>/executed-<file name>`.
///
/// Only the final component of `notebook_file_name` is used, so a name like
/// `sub/analysis.ipynb` still lands directly in `output_dir`.
pub fn executed_output_path(output_dir: &Path, notebook_file_name: &str) -> PathBuf {
    let file_name = Path::new(notebook_file_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| notebook_file_name.to_string());
    output_dir.join(format!("executed-{file_name}"))
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, creating the directory first if needed. Either the complete
/// file appears at `path` or nothing changes.
///
/// # Returns
/// A `WriteError` naming the path that could not be created or written.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })?;

    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".notebook-runner-")
        .tempfile_in(parent)
        .map_err(io_error)?;
    temp.write_all(contents).map_err(io_error)?;
    temp.flush().map_err(io_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(io_error)?;
    }

    temp.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}
