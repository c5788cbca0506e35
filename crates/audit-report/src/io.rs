//! Filesystem helpers: directory creation, atomic writes, document reads.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{OutputError, OutputResult};

/// Create `dir` and its parents if absent. Existing directories are fine.
pub fn ensure_dir(dir: &Path) -> OutputResult<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| OutputError::io(dir, e))
}

/// Sibling temp path used while an artifact is being written.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to a temp file next to `path`, then rename it over
/// `path`. On failure the temp file is removed and `path` is untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = temp_path(path);

    let written = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(OutputError::io(path, e));
    }
    Ok(())
}

/// Read a text document, dropping exactly one leading line when `header`
/// is set.
pub fn read_document(path: &Path, header: Option<&str>) -> OutputResult<String> {
    let text = fs::read_to_string(path).map_err(|e| OutputError::io(path, e))?;
    if header.is_none() {
        return Ok(text);
    }
    match text.split_once('\n') {
        Some((_, rest)) => Ok(rest.to_string()),
        None => Err(OutputError::invalid(path, "expected a header line")),
    }
}
