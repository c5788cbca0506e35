//! Decomposition of a results document into a tree of small JSON files.
//!
//! Every mapping becomes a directory holding `{segment}.json`, where the
//! file carries only the node's leaf entries plus injected metadata:
//!
//! ```text
//! positka/acme/acme.json
//! positka/acme/services/services.json
//! positka/acme/services/ec2/findings/open-ssh/open-ssh.json
//! ```
//!
//! Branch vs leaf is decided by value shape alone: a mapping is a branch,
//! anything else (scalars, sequences) is a leaf.

use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::error::{OutputError, OutputResult};
use crate::format::to_report_string;
use crate::guard::OverwriteGuard;
use crate::io::{ensure_dir, write_atomic};

/// Parent directory name that marks a node as an audit finding.
pub const FINDINGS_SEGMENT: &str = "findings";

/// Run context injected into every non-empty metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeContext {
    pub account_id: Option<String>,
    pub timestamp: String,
}

/// Outcome of a decomposition. Failures are already logged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecomposeReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// Subtree path and error text.
    pub failed: Vec<(PathBuf, String)>,
}

impl DecomposeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

enum Entry<'a> {
    Branch(&'a Map<String, Value>),
    Leaf(&'a Value),
}

impl<'a> From<&'a Value> for Entry<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Entry::Branch(map),
            other => Entry::Leaf(other),
        }
    }
}

pub struct TreeDecomposer<'a> {
    ctx: &'a TreeContext,
    guard: &'a dyn OverwriteGuard,
    force_write: bool,
}

impl<'a> TreeDecomposer<'a> {
    pub fn new(ctx: &'a TreeContext, guard: &'a dyn OverwriteGuard, force_write: bool) -> Self {
        Self {
            ctx,
            guard,
            force_write,
        }
    }

    /// Decompose `node` into `root`. A failing subtree is recorded and its
    /// siblings are still attempted.
    pub fn decompose(&self, node: &Map<String, Value>, root: &Path) -> DecomposeReport {
        let mut report = DecomposeReport::default();
        if let Err(err) = self.decompose_node(node, root, &mut report) {
            record_failure(root, err, &mut report);
        }
        report
    }

    fn decompose_node(
        &self,
        node: &Map<String, Value>,
        path: &Path,
        report: &mut DecomposeReport,
    ) -> OutputResult<()> {
        let mut leaves = Map::new();
        for (key, value) in node {
            match Entry::from(value) {
                Entry::Branch(child) => {
                    let child_path = path.join(sanitize_segment(key));
                    if let Err(err) = self.decompose_node(child, &child_path, report) {
                        record_failure(&child_path, err, report);
                    }
                }
                Entry::Leaf(leaf) => {
                    leaves.insert(key.clone(), leaf.clone());
                }
            }
        }

        let metadata = self.metadata(path, leaves);
        self.write_node_file(path, metadata, report)
    }

    fn metadata(&self, path: &Path, mut metadata: Map<String, Value>) -> Map<String, Value> {
        if let Some((service, finding)) = finding_identity(path) {
            metadata.insert("service".into(), Value::String(service));
            metadata.insert("finding".into(), Value::String(finding));
        }
        if !metadata.is_empty() {
            metadata.insert("account_id".into(), Value::from(self.ctx.account_id.clone()));
            metadata.insert(
                "timestamp".into(),
                Value::String(self.ctx.timestamp.clone()),
            );
        }
        metadata
    }

    fn write_node_file(
        &self,
        path: &Path,
        metadata: Map<String, Value>,
        report: &mut DecomposeReport,
    ) -> OutputResult<()> {
        let file = node_file(path);
        if !self.guard.confirm(&file, self.force_write) {
            warn!(path = %file.display(), "not overwriting existing file");
            report.skipped.push(file);
            return Ok(());
        }

        ensure_dir(path)?;
        let mut body = to_report_string(&Value::Object(metadata), false)
            .map_err(|e| OutputError::json(&file, e))?;
        body.push('\n');
        write_atomic(&file, body.as_bytes())?;

        debug!(path = %file.display(), "wrote tree node");
        report.written.push(file);
        Ok(())
    }
}

fn record_failure(path: &Path, err: OutputError, report: &mut DecomposeReport) {
    error!(path = %path.display(), error = %err, "failed to decompose subtree");
    report.failed.push((path.to_path_buf(), err.to_string()));
}

/// `{path}/{last segment}.json`
pub fn node_file(path: &Path) -> PathBuf {
    let segment = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.join(format!("{}.json", segment))
}

/// Directory segment for a mapping key.
///
/// A single leading `/` is dropped, `:` becomes `_` and `*` becomes `-`.
/// Remaining separators and NUL become `_`; empty, `.` and `..` become `_`.
pub fn sanitize_segment(key: &str) -> String {
    let key = key.strip_prefix('/').unwrap_or(key);
    let segment: String = key
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | '\0' => '_',
            '*' => '-',
            c => c,
        })
        .collect();
    match segment.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => segment,
    }
}

/// `(service, finding)` when the node's parent directory is `findings`:
/// the service is the grandparent directory, the finding the node itself.
fn finding_identity(path: &Path) -> Option<(String, String)> {
    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    let n = segments.len();
    if n < 3 || segments[n - 2] != FINDINGS_SEGMENT {
        return None;
    }
    Some((segments[n - 3].clone(), segments[n - 1].clone()))
}
