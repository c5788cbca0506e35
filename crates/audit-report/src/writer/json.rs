//! Single-document writer for JSON and JS artifacts.

use std::path::Path;

use chrono::Local;
use serde_json::Value;
use tracing::{info, warn};

use super::{finish, Collaborators, ReportWriter, SaveOptions, SaveOutcome};
use crate::config::{ReportConfig, METADATA_TIMESTAMP_FORMAT};
use crate::error::{OutputError, OutputResult};
use crate::format::to_report_string;
use crate::guard::OverwriteGuard;
use crate::io::{read_document, write_atomic};
use crate::naming::{tree_root, ArtifactType, PathResolver, DEFAULT_TREE_NAME};
use crate::tree::{DecomposeReport, TreeContext, TreeDecomposer};
use crate::PlainValue;

/// Writes each artifact as one key-sorted document. Script-module artifacts
/// get their header line first. Saving [`ArtifactType::Results`] also
/// decomposes the document under `positka/{report_name}`.
pub struct JsonReportWriter {
    config: ReportConfig,
    parts: Collaborators,
}

impl JsonReportWriter {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            parts: Collaborators::default(),
        }
    }

    pub fn with_guard(mut self, guard: impl OverwriteGuard + 'static) -> Self {
        self.parts.guard = Box::new(guard);
        self
    }

    pub fn with_resolver(mut self, resolver: impl PathResolver + 'static) -> Self {
        self.parts.resolver = Box::new(resolver);
        self
    }

    /// Load a document from an explicit path, skipping `header` if given.
    pub fn load_from_path(&self, path: &Path, header: Option<&str>) -> OutputResult<PlainValue> {
        let text = read_document(path, header)?;
        serde_json::from_str(&text).map_err(|e| OutputError::json(path, e))
    }

    /// Decompose `value` next to the artifact written at `artifact_path`.
    pub fn decompose(
        &self,
        value: &PlainValue,
        artifact_path: &Path,
        force_write: bool,
    ) -> DecomposeReport {
        let name = self
            .config
            .report_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_TREE_NAME);
        let root = tree_root(artifact_path, name);

        let Some(map) = value.as_object() else {
            let err = OutputError::invalid(artifact_path, "results root is not a mapping");
            super::report_error(&err);
            return DecomposeReport {
                failed: vec![(root, err.to_string())],
                ..Default::default()
            };
        };

        let ctx = self.tree_context(value);
        let report = TreeDecomposer::new(&ctx, &*self.parts.guard, force_write)
            .decompose(map, &root);
        if !report.failed.is_empty() || !report.skipped.is_empty() {
            warn!(
                root = %root.display(),
                written = report.written.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "results tree partially written"
            );
        }
        report
    }

    fn tree_context(&self, value: &PlainValue) -> TreeContext {
        let account_id = self.config.account_id.clone().or_else(|| {
            value
                .get("account_id")
                .and_then(Value::as_str)
                .map(String::from)
        });
        let timestamp = self
            .config
            .metadata_timestamp
            .clone()
            .unwrap_or_else(|| Local::now().format(METADATA_TIMESTAMP_FORMAT).to_string());
        TreeContext {
            account_id,
            timestamp,
        }
    }

    fn write_document(
        &self,
        value: &PlainValue,
        artifact: ArtifactType,
        path: &Path,
        header: Option<&str>,
        opts: SaveOptions,
    ) -> OutputResult<SaveOutcome> {
        if !self.parts.guard.confirm(path, opts.force_write) {
            warn!(path = %path.display(), "not overwriting existing file");
            return Ok(SaveOutcome::Skipped(path.to_path_buf()));
        }

        let body = to_report_string(value, opts.debug).map_err(|e| OutputError::json(path, e))?;
        let mut text = String::with_capacity(body.len() + 32);
        if let Some(header) = header {
            text.push_str(header);
            text.push('\n');
        }
        text.push_str(&body);
        text.push('\n');
        write_atomic(path, text.as_bytes())?;

        if artifact.is_results() {
            self.decompose(value, path, opts.force_write);
        }
        Ok(SaveOutcome::Written(path.to_path_buf()))
    }
}

impl ReportWriter for JsonReportWriter {
    fn config(&self) -> &ReportConfig {
        &self.config
    }

    fn save_value(
        &self,
        value: &PlainValue,
        artifact: ArtifactType,
        opts: SaveOptions,
    ) -> SaveOutcome {
        let resolved = self.parts.resolver.resolve(
            artifact,
            self.config.report_name.as_deref(),
            &self.config.report_dir,
            None,
        );
        info!(run = %self.config.timestamp, "Saving data to {}", resolved.path.display());
        let result = self.write_document(value, artifact, &resolved.path, resolved.header, opts);
        finish(resolved.path, result)
    }

    fn load_from_file(
        &self,
        artifact: ArtifactType,
        path: Option<&Path>,
    ) -> OutputResult<PlainValue> {
        let resolved = self.parts.resolver.resolve(
            artifact,
            self.config.report_name.as_deref(),
            &self.config.report_dir,
            None,
        );
        let path = path.unwrap_or(resolved.path.as_path());
        self.load_from_path(path, resolved.header)
    }
}
