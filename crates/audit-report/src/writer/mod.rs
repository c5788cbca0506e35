//! Output writers.
//!
//! Two variants share the [`ReportWriter`] contract:
//! - [`JsonReportWriter`]: one sorted JSON/JS document per artifact, plus the
//!   decomposed tree for the results document.
//! - [`SqliteReportWriter`]: one record per top-level key in a SQLite file.
//!
//! Saving never returns an error. Failures are logged and reported as
//! [`SaveOutcome::Failed`]; a guard refusal is [`SaveOutcome::Skipped`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::error;

use crate::config::ReportConfig;
use crate::encoder::StructuralEncoder;
use crate::error::{OutputError, OutputResult};
use crate::guard::{OverwriteGuard, PromptGuard};
use crate::naming::{ArtifactType, PathResolver, ReportLayout};
use crate::PlainValue;

mod json;
mod sqlite;

pub use json::JsonReportWriter;
pub use sqlite::{SqliteReportWriter, RECORDS_SCHEMA};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Replace existing files without asking the guard's user.
    pub force_write: bool,
    /// Pretty-print JSON documents.
    pub debug: bool,
}

impl SaveOptions {
    pub fn forced() -> Self {
        Self {
            force_write: true,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written(PathBuf),
    /// The overwrite guard declined.
    Skipped(PathBuf),
    /// An I/O, JSON or database error was logged; nothing was committed.
    Failed(PathBuf),
}

impl SaveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(p) | Self::Skipped(p) | Self::Failed(p) => p,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

pub trait ReportWriter {
    fn config(&self) -> &ReportConfig;

    /// Persist an already encoded value.
    fn save_value(
        &self,
        value: &PlainValue,
        artifact: ArtifactType,
        opts: SaveOptions,
    ) -> SaveOutcome;

    /// Load an artifact. `path` overrides the resolved location.
    fn load_from_file(
        &self,
        artifact: ArtifactType,
        path: Option<&Path>,
    ) -> OutputResult<PlainValue>;

    /// Encode `content` with the configured exclusions, then persist it.
    fn save_to_file<T>(&self, content: &T, artifact: ArtifactType, opts: SaveOptions) -> SaveOutcome
    where
        T: Serialize + ?Sized,
        Self: Sized,
    {
        let plain = StructuralEncoder::from_config(self.config()).encode(content);
        self.save_value(&plain, artifact, opts)
    }
}

/// Path resolver and overwrite guard shared by both writers.
pub(crate) struct Collaborators {
    pub(crate) resolver: Box<dyn PathResolver>,
    pub(crate) guard: Box<dyn OverwriteGuard>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            resolver: Box::new(ReportLayout),
            guard: Box::new(PromptGuard),
        }
    }
}

/// Turn the result of a save attempt into its outcome, logging failures.
pub(crate) fn finish(path: PathBuf, result: OutputResult<SaveOutcome>) -> SaveOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(err) => {
            report_error(&err);
            SaveOutcome::Failed(path)
        }
    }
}

pub(crate) fn report_error(err: &OutputError) {
    error!(path = %err.path().display(), error = %err, "failed to save report artifact");
}
