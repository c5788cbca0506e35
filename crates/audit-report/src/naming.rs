//! Artifact naming conventions.
//!
//! # Layout
//!
//! ```text
//! {report_dir}/{report_name}-{artifact}.{ext}        # consolidated artifacts
//! {report_dir}/{report_name}-{artifact}.db           # key-value mirror
//! {report_dir}/positka/{report_name}/{segments..}/{segment}.json
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

/// Sub-tree receiving the decomposed results.
pub const TREE_DIR_NAME: &str = "positka";

/// Tree root name when the run has no report name.
pub const DEFAULT_TREE_NAME: &str = "report";

/// Logical output targeted by a save or load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactType {
    /// Final results document. Saving it also decomposes the tree.
    Results,
    Exceptions,
    Errors,
    Rules,
}

impl ArtifactType {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Results => "RESULTS",
            Self::Exceptions => "EXCEPTIONS",
            Self::Errors => "ERRORS",
            Self::Rules => "RULES",
        }
    }

    /// Non-JSON first line marking the file as a script module.
    pub fn header(self) -> Option<&'static str> {
        match self {
            Self::Results => Some("audit_results ="),
            Self::Exceptions => Some("exceptions ="),
            Self::Errors | Self::Rules => None,
        }
    }

    pub fn default_extension(self) -> &'static str {
        if self.header().is_some() {
            "js"
        } else {
            "json"
        }
    }

    pub fn is_results(self) -> bool {
        matches!(self, Self::Results)
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Target file plus the header line the file carries (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub header: Option<&'static str>,
}

/// Maps an artifact to its on-disk location.
pub trait PathResolver: Send + Sync {
    /// `extension` overrides the artifact's default extension.
    fn resolve(
        &self,
        artifact: ArtifactType,
        report_name: Option<&str>,
        report_dir: &Path,
        extension: Option<&str>,
    ) -> ResolvedPath;
}

/// Default layout: `{report_dir}/{report_name}-{artifact}.{ext}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportLayout;

impl PathResolver for ReportLayout {
    fn resolve(
        &self,
        artifact: ArtifactType,
        report_name: Option<&str>,
        report_dir: &Path,
        extension: Option<&str>,
    ) -> ResolvedPath {
        let ext = extension.unwrap_or_else(|| artifact.default_extension());
        let tag = artifact.tag().to_lowercase();
        let file_name = match report_name.filter(|n| !n.is_empty()) {
            Some(name) => format!("{}-{}.{}", name, tag, ext),
            None => format!("{}.{}", tag, ext),
        };
        ResolvedPath {
            path: report_dir.join(file_name),
            header: artifact.header(),
        }
    }
}

/// Root directory of the decomposed tree for an artifact written at
/// `artifact_path`: `{dir of artifact}/positka/{report_name}`.
pub fn tree_root(artifact_path: &Path, report_name: &str) -> PathBuf {
    artifact_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(TREE_DIR_NAME)
        .join(report_name)
}
