//! Run configuration shared by every writer.
//!
//! The report identity (`report_name`, `report_dir`, `timestamp`) is fixed
//! when the config is built and never changes for the lifetime of a writer.

use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Default directory for report artifacts.
pub const DEFAULT_REPORT_DIRECTORY: &str = "scoutsuite-report";

/// Fields removed from every mapping by the structural encoder.
pub const DEFAULT_EXCLUDED_FIELDS: [&str; 4] =
    ["profile", "credentials", "metadata_path", "services_config"];

/// Format of the run timestamp (`2024-03-01_14h05+0100`).
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%Hh%M%z";

/// Format of the timestamp stamped into decomposed tree files.
pub const METADATA_TIMESTAMP_FORMAT: &str = "%d-%m-%y %H:%M:%S";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Report name, with path separators already replaced by `_`.
    #[serde(deserialize_with = "deserialize_report_name")]
    pub report_name: Option<String>,

    /// Directory receiving every artifact of the run.
    pub report_dir: PathBuf,

    /// Run timestamp. Default: local time at construction.
    ///
    /// Identifies the run in the save log only; artifact names do not carry it.
    pub timestamp: String,

    /// Account id injected into tree metadata.
    /// When unset, the results document's own `account_id` is used.
    pub account_id: Option<String>,

    /// Timestamp injected into tree metadata. When unset, the save time.
    pub metadata_timestamp: Option<String>,

    /// Field names stripped by the encoder, at any depth.
    pub excluded_fields: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report_name: None,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIRECTORY),
            timestamp: Local::now().format(RUN_TIMESTAMP_FORMAT).to_string(),
            account_id: None,
            metadata_timestamp: None,
            excluded_fields: DEFAULT_EXCLUDED_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl ReportConfig {
    /// Build from the `(report_name, report_dir, timestamp)` identity triple.
    /// `None` values fall back to the defaults.
    pub fn new(
        report_name: Option<&str>,
        report_dir: Option<PathBuf>,
        timestamp: Option<String>,
    ) -> Self {
        let mut cfg = Self::default();
        cfg.report_name = report_name.map(sanitize_report_name);
        if let Some(dir) = report_dir {
            cfg.report_dir = dir;
        }
        if let Some(ts) = timestamp {
            cfg.timestamp = ts;
        }
        cfg
    }

    /// Defaults overlaid with `AUDIT_REPORT_DIR`, `AUDIT_REPORT_NAME` and
    /// `AUDIT_ACCOUNT_ID`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(dir) = std::env::var("AUDIT_REPORT_DIR") {
            cfg.report_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("AUDIT_REPORT_NAME") {
            cfg.report_name = Some(sanitize_report_name(&name));
        }
        if let Ok(account) = std::env::var("AUDIT_ACCOUNT_ID") {
            cfg.account_id = Some(account);
        }
        cfg
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_metadata_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.metadata_timestamp = Some(timestamp.into());
        self
    }
}

/// Report names end up in file names: path separators become `_`.
pub fn sanitize_report_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

fn deserialize_report_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name: Option<String> = Option::deserialize(deserializer)?;
    Ok(name.as_deref().map(sanitize_report_name))
}
