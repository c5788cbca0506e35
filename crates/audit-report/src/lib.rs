//! Persistence of security-audit results.
//!
//! A run's findings are saved in three shapes:
//!
//! - a consolidated, key-sorted JSON/JS document per artifact
//!   ([`JsonReportWriter`]),
//! - a SQLite mirror holding one record per top-level key
//!   ([`SqliteReportWriter`]),
//! - a tree of small per-path JSON files decomposed from the results
//!   document, annotated with account, timestamp and finding identity
//!   ([`TreeDecomposer`]).
//!
//! Audit objects go through the [`StructuralEncoder`] first, which turns
//! anything `Serialize` into a [`PlainValue`] and strips sensitive fields.
//!
//! # Quick Start
//!
//! ```no_run
//! use audit_report::{
//!     ArtifactType, JsonReportWriter, NonInteractiveGuard, ReportConfig, ReportWriter,
//!     SaveOptions,
//! };
//!
//! let config = ReportConfig::new(Some("aws-prod"), Some("out".into()), None)
//!     .with_account_id("123456789012");
//! let writer = JsonReportWriter::new(config).with_guard(NonInteractiveGuard::overwrite());
//!
//! let results = serde_json::json!({"services": {"ec2": {"findings": {}}}});
//! let outcome = writer.save_to_file(&results, ArtifactType::Results, SaveOptions::default());
//! assert!(outcome.is_written());
//! ```
//!
//! # Errors
//!
//! Saving never fails the caller: I/O and database errors are logged through
//! `tracing` and surface as [`SaveOutcome::Failed`]. Loading returns
//! [`OutputResult`].

pub mod config;
pub mod encoder;
pub mod error;
pub mod format;
pub mod guard;
pub mod io;
pub mod naming;
pub mod tree;
pub mod writer;

/// JSON-representable value: scalar, sequence or mapping. Mappings keep
/// insertion order.
pub type PlainValue = serde_json::Value;

pub use config::ReportConfig;
pub use encoder::StructuralEncoder;
pub use error::{OutputError, OutputResult};
pub use guard::{NonInteractiveGuard, OverwriteGuard, PromptGuard};
pub use naming::{ArtifactType, PathResolver, ReportLayout, ResolvedPath};
pub use tree::{sanitize_segment, DecomposeReport, TreeContext, TreeDecomposer};
pub use writer::{
    JsonReportWriter, ReportWriter, SaveOptions, SaveOutcome, SqliteReportWriter,
};
