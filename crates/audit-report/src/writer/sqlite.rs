//! Key-value mirror of a report in a SQLite file.
//!
//! Each top-level key of the document becomes one row; values are stored as
//! JSON text and read back in insertion order.

use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{finish, Collaborators, ReportWriter, SaveOptions, SaveOutcome};
use crate::config::ReportConfig;
use crate::error::{OutputError, OutputResult};
use crate::guard::OverwriteGuard;
use crate::io::{ensure_dir, temp_path};
use crate::naming::{ArtifactType, PathResolver};
use crate::PlainValue;

/// DDL for the record table.
pub const RECORDS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const DB_EXTENSION: &str = "db";

pub struct SqliteReportWriter {
    config: ReportConfig,
    parts: Collaborators,
}

impl SqliteReportWriter {
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

    fn db_path(&self, artifact: ArtifactType) -> std::path::PathBuf {
        self.parts
            .resolver
            .resolve(
                artifact,
                self.config.report_name.as_deref(),
                &self.config.report_dir,
                Some(DB_EXTENSION),
            )
            .path
    }

    fn write_database(
        &self,
        value: &PlainValue,
        path: &Path,
        opts: SaveOptions,
    ) -> OutputResult<SaveOutcome> {
        if !self.parts.guard.confirm(path, opts.force_write) {
            warn!(path = %path.display(), "not overwriting existing database");
            return Ok(SaveOutcome::Skipped(path.to_path_buf()));
        }

        let map = value
            .as_object()
            .ok_or_else(|| OutputError::invalid(path, "document root is not a mapping"))?;
        let records = encode_records(map, path)?;

        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        // Built aside and renamed over the previous database on commit.
        let tmp = temp_path(path);
        let _ = fs::remove_file(&tmp);
        let committed = write_records(&tmp, &records)
            .and_then(|()| fs::rename(&tmp, path).map_err(|e| OutputError::io(path, e)));
        if let Err(err) = committed {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        Ok(SaveOutcome::Written(path.to_path_buf()))
    }
}

fn encode_records<'a>(
    map: &'a Map<String, Value>,
    path: &Path,
) -> OutputResult<Vec<(&'a str, String)>> {
    map.iter()
        .map(|(key, value)| {
            let text = serde_json::to_string(value).map_err(|e| OutputError::json(path, e))?;
            Ok((key.as_str(), text))
        })
        .collect()
}

fn write_records(path: &Path, records: &[(&str, String)]) -> OutputResult<()> {
    let conn = Connection::open(path).map_err(|e| OutputError::database(path, e))?;
    insert_all(conn, records).map_err(|e| OutputError::database(path, e))
}

fn insert_all(mut conn: Connection, records: &[(&str, String)]) -> rusqlite::Result<()> {
    conn.execute_batch(RECORDS_SCHEMA)?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare("INSERT INTO records (key, value) VALUES (?1, ?2)")?;
        for (key, value) in records {
            stmt.execute(params![key, value])?;
        }
    }
    tx.commit()?;
    conn.close().map_err(|(_, e)| e)
}

fn read_records(conn: &Connection) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT key, value FROM records ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

impl ReportWriter for SqliteReportWriter {
    fn config(&self) -> &ReportConfig {
        &self.config
    }

    fn save_value(
        &self,
        value: &PlainValue,
        artifact: ArtifactType,
        opts: SaveOptions,
    ) -> SaveOutcome {
        let path = self.db_path(artifact);
        info!(run = %self.config.timestamp, "Saving data to {}", path.display());
        let result = self.write_database(value, &path, opts);
        finish(path, result)
    }

    fn load_from_file(
        &self,
        artifact: ArtifactType,
        path: Option<&Path>,
    ) -> OutputResult<PlainValue> {
        let resolved;
        let path = match path {
            Some(p) => p,
            None => {
                resolved = self.db_path(artifact);
                resolved.as_path()
            }
        };

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| OutputError::database(path, e))?;
        let rows = read_records(&conn).map_err(|e| OutputError::database(path, e))?;

        let mut map = Map::with_capacity(rows.len());
        for (key, text) in rows {
            let value = serde_json::from_str(&text).map_err(|e| OutputError::json(path, e))?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}
