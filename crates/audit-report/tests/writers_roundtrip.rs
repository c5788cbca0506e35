mod common;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use audit_report::{
    ArtifactType, JsonReportWriter, NonInteractiveGuard, ReportConfig, ReportWriter,
    SaveOptions, SaveOutcome, SqliteReportWriter,
};
use common::{init_tracing, read_json, CountingGuard, ACCOUNT_ID, META_TIMESTAMP};
use serde::Serialize;
use serde_json::{json, Value};

fn config(dir: &Path) -> ReportConfig {
    ReportConfig::new(Some("aws-prod"), Some(dir.to_path_buf()), Some("ts".into()))
        .with_account_id(ACCOUNT_ID)
        .with_metadata_timestamp(META_TIMESTAMP)
}

fn json_writer(dir: &Path) -> JsonReportWriter {
    JsonReportWriter::new(config(dir)).with_guard(NonInteractiveGuard::overwrite())
}

fn db_writer(dir: &Path) -> SqliteReportWriter {
    SqliteReportWriter::new(config(dir)).with_guard(NonInteractiveGuard::overwrite())
}

fn results() -> Value {
    json!({
        "last_run": {"ruleset_name": "default", "summary": {"ec2": {"flagged_items": 1}}},
        "services": {
            "iam": {"findings": {"iam-root-account-used": {"level": "warning", "items": []}}}
        },
        "provider_name": "Amazon Web Services",
        "nullable": null,
        "ratio": 0.25
    })
}

#[derive(Debug, Serialize)]
struct Provider {
    provider_code: String,
    profile: String,
    credentials: Credentials,
    services: Services,
}

#[derive(Debug, Serialize)]
struct Credentials {
    access_key: String,
}

#[derive(Debug, Serialize)]
struct Services {
    s3: S3,
}

#[derive(Debug, Serialize)]
struct S3 {
    buckets_count: u32,
    credentials: Option<Credentials>,
    services_config: String,
}

/// Region index keyed by tuples, which JSON mappings cannot hold.
#[derive(Debug, Serialize)]
struct IndexedProvider {
    account_id: String,
    credentials: Credentials,
    regions: HashMap<(u8, u8), String>,
    services: BTreeMap<String, Value>,
}

#[test]
fn json_writer_roundtrips_every_artifact_type() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let writer = json_writer(dir.path());

    for artifact in [
        ArtifactType::Results,
        ArtifactType::Exceptions,
        ArtifactType::Errors,
        ArtifactType::Rules,
    ] {
        let outcome = writer.save_value(&results(), artifact, SaveOptions::default());
        assert!(outcome.is_written(), "{artifact}: {outcome:?}");
        assert_eq!(writer.load_from_file(artifact, None)?, results());
    }
    Ok(())
}

#[test]
fn debug_output_is_pretty_and_still_loads() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let writer = json_writer(dir.path());
    let opts = SaveOptions {
        force_write: false,
        debug: true,
    };

    let outcome = writer.save_value(&results(), ArtifactType::Exceptions, opts);

    let text = std::fs::read_to_string(outcome.path())?;
    assert!(text.starts_with("exceptions =\n{\n    \"last_run\": {"));
    assert_eq!(writer.load_from_file(ArtifactType::Exceptions, None)?, results());
    Ok(())
}

#[test]
fn sqlite_writer_roundtrips() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let writer = db_writer(dir.path());

    let outcome = writer.save_value(&results(), ArtifactType::Results, SaveOptions::default());

    assert_eq!(
        outcome,
        SaveOutcome::Written(dir.path().join("aws-prod-results.db"))
    );
    assert_eq!(writer.load_from_file(ArtifactType::Results, None)?, results());
    assert_eq!(
        writer.load_from_file(ArtifactType::Results, Some(outcome.path()))?,
        results()
    );
    // the SQLite mirror never decomposes
    assert!(!dir.path().join("positka").exists());
    Ok(())
}

#[test]
fn results_save_writes_document_and_tree() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let guard = Arc::new(CountingGuard::default());
    let writer = JsonReportWriter::new(config(dir.path())).with_guard(guard.clone());

    let outcome = writer.save_value(&results(), ArtifactType::Results, SaveOptions::default());

    let primary = dir.path().join("aws-prod-results.js");
    assert_eq!(outcome, SaveOutcome::Written(primary.clone()));
    assert_eq!(guard.calls_for(&primary), 1);
    assert_eq!(guard.max_calls_per_path(), 1);

    let tree = dir.path().join("positka").join("aws-prod");
    let finding = read_json(
        &tree.join("services/iam/findings/iam-root-account-used/iam-root-account-used.json"),
    );
    assert_eq!(finding["service"], json!("iam"));
    assert_eq!(finding["finding"], json!("iam-root-account-used"));
    assert_eq!(finding["account_id"], json!(ACCOUNT_ID));

    let root = read_json(&tree.join("aws-prod.json"));
    assert_eq!(root["provider_name"], json!("Amazon Web Services"));
    assert_eq!(root["ratio"], json!(0.25));
    assert_eq!(root["timestamp"], json!(META_TIMESTAMP));
    Ok(())
}

#[test]
fn sqlite_guard_is_consulted_once() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let guard = Arc::new(CountingGuard::default());
    let writer = SqliteReportWriter::new(config(dir.path())).with_guard(guard.clone());

    let outcome = writer.save_value(&results(), ArtifactType::Rules, SaveOptions::default());

    assert_eq!(guard.calls_for(outcome.path()), 1);
    assert_eq!(guard.max_calls_per_path(), 1);
    Ok(())
}

#[test]
fn sensitive_fields_never_reach_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let writer = json_writer(dir.path());
    let provider = Provider {
        provider_code: "aws".into(),
        profile: "default".into(),
        credentials: Credentials {
            access_key: "AKIAEXAMPLE".into(),
        },
        services: Services {
            s3: S3 {
                buckets_count: 3,
                credentials: Some(Credentials {
                    access_key: "AKIANESTED".into(),
                }),
                services_config: "opaque".into(),
            },
        },
    };

    let outcome = writer.save_to_file(&provider, ArtifactType::Results, SaveOptions::default());
    assert!(outcome.is_written());

    let loaded = writer.load_from_file(ArtifactType::Results, None)?;
    assert_eq!(
        loaded,
        json!({"provider_code": "aws", "services": {"s3": {"buckets_count": 3}}})
    );
    let text = std::fs::read_to_string(outcome.path())?;
    assert!(!text.contains("AKIA"));
    Ok(())
}

#[test]
fn unserializable_field_keeps_secrets_and_siblings() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let writer = json_writer(dir.path());
    let mut regions = HashMap::new();
    regions.insert((1, 2), "eu-west-1".to_string());
    let provider = IndexedProvider {
        account_id: ACCOUNT_ID.into(),
        credentials: Credentials {
            access_key: "AKIASECRET".into(),
        },
        regions,
        services: BTreeMap::from([(
            "ec2".to_string(),
            json!({"findings": {"ec2-open-ssh": {"level": "danger"}}}),
        )]),
    };

    let outcome = writer.save_to_file(&provider, ArtifactType::Results, SaveOptions::default());
    assert!(outcome.is_written(), "{outcome:?}");

    let loaded = writer.load_from_file(ArtifactType::Results, None)?;
    let regions = loaded["regions"].as_str().unwrap_or_default();
    assert!(regions.starts_with("<unserializable "));
    assert_eq!(
        loaded["services"]["ec2"]["findings"]["ec2-open-ssh"]["level"],
        json!("danger")
    );

    // the results document still decomposes into a tree
    let tree = dir.path().join("positka").join("aws-prod");
    let finding =
        read_json(&tree.join("services/ec2/findings/ec2-open-ssh/ec2-open-ssh.json"));
    assert_eq!(finding["finding"], json!("ec2-open-ssh"));

    for (path, bytes) in common::snapshot(dir.path()) {
        let text = String::from_utf8(bytes)?;
        assert!(
            !text.contains("AKIASECRET"),
            "secret written to {}",
            path.display()
        );
    }
    Ok(())
}

#[test]
fn unwritable_report_dir_is_a_reported_no_op() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, "a file, not a directory")?;

    let outcome = json_writer(&blocked).save_value(
        &results(),
        ArtifactType::Results,
        SaveOptions::default(),
    );
    assert!(matches!(outcome, SaveOutcome::Failed(_)));

    let outcome = db_writer(&blocked).save_value(
        &results(),
        ArtifactType::Results,
        SaveOptions::default(),
    );
    assert!(matches!(outcome, SaveOutcome::Failed(_)));

    assert_eq!(std::fs::read_to_string(&blocked)?, "a file, not a directory");
    Ok(())
}

#[test]
fn declined_overwrite_keeps_previous_database() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let first = db_writer(dir.path());
    first.save_value(
        &json!({"run": 1}),
        ArtifactType::Results,
        SaveOptions::default(),
    );

    let second = SqliteReportWriter::new(config(dir.path()))
        .with_guard(NonInteractiveGuard::keep_existing());
    let outcome = second.save_value(
        &json!({"run": 2}),
        ArtifactType::Results,
        SaveOptions::default(),
    );
    assert!(matches!(outcome, SaveOutcome::Skipped(_)));
    assert_eq!(
        second.load_from_file(ArtifactType::Results, None)?,
        json!({"run": 1})
    );

    let forced = second.save_value(
        &json!({"run": 3}),
        ArtifactType::Results,
        SaveOptions::forced(),
    );
    assert!(forced.is_written());
    assert_eq!(
        second.load_from_file(ArtifactType::Results, None)?,
        json!({"run": 3})
    );
    Ok(())
}
