/// Cluster manifest tests
///
/// Run with: cargo test --test manifest_tests

use permcheck::{ClusterManifest, PermissionValidator, ServerId, ValidatorConfig};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

fn grants(select_priv: &str) -> serde_json::Value {
    json!({
        "user": {
            "fields": [
                {"name": "Host", "kind": "text"},
                {"name": "User", "kind": "text"},
                {"name": "Password", "kind": "text"},
                {"name": "max_connections", "kind": "integer"}
            ],
            "rows": [["%", "app", "*2470C0C06DEE42FD1618BB99005ADCA2EC9D1E19", 10]]
        },
        "db": {
            "fields": [
                {"name": "Host", "kind": "text"},
                {"name": "Db", "kind": "text"},
                {"name": "User", "kind": "text"},
                {"name": "Select_priv", "kind": "text"}
            ],
            "rows": [["%", "commerce", "app", select_priv]]
        },
        "host": {
            "fields": [{"name": "Host", "kind": "text"}, {"name": "Db", "kind": "text"}],
            "rows": []
        }
    })
}

fn manifest_json() -> serde_json::Value {
    json!({
        "keyspaces": [{
            "name": "commerce",
            "shards": [
                {"name": "-80", "master": "zone1-100", "replicas": ["zone1-101", "zone1-102"]},
                {"name": "80-", "master": "zone1-200", "replicas": ["zone1-201"]}
            ]
        }],
        "servers": {
            "zone1-100": {"grants": grants("Y")},
            "zone1-101": {"same_as": "zone1-100"},
            "zone1-102": {"unreachable": true},
            "zone1-200": {"grants": grants("Y")},
            "zone1-201": {"same_as": "zone1-200", "grants": {"db": grants("N")["db"]}}
        }
    })
}

async fn validator_for(manifest: &ClusterManifest) -> PermissionValidator {
    let topology = manifest.build_topology().await.unwrap();
    let client = manifest.build_client("mysql").await.unwrap();
    PermissionValidator::new(Arc::new(topology), Arc::new(client), ValidatorConfig::new()).unwrap()
}

#[tokio::test]
async fn test_manifest_file_drives_a_full_validation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", manifest_json()).unwrap();

    let manifest = ClusterManifest::from_path(file.path()).unwrap();
    let validator = validator_for(&manifest).await;

    let err = validator.validate_keyspace("commerce").await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("cannot fetch permissions of replica zone1-102"));
    assert!(text.contains("zone1-200 and zone1-201 disagree on %:commerce:app"));
    assert!(text.contains("db Select_priv differs: reference=Y candidate=N"));
    assert!(!text.contains("zone1-101"));
}

#[tokio::test]
async fn test_inherited_grants_match_their_source() {
    let manifest: ClusterManifest = serde_json::from_value(manifest_json()).unwrap();
    let validator = validator_for(&manifest).await;

    let master = validator
        .get_permissions(&ServerId::from("zone1-100"))
        .await
        .unwrap();
    let replica = validator
        .get_permissions(&ServerId::from("zone1-101"))
        .await
        .unwrap();
    assert_eq!(
        permcheck::compare_snapshots(&master, &replica, permcheck::DiffMode::Positional)
            .unwrap(),
        None
    );
}

#[test]
fn test_missing_manifest_file_is_an_io_error() {
    let err = ClusterManifest::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, permcheck::PermError::Io(_)));
}
