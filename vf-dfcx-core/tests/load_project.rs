use std::fs::write;
use std::path::Path;
use tempfile::NamedTempFile;

use vf_dfcx_core::project::{load_project, ProjectError};

#[test]
fn test_fixture_project_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pizza.vf");
    let project = load_project(&path).expect("fixture should load");

    assert_eq!(project.slots().len(), 2);
    assert_eq!(project.intents().len(), 3);
    assert_eq!(project.slots_by_key()["tp2"].name, "topping");

    let sub_topics: Vec<_> = project
        .sub_topics()
        .iter()
        .map(|t| t.diagram.name.clone())
        .collect();
    assert_eq!(sub_topics, vec!["Delivery", "Payment"]);
}

#[test]
fn test_missing_file_is_read_error() {
    let err = load_project("/definitely/not/here/project.vf").expect_err("should fail");
    assert!(matches!(err, ProjectError::Read { .. }));
}

#[test]
fn test_malformed_json_is_parse_error() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), b"{ \"version\": ").unwrap();

    let err = load_project(file.path()).expect_err("should fail");
    assert!(matches!(err, ProjectError::Parse { .. }));
    assert!(err.to_string().contains("failed to parse project file"));
}

#[test]
fn test_export_without_platform_data_is_parse_error() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), br#"{ "version": { "name": "v1" } }"#).unwrap();

    let err = load_project(file.path()).expect_err("should fail");
    assert!(matches!(err, ProjectError::Parse { .. }));
}
