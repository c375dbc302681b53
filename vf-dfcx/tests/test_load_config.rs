use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use vf_dfcx::load_config::{load_config, Credentials, Overrides};

const AGENT: &str = "projects/pizza/locations/us-central1/agents/bot";

fn clear_env() {
    for key in [
        "PROJECT_NAME",
        "KEYFILE",
        "DIALOGFLOW_ACCESS_TOKEN",
        "API_ENDPOINT",
    ] {
        env::remove_var(key);
    }
}

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// Environment alone is enough: no config file, defaults everywhere else.
#[test]
#[serial]
fn test_load_config_from_env_only() {
    clear_env();
    env::set_var("PROJECT_NAME", AGENT);
    env::set_var("KEYFILE", "/secrets/key.json");

    let config = load_config(None, Overrides::default()).expect("Config should load");

    assert_eq!(config.sync.agent, AGENT);
    assert!(!config.sync.upload_pages);
    assert_eq!(config.sync.flow, None);
    assert_eq!(
        config.client.base_url,
        "https://us-central1-dialogflow.googleapis.com"
    );
    assert_eq!(
        config.client.credentials,
        Credentials::KeyFile(PathBuf::from("/secrets/key.json"))
    );
    assert_eq!(config.client.language_code, None);
}

#[test]
#[serial]
fn test_load_config_file_values_and_precedence() {
    clear_env();
    let file = config_file(
        r#"
agent: projects/from-file/locations/europe-west1/agents/a
api_endpoint: europe-west1-dialogflow.googleapis.com
keyfile: ./key.json
flow: f-file
language_code: nl
pages: false
"#,
    );
    env::set_var("DIALOGFLOW_ACCESS_TOKEN", "ya29.token");

    let config = load_config(
        Some(file.path()),
        Overrides {
            pages: true,
            flow: Some("f-cli".into()),
        },
    )
    .expect("Config should load");

    assert_eq!(config.sync.agent, "projects/from-file/locations/europe-west1/agents/a");
    assert_eq!(
        config.client.base_url,
        "https://europe-west1-dialogflow.googleapis.com"
    );
    assert_eq!(config.client.language_code.as_deref(), Some("nl"));
    // Token in env wins over the key file.
    assert_eq!(
        config.client.credentials,
        Credentials::AccessToken("ya29.token".into())
    );
    // CLI flags win over the file.
    assert!(config.sync.upload_pages);
    assert_eq!(config.sync.flow.as_deref(), Some("f-cli"));

    // Env wins over the file.
    env::set_var("PROJECT_NAME", AGENT);
    env::set_var("API_ENDPOINT", "http://127.0.0.1:9999/");
    let config = load_config(Some(file.path()), Overrides::default()).expect("Config should load");
    assert_eq!(config.sync.agent, AGENT);
    assert_eq!(config.client.base_url, "http://127.0.0.1:9999");
    assert_eq!(config.sync.flow.as_deref(), Some("f-file"));
    clear_env();
}

#[test]
#[serial]
fn test_load_config_errors_without_agent() {
    clear_env();
    env::set_var("DIALOGFLOW_ACCESS_TOKEN", "ya29.token");

    let err = load_config(None, Overrides::default()).unwrap_err();
    assert!(
        err.to_string().contains("PROJECT_NAME"),
        "Missing agent error expected, got: {err}"
    );
    clear_env();
}

#[test]
#[serial]
fn test_load_config_errors_without_credentials() {
    clear_env();
    env::set_var("PROJECT_NAME", AGENT);

    let err = load_config(None, Overrides::default()).unwrap_err();
    assert!(
        err.to_string().contains("no credentials"),
        "Missing credentials error expected, got: {err}"
    );
    clear_env();
}

/// This test ensures that if the config file is not valid YAML, load_config errors and reports as such.
#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    clear_env();
    env::set_var("PROJECT_NAME", AGENT);
    env::set_var("DIALOGFLOW_ACCESS_TOKEN", "present");

    let file = config_file("not-yaml: [:::");
    let msg = load_config(Some(file.path()), Overrides::default())
        .unwrap_err()
        .to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );

    let file = config_file("agent: a\nretries: 3\n");
    let msg = load_config(Some(file.path()), Overrides::default())
        .unwrap_err()
        .to_string();
    assert!(msg.contains("YAML"), "Unknown keys should be rejected, got: {msg}");
    clear_env();
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    clear_env();
    let err = load_config(
        Some(std::path::Path::new("/no/such/config.yaml")),
        Overrides::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
