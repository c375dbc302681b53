/// `load_config` module: merges the optional YAML config file, the environment and CLI
/// flags into the settings of one import run.
///
/// # Precedence
/// CLI flags override environment variables, which override the YAML file.
///
/// # Environment
/// - `PROJECT_NAME`: agent resource name, `projects/{p}/locations/{l}/agents/{a}`
/// - `KEYFILE`: path to a service-account JSON key
/// - `DIALOGFLOW_ACCESS_TOKEN`: pre-issued OAuth access token, wins over `KEYFILE`
/// - `API_ENDPOINT`: regional API host, or a full `http(s)://` base URL
///
/// `.env` files are honoured (loaded in `main`).
///
/// # Errors
/// All errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use vf_dfcx_core::config::SyncConfig;
use vf_dfcx_core::tagging::DEFAULT_API_ENDPOINT;

pub const ENV_PROJECT_NAME: &str = "PROJECT_NAME";
pub const ENV_KEYFILE: &str = "KEYFILE";
pub const ENV_ACCESS_TOKEN: &str = "DIALOGFLOW_ACCESS_TOKEN";
pub const ENV_API_ENDPOINT: &str = "API_ENDPOINT";

/// YAML file layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub agent: Option<String>,
    pub api_endpoint: Option<String>,
    pub keyfile: Option<PathBuf>,
    pub flow: Option<String>,
    pub language_code: Option<String>,
    #[serde(default)]
    pub pages: bool,
}

/// Flags given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub pages: bool,
    pub flow: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    AccessToken(String),
    KeyFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host the v3 REST paths are appended to.
    pub base_url: String,
    pub language_code: Option<String>,
    pub credentials: Credentials,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub sync: SyncConfig,
    pub client: ClientConfig,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// A bare host becomes `https://host`; full URLs are kept (minus a trailing slash).
pub fn base_url(api_endpoint: &str) -> String {
    let endpoint = api_endpoint.trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    let file: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(file)
}

/// Builds the run configuration. `path` is the optional YAML file.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<CliConfig> {
    let file = match path {
        Some(path) => read_file_config(path)?,
        None => FileConfig::default(),
    };

    let agent = env_var(ENV_PROJECT_NAME)
        .or(file.agent)
        .with_context(|| {
            error!("No agent configured");
            format!("{ENV_PROJECT_NAME} environment variable not set and no `agent` in config file")
        })?;

    let credentials = match (env_var(ENV_ACCESS_TOKEN), env_var(ENV_KEYFILE).map(PathBuf::from).or(file.keyfile)) {
        (Some(token), _) => {
            info!("{ENV_ACCESS_TOKEN} found in env");
            Credentials::AccessToken(token)
        }
        (None, Some(keyfile)) => {
            info!(keyfile = %keyfile.display(), "Using service account key file");
            Credentials::KeyFile(keyfile)
        }
        (None, None) => {
            error!("No credentials configured");
            anyhow::bail!(
                "no credentials: set {ENV_ACCESS_TOKEN} or {ENV_KEYFILE} (or `keyfile` in the config file)"
            );
        }
    };

    let api_endpoint = env_var(ENV_API_ENDPOINT)
        .or(file.api_endpoint)
        .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

    let sync = SyncConfig {
        agent,
        flow: overrides.flow.or(file.flow),
        upload_pages: overrides.pages || file.pages,
    };
    sync.trace_loaded();

    let client = ClientConfig {
        base_url: base_url(&api_endpoint),
        language_code: file.language_code,
        credentials,
    };
    info!(base_url = %client.base_url, language_code = ?client.language_code, "Config loaded and merged successfully");

    Ok(CliConfig { sync, client })
}
