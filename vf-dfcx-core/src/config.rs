use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tagging::DEFAULT_START_FLOW_ID;

/// What a synchronisation run writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Agent resource name, `projects/{p}/locations/{l}/agents/{a}`.
    pub agent: String,
    /// Flow receiving sub-topic pages: a full flow resource name or a bare flow id.
    /// Defaults to the agent's start flow.
    #[serde(default)]
    pub flow: Option<String>,
    /// Whether sub-topics are uploaded as pages at all.
    #[serde(default)]
    pub upload_pages: bool,
}

impl SyncConfig {
    pub fn new(agent: impl Into<String>) -> Self {
        SyncConfig {
            agent: agent.into(),
            flow: None,
            upload_pages: false,
        }
    }

    /// Full resource name of the flow pages are created in.
    pub fn flow_name(&self) -> String {
        match self.flow.as_deref() {
            Some(flow) if flow.contains('/') => flow.to_string(),
            Some(flow_id) => format!("{}/flows/{}", self.agent, flow_id),
            None => format!("{}/flows/{}", self.agent, DEFAULT_START_FLOW_ID),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            agent = %self.agent,
            flow = %self.flow_name(),
            upload_pages = self.upload_pages,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
