//! # contract: the remote agent as seen by the synchronisation pipeline
//!
//! [`AgentClient`] is the single seam between the pipeline and Dialogflow CX. The CLI
//! crate implements it over HTTP; tests use the generated [`MockAgentClient`].
//!
//! ## Contract
//! - List calls return the complete collection. Implementors follow `nextPageToken`
//!   until it runs out.
//! - Create calls return the created resource, including its server-assigned `name`.
//! - Every error is a boxed trait object; the pipeline only logs and propagates them.
//! - The agent being written to is fixed at construction time; flows are passed
//!   explicitly because pages live under a flow, not under the agent.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::remote::{EntityType, Intent, Page};

/// Error type for [`AgentClient`] (simple boxed error).
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// Read and create access to one Dialogflow CX agent.
///
/// The trait is `Send` + `Sync` so creation requests can be fired concurrently from a
/// shared reference.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// List every entity type of the agent.
    async fn list_entity_types(&self) -> Result<Vec<EntityType>, ClientError>;

    /// List every intent of the agent.
    async fn list_intents(&self) -> Result<Vec<Intent>, ClientError>;

    /// List every page of `flow` (a full flow resource name).
    async fn list_pages(&self, flow: &str) -> Result<Vec<Page>, ClientError>;

    async fn create_entity_type(&self, entity_type: &EntityType)
        -> Result<EntityType, ClientError>;

    async fn create_intent(&self, intent: &Intent) -> Result<Intent, ClientError>;

    /// Create `page` inside `flow`.
    async fn create_page(&self, flow: &str, page: &Page) -> Result<Page, ClientError>;
}
