//! High-level pipeline: diff a Voiceflow project against a Dialogflow CX agent and create
//! whatever is missing.
//!
//! A run:
//!   - Lists the agent's entity types, intents and (optionally) the target flow's pages,
//!     and recovers which local records they came from (see [`crate::tagging`])
//!   - Creates missing entity types, all requests in flight at once
//!   - Creates missing intents the same way, once the entity types they reference exist
//!   - Optionally creates a page per missing sub-topic
//!
//! Records already on the agent are skipped and listed in the report. Nothing is ever
//! updated or deleted.
//!
//! # Error Handling
//! The first failing list or create call aborts the run with a [`SyncError`]. Requests
//! already in flight for the same collection are dropped; records created before the
//! failure stay on the agent and are skipped on the next run.

use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};

use crate::config::SyncConfig;
use crate::contract::{AgentClient, ClientError};
use crate::project::VfProject;
use crate::tagging::{parse_tagged_name, INTENT_ID_LABEL};
use crate::transform;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to list {collection}: {source}")]
    List {
        collection: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("failed to create {collection} '{display_name}': {source}")]
    Create {
        collection: &'static str,
        display_name: String,
        #[source]
        source: ClientError,
    },
    #[error("created {collection} '{display_name}' but the response has no resource name")]
    MissingName {
        collection: &'static str,
        display_name: String,
    },
}

/// What the agent already holds, keyed by local Voiceflow ids.
#[derive(Debug, Clone, Default)]
pub struct RemoteState {
    /// Keys of intents carrying the `vf_intent_id` label.
    pub intent_keys: HashSet<String>,
    /// Slot key → entity type resource name.
    pub entity_types: HashMap<String, String>,
    /// Diagram ids of sub-topic pages in the target flow. Empty when pages are disabled.
    pub page_ids: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub entity_types: CollectionReport,
    pub intents: CollectionReport,
    /// `None` when page upload was not requested.
    pub pages: Option<CollectionReport>,
}

#[derive(Debug, Default)]
pub struct CollectionReport {
    pub created: Vec<CreatedRecord>,
    /// Display names of local records that already existed.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRecord {
    pub local_id: String,
    pub display_name: String,
    pub remote_name: String,
}

impl RemoteState {
    pub async fn fetch<C>(client: &C, config: &SyncConfig) -> Result<Self, SyncError>
    where
        C: AgentClient + ?Sized,
    {
        let list_intents = async {
            client.list_intents().await.map_err(|source| {
                error!(error = %source, "[SYNC][ERROR] Failed to list intents");
                SyncError::List {
                    collection: "intents",
                    source,
                }
            })
        };
        let list_entity_types = async {
            client.list_entity_types().await.map_err(|source| {
                error!(error = %source, "[SYNC][ERROR] Failed to list entity types");
                SyncError::List {
                    collection: "entity types",
                    source,
                }
            })
        };
        let (intents, entity_types) = futures::try_join!(list_intents, list_entity_types)?;

        let intent_keys: HashSet<String> = intents
            .into_iter()
            .filter_map(|mut intent| intent.labels.remove(INTENT_ID_LABEL))
            .collect();

        let entity_types: HashMap<String, String> = entity_types
            .into_iter()
            .filter_map(|entity_type| {
                let tagged = parse_tagged_name(&entity_type.display_name)?;
                Some((tagged.id, entity_type.name?))
            })
            .collect();

        let page_ids = if config.upload_pages {
            let flow = config.flow_name();
            client
                .list_pages(&flow)
                .await
                .map_err(|source| {
                    error!(error = %source, flow = %flow, "[SYNC][ERROR] Failed to list pages");
                    SyncError::List {
                        collection: "pages",
                        source,
                    }
                })?
                .into_iter()
                .filter_map(|page| parse_tagged_name(&page.display_name).map(|tagged| tagged.id))
                .collect()
        } else {
            HashSet::new()
        };

        info!(
            intents = intent_keys.len(),
            entity_types = entity_types.len(),
            pages = page_ids.len(),
            "[SYNC] Fetched existing records from agent"
        );

        Ok(RemoteState {
            intent_keys,
            entity_types,
            page_ids,
        })
    }
}

fn created_name(
    collection: &'static str,
    display_name: &str,
    name: Option<String>,
) -> Result<String, SyncError> {
    name.ok_or_else(|| {
        error!(collection, display_name, "[SYNC][ERROR] Create response has no resource name");
        SyncError::MissingName {
            collection,
            display_name: display_name.to_string(),
        }
    })
}

/// Creates every local slot the agent does not have yet and records the new entity
/// types in `remote.entity_types`.
pub async fn upload_entities<C>(
    project: &VfProject,
    client: &C,
    remote: &mut RemoteState,
) -> Result<CollectionReport, SyncError>
where
    C: AgentClient + ?Sized,
{
    let mut report = CollectionReport::default();
    let mut pending = Vec::new();

    for slot in project.slots() {
        if remote.entity_types.contains_key(&slot.key) {
            info!(entity = %slot.name, "[SYNC][ENTITY] Skipping entity that already exists on the agent");
            report.skipped.push(slot.name.clone());
        } else {
            pending.push(slot);
        }
    }

    let uploads = pending.into_iter().map(|slot| async move {
        let request = transform::entity_type(slot);
        info!(entity = %slot.name, values = request.entities.len(), "[SYNC][ENTITY] Uploading entity");
        let created = client.create_entity_type(&request).await.map_err(|source| {
            error!(entity = %slot.name, error = %source, "[SYNC][ERROR][ENTITY] create_entity_type failed");
            SyncError::Create {
                collection: "entity type",
                display_name: request.display_name.clone(),
                source,
            }
        })?;
        let remote_name = created_name("entity type", &request.display_name, created.name)?;
        debug!(entity = %slot.name, remote_name = %remote_name, "[SYNC][ENTITY] create_entity_type succeeded");
        Ok::<_, SyncError>(CreatedRecord {
            local_id: slot.key.clone(),
            display_name: request.display_name,
            remote_name,
        })
    });

    report.created = try_join_all(uploads).await?;
    for record in &report.created {
        remote
            .entity_types
            .insert(record.local_id.clone(), record.remote_name.clone());
    }

    Ok(report)
}

/// Creates every non-built-in local intent the agent does not have yet. Parameters
/// resolve against `remote.entity_types`, so entities must be uploaded first.
pub async fn upload_intents<C>(
    project: &VfProject,
    client: &C,
    remote: &RemoteState,
) -> Result<CollectionReport, SyncError>
where
    C: AgentClient + ?Sized,
{
    let local_slots = project.slots_by_key();
    let mut report = CollectionReport::default();
    let mut pending = Vec::new();

    for intent in project.intents() {
        if intent.is_builtin() {
            debug!(intent = %intent.name, "[SYNC][INTENT] Ignoring built-in intent");
        } else if remote.intent_keys.contains(&intent.key) {
            info!(intent = %intent.name, "[SYNC][INTENT] Skipping intent that already exists on the agent");
            report.skipped.push(intent.name.clone());
        } else {
            pending.push(intent);
        }
    }

    let local_slots = &local_slots;
    let uploads = pending.into_iter().map(|intent| async move {
        let request = transform::intent(intent, local_slots, &remote.entity_types);
        info!(
            intent = %intent.name,
            phrases = request.training_phrases.len(),
            parameters = request.parameters.len(),
            "[SYNC][INTENT] Uploading intent"
        );
        let created = client.create_intent(&request).await.map_err(|source| {
            error!(intent = %intent.name, error = %source, "[SYNC][ERROR][INTENT] create_intent failed");
            SyncError::Create {
                collection: "intent",
                display_name: request.display_name.clone(),
                source,
            }
        })?;
        let remote_name = created_name("intent", &request.display_name, created.name)?;
        Ok::<_, SyncError>(CreatedRecord {
            local_id: intent.key.clone(),
            display_name: request.display_name,
            remote_name,
        })
    });

    report.created = try_join_all(uploads).await?;
    Ok(report)
}

/// Creates a page in the configured flow for every sub-topic the flow does not have yet.
pub async fn upload_pages<C>(
    project: &VfProject,
    client: &C,
    remote: &RemoteState,
    config: &SyncConfig,
) -> Result<CollectionReport, SyncError>
where
    C: AgentClient + ?Sized,
{
    let flow = config.flow_name();
    let mut report = CollectionReport::default();
    let mut pending = Vec::new();

    for sub_topic in project.sub_topics() {
        if remote.page_ids.contains(sub_topic.diagram_id) {
            info!(page = %sub_topic.diagram.name, "[SYNC][PAGE] Skipping page that already exists in flow");
            report.skipped.push(sub_topic.diagram.name.clone());
        } else {
            pending.push(sub_topic);
        }
    }

    let flow = flow.as_str();
    let uploads = pending.into_iter().map(|sub_topic| async move {
        let request = transform::page(sub_topic.diagram_id, sub_topic.diagram);
        info!(page = %sub_topic.diagram.name, flow, "[SYNC][PAGE] Uploading page");
        let created = client.create_page(flow, &request).await.map_err(|source| {
            error!(page = %sub_topic.diagram.name, error = %source, "[SYNC][ERROR][PAGE] create_page failed");
            SyncError::Create {
                collection: "page",
                display_name: request.display_name.clone(),
                source,
            }
        })?;
        let remote_name = created_name("page", &request.display_name, created.name)?;
        Ok::<_, SyncError>(CreatedRecord {
            local_id: sub_topic.diagram_id.to_string(),
            display_name: request.display_name,
            remote_name,
        })
    });

    report.created = try_join_all(uploads).await?;
    Ok(report)
}

/// Entrypoint: brings the agent up to date with `project`.
pub async fn synchronise<C>(
    project: &VfProject,
    client: &C,
    config: &SyncConfig,
) -> Result<SynchroniseReport, SyncError>
where
    C: AgentClient + ?Sized,
{
    info!(agent = %config.agent, "[SYNC] Starting synchronisation");
    let mut remote = RemoteState::fetch(client, config).await?;

    let entity_types = upload_entities(project, client, &mut remote).await?;
    info!(
        created = entity_types.created.len(),
        skipped = entity_types.skipped.len(),
        "[SYNC] Entities done"
    );

    let intents = upload_intents(project, client, &remote).await?;
    info!(
        created = intents.created.len(),
        skipped = intents.skipped.len(),
        "[SYNC] Intents done"
    );

    let pages = if config.upload_pages {
        let pages = upload_pages(project, client, &remote, config).await?;
        info!(
            created = pages.created.len(),
            skipped = pages.skipped.len(),
            "[SYNC] Pages done"
        );
        Some(pages)
    } else {
        None
    };

    Ok(SynchroniseReport {
        entity_types,
        intents,
        pages,
    })
}
