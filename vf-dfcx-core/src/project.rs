//! The Voiceflow project export (`.vf` file) and its loader.
//!
//! Only the parts of the export this importer reads are modelled; unknown fields are
//! ignored. Voiceflow writes `null` for several list fields, so those deserialize to an
//! empty `Vec` rather than failing.

use serde::{Deserialize, Deserializer};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Intents whose names start with this prefix are Voiceflow built-ins.
pub const BUILTIN_INTENT_PREFIX: &str = "VF.";

const TOPIC_DIAGRAM: &str = "TOPIC";
const DIAGRAM_MENU_ITEM: &str = "DIAGRAM";

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("failed to read project file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse project file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct VfProject {
    pub version: Version,
    #[serde(default, deserialize_with = "null_as_default")]
    pub diagrams: HashMap<String, Diagram>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub platform_data: PlatformData,
    #[serde(default, rename = "rootDiagramID")]
    pub root_diagram_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: Vec<Slot>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub intents: Vec<VfIntent>,
}

/// A Voiceflow slot, i.e. an entity. Every input is one comma-separated synonym group
/// whose first element is the canonical value.
#[derive(Debug, Clone, Deserialize)]
pub struct Slot {
    pub key: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VfIntent {
    pub key: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: Vec<IntentInput>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: Vec<IntentSlot>,
}

/// One example utterance. `slots` lists the keys of slots referenced from `text`.
#[derive(Debug, Clone, Deserialize)]
pub struct IntentInput {
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentSlot {
    pub id: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    pub name: String,
    #[serde(default, rename = "type")]
    pub diagram_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub menu_items: Vec<MenuItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(rename = "sourceID")]
    pub source_id: String,
}

/// A sub-topic diagram together with the id it is stored under.
#[derive(Debug, Clone, Copy)]
pub struct SubTopic<'a> {
    pub diagram_id: &'a str,
    pub diagram: &'a Diagram,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Slot {
    /// Synonym groups with surrounding whitespace trimmed and empty entries dropped.
    pub fn synonym_groups(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.inputs
            .iter()
            .map(|input| {
                input
                    .split(',')
                    .map(str::trim)
                    .filter(|synonym| !synonym.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
    }

    /// Canonical value of the first synonym group, used as example text in training phrases.
    pub fn example_value(&self) -> Option<&str> {
        self.synonym_groups().next().and_then(|group| group.first().copied())
    }
}

impl VfIntent {
    pub fn is_builtin(&self) -> bool {
        self.name.starts_with(BUILTIN_INTENT_PREFIX)
    }
}

impl VfProject {
    pub fn slots(&self) -> &[Slot] {
        &self.version.platform_data.slots
    }

    pub fn intents(&self) -> &[VfIntent] {
        &self.version.platform_data.intents
    }

    pub fn slots_by_key(&self) -> HashMap<&str, &Slot> {
        self.slots()
            .iter()
            .map(|slot| (slot.key.as_str(), slot))
            .collect()
    }

    /// Diagrams linked from a topic's menu as nested diagrams, excluding the root diagram.
    /// Ordered by name, then id.
    pub fn sub_topics(&self) -> Vec<SubTopic<'_>> {
        let root = self.version.root_diagram_id.as_deref();
        let referenced: BTreeSet<&str> = self
            .diagrams
            .values()
            .filter(|diagram| diagram.diagram_type.as_deref() == Some(TOPIC_DIAGRAM))
            .flat_map(|diagram| diagram.menu_items.iter())
            .filter(|item| item.item_type == DIAGRAM_MENU_ITEM)
            .map(|item| item.source_id.as_str())
            .filter(|id| Some(*id) != root)
            .collect();

        let mut sub_topics: Vec<SubTopic<'_>> = referenced
            .into_iter()
            .filter_map(|id| match self.diagrams.get_key_value(id) {
                Some((diagram_id, diagram)) => Some(SubTopic {
                    diagram_id: diagram_id.as_str(),
                    diagram,
                }),
                None => {
                    warn!(diagram_id = id, "Sub-topic references a diagram missing from the export");
                    None
                }
            })
            .collect();
        sub_topics.sort_by(|a, b| {
            (a.diagram.name.as_str(), a.diagram_id).cmp(&(b.diagram.name.as_str(), b.diagram_id))
        });
        sub_topics
    }

    pub fn trace_loaded(&self) {
        info!(
            slots = self.slots().len(),
            intents = self.intents().len(),
            diagrams = self.diagrams.len(),
            "Loaded Voiceflow project"
        );
    }
}

/// Reads and parses a `.vf` export.
pub fn load_project<P: AsRef<Path>>(path: P) -> Result<VfProject, ProjectError> {
    let path = path.as_ref();
    info!(project_path = ?path, "Reading Voiceflow project");

    let content = fs::read_to_string(path).map_err(|source| {
        error!(error = ?source, project_path = ?path, "Failed to read project file");
        ProjectError::Read {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let project: VfProject = serde_json::from_str(&content).map_err(|source| {
        error!(error = %source, project_path = ?path, "Failed to parse project file");
        ProjectError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;

    project.trace_loaded();
    Ok(project)
}
