//! Local Voiceflow records → Dialogflow CX create requests.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::project::{Diagram, IntentInput, Slot, VfIntent};
use crate::remote::{Entity, EntityKind, EntityType, Intent, IntentParameter, Page, Part, TrainingPhrase};
use crate::tagging::{build_tagged_name, INTENT_ID_LABEL};
use crate::utterance::{segment_with_source, Segment};

/// System entity used for parameters whose slot has no entity type on the agent.
pub const FALLBACK_ENTITY_TYPE: &str = "@sys.any";

pub fn entity_type(slot: &Slot) -> EntityType {
    EntityType {
        name: None,
        display_name: build_tagged_name(&slot.name, &slot.key),
        kind: EntityKind::KindMap,
        entities: slot
            .synonym_groups()
            .map(|group| Entity {
                value: group[0].to_string(),
                synonyms: group.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    }
}

/// Builds the create request for `intent`.
///
/// `local_slots` resolves slot keys to slots; `remote_entity_types` maps slot keys to the
/// entity type resource names already present on the agent. Only slots the intent
/// declares become parameters, and only those are annotated in training phrases.
pub fn intent(
    intent: &VfIntent,
    local_slots: &HashMap<&str, &Slot>,
    remote_entity_types: &HashMap<String, String>,
) -> Intent {
    let mut declared = HashMap::new();
    let parameters = intent
        .slots
        .iter()
        .filter_map(|intent_slot| {
            let Some(slot) = local_slots.get(intent_slot.id.as_str()).copied() else {
                warn!(intent = %intent.name, slot_key = %intent_slot.id, "Intent references unknown slot, parameter skipped");
                return None;
            };
            declared.insert(slot.key.as_str(), slot);
            let entity_type = match remote_entity_types.get(&slot.key) {
                Some(name) => name.clone(),
                None => {
                    warn!(intent = %intent.name, slot = %slot.name, fallback = FALLBACK_ENTITY_TYPE, "No entity type on the agent for slot");
                    FALLBACK_ENTITY_TYPE.to_string()
                }
            };
            Some(IntentParameter {
                id: slot.name.clone(),
                entity_type,
                is_list: false,
            })
        })
        .collect();

    Intent {
        name: None,
        display_name: intent.name.clone(),
        training_phrases: intent
            .inputs
            .iter()
            .map(|input| training_phrase(input, &declared, local_slots))
            .collect(),
        parameters,
        labels: BTreeMap::from([(INTENT_ID_LABEL.to_string(), intent.key.clone())]),
    }
}

/// One training phrase per utterance. Inputs that declare no slot references are sent
/// verbatim as a single part.
///
/// A marker becomes an annotated part only when its slot is in `declared`. A marker for
/// a project slot the intent does not declare is replaced by that slot's example value,
/// and any other marker stays in the phrase as written.
pub fn training_phrase(
    input: &IntentInput,
    declared: &HashMap<&str, &Slot>,
    local_slots: &HashMap<&str, &Slot>,
) -> TrainingPhrase {
    let parts = if input.slots.is_empty() {
        vec![Part::text(&input.text)]
    } else {
        segment_with_source(&input.text)
            .into_iter()
            .map(|(segment, source)| match segment {
                Segment::Text(text) => Part::text(text),
                Segment::Param { id, .. } => {
                    if let Some(slot) = declared.get(id.as_str()) {
                        Part::parameter(&slot.name, slot.example_value().unwrap_or(slot.name.as_str()))
                    } else if let Some(slot) = local_slots.get(id.as_str()) {
                        debug!(slot = %slot.name, utterance = %input.text, "Slot not declared by intent, marker kept as text");
                        Part::text(slot.example_value().unwrap_or(source))
                    } else {
                        Part::text(source)
                    }
                }
            })
            .collect()
    };

    TrainingPhrase {
        id: None,
        parts,
        repeat_count: 1,
    }
}

pub fn page(diagram_id: &str, diagram: &Diagram) -> Page {
    Page {
        name: None,
        display_name: build_tagged_name(&diagram.name, diagram_id),
    }
}
