//! Tagged display names: how a remote record remembers which local record it came from.
//!
//! Dialogflow CX assigns its own opaque resource names, so the local Voiceflow key is
//! embedded in the remote display name as `name__key-vf`. Intents carry the key as a
//! label instead (see [`INTENT_ID_LABEL`]), which keeps their display names untouched.

use regex::Regex;
use std::sync::LazyLock;

/// Suffix marker appended to every tagged display name.
pub const TAG: &str = "vf";

/// Intent label key holding the Voiceflow intent key.
pub const INTENT_ID_LABEL: &str = "vf_intent_id";

/// Regional endpoint used when none is configured.
pub const DEFAULT_API_ENDPOINT: &str = "us-central1-dialogflow.googleapis.com";

/// Id of the start flow every Dialogflow CX agent is created with.
pub const DEFAULT_START_FLOW_ID: &str = "00000000-0000-0000-0000-000000000000";

static TAGGED_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(.*)__([^-]*)-{TAG}$")).expect("tagged name pattern is valid")
});

/// A display name split back into its local name and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedName {
    pub name: String,
    pub id: String,
}

pub fn build_tagged_name(name: &str, id: &str) -> String {
    format!("{name}__{id}-{TAG}")
}

/// Returns `None` for display names that were not produced by [`build_tagged_name`].
pub fn parse_tagged_name(full_name: &str) -> Option<TaggedName> {
    let captures = TAGGED_NAME_PATTERN.captures(full_name)?;
    Some(TaggedName {
        name: captures[1].to_string(),
        id: captures[2].to_string(),
    })
}
