//! Curated event records.
//!
//! An out-of-core build step pre-parses a set of curated schema
//! definitions and stores them as a JSON blob; this module loads that blob
//! at start and serves lookups.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::{Error, Result};

/// A single curated event payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// The unique full name of the event.
    pub name: String,

    /// The version of this event, allowing schemas to change over time.
    #[serde(default)]
    pub version: String,

    /// The CCL type definition of the event, without annotations.
    pub cue: String,

    /// The JSON schema definition of the event.
    pub schema: Map<String, Json>,

    /// The canonical example event to display in UIs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// All curated events, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    events: Vec<Event>,
}

impl Catalog {
    /// Load a catalog from the generated JSON blob.
    pub fn from_json(encoded: &str) -> Result<Self> {
        let events: Vec<Event> =
            serde_json::from_str(encoded).map_err(|e| Error::Format(e.to_string()))?;
        Ok(Catalog { events })
    }

    pub fn all(&self) -> &[Event] {
        &self.events
    }

    /// The event with the given name, if curated.
    pub fn find(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }
}
