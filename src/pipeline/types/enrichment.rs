use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placeholder text used when the reference data has nothing for a label.
pub const NO_INFORMATION: &str = "no information available";

pub const DESCRIPTION_KEY: &str = "description";
pub const HABITAT_KEY: &str = "habitat";

/// Descriptive facts about a label plus the name shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentInfo {
    pub display_name: String,
    /// Insertion-ordered so prompts and JSON output stay stable.
    pub facts: IndexMap<String, String>,
}

impl EnrichmentInfo {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            facts: IndexMap::new(),
        }
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    /// Minimal record for a lookup miss: the raw label as display name and a single
    /// "no information" description.
    pub fn placeholder(label: &str) -> Self {
        Self::new(label).with_fact(DESCRIPTION_KEY, NO_INFORMATION)
    }

    pub fn fact(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.fact(DESCRIPTION_KEY)
    }
}
