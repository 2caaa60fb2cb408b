use super::EnrichmentProvider;
use crate::error::DependencyError;
use crate::pipeline::types::{DESCRIPTION_KEY, EnrichmentInfo, HABITAT_KEY};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// One reference record. `translated_name` is optional; the raw label is shown without it.
#[derive(Debug, Clone)]
struct AnimalRecord {
    translated_name: Option<String>,
    description: String,
    habitat: Option<String>,
}

/// In-memory fact table with Korean display names.
#[derive(Debug, Clone, Default)]
pub struct StaticEnrichmentProvider {
    records: HashMap<String, AnimalRecord>,
}

impl StaticEnrichmentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_animal(
        mut self,
        label: &str,
        translated_name: Option<&str>,
        description: &str,
        habitat: Option<&str>,
    ) -> Self {
        self.records.insert(
            normalize_label(label),
            AnimalRecord {
                translated_name: translated_name.map(str::to_string),
                description: description.to_string(),
                habitat: habitat.map(str::to_string),
            },
        );
        self
    }

    /// The reference table covering the base class list.
    pub fn with_default_animals() -> Self {
        Self::new()
            .with_animal(
                "dog",
                Some("개"),
                "The most familiar companion animal; loyal, with a great many breeds.",
                Some("homes, wild"),
            )
            .with_animal(
                "cat",
                Some("고양이"),
                "An independent yet affectionate companion with a strong hunting instinct.",
                Some("homes, wild"),
            )
            .with_animal(
                "lion",
                Some("사자"),
                "Called the king of beasts and a symbol of the wild.",
                Some("savanna"),
            )
            .with_animal(
                "tiger",
                Some("호랑이"),
                "A powerful predator with striking striped fur.",
                Some("forests"),
            )
            .with_animal(
                "bear",
                Some("곰"),
                "Large and strong, and known for hibernating through winter.",
                Some("forests, mountains"),
            )
            .with_animal(
                "horse",
                Some("말"),
                "Fast and graceful, a long-time partner of people.",
                Some("grasslands"),
            )
            .with_animal(
                "panda",
                Some("판다"),
                "A bamboo eater famous for its relaxed temperament.",
                Some("bamboo forests"),
            )
            .with_animal(
                "fox",
                Some("여우"),
                "Clever and nimble, recognised by its red fur and pointed ears.",
                Some("forests, fields"),
            )
            .with_animal(
                "rabbit",
                Some("토끼"),
                "Soft and quick; it prefers grasses over carrots.",
                Some("meadows"),
            )
            .with_animal(
                "deer",
                Some("사슴"),
                "A graceful, agile herbivore; many species grow beautiful antlers.",
                Some("forests"),
            )
            .with_animal(
                "wolf",
                Some("늑대"),
                "A social, cooperative animal that draws its strength from the pack.",
                Some("forests, tundra"),
            )
            .with_animal(
                "monkey",
                Some("원숭이"),
                "Clever and playful, and an expert climber.",
                Some("tropical forests"),
            )
            .with_animal(
                "elephant",
                Some("코끼리"),
                "The largest land animal, with a remarkable memory.",
                Some("savanna, forests"),
            )
            .with_animal(
                "giraffe",
                Some("기린"),
                "The animal with the longest neck, browsing the highest leaves.",
                Some("savanna"),
            )
            .with_animal(
                "zebra",
                Some("얼룩말"),
                "A grazer whose stripe pattern is unique to each individual.",
                Some("savanna"),
            )
            .with_animal(
                "penguin",
                Some("펭귄"),
                "A flightless bird and an excellent swimmer.",
                Some("southern oceans"),
            )
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl EnrichmentProvider for StaticEnrichmentProvider {
    async fn lookup(&self, label: &str) -> Result<Option<EnrichmentInfo>, DependencyError> {
        let key = normalize_label(label);
        let Some(record) = self.records.get(&key) else {
            debug!("No reference record for '{}'", key);
            return Ok(None);
        };

        let display_name = record
            .translated_name
            .clone()
            .unwrap_or_else(|| label.to_string());
        let mut info =
            EnrichmentInfo::new(display_name).with_fact(DESCRIPTION_KEY, &record.description);
        if let Some(habitat) = &record.habitat {
            info = info.with_fact(HABITAT_KEY, habitat);
        }
        Ok(Some(info))
    }

    fn name(&self) -> &'static str {
        "StaticEnrichmentProvider"
    }
}

/// Lower-cases, trims and drops a leading "a " article ("A Dog " -> "dog").
pub fn normalize_label(label: &str) -> String {
    let lowered = label.trim().to_lowercase();
    match lowered.strip_prefix("a ") {
        Some(rest) => rest.trim_start().to_string(),
        None => lowered,
    }
}
