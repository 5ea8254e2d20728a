use serde::{Deserialize, Serialize};

/// A named context template. The description biases translation formality
/// and seeds the prompt for the context generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
}

impl Scenario {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Ordered mapping of scenario name to description.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    entries: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// Built-in scenarios; config may extend or override them.
    pub fn with_defaults() -> Self {
        Self {
            entries: vec![
                Scenario::new("general", "Everyday conversation"),
                Scenario::new("medical", "Medical checkup appointment"),
                Scenario::new("business", "Business meeting with clients"),
                Scenario::new("travel", "Travel, directions and transportation"),
                Scenario::new("academic", "University lecture or seminar"),
            ],
        }
    }

    /// Merge extra scenarios in: same name replaces the description in
    /// place, new names append. Order is preserved.
    pub fn extend(&mut self, extra: impl IntoIterator<Item = Scenario>) {
        for scenario in extra {
            match self.entries.iter_mut().find(|s| s.name == scenario.name) {
                Some(existing) => existing.description = scenario.description,
                None => self.entries.push(scenario),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.entries.iter().find(|s| s.name == name)
    }

    pub fn entries(&self) -> &[Scenario] {
        &self.entries
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ordered_and_lookupable() {
        let catalog = ScenarioCatalog::with_defaults();
        assert_eq!(catalog.entries()[0].name, "general");
        assert_eq!(
            catalog.get("medical").map(|s| s.description.as_str()),
            Some("Medical checkup appointment")
        );
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn extend_replaces_in_place_and_appends() {
        let mut catalog = ScenarioCatalog::with_defaults();
        let before = catalog.entries().len();
        catalog.extend(vec![
            Scenario::new("medical", "Dentist appointment"),
            Scenario::new("legal", "Courtroom hearing"),
        ]);

        assert_eq!(catalog.entries().len(), before + 1);
        assert_eq!(catalog.entries()[1].name, "medical");
        assert_eq!(catalog.entries()[1].description, "Dentist appointment");
        assert_eq!(catalog.entries().last().map(|s| s.name.as_str()), Some("legal"));
    }
}
