use serde::{Deserialize, Serialize};

/// One structured rejection reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonEntry {
    pub code: String,
    pub label: String,
}

/// Immutable, versioned snapshot of the rejection reason dictionary.
///
/// Editing the dictionary is a distinct administrative operation that
/// produces a new snapshot with a bumped version; nothing mutates a
/// catalog in place once it is handed to a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCatalog {
    version: u32,
    entries: Vec<ReasonEntry>,
}

impl ReasonCatalog {
    pub fn new(entries: Vec<ReasonEntry>) -> Self {
        Self {
            version: 1,
            entries,
        }
    }

    /// The stock dictionary seeded for new deployments.
    pub fn standard() -> Self {
        Self::new(vec![
            ReasonEntry {
                code: "photo_quality".to_string(),
                label: "Photo quality".to_string(),
            },
            ReasonEntry {
                code: "incomplete_profile".to_string(),
                label: "Incomplete profile".to_string(),
            },
            ReasonEntry {
                code: "rules_violation".to_string(),
                label: "Rules violation".to_string(),
            },
            ReasonEntry {
                code: "duplicate_entry".to_string(),
                label: "Duplicate entry".to_string(),
            },
        ])
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn entries(&self) -> &[ReasonEntry] {
        &self.entries
    }

    pub fn label_for(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.label.as_str())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.label_for(code).is_some()
    }

    /// Produce the next snapshot with a replaced entry set.
    pub fn revise(&self, entries: Vec<ReasonEntry>) -> Self {
        Self {
            version: self.version + 1,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_bumps_the_version_and_leaves_the_original_intact() {
        let original = ReasonCatalog::standard();
        let revised = original.revise(vec![ReasonEntry {
            code: "off_topic".to_string(),
            label: "Off topic".to_string(),
        }]);

        assert_eq!(original.version(), 1);
        assert_eq!(revised.version(), 2);
        assert!(original.contains("photo_quality"));
        assert!(!revised.contains("photo_quality"));
        assert!(revised.contains("off_topic"));
    }

    #[test]
    fn lookup_by_code() {
        let catalog = ReasonCatalog::standard();
        assert_eq!(catalog.label_for("photo_quality"), Some("Photo quality"));
        assert_eq!(catalog.label_for("unknown"), None);
    }
}
