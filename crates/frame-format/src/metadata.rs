use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who the frame is for and when it was worked on. Saved next to the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    /// Free-form notes: client, site, timber species.
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
    /// Never earlier than `created`.
    pub modified: DateTime<Utc>,
}

impl ProjectMetadata {
    /// Metadata for a project started now.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: String::new(),
            created: now,
            modified: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Record an edit at the current time.
    pub fn touch(&mut self) {
        self.modified = Utc::now().max(self.created);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_touch_never_goes_before_created() {
        let mut meta = ProjectMetadata::new("Barn");
        meta.created = Utc::now() + Duration::hours(1);
        meta.touch();
        assert_eq!(meta.modified, meta.created);
    }

    #[test]
    fn test_description_is_optional_on_load() {
        let meta: ProjectMetadata = serde_json::from_str(
            r#"{"name": "Shed", "created": "2024-03-01T08:00:00Z", "modified": "2024-03-02T08:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(meta.name, "Shed");
        assert!(meta.description.is_empty());
        assert!(meta.modified > meta.created);
    }
}
