//! Knowledge record type

use serde::{Deserialize, Serialize};

/// Placeholder used in the catalogue for unset optional fields
pub const NOT_APPLICABLE: &str = "N/A";

/// One upgrade incompatibility and what a diagnosis run learned about it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// Unique identifier
    pub id: String,
    /// Client project name (also its checkout directory name)
    #[serde(default)]
    pub client: String,
    /// Clone URL of the client project
    #[serde(default)]
    pub url: String,
    /// Commit the client is pinned to
    #[serde(default)]
    pub sha: String,
    /// Upgraded library as `groupId:artifactId`
    #[serde(default)]
    pub lib: String,
    /// Library version the client builds with
    #[serde(default)]
    pub old: String,
    /// Library version that breaks the build
    #[serde(default)]
    pub new: String,
    /// Failing test, `Class` or `Class#method`
    #[serde(default)]
    pub test: String,
    /// Maven module to test in, or `N/A`
    #[serde(default = "not_applicable")]
    pub submodule: String,
    /// Custom test command, or `N/A`
    #[serde(default = "not_applicable")]
    pub test_cmd: String,
    /// Source file named by the located stack frame
    #[serde(default)]
    pub file_name: String,
    /// Line number named by the located stack frame
    #[serde(default)]
    pub line_no: String,
    /// Exception type
    #[serde(default)]
    pub exception: String,
    /// Exception message
    #[serde(default)]
    pub exception_info: String,
    /// Fields this tool doesn't interpret, kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn not_applicable() -> String {
    NOT_APPLICABLE.to_string()
}

fn applicable(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value == NOT_APPLICABLE {
        None
    } else {
        Some(value)
    }
}

impl KnowledgeRecord {
    /// Create a record with only an identifier
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            submodule: not_applicable(),
            test_cmd: not_applicable(),
            ..Default::default()
        }
    }

    /// Maven module to run tests in, if any
    pub fn submodule(&self) -> Option<&str> {
        applicable(&self.submodule)
    }

    /// Custom test command, if any
    pub fn test_cmd(&self) -> Option<&str> {
        applicable(&self.test_cmd)
    }

    /// Split `lib` into group and artifact ids
    pub fn lib_coordinates(&self) -> Option<(&str, &str)> {
        let (group, artifact) = self.lib.split_once(':')?;
        let artifact = artifact.split(':').next().unwrap_or(artifact);
        Some((group, artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let record: KnowledgeRecord = serde_json::from_str(r#"{"id": "7"}"#).unwrap();
        assert_eq!(record.id, "7");
        assert_eq!(record.submodule(), None);
        assert_eq!(record.test_cmd(), None);
        assert!(record.exception.is_empty());
    }

    #[test]
    fn test_unknown_fields_survive() {
        let json = r#"{"id": "7", "client": "jackson", "stars": 12, "notes": ["a"]}"#;
        let record: KnowledgeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.extra["stars"], 12);

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["notes"][0], "a");
        assert_eq!(back["client"], "jackson");
    }

    #[test]
    fn test_lib_coordinates() {
        let mut record = KnowledgeRecord::new("1");
        record.lib = "com.google.guava:guava".to_string();
        assert_eq!(record.lib_coordinates(), Some(("com.google.guava", "guava")));

        record.lib = "guava".to_string();
        assert_eq!(record.lib_coordinates(), None);
    }

    #[test]
    fn test_submodule() {
        let mut record = KnowledgeRecord::new("1");
        record.submodule = "core".to_string();
        assert_eq!(record.submodule(), Some("core"));
    }
}
