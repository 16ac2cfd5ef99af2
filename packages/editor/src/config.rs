use crate::errors::EditorError;
use ontask_document::FontTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_NAVIGATION_PROMPT: &str = "You have unsaved changes. Are you sure you want to leave this page?";

/// Editor settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Undo levels kept (0 = unlimited)
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Repairs allowed per normalization before giving up
    #[serde(default = "default_max_normalize_passes")]
    pub max_normalize_passes: usize,

    /// Confirmation shown when leaving with unsaved changes
    #[serde(default = "default_navigation_prompt")]
    pub navigation_prompt: String,

    /// Extra font name → font stack entries, merged over the built-in table
    #[serde(default)]
    pub fonts: BTreeMap<String, Vec<String>>,
}

fn default_history_depth() -> usize {
    100
}

fn default_max_normalize_passes() -> usize {
    10_000
}

fn default_navigation_prompt() -> String {
    DEFAULT_NAVIGATION_PROMPT.to_string()
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, EditorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Built-in font table with the configured entries merged over it.
    pub fn font_table(&self) -> FontTable {
        let mut table = FontTable::default();
        table.extend(self.fonts.clone());
        table
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: default_history_depth(),
            max_normalize_passes: default_max_normalize_passes(),
            navigation_prompt: default_navigation_prompt(),
            fonts: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "historyDepth": 20,
            "fonts": { "Brand": ["Brand Sans", "Arial", "sans-serif"] }
        }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.history_depth, 20);
        assert_eq!(config.max_normalize_passes, 10_000);
        assert_eq!(config.navigation_prompt, DEFAULT_NAVIGATION_PROMPT);
        assert_eq!(config.font_table().stack("Brand"), "Brand Sans, Arial, sans-serif");
        assert_eq!(config.font_table().stack("Georgia"), "Georgia, serif");
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(EditorConfig::from_json("{"), Err(EditorError::Json(_))));
    }
}
