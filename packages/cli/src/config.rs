use ontask_editor::{EditorConfig, RuleContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "ontask.config.json";

/// OnTask content configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editor settings used when loading content
    #[serde(default)]
    pub editor: EditorConfig,

    /// Rules, parameter types and colours exported by the rules engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Path of the rule context, `explicit` taking precedence over the config.
    pub fn context_path(&self, cwd: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.context.as_ref().map(|context| cwd.join(context)))
    }

    pub fn rule_context(&self, cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<RuleContext> {
        match self.context_path(cwd, explicit) {
            Some(path) => Ok(RuleContext::load(&path)?),
            None => Ok(RuleContext::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "editor": { "historyDepth": 20, "fonts": { "mono": ["Menlo", "monospace"] } },
            "context": "rules/export.json"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.editor.history_depth, 20);
        assert_eq!(config.editor.fonts["mono"], vec!["Menlo", "monospace"]);
        assert_eq!(
            config.context_path(Path::new("/work"), None),
            Some(PathBuf::from("/work/rules/export.json"))
        );
    }

    #[test]
    fn test_explicit_context_wins() {
        let config = Config { context: Some("a.json".to_string()), ..Config::default() };
        assert_eq!(
            config.context_path(Path::new("/work"), Some(Path::new("/tmp/b.json"))),
            Some(PathBuf::from("/tmp/b.json"))
        );
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.editor, EditorConfig::default());
        assert_eq!(config.context, None);
        assert_eq!(config.context_path(Path::new("/work"), None), None);
    }
}
