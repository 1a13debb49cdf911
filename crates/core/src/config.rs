//! Runtime configuration, injected into the pipeline at startup.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default chat-completion endpoint.
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default chat model.
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding uploaded templates.
    pub upload_dir: PathBuf,

    /// Directory receiving generated presentations.
    pub output_dir: PathBuf,

    /// Accepted template extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,

    /// Files older than this many seconds are removed by the cleanup sweep.
    pub max_file_age_secs: u64,

    /// Chat-completion service settings.
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("generated"),
            allowed_extensions: vec!["pptx".to_string(), "potx".to_string()],
            max_file_age_secs: 3600,
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file. Missing keys take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Maximum age of generated and uploaded files.
    pub fn max_file_age(&self) -> Duration {
        Duration::from_secs(self.max_file_age_secs)
    }

    /// Directories scanned by the cleanup sweep.
    pub fn cleanup_dirs(&self) -> Vec<PathBuf> {
        vec![self.upload_dir.clone(), self.output_dir.clone()]
    }

    /// Whether a template path has one of the accepted extensions.
    pub fn is_allowed_template(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }
}

/// Chat-completion service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,

    /// Model name sent with each request.
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert_eq!(config.max_file_age(), Duration::from_secs(3600));
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.cleanup_dirs().len(), 2);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            AppConfig::from_json(r#"{"output_dir": "out", "llm": {"model": "gpt-4o-mini"}}"#)
                .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.endpoint, DEFAULT_LLM_ENDPOINT);
    }

    #[test]
    fn test_invalid_json() {
        let err = AppConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_file_age_secs": 60}}"#).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_file_age(), Duration::from_secs(60));

        let missing = AppConfig::from_file(Path::new("/nonexistent/slidegen.json"));
        assert!(matches!(missing, Err(Error::Config(_))));
    }

    #[test]
    fn test_allowed_template() {
        let config = AppConfig::default();
        assert!(config.is_allowed_template(Path::new("deck.pptx")));
        assert!(config.is_allowed_template(Path::new("Theme.POTX")));
        assert!(!config.is_allowed_template(Path::new("legacy.ppt")));
        assert!(!config.is_allowed_template(Path::new("noext")));
    }
}
