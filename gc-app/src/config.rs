//! geminichat configuration loader.
//!
//! Read once at startup: `.env`, then the TOML file, then environment
//! overrides. CLI flags are applied by the caller.

use gc_llm::{ChatClient, ClientConfig, DEFAULT_MODEL, ToolDefinition};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// JSON array of tool definitions.
    #[serde(default)]
    pub tools_file: Option<PathBuf>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            tools_file: None,
        }
    }
}

impl AppConfig {
    /// A missing file is only an error when the path was given explicitly.
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<(Self, PathBuf)> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(default_config_path);

        let mut cfg = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::parse(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                tracing::debug!(config_path = %path.display(), "no config file; using defaults");
                Self::default()
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok((cfg, path))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty(gc_llm::API_KEY_ENV) {
            self.gemini.api_key = Some(v);
        }
        if let Some(v) = non_empty("GEMINICHAT_MODEL") {
            self.gemini.model = v;
        }
        if let Some(v) = non_empty("GEMINICHAT_BASE_URL") {
            self.gemini.base_url = Some(v);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gemini.model.trim().is_empty() {
            return Err(anyhow::anyhow!("gemini.model is required"));
        }
        if let Some(url) = self.gemini.base_url.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!(
                    "gemini.base_url must start with http:// or https://, got {url:?}"
                ));
            }
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.gemini
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    pub async fn load_tools(&self) -> anyhow::Result<Vec<ToolDefinition>> {
        let Some(path) = self.gemini.tools_file.as_deref() else {
            return Ok(Vec::new());
        };
        load_tools_file(&expand_home(path)).await
    }

    /// `cli_key` wins over the configured (file or env) key.
    pub fn client_config(
        &self,
        cli_key: Option<&str>,
        tools: Vec<ToolDefinition>,
    ) -> anyhow::Result<ClientConfig> {
        let mut client = ClientConfig::resolve(cli_key, self.gemini.api_key.as_deref(), tools)?
            .with_model(self.gemini.model.clone());
        if let Some(url) = self.gemini.base_url.as_deref() {
            client = client.with_base_url(url);
        }
        Ok(client)
    }

    pub async fn build_client(&self, cli_key: Option<&str>) -> anyhow::Result<ChatClient> {
        let tools = self.load_tools().await?;
        Ok(ChatClient::new(self.client_config(cli_key, tools)?))
    }
}

pub async fn load_tools_file(path: &Path) -> anyhow::Result<Vec<ToolDefinition>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("read tools file {}: {e}", path.display()))?;
    gc_llm::load_tool_definitions(&contents)
        .map_err(|e| anyhow::anyhow!("tools file {}: {e}", path.display()))
}

/// Loads `.env` from the working directory; a missing file is fine.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(%e, "failed to load .env"),
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

pub fn default_config_path() -> PathBuf {
    home_dir().join(".geminichat").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("geminichat-config-{name}-{}", Uuid::new_v4()))
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = AppConfig::parse("").expect("empty config parses");
        assert_eq!(cfg.gemini.model, DEFAULT_MODEL);
        assert!(cfg.gemini.api_key.is_none());
        assert!(!cfg.has_api_key());
    }

    #[test]
    fn file_values_are_read() {
        let cfg = AppConfig::parse(
            r#"
            [gemini]
            model = "gemini-1.5-flash"
            api_key = "from-file"
            base_url = "http://localhost:9000/v1beta"
            tools_file = "/tmp/tools.json"
            "#,
        )
        .expect("config parses");
        assert_eq!(cfg.gemini.model, "gemini-1.5-flash");
        assert_eq!(cfg.gemini.api_key.as_deref(), Some("from-file"));
        assert_eq!(cfg.gemini.tools_file, Some(PathBuf::from("/tmp/tools.json")));
        cfg.validate().expect("valid");
    }

    #[test]
    fn env_overrides_win_and_blank_values_are_ignored() {
        let mut cfg = AppConfig::parse("[gemini]\napi_key = \"from-file\"\nmodel = \"m1\"")
            .expect("config parses");
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "from-env"),
            ("GEMINICHAT_MODEL", "  "),
            ("GEMINICHAT_BASE_URL", "https://proxy.example/v1beta"),
        ]
        .into_iter()
        .collect();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.gemini.api_key.as_deref(), Some("from-env"));
        assert_eq!(cfg.gemini.model, "m1");
        assert_eq!(
            cfg.gemini.base_url.as_deref(),
            Some("https://proxy.example/v1beta")
        );
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.gemini.model = " ".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.gemini.base_url = Some("ftp://nope".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cli_key_beats_configured_key() {
        let mut cfg = AppConfig::default();
        cfg.gemini.api_key = Some("configured".to_string());
        cfg.gemini.model = "gemini-1.5-flash".to_string();

        let client = cfg.client_config(Some("cli"), Vec::new()).expect("resolves");
        assert_eq!(client.api_key(), "cli");
        assert_eq!(client.model(), "gemini-1.5-flash");

        let client = cfg.client_config(None, Vec::new()).expect("resolves");
        assert_eq!(client.api_key(), "configured");
    }

    #[test]
    fn no_key_anywhere_fails() {
        let err = AppConfig::default()
            .client_config(None, Vec::new())
            .expect_err("no key");
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn tilde_paths_expand_to_home() {
        let expanded = expand_home(Path::new("~/tools.json"));
        assert!(expanded.ends_with("tools.json"));
        assert!(!expanded.starts_with("~"));
        assert_eq!(
            expand_home(Path::new("/abs/tools.json")),
            PathBuf::from("/abs/tools.json")
        );
    }

    #[tokio::test]
    async fn explicit_missing_file_is_an_error() {
        let path = temp_path("missing").join("config.toml");
        assert!(AppConfig::load(Some(path)).await.is_err());
    }

    #[tokio::test]
    async fn tools_file_is_loaded() {
        let dir = temp_path("tools");
        tokio::fs::create_dir_all(&dir).await.expect("mkdir");
        let tools_path = dir.join("tools.json");
        tokio::fs::write(
            &tools_path,
            r#"[{"name":"get_weather","description":"weather","parameters":{"type":"OBJECT"}}]"#,
        )
        .await
        .expect("write tools");

        let mut cfg = AppConfig::default();
        cfg.gemini.tools_file = Some(tools_path);
        let tools = cfg.load_tools().await.expect("tools load");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "get_weather");

        let _ = std::fs::remove_dir_all(dir);
    }
}
