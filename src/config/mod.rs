use anyhow::Context;
use config::{Config, FileFormat};
use serde::Deserialize;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_pdf_dir() -> String {
    "docs".to_string()
}

fn default_cache_dir() -> String {
    "cache".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Pre-baked question catalogs ({exam}_questions.json etc.)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Source exam PDFs
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: String,
    /// Per-question extraction cache root
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Built frontend bundle; served with SPA fallback when present
    pub frontend_dir: Option<String>,

    /// Vision model endpoint. All three must be set for extraction to be
    /// available; otherwise the extract endpoints answer 503.
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: Option<String>,
    pub llm_model_name: Option<String>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config: AppConfig = Config::builder()
            .add_source(
                config::File::with_name("application")
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()
            .with_context(|| anyhow::anyhow!("Failed to load config"))?
            .try_deserialize()
            .with_context(|| anyhow::anyhow!("Failed to deserialize config"))?;

        Ok(config)
    }

    /// The three LLM fields, if the endpoint is fully configured.
    pub fn llm_endpoint(&self) -> Option<(&str, &str, &str)> {
        let key = self.llm_api_key.as_deref().filter(|s| !s.trim().is_empty())?;
        let base = self
            .llm_api_base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        let model = self
            .llm_model_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        Some((key, base, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            pdf_dir: default_pdf_dir(),
            cache_dir: default_cache_dir(),
            frontend_dir: None,
            llm_api_key: Some("key".into()),
            llm_api_base_url: Some("https://example.com/v1".into()),
            llm_model_name: Some("gpt-4o".into()),
        }
    }

    #[test]
    fn blank_llm_field_means_no_endpoint() {
        let mut config = base_config();
        config.llm_api_base_url = Some("   ".into());
        assert!(config.llm_endpoint().is_none());
    }

    #[test]
    fn full_llm_config_yields_endpoint() {
        let config = base_config();
        let (key, base, model) = config.llm_endpoint().expect("endpoint");
        assert_eq!(key, "key");
        assert_eq!(base, "https://example.com/v1");
        assert_eq!(model, "gpt-4o");
    }
}
