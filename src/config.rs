//! Configuration management for chatbot-compare

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CompareError, Result};
use crate::llm::Source;
use crate::scoring::ScoringStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upstream model settings, keyed by source ("gemini", "cypher", "deepseek")
    pub providers: HashMap<String, ProviderConfig>,

    /// Answer aggregation settings
    pub panel: PanelConfig,

    /// UI preferences
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API endpoint URL
    pub endpoint: String,

    /// API key (can be env var reference like $GEMINI_API_KEY)
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Whether this provider is queried
    pub enabled: bool,

    /// Max tokens for responses
    pub max_tokens: Option<u32>,

    /// Temperature setting
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Provider that writes the merged answer
    pub synthesizer: Source,

    /// How the agreement score is computed
    pub strategy: ScoringStrategy,

    /// Per-call timeout, applied to each of the four upstream calls
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Draw the agreement bar under the merged answer
    pub show_bar: bool,

    /// Title shown at the top of the screen
    pub title: String,
}

impl PanelConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();

        providers.insert(
            Source::Gemini.key().to_string(),
            ProviderConfig {
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key: "$GEMINI_API_KEY".to_string(),
                model: "gemini-2.5-flash".to_string(),
                enabled: true,
                max_tokens: None,
                temperature: None,
            },
        );

        providers.insert(
            Source::Cypher.key().to_string(),
            ProviderConfig {
                endpoint: "https://openrouter.ai/api/v1".to_string(),
                api_key: "$OPENROUTER_API_KEY".to_string(),
                model: "openrouter/cypher-alpha:free".to_string(),
                enabled: true,
                max_tokens: None,
                temperature: None,
            },
        );

        providers.insert(
            Source::DeepSeek.key().to_string(),
            ProviderConfig {
                endpoint: "https://api.together.xyz/v1".to_string(),
                api_key: "$TOGETHER_API_KEY".to_string(),
                model: "deepseek-ai/DeepSeek-V3".to_string(),
                enabled: true,
                max_tokens: None,
                temperature: None,
            },
        );

        Self {
            providers,
            panel: PanelConfig {
                synthesizer: Source::Gemini,
                strategy: ScoringStrategy::Exact,
                request_timeout_secs: 60,
            },
            ui: UiConfig {
                show_bar: true,
                title: "Chatbot Response Comparator".to_string(),
            },
        }
    }
}

impl Config {
    /// Load config from file or create default
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatbot-compare")
            .join("config.toml")
    }

    /// Reject provider keys outside the fixed source set and zero timeouts.
    pub fn validate(&self) -> Result<()> {
        for key in self.providers.keys() {
            if Source::from_key(key).is_none() {
                return Err(CompareError::UnknownProvider(key.clone()));
            }
        }
        if self.panel.request_timeout_secs == 0 {
            return Err(CompareError::Config(
                "panel.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn provider(&self, source: Source) -> Option<&ProviderConfig> {
        self.providers.get(source.key())
    }

    /// Resolve API key from config (handles env var references)
    pub fn resolve_api_key(&self, source: Source) -> Option<String> {
        self.provider(source).and_then(|p| {
            if let Some(var) = p.api_key.strip_prefix('$') {
                std::env::var(var).ok().filter(|v| !v.is_empty())
            } else if p.api_key.is_empty() {
                None
            } else {
                Some(p.api_key.clone())
            }
        })
    }
}
