//! CopyGuard configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CopyGuardError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyGuardConfig {
    /// Shared API key, used when a section does not set its own.
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

impl Default for CopyGuardConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            vision: VisionConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }
}

impl CopyGuardConfig {
    /// Load config from the default path (~/.copyguard/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CopyGuardError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CopyGuardError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the given path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CopyGuardError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the CopyGuard home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".copyguard")
    }

    /// API key for a section: section key, then the shared key, else empty.
    pub fn key_for<'a>(&'a self, section_key: &'a str) -> &'a str {
        if !section_key.is_empty() {
            section_key
        } else {
            &self.api_key
        }
    }
}

/// Generative model configuration (product names and classification).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the registry base URL when set.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_provider() -> String { "openai".into() }
fn default_llm_model() -> String { "gpt-4o-mini".into() }
fn default_temperature() -> f32 { 0.1 }
fn default_max_tokens() -> u32 { 1024 }
fn default_llm_timeout() -> u64 { 30 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: String::new(),
            endpoint: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Embedding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Registry provider name, `custom:<url>`, or `local` for the offline hasher.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    /// Vector width of the `local` backend.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_provider() -> String { "openai".into() }
fn default_embedding_model() -> String { "text-embedding-3-small".into() }
fn default_dimensions() -> usize { 384 }
fn default_embedding_timeout() -> u64 { 30 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: String::new(),
            endpoint: String::new(),
            dimensions: default_dimensions(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Vision model used to read text out of images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_vision_provider")]
    pub provider: String,
    #[serde(default = "default_vision_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_vision_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_vision_max_tokens")]
    pub max_tokens: u32,
}

fn bool_true() -> bool { true }
fn default_vision_provider() -> String { "siliconflow".into() }
fn default_vision_model() -> String { "Qwen/Qwen2.5-VL-32B-Instruct".into() }
fn default_vision_timeout() -> u64 { 60 }
fn default_vision_max_tokens() -> u32 { 2000 }

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_vision_provider(),
            model: default_vision_model(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_vision_timeout(),
            max_tokens: default_vision_max_tokens(),
        }
    }
}

impl VisionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Knowledge base configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_index_path")]
    pub index_path: String,
    /// Rule document used by bootstrap and `reload-doc`.
    #[serde(default = "default_rules_document")]
    pub rules_document: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_search_k")]
    pub search_k: usize,
}

fn default_index_path() -> String { "~/.copyguard/knowledge.db".into() }
fn default_rules_document() -> String { "rules.md".into() }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_search_k() -> usize { 10 }

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            rules_document: default_rules_document(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            search_k: default_search_k(),
        }
    }
}

impl KnowledgeConfig {
    /// Index path with `~` expanded.
    pub fn resolved_index_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.index_path).as_ref())
    }

    pub fn resolved_rules_document(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.rules_document).as_ref())
    }
}
