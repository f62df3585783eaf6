//! Provider registry: maps provider names to endpoint configurations.
//!
//! Every remote backend CopyGuard talks to speaks the OpenAI wire format.
//! The unified `OpenAiCompatibleProvider` uses these entries to reach any of them.

/// How to attach auth credentials to requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// No authentication required (local servers).
    None,
}

/// Configuration for a single provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub name: &'static str,
    /// Base URL for the API.
    pub base_url: &'static str,
    /// Path for chat completions endpoint (appended to base_url).
    pub chat_path: &'static str,
    /// Path for the embeddings endpoint (appended to base_url).
    pub embeddings_path: &'static str,
    /// Environment variable names to try for the API key (in order).
    pub env_keys: &'static [&'static str],
    /// How to send auth credentials.
    pub auth_style: AuthStyle,
    /// Environment variable to override the base URL (e.g., OLLAMA_HOST).
    pub base_url_env: Option<&'static str>,
    /// Chat model used when the config leaves it empty.
    pub default_chat_model: &'static str,
    /// Embedding model used when the config leaves it empty.
    pub default_embedding_model: &'static str,
}

// ─── Provider Definitions ────────────────────────────────────────────────────

static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        chat_path: "/chat/completions",
        embeddings_path: "/embeddings",
        env_keys: &["OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: Some("OPENAI_BASE_URL"),
        default_chat_model: "gpt-4o-mini",
        default_embedding_model: "text-embedding-3-small",
    },
    ProviderConfig {
        name: "siliconflow",
        base_url: "https://api.siliconflow.cn/v1",
        chat_path: "/chat/completions",
        embeddings_path: "/embeddings",
        env_keys: &["SILICONFLOW_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: Some("SILICONFLOW_BASE_URL"),
        default_chat_model: "Qwen/Qwen2.5-VL-32B-Instruct",
        default_embedding_model: "BAAI/bge-m3",
    },
    ProviderConfig {
        name: "deepseek",
        base_url: "https://api.deepseek.com/v1",
        chat_path: "/chat/completions",
        embeddings_path: "/embeddings",
        env_keys: &["DEEPSEEK_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
        default_chat_model: "deepseek-chat",
        default_embedding_model: "",
    },
    ProviderConfig {
        name: "ollama",
        base_url: "http://localhost:11434/v1",
        chat_path: "/chat/completions",
        embeddings_path: "/embeddings",
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("OLLAMA_HOST"),
        default_chat_model: "qwen2.5:7b",
        default_embedding_model: "nomic-embed-text",
    },
    ProviderConfig {
        name: "llamacpp",
        base_url: "http://localhost:8080/v1",
        chat_path: "/chat/completions",
        embeddings_path: "/embeddings",
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("LLAMACPP_HOST"),
        default_chat_model: "default",
        default_embedding_model: "default",
    },
];

/// Look up a provider config by name.
pub fn get_provider_config(name: &str) -> Option<&'static ProviderConfig> {
    // Also match aliases
    let lookup = match name {
        "siliconcloud" | "silicon_flow" => "siliconflow",
        "llama.cpp" => "llamacpp",
        other => other,
    };
    PROVIDERS.iter().find(|p| p.name == lookup)
}

/// List all known provider names.
pub fn all_provider_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_with_alias() {
        assert_eq!(get_provider_config("llama.cpp").unwrap().name, "llamacpp");
        assert_eq!(
            get_provider_config("siliconcloud").unwrap().base_url,
            "https://api.siliconflow.cn/v1"
        );
        assert!(get_provider_config("nonexistent").is_none());
    }

    #[test]
    fn test_local_servers_need_no_auth() {
        for name in ["ollama", "llamacpp"] {
            let cfg = get_provider_config(name).unwrap();
            assert_eq!(cfg.auth_style, AuthStyle::None);
            assert!(cfg.env_keys.is_empty());
        }
    }

    #[test]
    fn test_names_unique() {
        let names = all_provider_names();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }
}
