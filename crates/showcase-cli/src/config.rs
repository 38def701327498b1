use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use showcase_core::providers::DEFAULT_BASE_URL;
use showcase_core::{ModelDescriptor, ModelRegistry};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShowcaseConfig {
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Extra catalog entries appended after the built-in models
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

// ── Hub Config ──────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("token", &mask_secret(&self.token))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_base_url(),
        }
    }
}

// ── Chat Config ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub default_model: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub welcome_message: String,
}

fn default_chat_model() -> String {
    "deepseek-ai/DeepSeek-R1-0528".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_chat_model(),
            system_prompt: String::new(),
            welcome_message: String::new(),
        }
    }
}

// ── Gateway Config ──────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth_token: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind", &self.bind)
            .field("auth_token", &mask_secret(&self.auth_token))
            .finish()
    }
}

fn default_gateway_bind() -> String {
    "127.0.0.1:8787".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            auth_token: String::new(),
        }
    }
}

/// Mask a secret for display: first 3 and last 4 chars when longer than 7,
/// otherwise "***"
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".showcase")
}

impl ShowcaseConfig {
    /// Load from `custom_path`, or `~/.showcase/config.toml`.
    ///
    /// A missing default file is not an error: defaults apply. An empty hub
    /// token falls back to `HF_TOKEN`.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        let mut config = if custom_path.is_none() && !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            Self::default()
        } else {
            Self::load_file(&path)?
        };

        if config.hub.token.is_empty() {
            config.hub.token = std::env::var("HF_TOKEN").unwrap_or_default();
        }
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        // The file may hold tokens; refuse it if group or other can read it
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `showcase init` first.",
                path.display()
            )
        })?;
        Self::parse(&content).with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Parse TOML after expanding allowlisted `${VAR}` references
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;

        if config.hub.token.starts_with("hf_") && content.contains(&config.hub.token) {
            warn!(
                "Hugging Face token is hardcoded in config file. For security, use environment variables: token = \"${{HF_TOKEN}}\""
            );
        }
        if !config.gateway.auth_token.is_empty() && content.contains(&config.gateway.auth_token) {
            warn!(
                "Gateway token is hardcoded in config file. For security, use environment variables: auth_token = \"${{SHOWCASE_GATEWAY_TOKEN}}\""
            );
        }
        Ok(config)
    }

    /// Built-in catalog plus the `[[models]]` entries
    pub fn registry(&self) -> Result<ModelRegistry> {
        ModelRegistry::builtin_with(self.models.clone()).context("Invalid [[models]] entry in config")
    }

    /// Copy with every secret masked, for display
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        masked.hub.token = mask_secret(&self.hub.token);
        masked.gateway.auth_token = mask_secret(&self.gateway.auth_token);
        masked
    }
}

/// Environment variables that may be expanded in config files.
/// Anything else is left as written so the config cannot read arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &["HF_TOKEN", "SHOWCASE_GATEWAY_TOKEN"];

fn expand_env_vars(s: &str) -> String {
    expand_with(s, |name| std::env::var(name).ok())
}

fn expand_with(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 2..start + len];
        out.push_str(&rest[..start]);
        if ALLOWED_ENV_VARS.contains(&name) {
            out.push_str(&lookup(name).unwrap_or_default());
        } else {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                name
            );
            out.push_str(&rest[start..=start + len]);
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use showcase_core::{InputType, ModelCategory};

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HF_TOKEN" => Some("hf_from_env".to_string()),
            "SHOWCASE_GATEWAY_TOKEN" => Some("gw".to_string()),
            "HOME" => Some("/home/x".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_allowlisted_vars() {
        assert_eq!(expand_with("token = \"${HF_TOKEN}\"", lookup), "token = \"hf_from_env\"");
        assert_eq!(expand_with("${HF_TOKEN}${SHOWCASE_GATEWAY_TOKEN}", lookup), "hf_from_envgw");
    }

    #[test]
    fn test_unlisted_vars_left_alone() {
        assert_eq!(expand_with("path = \"${HOME}/x\"", lookup), "path = \"${HOME}/x\"");
        assert_eq!(expand_with("unterminated ${HF_TOKEN", lookup), "unterminated ${HF_TOKEN");
        assert_eq!(expand_with("no vars", lookup), "no vars");
    }

    #[test]
    fn test_missing_allowlisted_var_expands_empty() {
        assert_eq!(expand_with("a${HF_TOKEN}b", |_| None), "ab");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ShowcaseConfig::parse("").unwrap();
        assert_eq!(config.hub.base_url, "https://router.huggingface.co");
        assert_eq!(config.chat.default_model, "deepseek-ai/DeepSeek-R1-0528");
        assert_eq!(config.gateway.bind, "127.0.0.1:8787");
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_default_toml_parses() {
        let config = ShowcaseConfig::parse(include_str!("../../../config/default.toml")).unwrap();
        assert!(!config.chat.welcome_message.is_empty());
        assert!(config.registry().is_ok());
    }

    #[test]
    fn test_extra_models() {
        let toml = r#"
[[models]]
id = "gpt2"
name = "GPT-2"
category = "text"
input_type = "text"
"#;
        let config = ShowcaseConfig::parse(toml).unwrap();
        let registry = config.registry().unwrap();
        let model = registry.lookup("gpt2").unwrap();
        assert_eq!(model.category, ModelCategory::Text);
        assert_eq!(model.input_type, InputType::Text);
        assert!(model.provider.is_none());
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let toml = r#"
[[models]]
id = "openai/whisper-tiny"
name = "Again"
category = "audio"
input_type = "file"
"#;
        let config = ShowcaseConfig::parse(toml).unwrap();
        assert!(config.registry().is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("hf_abcdefghijkl"), "hf_...ijkl");
    }

    #[test]
    fn test_debug_and_masked_hide_token() {
        let mut config = ShowcaseConfig::default();
        config.hub.token = "hf_supersecrettoken".to_string();
        config.gateway.auth_token = "gateway-secret".to_string();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("supersecret"));
        assert!(!debug.contains("gateway-secret"));

        let shown = toml::to_string_pretty(&config.masked()).unwrap();
        assert!(!shown.contains("supersecret"));
        assert!(shown.contains("hf_...oken"));
    }

    #[test]
    fn test_load_custom_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub]\ntoken = \"hf_filetoken123\"\n\n[gateway]\nbind = \"0.0.0.0:9000\"").unwrap();
        let config = ShowcaseConfig::load(&Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.hub.token, "hf_filetoken123");
        assert_eq!(config.gateway.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_load_missing_custom_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShowcaseConfig::load(&Some(dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("showcase init"));
    }

    #[cfg(unix)]
    #[test]
    fn test_world_readable_config_rejected() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = ShowcaseConfig::load(&Some(path)).unwrap_err();
        assert!(err.to_string().contains("permissive"));
    }
}
