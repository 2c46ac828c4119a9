//! The user's global configuration at `~/.config/dorgu/config.yaml`.
//!
//! Besides generation defaults it stores LLM credentials; API keys are
//! masked whenever they are displayed.

use crate::config::ConfigLayer;
use crate::error::{DorguError, Result};
use crate::io::atomic_write;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const KEYS: &[&str] = &[
    "llm.provider",
    "llm.api_key",
    "llm.model",
    "defaults.namespace",
    "defaults.registry",
    "defaults.org_name",
];

const LLM_PROVIDERS: &[&str] = &["openai", "anthropic", "gemini", "ollama"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalDefaults {
    pub namespace: String,
    pub registry: String,
    pub org_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub version: String,
    pub llm: LlmSettings,
    pub defaults: GlobalDefaults,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            llm: LlmSettings::default(),
            defaults: GlobalDefaults {
                namespace: "default".to_string(),
                ..GlobalDefaults::default()
            },
        }
    }
}

/// One row of `dorgu config list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

impl GlobalConfig {
    /// Missing or empty file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_yaml::to_string(self)?;
        let header = format!(
            "# Dorgu Global Configuration\n\
             # Location: {}\n\
             # Edit with: dorgu config set <key> <value>\n\n",
            path.display()
        );
        atomic_write(path, format!("{header}{body}").as_bytes())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "llm.provider" => {
                if !value.is_empty() && !LLM_PROVIDERS.contains(&value) {
                    return Err(DorguError::InvalidConfigValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason: format!("expected one of {}", LLM_PROVIDERS.join(", ")),
                    });
                }
                self.llm.provider = value.to_string();
            }
            "llm.api_key" => self.llm.api_key = value.to_string(),
            "llm.model" => self.llm.model = value.to_string(),
            "defaults.namespace" => self.defaults.namespace = value.to_string(),
            "defaults.registry" => self.defaults.registry = value.to_string(),
            "defaults.org_name" => self.defaults.org_name = value.to_string(),
            _ => return Err(DorguError::UnknownConfigKey(key.to_string())),
        }
        Ok(())
    }

    /// Value for display. The API key comes back masked.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "llm.provider" => self.llm.provider.clone(),
            "llm.api_key" if self.llm.api_key.is_empty() => String::new(),
            "llm.api_key" => mask_key(&self.llm.api_key),
            "llm.model" => self.llm.model.clone(),
            "defaults.namespace" => self.defaults.namespace.clone(),
            "defaults.registry" => self.defaults.registry.clone(),
            "defaults.org_name" => self.defaults.org_name.clone(),
            _ => return Err(DorguError::UnknownConfigKey(key.to_string())),
        };
        Ok(value)
    }

    pub fn list_all(&self) -> Vec<ConfigEntry> {
        self.list_all_with(|name| std::env::var(name).ok())
    }

    fn list_all_with(&self, env: impl Fn(&str) -> Option<String>) -> Vec<ConfigEntry> {
        KEYS.iter()
            .map(|key| {
                let mut entry = ConfigEntry {
                    key: key.to_string(),
                    value: self.get(key).unwrap_or_default(),
                    source: "global".to_string(),
                };
                if *key == "llm.api_key" {
                    if let Some((name, value)) = env_key(&self.llm.provider, &env) {
                        entry.value = mask_key(&value);
                        entry.source = format!("env:{name}");
                    }
                }
                entry
            })
            .collect()
    }

    /// Project the generation defaults into a config layer.
    pub fn as_layer(&self) -> ConfigLayer {
        let some = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let mut layer = ConfigLayer::with_overrides(
            some(&self.defaults.namespace),
            some(&self.defaults.registry),
        );
        layer.org.name = some(&self.defaults.org_name);
        layer
    }
}

fn env_keys_for_provider(provider: &str) -> &'static [&'static str] {
    match provider {
        "openai" => &["OPENAI_API_KEY"],
        "anthropic" => &["ANTHROPIC_API_KEY"],
        "gemini" => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        _ => &[],
    }
}

/// The first non-empty provider variable, with its name. It wins over the
/// stored key.
fn env_key(
    provider: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Option<(&'static str, String)> {
    env_keys_for_provider(provider)
        .iter()
        .find_map(|name| env(name).filter(|v| !v.is_empty()).map(|v| (*name, v)))
}

/// Keep the first and last four characters; keys of eight characters or
/// fewer are fully starred.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mask_rules() {
        assert_eq!(mask_key("sk-abcdefghijkl"), "sk-a*******ijkl");
        assert_eq!(mask_key("12345678"), "********");
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key(""), "");
    }

    #[test]
    fn set_and_get() {
        let mut cfg = GlobalConfig::default();
        cfg.set("defaults.registry", "ghcr.io/acme").unwrap();
        cfg.set("llm.api_key", "sk-abcdefghijkl").unwrap();
        assert_eq!(cfg.get("defaults.registry").unwrap(), "ghcr.io/acme");
        assert_eq!(cfg.get("llm.api_key").unwrap(), "sk-a*******ijkl");
        assert_eq!(cfg.get("defaults.namespace").unwrap(), "default");
    }

    #[test]
    fn unknown_key_rejected() {
        let mut cfg = GlobalConfig::default();
        assert!(matches!(
            cfg.set("llm.temperature", "1"),
            Err(DorguError::UnknownConfigKey(_))
        ));
        assert!(cfg.get("nope").is_err());
    }

    #[test]
    fn invalid_provider_rejected() {
        let mut cfg = GlobalConfig::default();
        assert!(matches!(
            cfg.set("llm.provider", "watson"),
            Err(DorguError::InvalidConfigValue { .. })
        ));
        cfg.set("llm.provider", "gemini").unwrap();
        assert_eq!(cfg.llm.provider, "gemini");
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dorgu/config.yaml");
        let mut cfg = GlobalConfig::default();
        cfg.set("defaults.org_name", "acme").unwrap();
        cfg.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Dorgu Global Configuration"));
        assert_eq!(GlobalConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn load_missing_or_empty_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        assert_eq!(GlobalConfig::load(&path).unwrap(), GlobalConfig::default());
        std::fs::write(&path, "").unwrap();
        assert_eq!(GlobalConfig::load(&path).unwrap(), GlobalConfig::default());
    }

    #[test]
    fn env_key_wins_over_stored_key() {
        let mut cfg = GlobalConfig::default();
        cfg.set("llm.provider", "gemini").unwrap();
        cfg.set("llm.api_key", "stored-key-123456").unwrap();
        let env = |name: &str| (name == "GOOGLE_API_KEY").then(|| "google-key-abcdef".to_string());

        let entries = cfg.list_all_with(env);
        let key = entries.iter().find(|e| e.key == "llm.api_key").unwrap();
        assert_eq!(key.source, "env:GOOGLE_API_KEY");
        assert_eq!(key.value, "goog*********cdef");

        let entries = cfg.list_all_with(|_| None);
        let key = entries.iter().find(|e| e.key == "llm.api_key").unwrap();
        assert_eq!(key.source, "global");
        assert_eq!(key.value, "stor*********3456");
    }

    #[test]
    fn as_layer_only_carries_set_values() {
        let cfg = GlobalConfig {
            defaults: GlobalDefaults {
                namespace: String::new(),
                registry: "ghcr.io/acme".to_string(),
                org_name: String::new(),
            },
            ..GlobalConfig::default()
        };
        let layer = cfg.as_layer();
        assert_eq!(layer.ci.registry.as_deref(), Some("ghcr.io/acme"));
        assert!(layer.defaults.namespace.is_none());
        assert!(layer.org.name.is_none());
    }
}
