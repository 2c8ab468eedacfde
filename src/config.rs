//! Provider configuration handling for storyreel.
//!
//! Loads credentials and per-provider settings from
//! `~/.config/storyreel/config.toml` (or a custom path), then merges API
//! keys from environment variables on top. The merged config is loaded once
//! at startup and passed by reference into the provider constructors; it is
//! never mutated while a pipeline run is in flight.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable holding the Google Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding the ElevenLabs API key.
pub const ELEVENLABS_API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Provider credentials and endpoint settings.
///
/// Every section is optional in the file; a missing file yields the default
/// config (no keys, keyless providers only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
    #[serde(default)]
    pub pollinations: PollinationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Chat model used for script generation.
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Image model used for scene stills.
    #[serde(default = "default_openai_image_model")]
    pub image_model: String,
    /// Speech model used for narration.
    #[serde(default = "default_openai_tts_model")]
    pub tts_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            image_model: default_openai_image_model(),
            tts_model: default_openai_tts_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Voice used when the requested voice has no ElevenLabs mapping.
    #[serde(default = "default_elevenlabs_voice")]
    pub voice_id: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: default_elevenlabs_voice(),
        }
    }
}

/// Pollinations is keyless; the flag exists so fully offline runs can opt
/// out of the free tail of the image chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollinationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for PollinationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_openai_tts_model() -> String {
    "tts-1".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_elevenlabs_voice() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

impl ProviderConfig {
    /// Load configuration from a file path, then merge environment keys.
    ///
    /// Returns the default config if the file doesn't exist. Returns an
    /// error if the file exists but cannot be parsed. Environment variables
    /// win over file values so a key can be rotated without editing files.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.merge_env();
        Ok(config)
    }

    /// Overlay API keys from the environment.
    pub fn merge_env(&mut self) {
        if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
            if !key.is_empty() {
                self.openai.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var(GEMINI_API_KEY_ENV) {
            if !key.is_empty() {
                self.gemini.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var(ELEVENLABS_API_KEY_ENV) {
            if !key.is_empty() {
                self.elevenlabs.api_key = Some(key);
            }
        }
    }

    /// Write this config as TOML to the given path, creating parent dirs.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// True if any text-generation provider has a credential.
    pub fn has_text_provider(&self) -> bool {
        self.openai.api_key.is_some() || self.gemini.api_key.is_some()
    }

    /// True if any speech provider has a credential.
    pub fn has_speech_provider(&self) -> bool {
        self.openai.api_key.is_some() || self.elevenlabs.api_key.is_some()
    }
}

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("storyreel")
        .join("config.toml")
}
