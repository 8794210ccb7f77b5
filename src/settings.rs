use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DEFAULT_API_URL, MAX_TOKENS_MAX, MAX_TOKENS_MIN, TEMPERATURE_MAX, TEMPERATURE_MIN};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("temperature {0} is out of range [{TEMPERATURE_MIN}, {TEMPERATURE_MAX}]")]
    TemperatureOutOfRange(f64),
    #[error("max_tokens {0} is out of range [{MAX_TOKENS_MIN}, {MAX_TOKENS_MAX}]")]
    MaxTokensOutOfRange(u32),
    #[error("model '{model}' is not offered by provider '{provider}'")]
    UnknownModel { provider: Provider, model: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Fireworks,
}

impl Provider {
    /// Fixed (value, display label) option list for this provider. The
    /// first entry is the model a provider switch resets to.
    #[must_use]
    pub const fn model_options(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::OpenAi => &[
                ("gpt-4", "GPT-4"),
                ("gpt-4-turbo", "GPT-4 Turbo"),
                ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
            ],
            Self::Anthropic => &[
                ("claude-3-opus", "Claude 3 Opus"),
                ("claude-3-sonnet", "Claude 3 Sonnet"),
                ("claude-3-haiku", "Claude 3 Haiku"),
            ],
            Self::Fireworks => &[
                ("mixtral-8x7b", "Mixtral 8x7B"),
                ("llama-2-70b", "Llama 2 70B"),
            ],
        }
    }

    #[must_use]
    pub const fn first_model(self) -> &'static str {
        self.model_options()[0].0
    }

    #[must_use]
    pub fn offers_model(self, model: &str) -> bool {
        self.model_options().iter().any(|(value, _)| *value == model)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Fireworks => "fireworks",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            model: Provider::OpenAi.first_model().to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

impl LlmConfig {
    /// Switching provider always snaps the model to that provider's first
    /// option, so the pair can never disagree.
    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
        self.model = provider.first_model().to_string();
    }

    /// Selecting a model leaves the provider untouched; models outside the
    /// current provider's list are rejected.
    pub fn set_model(&mut self, model: impl Into<String>) -> Result<(), SettingsError> {
        let model = model.into();
        if !self.provider.offers_model(&model) {
            return Err(SettingsError::UnknownModel {
                provider: self.provider,
                model,
            });
        }
        self.model = model;
        Ok(())
    }

    pub fn set_temperature(&mut self, value: f64) -> Result<(), SettingsError> {
        if !value.is_finite() || !(TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&value) {
            return Err(SettingsError::TemperatureOutOfRange(value));
        }
        self.temperature = value;
        Ok(())
    }

    pub fn set_max_tokens(&mut self, value: u32) -> Result<(), SettingsError> {
        if !(MAX_TOKENS_MIN..=MAX_TOKENS_MAX).contains(&value) {
            return Err(SettingsError::MaxTokensOutOfRange(value));
        }
        self.max_tokens = value;
        Ok(())
    }
}

/// Persisted user configuration. Field names match the JSON the dashboard
/// has always written, so existing stored settings keep loading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LlmConfig,
    #[serde(rename = "apiUrl")]
    pub api_url: String,
    #[serde(rename = "darkMode")]
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            api_url: DEFAULT_API_URL.to_string(),
            dark_mode: false,
        }
    }
}

/// Partial shape read back from the store: every key optional, so a value
/// written by an older build still overlays cleanly onto current defaults.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StoredSettings {
    #[serde(default)]
    llm: Option<StoredLlmConfig>,
    #[serde(default, rename = "apiUrl")]
    api_url: Option<String>,
    #[serde(default, rename = "darkMode")]
    dark_mode: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct StoredLlmConfig {
    #[serde(default)]
    provider: Option<Provider>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

impl Settings {
    /// Defaults overlaid with whatever subset the store held. Shallow
    /// merge: present keys win, absent keys keep their defaults.
    #[must_use]
    pub fn overlaid(mut self, stored: StoredSettings) -> Self {
        if let Some(llm) = stored.llm {
            if let Some(provider) = llm.provider {
                self.llm.set_provider(provider);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }
        if let Some(api_url) = stored.api_url {
            self.api_url = api_url;
        }
        if let Some(dark_mode) = stored.dark_mode {
            self.dark_mode = dark_mode;
        }
        self
    }

    /// Settings as loaded at startup. Malformed stored JSON is recovered
    /// silently: log and fall back to defaults, never surface.
    #[must_use]
    pub fn from_stored_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<StoredSettings>(bytes) {
            Ok(stored) => Self::default().overlaid(stored),
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse saved settings, using defaults");
                Self::default()
            }
        }
    }
}
