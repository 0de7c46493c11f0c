use std::fmt;

use serde::{Deserialize, Serialize};

/// Application settings as the backend reports them. The API key itself is
/// never read back, only whether one is stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub openai_api_key_set: bool,
    #[serde(default)]
    pub openai_model: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub font_size: Option<u16>,
    #[serde(default)]
    pub tab_size: Option<u8>,
    #[serde(default)]
    pub auto_complete_enabled: Option<bool>,
    #[serde(default)]
    pub default_query_limit: Option<u32>,
}

impl Settings {
    #[must_use]
    pub fn ai_ready(&self) -> bool {
        self.openai_api_key_set
    }

    #[must_use]
    pub fn autocomplete_enabled(&self) -> bool {
        self.auto_complete_enabled.unwrap_or(true)
    }
}

/// Partial update. Fields left `None` are not sent.
#[derive(Clone, PartialEq, Eq, Default, Serialize)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_size: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_complete_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_query_limit: Option<u32>,
}

impl SettingsUpdate {
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.openai_api_key = (!key.trim().is_empty()).then_some(key);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl fmt::Debug for SettingsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsUpdate")
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("openai_model", &self.openai_model)
            .field("theme", &self.theme)
            .field("font_size", &self.font_size)
            .field("tab_size", &self.tab_size)
            .field("auto_complete_enabled", &self.auto_complete_enabled)
            .field("default_query_limit", &self.default_query_limit)
            .finish()
    }
}
