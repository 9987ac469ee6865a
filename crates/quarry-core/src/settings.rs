//! Indexing settings.
//!
//! Settings are plain serde data, usually read from a TOML file:
//!
//! ```toml
//! batch_size = 500
//! template_dir = "templates"
//!
//! [[languages]]
//! code = "en"
//! name = "English"
//!
//! [[languages]]
//! code = "fr"
//! name = "French"
//! ```
//!
//! The order of `languages` matters: it is the fan-out order of translatable
//! fields and the concatenation order of their aggregate values.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::locale::{Language, Locale};

/// Separator between a base field name and its locale suffix.
pub const LOCALE_SEPARATOR: &str = "__";

/// Settings for the indexing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of documents a backend should send per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Directory containing field templates.
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Configured languages, in fan-out order.
    // Keep last: TOML tables must follow scalar keys.
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,
}

fn default_languages() -> Vec<Language> {
    vec![Language::new("en", "English")]
}

fn default_batch_size() -> usize {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            template_dir: None,
            languages: default_languages(),
        }
    }
}

impl Settings {
    /// Settings with the given language codes and defaults elsewhere.
    ///
    /// Display names default to the codes.
    pub fn with_languages<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let languages = codes
            .into_iter()
            .map(|code| {
                let code = code.into();
                Language::new(code.clone(), code)
            })
            .collect();
        Self {
            languages,
            ..Self::default()
        }
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let settings = Self::from_toml_str(&content)?;
        log::debug!(
            "Loaded settings from {} ({} languages)",
            path.display(),
            settings.languages.len()
        );
        Ok(settings)
    }

    /// Serialize the settings as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Configured locales, in order.
    pub fn locales(&self) -> Vec<Locale> {
        self.languages.iter().map(|l| l.code.clone()).collect()
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.languages.is_empty() {
            return Err(invalid("at least one language must be configured"));
        }
        let mut seen = HashSet::new();
        for language in &self.languages {
            let code = language.code.code();
            if code.trim().is_empty() {
                return Err(invalid("language codes must not be empty"));
            }
            if code.contains(LOCALE_SEPARATOR) {
                return Err(invalid(format!(
                    "language code '{code}' must not contain '{LOCALE_SEPARATOR}'"
                )));
            }
            if !seen.insert(code) {
                return Err(invalid(format!("language code '{code}' is listed twice")));
            }
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

// ============================================================================
// Tests
// ============================================================================
