//! Locales and configured languages.
//!
//! There is no process-wide "active language". Anything that depends on a
//! locale receives it explicitly as `Option<&Locale>`, where `None` is the
//! neutral locale.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A language code such as `en` or `pt-br`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    /// Create a locale from its code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The language code.
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A configured language: code plus human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language code used as the field-name suffix.
    pub code: Locale,
    /// Display name.
    pub name: String,
}

impl Language {
    /// Create a language entry.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: Locale::new(code),
            name: name.into(),
        }
    }
}
