//! Locale selection and bilingual display text.
//!
//! # Responsibility
//! - Name the UI languages that catalog and option texts are authored in.
//! - Resolve one display string for an explicitly passed locale.
//!
//! # Invariants
//! - Locale is always passed explicitly; core never reads a process-wide
//!   "current language".
//! - Lookups fall back to English when the requested translation is blank.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// UI language used when rendering answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    De,
}

impl Locale {
    /// Returns the ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
        }
    }

    /// Localized label for a positive yes/no answer.
    pub fn yes_label(self) -> &'static str {
        match self {
            Self::En => "yes",
            Self::De => "ja",
        }
    }

    /// Localized label for a negative yes/no answer.
    pub fn no_label(self) -> &'static str {
        match self {
            Self::En => "no",
            Self::De => "nein",
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error for unsupported locale codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedLocale(pub String);

impl Display for UnsupportedLocale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported locale `{}`; expected en|de", self.0)
    }
}

impl Error for UnsupportedLocale {}

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    /// Accepts `en`, `de` and region-qualified forms such as `de-AT`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let language = normalized
            .split(['-', '_'])
            .next()
            .unwrap_or_default();
        match language {
            "en" => Ok(Self::En),
            "de" => Ok(Self::De),
            _ => Err(UnsupportedLocale(value.trim().to_string())),
        }
    }
}

/// Text authored once per supported locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    pub de: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, de: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            de: de.into(),
        }
    }

    /// Same text for every locale.
    pub fn uniform(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            en: text.clone(),
            de: text,
        }
    }

    /// Returns the text for `locale`, falling back to English when blank.
    pub fn get(&self, locale: Locale) -> &str {
        let value = match locale {
            Locale::En => self.en.as_str(),
            Locale::De => self.de.as_str(),
        };
        if value.trim().is_empty() {
            self.en.as_str()
        } else {
            value
        }
    }
}
