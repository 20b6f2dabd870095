//! Reply text lookup. The conversation engine only sees the [`Localizer`]
//! trait; string tables are plain data bundled with the crate.

mod catalog;

pub use catalog::{Catalog, CatalogError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Shona,
}

impl Language {
    pub const fn ordered() -> [Self; 2] {
        [Self::English, Self::Shona]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Shona => "sn",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Shona => "ChiShona",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "sn" | "shona" | "chishona" => Ok(Self::Shona),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// Localized text lookup consumed by the conversation engine.
///
/// Implementations fall back to a default language when the requested
/// language lacks `key`, and return the key itself when no language has it.
pub trait Localizer: Send + Sync {
    fn text(&self, language: Language, key: &str, args: &[(&str, String)]) -> String;
}
