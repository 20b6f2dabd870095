use std::collections::HashMap;

use super::{Language, Localizer};

const EN_TABLE: &str = include_str!("../../locales/en.json");
const SN_TABLE: &str = include_str!("../../locales/sn.json");

/// In-memory string tables keyed by language, with `{placeholder}` templates.
#[derive(Debug, Clone)]
pub struct Catalog {
    default_language: Language,
    tables: HashMap<Language, HashMap<String, String>>,
}

impl Catalog {
    pub fn new(default_language: Language) -> Self {
        Self {
            default_language,
            tables: HashMap::new(),
        }
    }

    /// Loads the tables shipped in `locales/`.
    pub fn bundled(default_language: Language) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(default_language);
        catalog.load_json(Language::English, EN_TABLE)?;
        catalog.load_json(Language::Shona, SN_TABLE)?;
        Ok(catalog)
    }

    pub fn load_json(&mut self, language: Language, raw: &str) -> Result<(), CatalogError> {
        let table: HashMap<String, String> =
            serde_json::from_str(raw).map_err(|source| CatalogError::Parse { language, source })?;
        self.tables.entry(language).or_default().extend(table);
        Ok(())
    }

    pub fn insert(&mut self, language: Language, key: &str, template: &str) {
        self.tables
            .entry(language)
            .or_default()
            .insert(key.to_string(), template.to_string());
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// Keys present in the default table but missing from `language`.
    pub fn missing_keys(&self, language: Language) -> Vec<&str> {
        let Some(reference) = self.tables.get(&self.default_language) else {
            return Vec::new();
        };
        let target = self.tables.get(&language);
        let mut missing: Vec<&str> = reference
            .keys()
            .filter(|key| target.map_or(true, |table| !table.contains_key(*key)))
            .map(String::as_str)
            .collect();
        missing.sort_unstable();
        missing
    }

    fn lookup(&self, language: Language, key: &str) -> Option<&str> {
        self.tables
            .get(&language)
            .and_then(|table| table.get(key))
            .map(String::as_str)
    }
}

impl Localizer for Catalog {
    fn text(&self, language: Language, key: &str, args: &[(&str, String)]) -> String {
        match self
            .lookup(language, key)
            .or_else(|| self.lookup(self.default_language, key))
        {
            Some(template) => render(template, args),
            None => key.to_string(),
        }
    }
}

/// Substitutes `{name}` tokens in a single pass. Substituted values are never
/// rescanned, and unknown tokens are left as written.
fn render(template: &str, args: &[(&str, String)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substitution = after.find('}').and_then(|close| {
            let name = &after[..close];
            args.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (value, close))
        });

        match substitution {
            Some((value, close)) => {
                rendered.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("string table for '{language}' is not valid JSON")]
    Parse {
        language: Language,
        #[source]
        source: serde_json::Error,
    },
}
