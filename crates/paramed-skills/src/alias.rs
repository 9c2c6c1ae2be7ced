use std::collections::HashMap;

use crate::error::SkillError;
use crate::normalize::normalize;

/// Curated mapping from names that appear in handouts to the catalogue name
/// they belong to. Keys are compared after [`normalize`].
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `alias -> canonical name` pairs.
    ///
    /// # Errors
    ///
    /// Returns `EmptyAlias` if a canonical name is blank.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, SkillError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table = Self::new();
        for (alias, canonical) in pairs {
            let canonical = canonical.into();
            if canonical.trim().is_empty() {
                return Err(SkillError::EmptyAlias {
                    alias: alias.as_ref().to_owned(),
                });
            }
            table.insert(alias.as_ref(), canonical);
        }
        Ok(table)
    }

    pub fn insert(&mut self, alias: &str, canonical: impl Into<String>) {
        self.entries.insert(normalize(alias), canonical.into());
    }

    /// Canonical name for `candidate`, if it is a known alias.
    #[must_use]
    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        self.entries.get(&normalize(candidate)).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
