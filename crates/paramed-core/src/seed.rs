//! Reference catalogue seeding from a TOML file.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use paramed_store::SqliteStore;
use paramed_store::types::{CategoryId, Difficulty, NewSkill, SubjectId};
use serde::Deserialize;

use crate::error::PipelineError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub subjects: Vec<SubjectEntry>,
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubjectEntry {
    pub hem_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// HEM code of a subject declared in the same file or already stored.
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub indications: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default)]
    pub common_errors: Vec<String>,
}

/// Rows created by one seeding pass. Existing rows are reused, not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub subjects: usize,
    pub skills: usize,
    pub skills_existing: usize,
}

impl Catalogue {
    /// # Errors
    ///
    /// Returns an error if the TOML does not describe a catalogue.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalogue {}", path.display()))?;
        Self::parse(&content).context("failed to parse catalogue")
    }

    /// Reject blank names before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `Catalogue` naming the first offending entry.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let blank = |s: &str| s.trim().is_empty();
        if let Some(pos) = self.categories.iter().position(|c| blank(&c.name)) {
            return Err(PipelineError::Catalogue(format!("category #{} has no name", pos + 1)));
        }
        if let Some(s) = self
            .subjects
            .iter()
            .find(|s| blank(&s.hem_code) || blank(&s.name))
        {
            return Err(PipelineError::Catalogue(format!(
                "subject {:?} needs both hem_code and name",
                s.hem_code
            )));
        }
        if let Some(pos) = self.skills.iter().position(|s| blank(&s.name)) {
            return Err(PipelineError::Catalogue(format!("skill #{} has no name", pos + 1)));
        }
        Ok(())
    }
}

/// Insert whatever part of `catalogue` is not stored yet.
///
/// Categories are matched by name, subjects by HEM code, skills by name
/// (all ignoring case). A skill naming an undeclared category gets that
/// category created; an unknown subject code is an error.
///
/// # Errors
///
/// Returns an error if the catalogue is invalid or a store operation fails.
/// Rows written before the failure stay; rerunning is safe.
pub async fn seed_catalogue(
    store: &SqliteStore,
    catalogue: &Catalogue,
) -> Result<SeedSummary, PipelineError> {
    catalogue.validate()?;
    let mut summary = SeedSummary::default();

    let mut categories: HashMap<String, CategoryId> = HashMap::new();
    for entry in &catalogue.categories {
        let (id, created) = store
            .ensure_category(entry.name.trim(), &entry.description)
            .await?;
        summary.categories += usize::from(created);
        categories.insert(entry.name.trim().to_lowercase(), id);
    }

    let mut subjects: HashMap<String, SubjectId> = HashMap::new();
    for entry in &catalogue.subjects {
        let (id, created) = store
            .ensure_subject(entry.hem_code.trim(), entry.name.trim())
            .await?;
        summary.subjects += usize::from(created);
        subjects.insert(entry.hem_code.trim().to_lowercase(), id);
    }

    for entry in &catalogue.skills {
        let name = entry.name.trim();
        if !store.find_skills_by_name(name).await?.is_empty() {
            summary.skills_existing += 1;
            continue;
        }

        let category_id = match entry.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => {
                let key = category.to_lowercase();
                if let Some(&id) = categories.get(&key) {
                    Some(id)
                } else {
                    let (id, created) = store.ensure_category(category, "").await?;
                    summary.categories += usize::from(created);
                    categories.insert(key, id);
                    Some(id)
                }
            }
            _ => None,
        };

        let subject_id = match entry.subject.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let key = code.to_lowercase();
                let id = match subjects.get(&key) {
                    Some(&id) => id,
                    None => store
                        .find_subject(code)
                        .await?
                        .ok_or_else(|| {
                            PipelineError::Catalogue(format!(
                                "skill {name:?} references unknown subject {code:?}"
                            ))
                        })?
                        .id,
                };
                Some(id)
            }
            _ => None,
        };

        store
            .insert_skill(&NewSkill {
                name: name.to_owned(),
                category_id,
                subject_id,
                difficulty: entry.difficulty,
                is_critical: entry.critical,
                objectives: entry.objectives.clone(),
                indications: entry.indications.clone(),
                contraindications: entry.contraindications.clone(),
                common_errors: entry.common_errors.clone(),
            })
            .await?;
        summary.skills += 1;
    }

    tracing::info!(
        categories = summary.categories,
        subjects = summary.subjects,
        skills = summary.skills,
        existing = summary.skills_existing,
        "catalogue seeded"
    );
    Ok(summary)
}
