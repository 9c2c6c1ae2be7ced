use std::collections::BTreeMap;
use std::fmt;

use paramed_store::types::SkillSummary;
use paramed_store::{SqliteStore, StoreError};
use serde::Serialize;

const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub name: String,
    pub skills: usize,
    pub with_steps: usize,
    pub with_questions: usize,
}

/// Catalogue coverage at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub total_skills: usize,
    pub total_steps: i64,
    pub total_questions: i64,
    pub skills_with_steps: usize,
    pub skills_with_questions: usize,
    /// Sorted by category name.
    pub categories: Vec<CategoryProgress>,
    pub missing_steps: Vec<String>,
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl ProgressReport {
    #[must_use]
    pub fn from_summaries(summaries: &[SkillSummary]) -> Self {
        let mut categories: BTreeMap<&str, CategoryProgress> = BTreeMap::new();
        let mut report = Self {
            total_skills: summaries.len(),
            ..Self::default()
        };

        for skill in summaries {
            let has_steps = skill.step_count > 0;
            let has_questions = skill.question_count > 0;
            report.total_steps += skill.step_count;
            report.total_questions += skill.question_count;
            report.skills_with_steps += usize::from(has_steps);
            report.skills_with_questions += usize::from(has_questions);
            if !has_steps {
                report.missing_steps.push(skill.name.clone());
            }

            let name = skill.category.as_deref().unwrap_or(UNCATEGORIZED);
            let entry = categories.entry(name).or_insert_with(|| CategoryProgress {
                name: name.to_owned(),
                ..CategoryProgress::default()
            });
            entry.skills += 1;
            entry.with_steps += usize::from(has_steps);
            entry.with_questions += usize::from(has_questions);
        }

        report.categories = categories.into_values().collect();
        report
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn collect(store: &SqliteStore) -> Result<Self, StoreError> {
        let summaries = store.skill_summaries().await?;
        Ok(Self::from_summaries(&summaries))
    }

    #[must_use]
    pub fn step_coverage(&self) -> f64 {
        percent(self.skills_with_steps, self.total_skills)
    }

    #[must_use]
    pub fn question_coverage(&self) -> f64 {
        percent(self.skills_with_questions, self.total_skills)
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Skills:    {}", self.total_skills)?;
        writeln!(f, "Steps:     {}", self.total_steps)?;
        writeln!(f, "Questions: {}", self.total_questions)?;
        writeln!(
            f,
            "With steps:     {}/{} ({:.1}%)",
            self.skills_with_steps,
            self.total_skills,
            self.step_coverage()
        )?;
        writeln!(
            f,
            "With questions: {}/{} ({:.1}%)",
            self.skills_with_questions,
            self.total_skills,
            self.question_coverage()
        )?;

        if !self.categories.is_empty() {
            writeln!(f, "\nBy category:")?;
            for c in &self.categories {
                writeln!(
                    f,
                    "  {:<32} {:>3} skills, {:>3} with steps, {:>3} with questions",
                    c.name, c.skills, c.with_steps, c.with_questions
                )?;
            }
        }

        if !self.missing_steps.is_empty() {
            writeln!(f, "\nSkills without steps ({}):", self.missing_steps.len())?;
            for name in &self.missing_steps {
                writeln!(f, "  - {name}")?;
            }
        }
        Ok(())
    }
}
