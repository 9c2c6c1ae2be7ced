//! Per-skill content quality scoring.

use std::collections::HashMap;
use std::fmt;

use paramed_store::types::{QuestionRecord, SkillId, StepRecord};
use paramed_store::{SqliteStore, StoreError};
use serde::Serialize;

use super::quiz::question_issues;
use crate::config::QualityConfig;

const KEY_POINTS_PENALTY: u32 = 5;
const KEY_POINTS_CAP: u32 = 25;
const DESCRIPTION_PENALTY: u32 = 5;
const DESCRIPTION_CAP: u32 = 25;
const TIME_PENALTY: u32 = 2;
const TIME_CAP: u32 = 10;
const NO_QUESTIONS_PENALTY: u32 = 10;
const MALFORMED_QUESTION_PENALTY: u32 = 10;
const MALFORMED_QUESTION_CAP: u32 = 30;
const NUMBERING_PENALTY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum QualityBand {
    Critical,
    NeedsWork,
    Good,
    Excellent,
}

impl QualityBand {
    pub const ALL: [Self; 4] = [Self::Excellent, Self::Good, Self::NeedsWork, Self::Critical];

    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Self::Excellent,
            75..=89 => Self::Good,
            50..=74 => Self::NeedsWork,
            _ => Self::Critical,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::NeedsWork => "Needs work",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    NoSteps,
    MissingKeyPoints,
    ShortDescription,
    TimeEstimate,
    NoQuestions,
    MalformedQuestion,
    StepNumbering,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityIssue {
    pub category: IssueCategory,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillQuality {
    pub skill_id: SkillId,
    pub name: String,
    pub score: u32,
    pub band: QualityBand,
    pub issues: Vec<QualityIssue>,
}

fn capped(count: usize, each: u32, cap: u32) -> u32 {
    u32::try_from(count)
        .unwrap_or(u32::MAX)
        .saturating_mul(each)
        .min(cap)
}

/// Score one skill from its steps and questions.
///
/// A skill without steps scores 0 and lands in the `Critical` band.
#[must_use]
pub fn assess_skill(
    skill_id: SkillId,
    name: &str,
    steps: &[&StepRecord],
    questions: &[&QuestionRecord],
    config: &QualityConfig,
) -> SkillQuality {
    let mut issues = Vec::new();
    let mut penalty = 0;
    let mut flag = |category, count: usize, each, cap, detail: String| {
        if count > 0 {
            penalty += capped(count, each, cap);
            issues.push(QualityIssue { category, detail });
        }
    };

    if steps.is_empty() {
        flag(IssueCategory::NoSteps, 1, 0, 0, "skill has no steps".into());
    }

    let missing_key_points = steps.iter().filter(|s| s.key_points.is_empty()).count();
    flag(
        IssueCategory::MissingKeyPoints,
        missing_key_points,
        KEY_POINTS_PENALTY,
        KEY_POINTS_CAP,
        format!("{missing_key_points} steps without key points"),
    );

    let short = steps
        .iter()
        .filter(|s| s.description.trim().chars().count() < config.min_description_len)
        .count();
    flag(
        IssueCategory::ShortDescription,
        short,
        DESCRIPTION_PENALTY,
        DESCRIPTION_CAP,
        format!(
            "{short} steps with descriptions under {} characters",
            config.min_description_len
        ),
    );

    let bad_time = steps
        .iter()
        .filter(|s| {
            !s.time_estimate_secs
                .is_some_and(|t| (config.min_time_secs..=config.max_time_secs).contains(&t))
        })
        .count();
    flag(
        IssueCategory::TimeEstimate,
        bad_time,
        TIME_PENALTY,
        TIME_CAP,
        format!(
            "{bad_time} steps with time estimate missing or outside {}..={}s",
            config.min_time_secs, config.max_time_secs
        ),
    );

    if questions.is_empty() {
        flag(
            IssueCategory::NoQuestions,
            1,
            NO_QUESTIONS_PENALTY,
            NO_QUESTIONS_PENALTY,
            "no quiz questions".into(),
        );
    }

    let malformed = questions
        .iter()
        .filter(|q| question_issues(q).iter().any(|i| i.is_malformed()))
        .count();
    flag(
        IssueCategory::MalformedQuestion,
        malformed,
        MALFORMED_QUESTION_PENALTY,
        MALFORMED_QUESTION_CAP,
        format!("{malformed} malformed quiz questions"),
    );

    let mut numbers: Vec<i64> = steps.iter().map(|s| s.step_number).collect();
    numbers.sort_unstable();
    let contiguous = numbers
        .iter()
        .zip(1_i64..)
        .all(|(&actual, expected)| actual == expected);
    if !contiguous {
        flag(
            IssueCategory::StepNumbering,
            1,
            NUMBERING_PENALTY,
            NUMBERING_PENALTY,
            format!("step numbers {numbers:?} are not 1..={}", numbers.len()),
        );
    }

    let score = if steps.is_empty() {
        0
    } else {
        100_u32.saturating_sub(penalty)
    };
    SkillQuality {
        skill_id,
        name: name.to_owned(),
        score,
        band: QualityBand::from_score(score),
        issues,
    }
}

/// Quality of every skill in the catalogue, worst first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub skills: Vec<SkillQuality>,
}

impl QualityReport {
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn collect(store: &SqliteStore, config: &QualityConfig) -> Result<Self, StoreError> {
        let skills = store.list_skills().await?;
        let steps = store.all_steps().await?;
        let questions = store.all_questions().await?;

        let mut steps_by_skill: HashMap<SkillId, Vec<&StepRecord>> = HashMap::new();
        for step in &steps {
            steps_by_skill.entry(step.skill_id).or_default().push(step);
        }
        let mut questions_by_skill: HashMap<SkillId, Vec<&QuestionRecord>> = HashMap::new();
        for q in &questions {
            questions_by_skill.entry(q.skill_id).or_default().push(q);
        }

        let mut report: Vec<SkillQuality> = skills
            .iter()
            .map(|skill| {
                assess_skill(
                    skill.id,
                    &skill.name,
                    steps_by_skill
                        .get(&skill.id)
                        .map(Vec::as_slice)
                        .unwrap_or_default(),
                    questions_by_skill
                        .get(&skill.id)
                        .map(Vec::as_slice)
                        .unwrap_or_default(),
                    config,
                )
            })
            .collect();
        report.sort_by(|a, b| a.score.cmp(&b.score).then_with(|| a.name.cmp(&b.name)));
        Ok(Self { skills: report })
    }

    #[must_use]
    pub fn band_count(&self, band: QualityBand) -> usize {
        self.skills.iter().filter(|s| s.band == band).count()
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_score(&self) -> f64 {
        if self.skills.is_empty() {
            return 0.0;
        }
        let total: u64 = self.skills.iter().map(|s| u64::from(s.score)).sum();
        total as f64 / self.skills.len() as f64
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Quality report: {} skills, average score {:.1}",
            self.skills.len(),
            self.average_score()
        )?;
        for band in QualityBand::ALL {
            writeln!(f, "  {:<11} {}", band.as_str(), self.band_count(band))?;
        }
        for skill in self.skills.iter().filter(|s| !s.issues.is_empty()) {
            writeln!(f, "\n{} [{} - {}]", skill.name, skill.score, skill.band)?;
            for issue in &skill.issues {
                writeln!(f, "  - {}", issue.detail)?;
            }
        }
        Ok(())
    }
}
