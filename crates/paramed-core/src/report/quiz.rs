use std::collections::{HashMap, HashSet};
use std::fmt;

use paramed_store::types::{QuestionRecord, SkillId};
use paramed_store::{SqliteStore, StoreError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizIssueKind {
    EmptyQuestion,
    TooFewOptions,
    AnswerOutOfRange,
    BlankOption,
    DuplicateOptions,
    MissingExplanation,
}

impl QuizIssueKind {
    /// Issues that make a question unusable, as opposed to merely untidy.
    #[must_use]
    pub fn is_malformed(self) -> bool {
        matches!(
            self,
            Self::EmptyQuestion | Self::TooFewOptions | Self::AnswerOutOfRange
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyQuestion => "empty question text",
            Self::TooFewOptions => "fewer than two options",
            Self::AnswerOutOfRange => "correct index out of range",
            Self::BlankOption => "blank option",
            Self::DuplicateOptions => "duplicate options",
            Self::MissingExplanation => "missing explanation",
        }
    }
}

impl fmt::Display for QuizIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every problem found with a single question.
#[must_use]
pub fn question_issues(question: &QuestionRecord) -> Vec<QuizIssueKind> {
    let mut issues = Vec::new();
    if question.question.trim().is_empty() {
        issues.push(QuizIssueKind::EmptyQuestion);
    }
    if question.options.len() < 2 {
        issues.push(QuizIssueKind::TooFewOptions);
    }
    let in_range = usize::try_from(question.correct_index)
        .is_ok_and(|i| i < question.options.len());
    if !in_range {
        issues.push(QuizIssueKind::AnswerOutOfRange);
    }
    if question.options.iter().any(|o| o.trim().is_empty()) {
        issues.push(QuizIssueKind::BlankOption);
    }
    let mut seen = HashSet::new();
    if !question
        .options
        .iter()
        .map(|o| o.trim().to_lowercase())
        .all(|o| seen.insert(o))
    {
        issues.push(QuizIssueKind::DuplicateOptions);
    }
    if question.explanation.trim().is_empty() {
        issues.push(QuizIssueKind::MissingExplanation);
    }
    issues
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizIssue {
    pub question_id: i64,
    pub skill_id: SkillId,
    pub skill_name: String,
    pub kind: QuizIssueKind,
}

/// Result of checking every stored quiz question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuizValidation {
    pub checked: usize,
    pub issues: Vec<QuizIssue>,
}

impl QuizValidation {
    #[must_use]
    pub fn from_questions(questions: &[QuestionRecord], names: &HashMap<SkillId, String>) -> Self {
        let issues = questions
            .iter()
            .flat_map(|q| {
                question_issues(q).into_iter().map(|kind| QuizIssue {
                    question_id: q.id,
                    skill_id: q.skill_id,
                    skill_name: names
                        .get(&q.skill_id)
                        .cloned()
                        .unwrap_or_else(|| format!("skill {}", q.skill_id)),
                    kind,
                })
            })
            .collect();
        Self {
            checked: questions.len(),
            issues,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn collect(store: &SqliteStore) -> Result<Self, StoreError> {
        let names = store
            .list_skills()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let questions = store.all_questions().await?;
        Ok(Self::from_questions(&questions, &names))
    }

    #[must_use]
    pub fn malformed_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.kind.is_malformed())
            .map(|i| i.question_id)
            .collect::<HashSet<_>>()
            .len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for QuizValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quiz validation: {} questions checked", self.checked)?;
        if self.is_clean() {
            return writeln!(f, "  no issues found");
        }
        for issue in &self.issues {
            writeln!(
                f,
                "  [{}] question {} ({}): {}",
                if issue.kind.is_malformed() { "error" } else { "warn" },
                issue.question_id,
                issue.skill_name,
                issue.kind
            )?;
        }
        writeln!(
            f,
            "{} issues, {} malformed questions",
            self.issues.len(),
            self.malformed_count()
        )
    }
}
