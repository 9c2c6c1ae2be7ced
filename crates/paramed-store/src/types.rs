use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Strongly typed wrapper for skill row IDs.
    SkillId
);
row_id!(
    /// Strongly typed wrapper for category row IDs.
    CategoryId
);
row_id!(
    /// Strongly typed wrapper for HEM subject row IDs.
    SubjectId
);
row_id!(
    /// Strongly typed wrapper for message row IDs.
    MessageId
);
row_id!(
    /// Identifier of a student or instructor account (owned by the web app).
    UserId
);

/// Difficulty level shared by skills and quiz questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    /// Accepts the stored names plus the "easy/medium/hard" wording models tend to emit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" | "easy" | "beginner" => Ok(Self::Basic),
            "intermediate" | "medium" | "moderate" => Ok(Self::Intermediate),
            "advanced" | "hard" | "difficult" => Ok(Self::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    pub hem_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillRecord {
    pub id: SkillId,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub subject_id: Option<SubjectId>,
    pub difficulty: Difficulty,
    pub is_critical: bool,
    pub objectives: Vec<String>,
    pub indications: Vec<String>,
    pub contraindications: Vec<String>,
    pub common_errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSkill {
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub subject_id: Option<SubjectId>,
    pub difficulty: Difficulty,
    pub is_critical: bool,
    pub objectives: Vec<String>,
    pub indications: Vec<String>,
    pub contraindications: Vec<String>,
    pub common_errors: Vec<String>,
}

impl NewSkill {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Skill with its category name and child row counts, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSummary {
    pub id: SkillId,
    pub name: String,
    pub category: Option<String>,
    pub hem_code: Option<String>,
    pub step_count: i64,
    pub question_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub id: i64,
    pub skill_id: SkillId,
    pub step_number: i64,
    pub title: String,
    pub description: String,
    pub key_points: Vec<String>,
    pub is_critical: bool,
    pub time_estimate_secs: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStep {
    pub title: String,
    pub description: String,
    pub key_points: Vec<String>,
    pub is_critical: bool,
    pub time_estimate_secs: Option<i64>,
    /// Number the source claimed for this step; informational only.
    pub source_step_number: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub id: i64,
    pub skill_id: SkillId,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    pub explanation: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    pub explanation: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender: UserId,
    pub recipient: UserId,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMessage {
    pub id: MessageId,
    pub sender: UserId,
    pub recipient: UserId,
    pub subject: String,
    pub body: String,
    /// `YYYY-MM-DD HH:MM:SS.sss` UTC; sorts lexicographically.
    pub created_at: String,
    pub read_at: Option<String>,
}

impl StoredMessage {
    /// The participant on the other side of this message from `user`'s point of view.
    #[must_use]
    pub fn counterpart(&self, user: UserId) -> UserId {
        if self.sender == user {
            self.recipient
        } else {
            self.sender
        }
    }

    #[must_use]
    pub fn is_unread_by(&self, user: UserId) -> bool {
        self.recipient == user && self.read_at.is_none()
    }
}

/// Outcome of a step-number repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenumberSummary {
    pub skills_touched: usize,
    pub rows_changed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_id_display() {
        assert_eq!(format!("{}", SkillId(42)), "42");
    }

    #[test]
    fn ids_compare() {
        assert_eq!(UserId(1), UserId(1));
        assert_ne!(MessageId(1), MessageId(2));
        assert!(CategoryId(1) < CategoryId(2));
    }

    #[test]
    fn difficulty_parses_synonyms() {
        assert_eq!("Medium".parse::<Difficulty>(), Ok(Difficulty::Intermediate));
        assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Advanced));
        assert_eq!(" basic ".parse::<Difficulty>(), Ok(Difficulty::Basic));
        assert!("expert-ish".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_round_trips_through_as_str() {
        for d in [Difficulty::Basic, Difficulty::Intermediate, Difficulty::Advanced] {
            assert_eq!(d.as_str().parse::<Difficulty>(), Ok(d));
        }
    }

    #[test]
    fn counterpart_and_unread() {
        let msg = StoredMessage {
            id: MessageId(1),
            sender: UserId(10),
            recipient: UserId(20),
            subject: String::new(),
            body: "hi".into(),
            created_at: "2026-01-01 10:00:00.000".into(),
            read_at: None,
        };
        assert_eq!(msg.counterpart(UserId(10)), UserId(20));
        assert_eq!(msg.counterpart(UserId(20)), UserId(10));
        assert!(msg.is_unread_by(UserId(20)));
        assert!(!msg.is_unread_by(UserId(10)));
    }
}
