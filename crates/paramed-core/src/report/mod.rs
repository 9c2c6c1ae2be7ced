//! Read-only catalogue reports. Every call is a fresh snapshot.

pub mod progress;
pub mod quality;
pub mod quiz;

pub use progress::{CategoryProgress, ProgressReport};
pub use quality::{IssueCategory, QualityBand, QualityIssue, QualityReport, SkillQuality, assess_skill};
pub use quiz::{QuizIssue, QuizIssueKind, QuizValidation, question_issues};
