use paramed_store::types::{Difficulty, NewQuestion, NewStep};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ExtractionError;

/// Procedure steps extracted from one document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepExtraction {
    /// Name of the skill the document teaches.
    pub skill_name: String,
    pub steps: Vec<ExtractedStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStep {
    #[serde(default)]
    pub step_number: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub is_critical: bool,
    /// Estimated duration in seconds.
    #[serde(default, deserialize_with = "lenient_seconds")]
    #[schemars(with = "Option<i64>")]
    pub time_estimate: Option<i64>,
}

/// Multiple-choice questions extracted from one document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizExtraction {
    #[serde(default)]
    pub skill_name: Option<String>,
    pub questions: Vec<ExtractedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index of the correct option.
    pub correct_answer: AnswerKey,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// The correct answer as the model gave it: an index, a letter, or the option text.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum AnswerKey {
    Index(i64),
    Text(String),
}

impl AnswerKey {
    /// Zero-based option index, if it points inside `options`.
    ///
    /// An answer spelling out one of the options wins over reading it as an
    /// index or a letter, so numeric options ("110") resolve by text.
    #[must_use]
    pub fn resolve(&self, options: &[String]) -> Option<usize> {
        let in_range = |i: i64| usize::try_from(i).ok().filter(|&i| i < options.len());
        let by_text = |text: &str| {
            options
                .iter()
                .position(|o| o.trim().eq_ignore_ascii_case(text))
        };
        match self {
            Self::Index(i) => by_text(&i.to_string()).or_else(|| in_range(*i)),
            Self::Text(text) => {
                let text = text.trim();
                if let Some(pos) = by_text(text) {
                    return Some(pos);
                }
                if let Ok(i) = text.parse::<i64>() {
                    return in_range(i);
                }
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) if letter.is_ascii_alphabetic() => {
                        let idx = u8::try_from(letter.to_ascii_uppercase()).ok()? - b'A';
                        in_range(i64::from(idx))
                    }
                    _ => None,
                }
            }
        }
    }
}

fn invalid(msg: impl Into<String>) -> ExtractionError {
    ExtractionError::Invalid(msg.into())
}

impl StepExtraction {
    /// # Errors
    ///
    /// Returns `Invalid` for a blank skill name, no steps, or an untitled step.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.skill_name.trim().is_empty() {
            return Err(invalid("skill name is empty"));
        }
        if self.steps.is_empty() {
            return Err(invalid("no steps extracted"));
        }
        if let Some(pos) = self.steps.iter().position(|s| s.title.trim().is_empty()) {
            return Err(invalid(format!("step {} has no title", pos + 1)));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_new_steps(&self) -> Vec<NewStep> {
        self.steps
            .iter()
            .map(|s| NewStep {
                title: s.title.trim().to_owned(),
                description: s.description.trim().to_owned(),
                key_points: s
                    .key_points
                    .iter()
                    .map(|k| k.trim().to_owned())
                    .filter(|k| !k.is_empty())
                    .collect(),
                is_critical: s.is_critical,
                time_estimate_secs: s.time_estimate,
                source_step_number: s.step_number,
            })
            .collect()
    }
}

impl QuizExtraction {
    /// # Errors
    ///
    /// Returns `Invalid` for no questions, blank question text, fewer than two
    /// options, or an answer outside the options.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.questions.is_empty() {
            return Err(invalid("no questions extracted"));
        }
        for (i, q) in self.questions.iter().enumerate() {
            let n = i + 1;
            if q.question.trim().is_empty() {
                return Err(invalid(format!("question {n} has no text")));
            }
            if q.options.len() < 2 {
                return Err(invalid(format!("question {n} has fewer than two options")));
            }
            if q.correct_answer.resolve(&q.options).is_none() {
                return Err(invalid(format!(
                    "question {n} answer {:?} is not one of its options",
                    q.correct_answer
                )));
            }
        }
        Ok(())
    }

    /// Skill name given by the model, if any and not blank.
    #[must_use]
    pub fn named_skill(&self) -> Option<&str> {
        self.skill_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Convert validated questions; unresolvable answers are skipped.
    #[must_use]
    pub fn to_new_questions(&self) -> Vec<NewQuestion> {
        self.questions
            .iter()
            .filter_map(|q| {
                let index = q.correct_answer.resolve(&q.options)?;
                Some(NewQuestion {
                    question: q.question.trim().to_owned(),
                    options: q.options.iter().map(|o| o.trim().to_owned()).collect(),
                    correct_index: i64::try_from(index).ok()?,
                    explanation: q.explanation.trim().to_owned(),
                    difficulty: q
                        .difficulty
                        .as_deref()
                        .and_then(|d| d.parse().ok())
                        .unwrap_or(Difficulty::Basic),
                })
            })
            .collect()
    }
}

/// Accept `90`, `"90"`, `"2 minutes"` or `"1-2 min"` (first number wins).
#[allow(clippy::cast_possible_truncation)]
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(serde_json::Value::String(s)) => parse_duration_text(&s),
        _ => None,
    })
}

pub(crate) fn parse_duration_text(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();
    let digits: String = lower
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    let amount: i64 = digits.parse().ok()?;
    let is_hours = lower.contains("hour")
        || lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|w| w == "hr" || w == "hrs");
    let multiplier = if is_hours {
        3600
    } else if lower.contains("min") {
        60
    } else {
        1
    };
    amount.checked_mul(multiplier)
}
