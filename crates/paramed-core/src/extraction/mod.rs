//! Typed model responses and the prompts that request them.

pub mod prompt;
pub mod types;

pub use prompt::{QUIZ_PREAMBLE, STEP_PREAMBLE, quiz_prompt, step_prompt, truncate_chars};
pub use types::{AnswerKey, ExtractedQuestion, ExtractedStep, QuizExtraction, StepExtraction};
