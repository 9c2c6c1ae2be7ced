pub const STEP_PREAMBLE: &str = "You are an instructional designer for a paramedic training \
program. You turn procedure handouts into ordered, practical skill steps that a student can \
follow during a practical assessment. Never invent steps that the handout does not support.";

pub const QUIZ_PREAMBLE: &str = "You are an examiner for a paramedic training program. You \
write multiple-choice questions that test understanding of the procedure described in a \
handout. Every question has exactly one correct option.";

/// Longest prefix of `text` holding at most `budget` characters.
#[must_use]
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[must_use]
pub fn step_prompt(file_name: &str, text: &str, budget: usize) -> String {
    let body = truncate_chars(text, budget);
    format!(
        "Document: {file_name}\n\n\
         Extract the skill this document teaches and its procedure steps in order.\n\
         For every step give a short title, a description of at least one sentence, \
         the key points an assessor checks, whether the step is critical to patient \
         safety, and an estimated duration in seconds.\n\
         Number steps from 1 without gaps.\n\n\
         Document text:\n{body}"
    )
}

#[must_use]
pub fn quiz_prompt(file_name: &str, text: &str, budget: usize, questions: usize) -> String {
    let body = truncate_chars(text, budget);
    format!(
        "Document: {file_name}\n\n\
         Write {questions} multiple-choice questions about this procedure.\n\
         Each question has four options, the zero-based index of the correct option, \
         a one-sentence explanation, and a difficulty of basic, intermediate or advanced.\n\
         Also give the name of the skill the document teaches.\n\n\
         Document text:\n{body}"
    )
}
