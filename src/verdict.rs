//! Correctness detection for evaluated answers.
//!
//! The evaluation prompt asks the model to open its reply with the "correct" or
//! "incorrect" keyword followed by a period. This is a purely textual contract and it
//! is deliberately kept in this one place.

use crate::prompt::Keywords;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
    /// Everything after the first period, trimmed.
    pub feedback: String,
}

/// Parses an evaluation reply.
///
/// The answer is correct only if the reply starts with `"<correct>."`. Anything else,
/// including a missing period or a different keyword, counts as incorrect. Feedback
/// is the text after the first period; with no period at all the whole reply is used.
pub fn parse_verdict(response: &str, keywords: &Keywords) -> Verdict {
    let response = response.trim_start();
    let marker = format!("{}.", keywords.correct);
    let is_correct = response.starts_with(&marker);
    let feedback = match response.find('.') {
        Some(idx) => response[idx + 1..].trim(),
        None => response.trim(),
    };
    Verdict {
        is_correct,
        feedback: feedback.to_string(),
    }
}
