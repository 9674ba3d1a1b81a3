//! Validation of generated questions before persistence.

use crate::{
    generation::RawQuestion,
    store::{Difficulty, QuestionRecord},
};
use std::fmt;

const OPTION_COUNT: usize = 4;

/// Reason a generated question was not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionDefect {
    /// `question_text` missing or blank.
    MissingText,
    /// `options` missing or not exactly four entries.
    WrongOptionCount(usize),
    /// `correct_index` missing.
    MissingCorrectIndex,
    /// `correct_index` outside `0..=3`.
    CorrectIndexOutOfRange(i64),
    /// `explanation` missing.
    MissingExplanation,
}

impl fmt::Display for QuestionDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingText => f.write_str("missing question_text"),
            Self::WrongOptionCount(count) => write!(f, "expected 4 options, got {count}"),
            Self::MissingCorrectIndex => f.write_str("missing correct_index"),
            Self::CorrectIndexOutOfRange(index) => write!(f, "correct_index {index} out of range"),
            Self::MissingExplanation => f.write_str("missing explanation"),
        }
    }
}

/// Questions split into persistable records and rejects.
#[derive(Debug, Default, PartialEq)]
pub struct ShapedQuestions {
    /// Records ready for a single bulk insert, in backend order.
    pub accepted: Vec<QuestionRecord>,
    /// Position and defect of every rejected item.
    pub dropped: Vec<(usize, QuestionDefect)>,
}

/// Tag every well-formed question with `document_id` and drop the rest.
pub fn shape_questions(document_id: &str, raw: Vec<RawQuestion>) -> ShapedQuestions {
    let mut shaped = ShapedQuestions::default();
    for (position, question) in raw.into_iter().enumerate() {
        match validate(document_id, question) {
            Ok(record) => shaped.accepted.push(record),
            Err(defect) => {
                tracing::warn!(position, %defect, "Dropping malformed generated question");
                shaped.dropped.push((position, defect));
            }
        }
    }
    shaped
}

fn validate(document_id: &str, raw: RawQuestion) -> Result<QuestionRecord, QuestionDefect> {
    let question_text = raw
        .question_text
        .filter(|text| !text.trim().is_empty())
        .ok_or(QuestionDefect::MissingText)?;
    let options = raw.options.unwrap_or_default();
    if options.len() != OPTION_COUNT {
        return Err(QuestionDefect::WrongOptionCount(options.len()));
    }
    let Some(index) = raw.correct_index else {
        return Err(QuestionDefect::MissingCorrectIndex);
    };
    let correct_index = u8::try_from(index)
        .ok()
        .filter(|candidate| usize::from(*candidate) < OPTION_COUNT)
        .ok_or(QuestionDefect::CorrectIndexOutOfRange(index))?;
    let explanation = raw.explanation.ok_or(QuestionDefect::MissingExplanation)?;

    Ok(QuestionRecord {
        document_id: document_id.to_string(),
        question_text,
        options,
        correct_index,
        explanation,
        difficulty: Difficulty::from_label(raw.difficulty.as_deref()),
    })
}
