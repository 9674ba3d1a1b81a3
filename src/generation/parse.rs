//! Tolerant decoding of backend responses.

use super::prompts::truncate_chars;
use super::questions::{QuestionOutcome, RawQuestion};
use super::summary::{Summary, SummaryOutcome};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Remove a surrounding markdown code fence (```` ```json ```` or bare ```` ``` ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) up to the end of the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode a summary response, degrading to a prefix of the raw text when it is not a JSON object
/// with a `summary` string.
pub fn parse_summary(raw: &str, fallback_chars: usize) -> SummaryOutcome {
    match serde_json::from_str::<Summary>(strip_code_fence(raw)) {
        Ok(summary) => SummaryOutcome::Parsed(summary),
        Err(error) => {
            tracing::warn!(%error, "Summary response was not a summary object; using raw text");
            SummaryOutcome::Degraded(Summary {
                summary: truncate_chars(raw, fallback_chars).to_string(),
                key_points: Vec::new(),
            })
        }
    }
}

/// Decode a question response. Anything other than a JSON array yields [`QuestionOutcome::Empty`].
///
/// Elements are decoded field by field: a field that is absent or has the wrong type is left
/// empty, so validation reports the field that was actually wrong.
pub fn parse_questions(raw: &str) -> QuestionOutcome {
    let items = match serde_json::from_str::<Value>(strip_code_fence(raw)) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            tracing::warn!("Question response was JSON but not an array");
            return QuestionOutcome::Empty;
        }
        Err(error) => {
            tracing::warn!(%error, "Question response was not valid JSON");
            return QuestionOutcome::Empty;
        }
    };

    QuestionOutcome::Parsed(items.into_iter().map(decode_question).collect())
}

fn decode_question(item: Value) -> RawQuestion {
    let Value::Object(mut fields) = item else {
        return RawQuestion::default();
    };
    RawQuestion {
        question_text: take_field(&mut fields, "question_text"),
        options: take_field(&mut fields, "options"),
        correct_index: take_field(&mut fields, "correct_index"),
        explanation: take_field(&mut fields, "explanation"),
        difficulty: take_field(&mut fields, "difficulty"),
    }
}

fn take_field<T: DeserializeOwned>(fields: &mut Map<String, Value>, name: &str) -> Option<T> {
    let value = fields.remove(name)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            tracing::debug!(field = name, %error, "Ignoring mistyped question field");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_and_bare_summaries_parse_identically() {
        let fenced = "```json\n{\"summary\":\"x\",\"key_points\":[]}\n```";
        let bare = "{\"summary\":\"x\",\"key_points\":[]}";

        assert_eq!(parse_summary(fenced, 500), parse_summary(bare, 500));
        assert_eq!(
            parse_summary(bare, 500),
            SummaryOutcome::Parsed(Summary {
                summary: "x".into(),
                key_points: vec![],
            })
        );
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        assert_eq!(strip_code_fence("  ```\n[1, 2]\n```  "), "[1, 2]");
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("\n{\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn non_json_summary_degrades_to_raw_prefix() {
        let raw = "z".repeat(800);
        let outcome = parse_summary(&raw, 500);

        let SummaryOutcome::Degraded(summary) = outcome else {
            panic!("expected degraded summary");
        };
        assert_eq!(summary.summary, "z".repeat(500));
        assert!(summary.key_points.is_empty());
    }

    #[test]
    fn missing_key_points_default_to_empty() {
        let outcome = parse_summary("{\"summary\":\"short\"}", 500);
        assert!(matches!(
            outcome,
            SummaryOutcome::Parsed(ref summary) if summary.key_points.is_empty()
        ));
    }

    #[test]
    fn null_or_scalar_key_points_keep_the_parsed_summary() {
        let expected = SummaryOutcome::Parsed(Summary {
            summary: "Offices merge.".into(),
            key_points: vec![],
        });
        let null_points = r#"{"summary":"Offices merge.","key_points":null}"#;
        let scalar_points = r#"{"summary":"Offices merge.","key_points":"Merge"}"#;

        assert_eq!(parse_summary(null_points, 500), expected);
        assert_eq!(parse_summary(scalar_points, 500), expected);

        let mixed_points = r#"{"summary":"Fees rise.","key_points":["Fees",3]}"#;
        assert_eq!(
            parse_summary(mixed_points, 500),
            SummaryOutcome::Parsed(Summary {
                summary: "Fees rise.".into(),
                key_points: vec!["Fees".into()],
            })
        );
    }

    #[test]
    fn summary_without_summary_string_degrades() {
        let raw = r#"{"summary":42,"key_points":[]}"#;
        assert_eq!(
            parse_summary(raw, 500),
            SummaryOutcome::Degraded(Summary {
                summary: raw.into(),
                key_points: vec![],
            })
        );
    }

    #[test]
    fn non_json_questions_are_empty() {
        assert_eq!(
            parse_questions("Sorry, I cannot help."),
            QuestionOutcome::Empty
        );
        assert_eq!(
            parse_questions("{\"question_text\":\"q\"}"),
            QuestionOutcome::Empty
        );
    }

    #[test]
    fn malformed_elements_are_kept_for_validation() {
        let raw = r#"```json
[
  {"question_text":"Q1","options":["a","b","c","d"],"correct_index":2,"explanation":"e"},
  {"question_text":"Q2","options":"not a list"}
]
```"#;

        let QuestionOutcome::Parsed(questions) = parse_questions(raw) else {
            panic!("expected parsed questions");
        };
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct_index, Some(2));
        assert_eq!(questions[1].question_text.as_deref(), Some("Q2"));
        assert_eq!(questions[1].options, None);
    }

    #[test]
    fn mistyped_field_only_clears_that_field() {
        let raw = r#"[
  {"question_text":"Q","options":["a","b","c","d"],"correct_index":"1","explanation":"e"},
  "not an object"
]"#;

        let QuestionOutcome::Parsed(questions) = parse_questions(raw) else {
            panic!("expected parsed questions");
        };
        assert_eq!(
            questions[0],
            RawQuestion {
                question_text: Some("Q".into()),
                options: Some(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
                correct_index: None,
                explanation: Some("e".into()),
                difficulty: None,
            }
        );
        assert_eq!(questions[1], RawQuestion::default());
    }
}
