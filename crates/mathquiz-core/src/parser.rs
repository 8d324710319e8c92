//! Question parsing and validation.
//!
//! Loads question pools from `questions.json` files and extracts questions
//! from free-form LLM output, which may wrap the JSON in prose or markdown.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::error::QuizError;
use crate::model::{Question, RawQuestion};

/// Parse a `questions.json` file into a question pool.
pub fn load_question_file(path: &Path) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question file: {}", path.display()))?;

    parse_question_file_str(&content, path)
}

/// Parse question file contents (useful for testing).
///
/// Unlike generated output, a question file must be well-formed: any invalid
/// entry fails the whole file. Questions without an ID are numbered after
/// the highest explicit ID.
pub fn parse_question_file_str(content: &str, source_path: &Path) -> Result<Vec<Question>> {
    let mut questions: Vec<Question> = serde_json::from_str(content)
        .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?;
    assign_missing_ids(&mut questions);
    Ok(questions)
}

/// Give every question with ID 0 a fresh ID above the current maximum.
pub fn assign_missing_ids(questions: &mut [Question]) {
    let mut next = questions.iter().map(|q| q.id).max().unwrap_or(0) + 1;
    for q in questions.iter_mut().filter(|q| q.id == 0) {
        q.id = next;
        next += 1;
    }
}

/// Extract questions from an LLM completion.
///
/// Strategies are tried in order until one yields a JSON value holding
/// questions:
/// 1. the whole response as JSON
/// 2. the first fenced ```json (or untagged ```) block
/// 3. the outermost `[ ... ]` slice
/// 4. the outermost `{ ... }` slice
///
/// A JSON object is accepted if it carries a `questions` array. Entries that
/// do not form a valid question are skipped with a warning. Generated
/// questions are numbered from 1 in response order.
pub fn parse_generated_questions(response: &str) -> Result<Vec<Question>, QuizError> {
    let value = candidate_values(response)
        .into_iter()
        .find_map(|text| serde_json::from_str::<Value>(&text).ok().and_then(question_array))
        .ok_or_else(|| QuizError::MalformedResponse("no JSON question array found".into()))?;

    let mut questions = Vec::new();
    for (i, entry) in value.into_iter().enumerate() {
        let parsed = RawQuestion::deserialize(&entry)
            .map_err(|e| QuizError::MalformedResponse(e.to_string()))
            .and_then(Question::try_from);
        match parsed {
            Ok(mut q) => {
                q.id = questions.len() as u32 + 1;
                questions.push(q);
            }
            Err(e) => tracing::warn!("skipping generated question {}: {}", i + 1, e),
        }
    }

    if questions.is_empty() {
        return Err(QuizError::MalformedResponse(
            "response contained no usable questions".into(),
        ));
    }
    Ok(questions)
}

fn candidate_values(response: &str) -> Vec<String> {
    let mut candidates = vec![response.trim().to_string()];
    if let Some(block) = extract_json_block(response) {
        candidates.push(block);
    }
    if let Some(slice) = outer_slice(response, '[', ']') {
        candidates.push(slice.to_string());
    }
    if let Some(slice) = outer_slice(response, '{', '}') {
        candidates.push(slice.to_string());
    }
    candidates
}

fn question_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn outer_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Extract the contents of the first fenced JSON block.
///
/// A ```json block is preferred over an untagged ``` block; blocks in other
/// languages are ignored. An unclosed trailing block is still returned.
pub fn extract_json_block(response: &str) -> Option<String> {
    let mut json_block = None;
    let mut generic_block = None;
    let mut in_block = false;
    let mut is_json = false;
    let mut is_generic = false;
    let mut current = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json = lang == "json";
            is_generic = lang.is_empty();
            current.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json && json_block.is_none() {
                json_block = Some(current.clone());
            } else if is_generic && generic_block.is_none() {
                generic_block = Some(current.clone());
            }
            continue;
        }

        if in_block {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    // Truncated responses can leave the last block open
    if in_block && !current.is_empty() {
        if is_json && json_block.is_none() {
            json_block = Some(current);
        } else if is_generic && generic_block.is_none() {
            generic_block = Some(current);
        }
    }

    json_block.or(generic_block)
}

/// A non-fatal problem found in a question pool.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<u32>,
    /// Warning message.
    pub message: String,
}

/// Validate a question pool for common issues.
pub fn validate_questions(questions: &[Question]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for q in questions {
        if !seen_ids.insert(q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: format!("duplicate question ID: {}", q.id),
            });
        }
    }

    let mut seen_text = HashSet::new();
    for q in questions {
        if q.question.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "question text is empty".into(),
            });
        } else if !seen_text.insert(q.question.trim().to_lowercase()) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "question text duplicates an earlier question".into(),
            });
        }
    }

    for q in questions {
        let distinct: HashSet<&str> = q.options.iter().map(|o| o.trim()).collect();
        if distinct.len() != q.options.len() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "options are not distinct".into(),
            });
        }
        if q.options.iter().any(|o| o.trim().is_empty()) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "an option is empty".into(),
            });
        }
    }

    for q in questions {
        if q.explanation.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "explanation is empty".into(),
            });
        }
    }

    if questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "question pool is empty".into(),
        });
    }

    warnings
}
