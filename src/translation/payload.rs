/*!
 * Id-tagged request and response payloads.
 *
 * Every text sent to a provider carries its position as `id`; the response must
 * return `{"translations": [{"id": n, "text": "..."}]}` covering exactly the ids
 * that were sent. Results are ordered by id, never by array position.
 */

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::TranslationError;
use crate::language_utils;

/// A text tagged with its position in the caller's list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedText {
    pub id: usize,
    pub text: String,
}

/// Expected shape of a provider reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationPayload {
    pub translations: Vec<TaggedText>,
}

const USER_PROMPT_HEADER: &str = "Please translate these subtitles:";

/// Tag `texts` with ids starting at `offset`
pub fn tag_texts(texts: &[String], offset: usize) -> Vec<TaggedText> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| TaggedText {
            id: offset + i,
            text: text.clone(),
        })
        .collect()
}

/// System prompt naming the target language in full, so "es" reads as "Spanish"
pub fn build_system_prompt(target_language: &str) -> String {
    let target_language = language_utils::display_language_name(target_language);
    format!(
        "You are a professional subtitle translator. \
         Translate the following subtitle texts from English to {target_language}. \
         Return ONLY a JSON object with a 'translations' array containing objects with 'id' and 'text'. \
         Each translation must keep the same ID as its source text. \
         Keep the same number of lines as the source text and match the layout with new lines."
    )
}

pub fn build_user_prompt(items: &[TaggedText]) -> String {
    let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
    format!("{}\n{}", USER_PROMPT_HEADER, json)
}

/// Recover the tagged items from a user prompt built by [`build_user_prompt`]
pub fn parse_request_items(user_prompt: &str) -> Option<Vec<TaggedText>> {
    let start = user_prompt.find('[')?;
    serde_json::from_str(&user_prompt[start..]).ok()
}

// Some models wrap JSON in a markdown fence even in JSON mode
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Trim a translated text and drop blank lines, which would end an SRT block early
fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate a raw reply against the items that were sent and return it sorted by id
///
/// A blank translation of a non-blank source is malformed.
pub fn parse_response(raw: &str, sent: &[TaggedText]) -> Result<Vec<TaggedText>, TranslationError> {
    let malformed = |msg: String| TranslationError::MalformedResponse(msg);

    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| malformed(format!("invalid JSON: {}", e)))?;

    let items = value
        .get("translations")
        .ok_or_else(|| malformed("response missing 'translations' key".to_string()))?
        .as_array()
        .ok_or_else(|| malformed("'translations' is not an array".to_string()))?;

    if items.len() != sent.len() {
        return Err(malformed(format!(
            "expected {} translations, got {}",
            sent.len(),
            items.len()
        )));
    }

    let expected: HashMap<usize, &str> = sent.iter().map(|t| (t.id, t.text.as_str())).collect();
    let mut seen = HashSet::with_capacity(items.len());
    let mut translations = Vec::with_capacity(items.len());

    for item in items {
        let id = item
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed(format!("item without integer 'id': {}", item)))? as usize;
        let text = item
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(format!("item {} without string 'text'", id)))?;

        let Some(source) = expected.get(&id) else {
            return Err(malformed(format!("unexpected id {}", id)));
        };
        if !seen.insert(id) {
            return Err(malformed(format!("duplicate id {}", id)));
        }

        let text = normalize_text(text);
        if text.is_empty() && !source.trim().is_empty() {
            return Err(malformed(format!("empty translation for id {}", id)));
        }

        translations.push(TaggedText { id, text });
    }

    translations.sort_by_key(|t| t.id);
    Ok(translations)
}
