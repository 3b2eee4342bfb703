use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for target-language naming and ISO code handling
///
/// Output files are suffixed with a 3-letter code derived from the target
/// language name, while Jellyfin expects 2-letter codes where they exist.

// Bibliographic (639-2/B) codes that differ from the terminological ones isolang knows
const PART2B_TO_PART2T: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

// Output suffixes for the languages users ask for most
const COMMON_OUTPUT_CODES: [(&str, &str); 10] = [
    ("english", "eng"),
    ("spanish", "spa"),
    ("french", "fre"),
    ("german", "ger"),
    ("italian", "ita"),
    ("portuguese", "por"),
    ("russian", "rus"),
    ("japanese", "jpn"),
    ("korean", "kor"),
    ("chinese", "chi"),
];

fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    PART2B_TO_PART2T
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

fn part2t_to_part2b(code: &str) -> Option<&'static str> {
    PART2B_TO_PART2T
        .iter()
        .find(|(_, t)| *t == code)
        .map(|(b, _)| *b)
}

fn capitalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Resolve a language given as an English name or an ISO 639 code
pub fn resolve_language(input: &str) -> Option<Language> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(code) = normalize_to_part2t(trimmed) {
        if let Some(lang) = Language::from_639_3(&code) {
            return Some(lang);
        }
    }

    Language::from_name(&capitalize(trimmed))
}

/// Three-letter suffix used when naming translated output files.
///
/// Well-known names map through a fixed table, other names and codes go through
/// isolang and come out as 639-2/B, and anything unrecognised falls back to the
/// first three letters.
pub fn output_language_code(target_language: &str) -> String {
    let lowered = target_language.trim().to_lowercase();

    if let Some((_, code)) = COMMON_OUTPUT_CODES.iter().find(|(name, _)| *name == lowered) {
        return (*code).to_string();
    }

    // Bibliographic codes win so "fr", "fra" and "French" all name the same file
    if let Some(lang) = resolve_language(&lowered) {
        let code = lang.to_639_3();
        return part2t_to_part2b(code).unwrap_or(code).to_string();
    }

    lowered.chars().take(3).collect()
}

/// Human readable language name for prompts ("es" becomes "Spanish")
pub fn display_language_name(target_language: &str) -> String {
    let trimmed = target_language.trim();
    if trimmed.len() <= 3 {
        if let Ok(name) = get_language_name(trimmed) {
            return name;
        }
    }
    trimmed.to_string()
}

/// Two-letter code used in Jellyfin subtitle names, falling back to 639-2/T
pub fn jellyfin_language_code(input: &str) -> Option<String> {
    let lang = resolve_language(input)?;
    Some(
        lang.to_639_1()
            .map(|c| c.to_string())
            .unwrap_or_else(|| lang.to_639_3().to_string()),
    )
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if let Some(part2t) = part2b_to_part2t(&normalized_code) {
            return Ok(part2t.to_string());
        }
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
