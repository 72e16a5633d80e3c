//! Text normalisation for model input and for highlight matching.
//!
//! Model input keeps only ASCII letters, digits and whitespace. Highlight
//! matching works on a single word and keeps any Unicode alphanumeric.

use regex::Regex;

fn lazy_inference_regex() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s]").unwrap())
}

/// Prepare free text for the NER model: strip symbols and lowercase.
pub fn normalize_for_inference(text: &str) -> String {
    lazy_inference_regex().replace_all(text, "").to_lowercase()
}

/// Comparison key for one whitespace-delimited word of the original text.
pub fn normalize_for_match(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
