//! Renders source text with entity words marked, plus an entity listing.

use synth_common::{EntityCollection, HighlightResult};

use crate::normalize::normalize_for_match;

pub const DEFAULT_HIGHLIGHT_STYLE: &str =
    "background-color: #ffcc80; color: black; padding: 2px; border-radius: 4px;";

/// Listing shown when no entity was found.
pub const EMPTY_LISTING: &str = "<p><em>No medical entities detected.</em></p>";

#[derive(Debug, Clone)]
pub struct Highlighter {
    style: String,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self { style: DEFAULT_HIGHLIGHT_STYLE.to_string() }
    }
}

impl Highlighter {
    pub fn new(style: impl Into<String>) -> Self {
        Self { style: style.into() }
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    /// Highlight every whitespace-delimited word of `text` whose
    /// punctuation-free, lowercased form is an entity term.
    ///
    /// Words are rejoined with single spaces, so runs of whitespace and
    /// newlines collapse.
    pub fn render(&self, text: &str, entities: &EntityCollection) -> HighlightResult {
        let markup = text
            .split_whitespace()
            .map(|word| {
                let escaped = escape_html(word);
                let key = normalize_for_match(word);
                if !key.is_empty() && entities.contains_term(&key) {
                    format!("<span style='{}'>{}</span>", self.style, escaped)
                } else {
                    escaped
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        HighlightResult { markup, listing: render_listing(entities) }
    }
}

fn render_listing(entities: &EntityCollection) -> String {
    if entities.is_empty() {
        return EMPTY_LISTING.to_string();
    }
    let items: String = entities
        .iter()
        .map(|e| {
            format!(
                "<li><strong>{}</strong> ({})</li>",
                escape_html(&e.term),
                escape_html(&e.entity_type)
            )
        })
        .collect();
    format!("<ul>{}</ul>", items)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
