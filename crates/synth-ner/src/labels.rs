//! Label parsing: split a model label into a boundary marker and a bare category.

use std::fmt;

/// Positional qualifier carried by a tagged label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    Begin,
    Inside,
    End,
    Single,
    Outside,
    /// The label carried no positional prefix.
    Untagged,
}

/// The semantic type assigned to a span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Named(String),
    /// A span that started with an orphan continuation fragment.
    Unclassified,
}

impl Category {
    pub const UNCLASSIFIED: &'static str = "UNCLASSIFIED";

    pub fn as_str(&self) -> &str {
        match self {
            Category::Named(name) => name,
            Category::Unclassified => Self::UNCLASSIFIED,
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Category::Unclassified)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    pub boundary: Boundary,
    pub category: Category,
}

/// A labelling convention. Swap the scheme to support other taggers.
pub trait LabelScheme: Send + Sync {
    fn parse(&self, label: &str) -> ParsedLabel;
}

/// BIO / BIOES / BILOU prefixes (`B-`, `I-`, `E-`, `S-`, `L-`, `U-`) and the bare `O` tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct BioScheme;

impl LabelScheme for BioScheme {
    fn parse(&self, label: &str) -> ParsedLabel {
        let label = label.trim();
        if label == "O" {
            return ParsedLabel {
                boundary: Boundary::Outside,
                category: Category::Named(label.to_string()),
            };
        }

        let tagged = label.split_once('-').and_then(|(prefix, rest)| {
            let boundary = match prefix {
                "B" | "b" => Boundary::Begin,
                "I" | "i" => Boundary::Inside,
                "E" | "e" | "L" | "l" => Boundary::End,
                "S" | "s" | "U" | "u" => Boundary::Single,
                _ => return None,
            };
            (!rest.is_empty()).then(|| (boundary, rest))
        });

        match tagged {
            Some((boundary, rest)) => ParsedLabel {
                boundary,
                category: Category::Named(rest.to_string()),
            },
            None => ParsedLabel {
                boundary: Boundary::Untagged,
                category: Category::Named(label.to_string()),
            },
        }
    }
}
