//! Merge a hand-written token stream and print the highlighted text.
//! Runs offline; no model is loaded.

use synth_common::RawToken;
use synth_ner::{normalize_for_inference, Highlighter, MergerOptions, TokenMerger};

fn main() {
    tracing_subscriber::fmt::init();

    let text = "Patient with Type 2 diabetes reports fever and chest pain; started metformin.";
    println!("Model input: {}", normalize_for_inference(text));

    // What a token classifier would emit for the text above
    let tokens = vec![
        RawToken::from_wordpiece("diab", "B-Disease_disorder", 0.97),
        RawToken::from_wordpiece("##etes", "I-Disease_disorder", 0.96),
        RawToken::from_wordpiece("fever", "B-Sign_symptom", 0.99),
        RawToken::from_wordpiece("chest", "B-Biological_structure", 0.91),
        RawToken::from_wordpiece("pain", "B-Sign_symptom", 0.93),
        RawToken::from_wordpiece("met", "B-Medication", 0.95),
        RawToken::from_wordpiece("##form", "I-Medication", 0.94),
        RawToken::from_wordpiece("##in", "I-Medication", 0.94),
    ];

    let merger = TokenMerger::new(MergerOptions::default());
    let entities = merger.merge(&tokens);

    println!("\nFound {} entities:", entities.len());
    for e in &entities {
        println!("  - {} ({})", e.term, e.entity_type);
    }

    let result = Highlighter::default().render(text, &entities);
    println!("\n{}\n\n{}", result.markup, result.listing);
}
