//! Classify text with the in-process DistilBERT model.
//!
//!     cargo run -p synth-ner --example local_model --features local-model

use synth_ner::{NerConfig, NerModel, NerProvider, TokenMerger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("Loading NER model...");
    let start = std::time::Instant::now();
    let model = NerModel::new(NerConfig {
        use_gpu: false,
        ..Default::default()
    })
    .await?;
    println!("Model {} loaded in {:?}", model.model_id(), start.elapsed());

    let text = "the patient was given aspirin for a persistent headache and mild fever";
    let tokens = model.tokens(text).await?;
    for t in &tokens {
        println!("  {:>12} {:<28} {:.2}{}", t.text, t.label, t.score, if t.is_continuation { " (cont)" } else { "" });
    }

    let entities = TokenMerger::default().merge(&tokens);
    println!("\nFound {} entities:", entities.len());
    for e in &entities {
        println!("  - {} ({})", e.term, e.entity_type);
    }
    Ok(())
}
