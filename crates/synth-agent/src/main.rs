//! Synth: medical entity highlighter and term explainer.
//! Entry point for the `synth` binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use synth_agent::config::{Config, NerBackend};
use synth_agent::{Analysis, ExplainOutcome, Pipeline};
use synth_llm::{ExplanationProvider, MedicalExplainer, OpenAiCompatibleBackend};
use synth_ner::{HttpNerConfig, HttpNerProvider, NerProvider};

#[derive(Parser)]
#[command(name = "synth", version, about = "Highlight and explain medical terms in clinical text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and highlight medical entities, optionally explaining some of them
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
#[command(group(ArgGroup::new("input").required(true).args(["text", "pdf"])))]
struct AnalyzeArgs {
    /// Text to analyze
    #[arg(long)]
    text: Option<String>,

    /// PDF document to analyze
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Entity to explain (repeatable; selected terms are explained together)
    #[arg(long = "select", short = 's')]
    select: Vec<String>,

    /// Print the analysis as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    analysis: &'a Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<&'a ExplainOutcome>,
}

async fn build_ner_provider(config: &Config) -> anyhow::Result<Arc<dyn NerProvider>> {
    match config.ner.provider {
        NerBackend::Http => {
            let token = config.ner.resolved_api_token();
            if token.is_none() {
                warn!("No NER API token found (set ner.api_token, SYNTH_HF_TOKEN or HF_TOKEN)");
            }
            Ok(Arc::new(HttpNerProvider::new(HttpNerConfig {
                endpoint: config.ner.endpoint.clone(),
                model_id: config.ner.model_id.clone(),
                api_token: token,
            })))
        }
        #[cfg(feature = "local-model")]
        NerBackend::Local => {
            let model = synth_ner::NerModel::new(synth_ner::NerConfig {
                model_id: config.ner.model_id.clone(),
                max_length: config.ner.max_length,
                use_gpu: config.ner.use_gpu,
            })
            .await?;
            Ok(Arc::new(model))
        }
        #[cfg(not(feature = "local-model"))]
        NerBackend::Local => anyhow::bail!(
            "ner.provider = \"local\" requires building synth with `--features local-model`"
        ),
    }
}

fn build_explainer(config: &Config) -> Arc<dyn ExplanationProvider> {
    let settings = &config.explanation;
    let key = settings.resolved_api_key();
    if key.is_none() {
        warn!("No explanation API key found (set explanation.api_key, SYNTH_OPENROUTER_API_KEY or OPENROUTER_API_KEY)");
    }
    let mut backend = OpenAiCompatibleBackend::new(&settings.base_url, &settings.model, key);
    if let Some(referer) = &settings.referer {
        backend = backend.with_referer(referer);
    }
    Arc::new(MedicalExplainer::new(backend).with_max_tokens(settings.max_tokens))
}

async fn run_analyze(pipeline: &Pipeline, args: AnalyzeArgs) -> anyhow::Result<()> {
    let analysis = match (&args.text, &args.pdf) {
        (Some(text), _) => pipeline.analyze(text).await,
        (None, Some(path)) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            pipeline
                .analyze_document(&bytes)
                .await
                .with_context(|| format!("Could not extract text from {}", path.display()))?
        }
        (None, None) => anyhow::bail!("either --text or --pdf is required"),
    };

    let explanation = if args.select.is_empty() {
        None
    } else {
        Some(pipeline.explain_selection(&analysis.entities, args.select.as_slice()).await)
    };

    if args.json {
        let report = Report { analysis: &analysis, explanation: explanation.as_ref() };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", analysis.highlight.markup);
    println!();
    println!("{}", analysis.highlight.listing);
    if let Some(outcome) = &explanation {
        println!();
        println!("{}", outcome.display_text());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("synth=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Synth v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!(
        "Configuration loaded. NER: {:?} ({}), explanations: {}",
        config.ner.provider, config.ner.model_id, config.explanation.model
    );

    let ner = build_ner_provider(&config).await?;
    let explainer = build_explainer(&config);
    let pipeline = Pipeline::new(ner, explainer).with_config(&config);

    match cli.command {
        Commands::Analyze(args) => run_analyze(&pipeline, args).await,
    }
}
