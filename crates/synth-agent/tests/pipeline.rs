//! End-to-end pipeline behaviour with scripted providers.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use synth_agent::config::Config;
use synth_agent::{ExplainOutcome, Pipeline};
use synth_common::{Entity, RawToken};
use synth_llm::{ExplanationProvider, LlmError, MedicalExplainer, OpenAiCompatibleBackend};
use synth_ner::{HttpNerConfig, HttpNerProvider, NerError, NerProvider, DEFAULT_HIGHLIGHT_STYLE, EMPTY_LISTING};
use synth_test_utils::pretty_assertions::assert_eq;
use synth_test_utils::{build_pdf, cont, inference_body, init_tracing, tok, MockServer};

// ── Fakes ─────────────────────────────────────────────────────────────────────

/// Returns a fixed token stream and records what it was asked to classify.
struct ScriptedNer {
    tokens: Vec<RawToken>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedNer {
    fn new(tokens: Vec<RawToken>) -> Arc<Self> {
        Arc::new(Self { tokens, seen: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl NerProvider for ScriptedNer {
    async fn tokens(&self, text: &str) -> synth_ner::Result<Vec<RawToken>> {
        self.seen.lock().unwrap().push(text.to_string());
        Ok(self.tokens.clone())
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

struct FailingNer;

#[async_trait]
impl NerProvider for FailingNer {
    async fn tokens(&self, _text: &str) -> synth_ner::Result<Vec<RawToken>> {
        Err(NerError::Api { status: 503, message: "model is loading".to_string() })
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

struct SlowNer;

#[async_trait]
impl NerProvider for SlowNer {
    async fn tokens(&self, _text: &str) -> synth_ner::Result<Vec<RawToken>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    }

    fn model_id(&self) -> &str {
        "slow"
    }
}

/// Runs synchronous work on the blocking pool, as the in-process model does.
struct BlockingNer;

#[async_trait]
impl NerProvider for BlockingNer {
    async fn tokens(&self, _text: &str) -> synth_ner::Result<Vec<RawToken>> {
        tokio::task::spawn_blocking(|| {
            std::thread::sleep(Duration::from_millis(500));
            vec![tok("fever", "B-Sign_symptom")]
        })
        .await
        .map_err(|e| NerError::Inference(e.to_string()))
    }

    fn model_id(&self) -> &str {
        "blocking"
    }
}

/// Replies with a canned result (or hangs) and records every query.
struct CannedExplainer {
    reply: Option<Result<String, (u16, String)>>,
    calls: Mutex<Vec<String>>,
}

impl CannedExplainer {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self { reply: Some(Ok(text.to_string())), calls: Mutex::new(Vec::new()) })
    }

    fn failing(status: u16, message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(Err((status, message.to_string()))),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self { reply: None, calls: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExplanationProvider for CannedExplainer {
    async fn explain(&self, term: &str) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(term.to_string());
        match &self.reply {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err((status, message))) => {
                Err(LlmError::ApiError { status: *status, message: message.clone() })
            }
            None => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(String::new())
            }
        }
    }
}

fn clinical_tokens() -> Vec<RawToken> {
    vec![
        tok("diab", "B-Disease_disorder"),
        cont("etes", "I-Disease_disorder"),
        tok("fever", "B-Sign_symptom"),
        tok("and", "B-Sign_symptom"),
        tok("Fever", "B-Sign_symptom"),
    ]
}

fn span(word: &str) -> String {
    format!("<span style='{}'>{}</span>", DEFAULT_HIGHLIGHT_STYLE, word)
}

// ── Analysis ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn analyze_highlights_merged_entities() {
    init_tracing();
    let ner = ScriptedNer::new(clinical_tokens());
    let pipeline = Pipeline::new(ner.clone(), CannedExplainer::ok("unused."));

    let analysis = pipeline.analyze("Patient has Diabetes,  and fever!").await;

    assert_eq!(
        ner.seen.lock().unwrap().as_slice(),
        &["patient has diabetes  and fever".to_string()]
    );
    assert_eq!(
        analysis.entities.as_slice(),
        &[
            Entity::new("diabetes", "Disease_disorder"),
            Entity::new("fever", "Sign_symptom"),
        ]
    );
    assert_eq!(
        analysis.highlight.markup,
        format!("Patient has {} and {}", span("Diabetes,"), span("fever!"))
    );
    assert_eq!(
        analysis.highlight.listing,
        "<ul><li><strong>diabetes</strong> (Disease_disorder)</li>\
         <li><strong>fever</strong> (Sign_symptom)</li></ul>"
    );
    assert_eq!(analysis.extraction_failure, None);
}

#[tokio::test]
async fn ner_failure_renders_without_entities() {
    let pipeline = Pipeline::new(Arc::new(FailingNer), CannedExplainer::ok("unused."));

    let analysis = pipeline.analyze("Chest pain after exercise").await;

    assert!(analysis.entities.is_empty());
    assert_eq!(analysis.highlight.markup, "Chest pain after exercise");
    assert_eq!(analysis.highlight.listing, EMPTY_LISTING);
    let reason = analysis.extraction_failure.expect("failure recorded");
    assert!(reason.contains("model is loading"), "{}", reason);
}

#[tokio::test]
async fn ner_timeout_is_reported() {
    let pipeline = Pipeline::new(Arc::new(SlowNer), CannedExplainer::ok("unused."))
        .with_timeouts(Duration::from_millis(50), Duration::from_secs(1));

    let analysis = pipeline.analyze("Headache").await;

    assert!(analysis.entities.is_empty());
    assert!(analysis.extraction_failure.unwrap().contains("timed out"));
}

#[tokio::test]
async fn ner_timeout_covers_blocking_inference() {
    let pipeline = Pipeline::new(Arc::new(BlockingNer), CannedExplainer::ok("unused."))
        .with_timeouts(Duration::from_millis(50), Duration::from_secs(1));

    let started = Instant::now();
    let analysis = pipeline.analyze("fever").await;

    assert!(started.elapsed() < Duration::from_millis(400), "took {:?}", started.elapsed());
    assert!(analysis.entities.is_empty());
    assert!(analysis.extraction_failure.unwrap().contains("timed out"));
}

#[tokio::test]
async fn config_controls_merging_and_style() {
    let config = Config::parse(
        r#"
        [ner]
        keep_unclassified = true
        extra_stopwords = ["fever"]

        [highlight]
        style = "font-weight: bold;"
        "#,
    )
    .unwrap();
    let ner = ScriptedNer::new(vec![cont("itis", "I-Disease_disorder"), tok("fever", "B-Sign_symptom")]);
    let pipeline = Pipeline::new(ner, CannedExplainer::ok("unused.")).with_config(&config);

    let analysis = pipeline.analyze("itis fever").await;

    assert_eq!(analysis.entities.as_slice(), &[Entity::new("itis", "UNCLASSIFIED")]);
    assert_eq!(
        analysis.highlight.markup,
        "<span style='font-weight: bold;'>itis</span> fever"
    );
}

#[tokio::test]
async fn analyze_document_reads_every_page() {
    let ner = ScriptedNer::new(vec![tok("aspirin", "B-Medication")]);
    let pipeline = Pipeline::new(ner.clone(), CannedExplainer::ok("unused."));

    let pdf = build_pdf(&["Patient reports fever", "Prescribed aspirin"]);
    let analysis = pipeline.analyze_document(&pdf).await.unwrap();

    assert!(analysis.text.contains("fever"));
    assert!(analysis.text.contains("aspirin"));
    assert!(analysis.highlight.markup.contains(&span("aspirin")));
    assert_eq!(ner.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unreadable_document_is_an_error() {
    let ner = ScriptedNer::new(Vec::new());
    let pipeline = Pipeline::new(ner.clone(), CannedExplainer::ok("unused."));

    assert!(pipeline.analyze_document(b"%PDF-not-really").await.is_err());
    assert!(ner.seen.lock().unwrap().is_empty());
}

// ── Selection ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_selection_makes_no_call() {
    let explainer = CannedExplainer::ok("unused.");
    let pipeline = Pipeline::new(ScriptedNer::new(clinical_tokens()), explainer.clone());
    let analysis = pipeline.analyze("diabetes and fever").await;

    let none: [&str; 0] = [];
    assert_eq!(pipeline.explain_selection(&analysis.entities, &none).await, ExplainOutcome::EmptySelection);
    assert_eq!(
        pipeline.explain_selection(&analysis.entities, &["migraine"]).await,
        ExplainOutcome::EmptySelection
    );
    assert!(explainer.calls().is_empty());
}

#[tokio::test]
async fn selected_terms_are_joined_in_collection_order() {
    let explainer = CannedExplainer::ok("Both are common.");
    let pipeline = Pipeline::new(ScriptedNer::new(clinical_tokens()), explainer.clone());
    let analysis = pipeline.analyze("diabetes and fever").await;

    let outcome = pipeline.explain_selection(&analysis.entities, &["fever", "diabetes"]).await;

    assert_eq!(explainer.calls(), vec!["diabetes fever".to_string()]);
    assert_eq!(
        outcome,
        ExplainOutcome::Explained {
            term: "diabetes fever".to_string(),
            text: "Both are common.".to_string(),
        }
    );
}

#[tokio::test]
async fn explanation_failure_becomes_message() {
    let pipeline = Pipeline::new(
        ScriptedNer::new(clinical_tokens()),
        CannedExplainer::failing(429, "rate limited"),
    );
    let analysis = pipeline.analyze("fever").await;

    let outcome = pipeline.explain_selection(&analysis.entities, &["fever"]).await;

    assert_eq!(
        outcome,
        ExplainOutcome::Failed {
            term: "fever".to_string(),
            message: "❌ Error from explanation API: rate limited".to_string(),
        }
    );
}

#[tokio::test]
async fn explanation_timeout_becomes_message() {
    let pipeline = Pipeline::new(ScriptedNer::new(clinical_tokens()), CannedExplainer::hanging())
        .with_timeouts(Duration::from_secs(1), Duration::from_millis(50));
    let analysis = pipeline.analyze("fever").await;

    match pipeline.explain_selection(&analysis.entities, &["fever"]).await {
        ExplainOutcome::Failed { message, .. } => {
            assert!(message.starts_with("❌ Error from explanation API: "));
            assert!(message.contains("timed out"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

// ── Over HTTP ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn http_providers_end_to_end() {
    init_tracing();
    let ner_server = MockServer::respond_once(
        200,
        inference_body(&[
            ("hyper", "B-Disease_disorder"),
            ("##tension", "I-Disease_disorder"),
            ("the", "O"),
            ("lisin", "B-Medication"),
            ("##opril", "I-Medication"),
        ]),
    )
    .await;
    let llm_server = MockServer::respond_once(
        200,
        r#"{"choices":[{"message":{"content":"Hypertension is high blood pressure. Lisinopril treats it. It is"}}]}"#,
    )
    .await;

    let ner = HttpNerProvider::new(HttpNerConfig {
        endpoint: ner_server.url(),
        ..Default::default()
    });
    let explainer = MedicalExplainer::new(OpenAiCompatibleBackend::new(
        llm_server.url(),
        "openai/gpt-4o-mini",
        Some("sk-test".to_string()),
    ));
    let pipeline = Pipeline::new(Arc::new(ner), Arc::new(explainer));

    let analysis = pipeline.analyze("Hypertension; the patient takes Lisinopril.").await;
    assert_eq!(analysis.entities.terms(), vec!["hypertension", "lisinopril"]);
    assert!(ner_server.request().await.contains("hypertension the patient takes lisinopril"));

    let outcome = pipeline
        .explain_selection(&analysis.entities, &["lisinopril", "hypertension"])
        .await;
    assert_eq!(
        outcome.display_text(),
        "Hypertension is high blood pressure. Lisinopril treats it."
    );
    assert!(llm_server
        .request()
        .await
        .contains("Explain the medical term: hypertension lisinopril in clear and concise."));
}
