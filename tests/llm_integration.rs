//! Integration tests against a live model.
//!
//! These tests make real API calls to OpenRouter.
//! Run with: OPENROUTER_API_KEY=your_key cargo test --test llm_integration -- --ignored

use std::sync::Arc;

use reel_forge::agents::{Brief, ScriptwriterAgent, TemplateMode};
use reel_forge::llm::{GenerationRequest, LiteLlmClient, LlmProvider, Message};
use reel_forge::pipeline::{Orchestrator, PipelineConfig};

fn get_test_api_key() -> String {
    std::env::var("OPENROUTER_API_KEY")
        .expect("OPENROUTER_API_KEY environment variable must be set for integration tests")
}

fn create_test_client() -> LiteLlmClient {
    LiteLlmClient::new_with_defaults(get_test_api_key())
}

fn test_brief() -> Brief {
    Brief::new(
        "Lumen",
        "A calm project management app for small design studios, in teal and white.",
    )
    .with_target_audience("studio leads")
    .with_tone("friendly and upbeat")
    .with_call_to_action("Start your free trial at lumen.app")
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_generation() {
    let client = create_test_client();

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system("You are a helpful assistant. Reply concisely."),
            Message::user("What is 2 + 2? Reply with just the number."),
        ],
    )
    .with_max_tokens(10)
    .with_temperature(0.0);

    let response = client.generate(request).await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let response = response.expect("Should have response");
    let content = response.first_content().expect("Should have content");
    assert!(
        content.contains('4'),
        "Response should contain '4', got: {}",
        content
    );
}

#[tokio::test]
#[ignore]
async fn test_live_scriptwriter() {
    let agent = ScriptwriterAgent::with_defaults(Arc::new(create_test_client()));

    let (_framework, beats) = agent
        .write_script(&test_brief(), TemplateMode::Viable.beat_count())
        .await
        .expect("script should be written");

    assert_eq!(beats.len(), TemplateMode::Viable.beat_count());
    assert!(beats.iter().all(|b| !b.trim().is_empty()));
}

#[tokio::test]
#[ignore]
async fn test_live_template_pipeline() {
    let orchestrator = Orchestrator::new(Arc::new(create_test_client()), PipelineConfig::default());

    let run = orchestrator.run(test_brief(), TemplateMode::Viable).await;

    assert_eq!(run.plan.template, "viable");
    assert_eq!(run.plan.scenes().len(), 6);
    assert!(run.plan.body.template_data().is_some());
    assert!(run.state.refinement_count <= 2);
    assert!((0.0..=1.0).contains(&run.plan.quality_score));
}

#[tokio::test]
#[ignore]
async fn test_live_freeform_pipeline() {
    let orchestrator = Orchestrator::new(Arc::new(create_test_client()), PipelineConfig::default());

    let run = orchestrator.run(test_brief(), TemplateMode::Freeform).await;

    assert_eq!(run.plan.template, "freeform");
    assert!(!run.plan.scenes().is_empty());
    assert!(!run.plan.audio_events.is_empty());
    assert!(run.plan.total_duration > 0.0);
}

#[tokio::test]
async fn test_invalid_api_key() {
    let client = LiteLlmClient::new_with_defaults("invalid-key".to_string());

    let request = GenerationRequest::new("", vec![Message::user("test")]).with_max_tokens(5);

    let response = client.generate(request).await;
    assert!(response.is_err(), "Should fail with invalid API key");
}
