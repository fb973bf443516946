//! Scriptwriter Agent: narration broken into narrative beats.
//!
//! Asks the model for a fixed number of beats (8 freeform, 6 for the viable
//! template). Anything other than a non-empty list of non-blank strings is
//! rejected and replaced with a deterministic script built from the brief,
//! whose last beat is always the brief's call-to-action.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::llm::LlmProvider;

use super::error::{AgentError, AgentResult};
use super::step::{complete, lenient_text, parse_json_response, PipelineStep, StepOutcome};
use super::types::{Brief, NarrativeFramework, PipelineState};

/// System prompt for script writing.
const SCRIPT_SYSTEM_PROMPT: &str = r#"You are a senior copywriter who writes narration for short product marketing videos.

Write tight, spoken-language beats: one or two short sentences each, no stage directions, no emoji.
Pick the storytelling framework that suits the product: "aida", "pas", "bab" or "story".

Output Format:
You MUST respond with ONLY a JSON object in this exact format:
{
  "framework": "<aida|pas|bab|story>",
  "beats": ["<beat 1>", "<beat 2>", ...]
}

Do not include any text outside the JSON object."#;

/// User prompt template for script writing.
const SCRIPT_USER_TEMPLATE: &str = r#"Write narration for a marketing video.

Product: {product}
Description: {description}
Target audience: {audience}
Tone: {tone}
Call to action: {cta}

Reference media:
{references}

Write exactly {beat_count} beats. The final beat must deliver the call to action."#;

/// Configuration for the Scriptwriter Agent.
#[derive(Debug, Clone)]
pub struct ScriptwriterConfig {
    /// Temperature for LLM generation.
    pub temperature: f64,
    /// Maximum tokens for LLM response.
    pub max_tokens: u32,
}

impl Default for ScriptwriterConfig {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_tokens: 1200,
        }
    }
}

impl ScriptwriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Accepted response shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptResponse {
    Structured {
        #[serde(default)]
        framework: Option<Value>,
        #[serde(alias = "beatScripts", alias = "script")]
        beats: Vec<String>,
    },
    Beats(Vec<String>),
}

/// Scriptwriter Agent that produces `script`, `beat_scripts` and the
/// narrative framework.
pub struct ScriptwriterAgent {
    llm: Arc<dyn LlmProvider>,
    config: ScriptwriterConfig,
}

impl std::fmt::Debug for ScriptwriterAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptwriterAgent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScriptwriterAgent {
    /// Agent name constant for identification.
    pub const AGENT_NAME: &'static str = "scriptwriter";

    pub fn new(llm: Arc<dyn LlmProvider>, config: ScriptwriterConfig) -> Self {
        Self { llm, config }
    }

    pub fn with_defaults(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm, ScriptwriterConfig::default())
    }

    /// Requests beats from the model and validates them.
    pub async fn write_script(
        &self,
        brief: &Brief,
        beat_count: usize,
    ) -> AgentResult<(NarrativeFramework, Vec<String>)> {
        let prompt = build_script_prompt(brief, beat_count);
        let content = complete(
            self.llm.as_ref(),
            SCRIPT_SYSTEM_PROMPT,
            prompt,
            self.config.temperature,
            self.config.max_tokens,
        )
        .await?;

        parse_script_response(&content, beat_count)
    }
}

#[async_trait]
impl PipelineStep for ScriptwriterAgent {
    fn name(&self) -> &'static str {
        Self::AGENT_NAME
    }

    async fn run(&self, state: &PipelineState) -> StepOutcome {
        let beat_count = state.template_mode().beat_count();

        if !has_source_material(state.brief()) {
            return self.recover(state, "brief has no description or reference media");
        }

        match self.write_script(state.brief(), beat_count).await {
            Ok((framework, beats)) => {
                tracing::info!(
                    beats = beats.len(),
                    framework = %framework,
                    "Script written"
                );
                let mut next = state.clone();
                next.set_script(beats, framework);
                StepOutcome::Completed(next)
            }
            Err(e) => self.recover(state, &e.to_string()),
        }
    }

    fn recover(&self, state: &PipelineState, reason: &str) -> StepOutcome {
        let beats = fallback_script(state.brief(), state.template_mode().beat_count());
        let mut next = state.clone();
        next.set_script(beats, NarrativeFramework::default());
        StepOutcome::recovered(
            next,
            Self::AGENT_NAME,
            format!("script fallback used ({})", reason),
        )
    }
}

/// A brief with neither a description nor reference media gives the model
/// nothing to write from.
fn has_source_material(brief: &Brief) -> bool {
    !brief.description.trim().is_empty() || !brief.reference_media.is_empty()
}

fn build_script_prompt(brief: &Brief, beat_count: usize) -> String {
    let references = if brief.reference_media.is_empty() {
        "None".to_string()
    } else {
        brief
            .reference_media
            .iter()
            .map(|m| format!("- {} ({})", m.description, m.url))
            .collect::<Vec<_>>()
            .join("\n")
    };

    SCRIPT_USER_TEMPLATE
        .replace("{product}", &brief.product_name)
        .replace("{description}", or_unspecified(&brief.description))
        .replace("{audience}", or_unspecified(&brief.target_audience))
        .replace("{tone}", or_unspecified(&brief.tone))
        .replace("{cta}", brief.call_to_action_or_default())
        .replace("{references}", &references)
        .replace("{beat_count}", &beat_count.to_string())
}

fn or_unspecified(value: &str) -> &str {
    if value.trim().is_empty() {
        "Not specified"
    } else {
        value
    }
}

/// Validates the model output: a non-empty, ordered list of non-blank beats.
fn parse_script_response(
    content: &str,
    beat_count: usize,
) -> AgentResult<(NarrativeFramework, Vec<String>)> {
    let (framework, beats) = match parse_json_response::<ScriptResponse>(content)? {
        ScriptResponse::Structured { framework, beats } => (framework, beats),
        ScriptResponse::Beats(beats) => (None, beats),
    };

    if beats.is_empty() {
        return Err(AgentError::InvalidResponse("Script has no beats".to_string()));
    }
    if let Some(i) = beats.iter().position(|b| b.trim().is_empty()) {
        return Err(AgentError::InvalidResponse(format!(
            "Beat {} is blank",
            i + 1
        )));
    }

    let beats: Vec<String> = beats
        .into_iter()
        .take(beat_count)
        .map(|b| b.trim().to_string())
        .collect();

    let framework = lenient_text(framework.as_ref())
        .as_deref()
        .and_then(NarrativeFramework::parse)
        .unwrap_or_default();

    Ok((framework, beats))
}

/// Deterministic script built only from brief fields.
///
/// Produces `beat_count` beats (at most eight) and always ends with the
/// call-to-action.
pub fn fallback_script(brief: &Brief, beat_count: usize) -> Vec<String> {
    let name = brief.product_name.trim();
    let name = if name.is_empty() { "our product" } else { name };

    let description = brief.description.trim();
    let pitch = if description.is_empty() {
        format!("{} makes every day a little easier.", name)
    } else if description.ends_with(['.', '!', '?']) {
        description.to_string()
    } else {
        format!("{}.", description)
    };

    let audience = brief.target_audience.trim();
    let audience_line = if audience.is_empty() {
        "Made for people who want more from their day.".to_string()
    } else {
        format!("Made for {}.", audience)
    };

    let body = [
        format!("Meet {}.", name),
        pitch,
        audience_line,
        "No more wasted time. No more guesswork.".to_string(),
        format!("{} handles the details so you can focus on what matters.", name),
        "See the difference from the very first day.".to_string(),
        format!("Join the people already switching to {}.", name),
    ];

    let mut beats: Vec<String> = body
        .into_iter()
        .take(beat_count.saturating_sub(1))
        .collect();
    if beat_count > 0 {
        beats.push(brief.call_to_action_or_default().to_string());
    }
    beats
}
