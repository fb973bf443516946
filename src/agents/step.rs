//! The contract shared by every generator step.
//!
//! A step takes the current [`PipelineState`] and returns a new one wrapped
//! in a [`StepOutcome`]. Steps never fail: provider errors, malformed model
//! output, timeouts and panics all end up as [`StepOutcome::Recovered`] with
//! documented defaults in place of the missing fields.

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::utils::try_extract_json_from_response;

use super::error::{AgentError, AgentResult};
use super::types::PipelineState;

/// Generator stages in the order the orchestrator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Scriptwriter,
    ArtDirector,
    Director,
    SoundDesigner,
}

impl PipelineStage {
    /// Every generator stage, in execution order.
    pub fn all_stages() -> Vec<PipelineStage> {
        vec![
            PipelineStage::Scriptwriter,
            PipelineStage::ArtDirector,
            PipelineStage::Director,
            PipelineStage::SoundDesigner,
        ]
    }

    /// Stages re-run on every refinement pass.
    pub fn refinement_stages() -> Vec<PipelineStage> {
        vec![
            PipelineStage::ArtDirector,
            PipelineStage::Director,
            PipelineStage::SoundDesigner,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Scriptwriter => "scriptwriter",
            PipelineStage::ArtDirector => "art_director",
            PipelineStage::Director => "director",
            PipelineStage::SoundDesigner => "sound_designer",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PipelineStage::Scriptwriter => "Scriptwriter",
            PipelineStage::ArtDirector => "Art Director",
            PipelineStage::Director => "Director",
            PipelineStage::SoundDesigner => "Sound Designer",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Result of running one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step produced its fields normally.
    Completed(PipelineState),
    /// The step hit a failure and substituted defaults.
    ///
    /// `state.errors()` already contains the prefixed diagnostic.
    Recovered {
        state: PipelineState,
        diagnostic: String,
    },
}

impl StepOutcome {
    /// Builds a recovered outcome, recording `"{step}: {diagnostic}"` in the state.
    pub fn recovered(
        mut state: PipelineState,
        step: &str,
        diagnostic: impl Into<String>,
    ) -> Self {
        let diagnostic = diagnostic.into();
        state.record_error(format!("{}: {}", step, diagnostic));
        StepOutcome::Recovered { state, diagnostic }
    }

    pub fn state(&self) -> &PipelineState {
        match self {
            StepOutcome::Completed(state) => state,
            StepOutcome::Recovered { state, .. } => state,
        }
    }

    pub fn into_state(self) -> PipelineState {
        match self {
            StepOutcome::Completed(state) => state,
            StepOutcome::Recovered { state, .. } => state,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, StepOutcome::Recovered { .. })
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            StepOutcome::Completed(_) => None,
            StepOutcome::Recovered { diagnostic, .. } => Some(diagnostic),
        }
    }
}

/// A generator step of the pipeline.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Name used to prefix diagnostics, e.g. `"art_director"`.
    fn name(&self) -> &'static str;

    /// Produces this step's fields from `state`.
    async fn run(&self, state: &PipelineState) -> StepOutcome;

    /// Produces this step's documented defaults after a failure.
    ///
    /// Used by the step itself and by the orchestrator when the step times
    /// out or panics.
    fn recover(&self, state: &PipelineState, reason: &str) -> StepOutcome;
}

/// Sends one system + user prompt and returns the first choice's content.
pub(crate) async fn complete(
    llm: &dyn LlmProvider,
    system_prompt: &str,
    user_prompt: String,
    temperature: f64,
    max_tokens: u32,
) -> AgentResult<String> {
    let request = GenerationRequest::new(
        "",
        vec![Message::system(system_prompt), Message::user(user_prompt)],
    )
    .with_temperature(temperature)
    .with_max_tokens(max_tokens);

    let response = llm.generate(request).await?;
    let content = response
        .first_content()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AgentError::InvalidResponse("Empty LLM response".to_string()))?;

    tracing::debug!(chars = content.len(), "Received LLM response");
    Ok(content.to_string())
}

/// Extracts the JSON payload from raw model output and deserializes it.
pub(crate) fn parse_json_response<T: DeserializeOwned>(content: &str) -> AgentResult<T> {
    let json = try_extract_json_from_response(content).into_result_with_context(content)?;
    serde_json::from_str(&json)
        .map_err(|e| AgentError::InvalidResponse(format!("Unexpected JSON shape: {}", e)))
}

// Model replies are loosely typed: a wrong type on one optional field must
// only reset that field, never reject the reply.

/// First non-null value among `names`.
pub(crate) fn pick<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| object.get(*name).filter(|value| !value.is_null()))
}

/// Trimmed text; numbers and booleans are rendered, blanks are `None`.
pub(crate) fn lenient_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// A number, or a string holding one with an optional trailing `s` unit.
pub(crate) fn lenient_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('s').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Non-blank entries of a list. A lone string counts as a one-item list.
pub(crate) fn lenient_text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| lenient_text(Some(v))).collect(),
        Some(value) if value.is_string() => lenient_text(Some(value)).into_iter().collect(),
        _ => Vec::new(),
    }
}
