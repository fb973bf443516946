//! Director Agent: the storyboard.
//!
//! Freeform runs get exactly [`FREEFORM_SCENE_COUNT`] scenes with ids
//! `scene-1..scene-8`; whatever the model returns is truncated or padded
//! from the beat scripts. Template runs get the fixed six-scene schema of
//! [`TEMPLATE_SCENES`] filled with model-written copy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::llm::LlmProvider;

use super::error::{AgentError, AgentResult};
use super::step::{
    complete, lenient_number, lenient_text, lenient_text_list, parse_json_response, pick,
    PipelineStep, StepOutcome,
};
use super::types::{
    Brief, CameraMove, CameraMovement, PipelineState, Scene, SceneLayout, SceneType, SceneVisual,
    TemplateCopy, TemplateData,
};

/// Number of scenes in a freeform storyboard.
pub const FREEFORM_SCENE_COUNT: usize = 8;

/// Duration used for a scene whose type is unknown.
pub const UNTYPED_SCENE_DURATION: f64 = 4.0;

/// Slot of the viable template: type, title and fixed duration in seconds.
#[derive(Debug, Clone, Copy)]
pub struct TemplateSlot {
    pub scene_type: SceneType,
    pub title: &'static str,
    pub duration: f64,
}

/// The viable template, 30 seconds in total.
pub const TEMPLATE_SCENES: [TemplateSlot; 6] = [
    TemplateSlot {
        scene_type: SceneType::Hook,
        title: "Hook",
        duration: 4.0,
    },
    TemplateSlot {
        scene_type: SceneType::Problem,
        title: "Problem",
        duration: 5.0,
    },
    TemplateSlot {
        scene_type: SceneType::Solution,
        title: "Solution",
        duration: 5.0,
    },
    TemplateSlot {
        scene_type: SceneType::Feature,
        title: "Features",
        duration: 7.0,
    },
    TemplateSlot {
        scene_type: SceneType::Testimonial,
        title: "Social Proof",
        duration: 4.0,
    },
    TemplateSlot {
        scene_type: SceneType::CallToAction,
        title: "Call to Action",
        duration: 5.0,
    },
];

const FREEFORM_SYSTEM_PROMPT: &str = r#"You are a video director storyboarding a short product marketing video.

Each scene needs a type from this list: hook, problem, solution, feature, demo, testimonial, stats, call_to_action.
Durations are in seconds; most scenes run 3 to 5 seconds.
Layouts: centered, split, full_bleed, grid. Camera movements: static, push_in, pull_out, pan, orbit.

Output Format:
You MUST respond with ONLY a JSON object in this exact format:
{
  "scenes": [
    {
      "type": "<scene type>",
      "title": "<short title>",
      "duration": <seconds>,
      "narration": "<narration for this scene>",
      "visual": {"headline": "<on-screen text>", "subtext": "<optional>", "layout": "<layout>"},
      "camera": {"movement": "<movement>", "intensity": <0.0-1.0>}
    }
  ]
}

Do not include any text outside the JSON object."#;

const FREEFORM_USER_TEMPLATE: &str = r#"Storyboard exactly {scene_count} scenes, one per narration beat.

Product: {product}
Visual archetype: {archetype}
Brand color: {primary}

Narration beats:
{beats}"#;

const TEMPLATE_SYSTEM_PROMPT: &str = r#"You are a conversion copywriter filling a fixed six-scene video template:
hook, problem, solution, features, social proof, call to action.

Keep every line short enough to read on screen in a few seconds.

Output Format:
You MUST respond with ONLY a JSON object in this exact format:
{
  "copy": {
    "headline": "<hook headline>",
    "problem": "<the pain the audience feels>",
    "solution": "<how the product resolves it>",
    "features": ["<feature>", "<feature>", "<feature>"],
    "cta": "<call to action>"
  },
  "trustLogos": ["<customer or partner name>", "..."]
}

Do not include any text outside the JSON object."#;

const TEMPLATE_USER_TEMPLATE: &str = r#"Product: {product}
Description: {description}
Target audience: {audience}
Call to action: {cta}

Narration:
{script}"#;

/// Configuration for the Director Agent.
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 3000,
        }
    }
}

impl DirectorConfig {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoryboardResponse {
    Wrapped { scenes: Vec<Value> },
    Bare(Vec<Value>),
}

// ============================================================================
// Agent
// ============================================================================

/// Director Agent that produces `scenes`, plus `template_data` in template mode.
pub struct DirectorAgent {
    llm: Arc<dyn LlmProvider>,
    config: DirectorConfig,
}

impl std::fmt::Debug for DirectorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorAgent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DirectorAgent {
    pub const AGENT_NAME: &'static str = "director";

    pub fn new(llm: Arc<dyn LlmProvider>, config: DirectorConfig) -> Self {
        Self { llm, config }
    }

    pub fn with_defaults(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm, DirectorConfig::default())
    }

    /// Requests a freeform storyboard and normalizes it to eight scenes.
    pub async fn storyboard(&self, state: &PipelineState) -> AgentResult<Vec<Scene>> {
        let brief = state.brief();
        let (archetype, primary) = state
            .visual_assets
            .as_ref()
            .map(|a| (a.archetype.as_str(), a.brand_color()))
            .unwrap_or(("minimal", "unspecified"));

        let prompt = FREEFORM_USER_TEMPLATE
            .replace("{scene_count}", &FREEFORM_SCENE_COUNT.to_string())
            .replace("{product}", &brief.product_name)
            .replace("{archetype}", archetype)
            .replace("{primary}", primary)
            .replace("{beats}", &numbered(&state.beat_scripts));

        let content = self.ask(FREEFORM_SYSTEM_PROMPT, prompt).await?;
        let scenes = match parse_json_response::<StoryboardResponse>(&content)? {
            StoryboardResponse::Wrapped { scenes } => scenes,
            StoryboardResponse::Bare(scenes) => scenes,
        };
        let raw: Vec<Map<String, Value>> = scenes
            .into_iter()
        .filter_map(|scene| match scene {
            Value::Object(fields) => Some(fields),
            _ => None,
        })
        .collect();

        if raw.is_empty() {
            return Err(AgentError::InvalidResponse(
                "Storyboard has no scenes".to_string(),
            ));
        }
        if raw.len() != FREEFORM_SCENE_COUNT {
            tracing::debug!(
                returned = raw.len(),
                expected = FREEFORM_SCENE_COUNT,
                "Normalizing storyboard length"
            );
        }

        Ok(normalize_scenes(raw, &state.beat_scripts))
    }

    /// Requests the template copy block and trust logos.
    pub async fn template_copy(&self, state: &PipelineState) -> AgentResult<TemplateData> {
        let brief = state.brief();
        let prompt = TEMPLATE_USER_TEMPLATE
            .replace("{product}", &brief.product_name)
            .replace("{description}", &brief.description)
            .replace("{audience}", &brief.target_audience)
            .replace("{cta}", brief.call_to_action_or_default())
            .replace("{script}", state.script.as_deref().unwrap_or(""));

        let content = self.ask(TEMPLATE_SYSTEM_PROMPT, prompt).await?;
        let response: Value = parse_json_response(&content)?;
        let response = response.as_object().ok_or_else(|| {
            AgentError::InvalidResponse("Template reply is not a JSON object".to_string())
        })?;

        Ok(TemplateData {
            copy: pick(response, &["copy"])
                .and_then(Value::as_object)
                .map(|copy| read_copy(copy, brief)),
            trust_logos: lenient_text_list(pick(
                response,
                &["trustLogos", "trust_logos", "logos"],
            )),
        })
    }

    async fn ask(&self, system: &str, prompt: String) -> AgentResult<String> {
        complete(
            self.llm.as_ref(),
            system,
            prompt,
            self.config.temperature,
            self.config.max_tokens,
        )
        .await
    }
}

#[async_trait]
impl PipelineStep for DirectorAgent {
    fn name(&self) -> &'static str {
        Self::AGENT_NAME
    }

    async fn run(&self, state: &PipelineState) -> StepOutcome {
        let mut next = state.clone();

        if state.template_mode().is_template() {
            match self.template_copy(state).await {
                Ok(data) => {
                    tracing::info!(
                        has_copy = data.copy.is_some(),
                        logos = data.trust_logos.len(),
                        "Template copy written"
                    );
                    next.scenes = template_scenes(&data, &state.beat_scripts);
                    next.template_data = Some(data);
                    StepOutcome::Completed(next)
                }
                Err(e) => self.recover(state, &e.to_string()),
            }
        } else {
            match self.storyboard(state).await {
                Ok(scenes) => {
                    tracing::info!(scenes = scenes.len(), "Storyboard directed");
                    next.scenes = scenes;
                    next.template_data = None;
                    StepOutcome::Completed(next)
                }
                Err(e) => self.recover(state, &e.to_string()),
            }
        }
    }

    fn recover(&self, state: &PipelineState, reason: &str) -> StepOutcome {
        let mut next = state.clone();
        if state.template_mode().is_template() {
            let data = fallback_template_data(state.brief());
            next.scenes = template_scenes(&data, &state.beat_scripts);
            next.template_data = Some(data);
        } else {
            next.scenes = fallback_storyboard(&state.beat_scripts);
            next.template_data = None;
        }
        StepOutcome::recovered(
            next,
            Self::AGENT_NAME,
            format!("storyboard fallback used ({})", reason),
        )
    }
}

// ============================================================================
// Freeform normalization
// ============================================================================

/// Title given to a scene that arrives without one.
pub fn default_title(scene_type: SceneType) -> &'static str {
    match scene_type {
        SceneType::Hook => "Hook",
        SceneType::Problem => "The Problem",
        SceneType::Solution => "The Solution",
        SceneType::Feature => "Key Feature",
        SceneType::Demo => "Product Demo",
        SceneType::Testimonial => "What People Say",
        SceneType::Stats => "By the Numbers",
        SceneType::CallToAction => "Get Started",
    }
}

fn numbered(beats: &[String]) -> String {
    if beats.is_empty() {
        return "(no narration yet)".to_string();
    }
    beats
        .iter()
        .enumerate()
        .map(|(i, beat)| format!("{}. {}", i + 1, beat))
        .collect::<Vec<_>>()
        .join("\n")
}

fn scene_id(index: usize) -> String {
    format!("scene-{}", index + 1)
}

fn positive_seconds(value: Option<&Value>) -> Option<f64> {
    lenient_number(value).filter(|seconds| *seconds > 0.0)
}

fn convert_scene(raw: &Map<String, Value>, index: usize, beat: Option<&String>) -> Scene {
    let scene_type = lenient_text(pick(raw, &["type", "sceneType", "scene_type"]))
        .as_deref()
        .and_then(SceneType::parse);

    let duration = positive_seconds(pick(raw, &["duration"])).unwrap_or_else(|| {
        scene_type
            .map(SceneType::default_duration)
            .unwrap_or(UNTYPED_SCENE_DURATION)
    });

    let title = lenient_text(pick(raw, &["title"]))
        .or_else(|| scene_type.map(|t| default_title(t).to_string()))
        .unwrap_or_else(|| format!("Scene {}", index + 1));

    let narration = lenient_text(pick(raw, &["narration"])).or_else(|| beat.cloned());

    let visual = pick(raw, &["visual"])
        .and_then(Value::as_object)
        .map(|v| SceneVisual {
            headline: lenient_text(pick(v, &["headline"])).unwrap_or_else(|| title.clone()),
            subtext: lenient_text(pick(v, &["subtext"])),
            layout: lenient_text(pick(v, &["layout"]))
                .as_deref()
                .and_then(SceneLayout::parse)
                .unwrap_or_default(),
            background: lenient_text(pick(v, &["background"]))
                .as_deref()
                .and_then(super::art_director::normalize_hex),
        });

    let camera = pick(raw, &["camera"])
        .and_then(Value::as_object)
        .map(|c| {
            CameraMove::new(
                lenient_text(pick(c, &["movement"]))
                    .as_deref()
                    .and_then(CameraMovement::parse)
                    .unwrap_or_default(),
                lenient_number(pick(c, &["intensity"]))
                    .unwrap_or_else(CameraMove::default_intensity),
            )
        });

    let mut scene = Scene::new(scene_id(index), scene_type, title, duration);
    scene.narration = narration;
    scene.visual = visual;
    scene.camera = camera;
    scene
}

/// Scene padded in from the beat scripts at `index`.
fn beat_scene(index: usize, beat: Option<&String>) -> Scene {
    let scene_type = SceneType::CANONICAL_SEQUENCE[index % SceneType::CANONICAL_SEQUENCE.len()];
    let title = default_title(scene_type);
    let headline = beat.cloned().unwrap_or_else(|| title.to_string());

    let mut scene = Scene::new(
        scene_id(index),
        Some(scene_type),
        title,
        scene_type.default_duration(),
    )
        .with_visual(SceneVisual {
            headline,
            ..SceneVisual::default()
        })
        .with_camera(default_camera(scene_type));
    scene.narration = beat.cloned();
    scene
}

fn default_camera(scene_type: SceneType) -> CameraMove {
    match scene_type {
        SceneType::Hook => CameraMove::new(CameraMovement::PushIn, 0.6),
        SceneType::Demo => CameraMove::new(CameraMovement::Orbit, 0.4),
        SceneType::Stats => CameraMove::new(CameraMovement::Pan, 0.3),
        SceneType::CallToAction => CameraMove::new(CameraMovement::PullOut, 0.5),
        _ => CameraMove::default(),
    }
}

/// Truncates or pads model scenes to exactly [`FREEFORM_SCENE_COUNT`].
fn normalize_scenes(raw: Vec<Map<String, Value>>, beats: &[String]) -> Vec<Scene> {
    let mut raw = raw.iter();
    (0..FREEFORM_SCENE_COUNT)
        .map(|i| match raw.next() {
            Some(scene) => convert_scene(scene, i, beats.get(i)),
            None => beat_scene(i, beats.get(i)),
        })
        .collect()
}

/// Deterministic freeform storyboard: the canonical sequence narrated by the beats.
pub fn fallback_storyboard(beats: &[String]) -> Vec<Scene> {
    (0..FREEFORM_SCENE_COUNT)
        .map(|i| beat_scene(i, beats.get(i)))
        .collect()
}

// ============================================================================
// Template mode
// ============================================================================

/// Copy block from the model; a bad field falls back on its own.
fn read_copy(copy: &Map<String, Value>, brief: &Brief) -> TemplateCopy {
    TemplateCopy {
        headline: lenient_text(pick(copy, &["headline"]))
            .unwrap_or_else(|| brief.product_name.clone()),
        problem: lenient_text(pick(copy, &["problem"])),
        solution: lenient_text(pick(copy, &["solution"])),
        features: lenient_text_list(pick(copy, &["features"])),
        cta: lenient_text(pick(copy, &["cta", "callToAction"]))
            .unwrap_or_else(|| brief.call_to_action_or_default().to_string()),
    }
}

/// Copy built from the brief alone.
pub fn fallback_template_data(brief: &Brief) -> TemplateData {
    let name = brief.product_name.trim();
    TemplateData {
        copy: Some(TemplateCopy {
            headline: name.to_string(),
            problem: Some(brief.description.trim().to_string()).filter(|d| !d.is_empty()),
            solution: Some(format!("{} makes it simple.", name)),
            features: Vec::new(),
            cta: brief.call_to_action_or_default().to_string(),
        }),
        trust_logos: Vec::new(),
    }
}

/// The six template scenes for `data`, with fixed durations.
pub fn template_scenes(data: &TemplateData, beats: &[String]) -> Vec<Scene> {
    let copy = data.copy.clone().unwrap_or_default();

    TEMPLATE_SCENES
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let (headline, subtext, layout) = match slot.scene_type {
                SceneType::Hook => (copy.headline.clone(), None, SceneLayout::FullBleed),
                SceneType::Problem => (
                    copy.problem.clone().unwrap_or_default(),
                    None,
                    SceneLayout::Centered,
                ),
                SceneType::Solution => (
                    copy.solution.clone().unwrap_or_default(),
                    None,
                    SceneLayout::Split,
                ),
                SceneType::Feature => (
                    slot.title.to_string(),
                    (!copy.features.is_empty()).then(|| copy.features.join(" · ")),
                    SceneLayout::Grid,
                ),
                SceneType::Testimonial => (
                    "Trusted by teams everywhere".to_string(),
                    (!data.trust_logos.is_empty()).then(|| data.trust_logos.join(" · ")),
                    SceneLayout::Grid,
                ),
                _ => (copy.cta.clone(), None, SceneLayout::Centered),
            };

            let mut scene =
                Scene::new(scene_id(i), Some(slot.scene_type), slot.title, slot.duration)
                .with_visual(SceneVisual {
                    headline,
                    subtext,
                    layout,
                    background: None,
                })
                .with_camera(default_camera(slot.scene_type));
            scene.narration = beats.get(i).cloned();
            scene
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{sample_state, ScriptedProvider};
    use crate::agents::types::TemplateMode;

    fn scripted_state(mode: TemplateMode) -> PipelineState {
        let mut state = sample_state(mode);
        let beats = (1..=mode.beat_count()).map(|i| format!("Beat {}", i)).collect();
        state.set_script(beats, Default::default());
        state
    }

    #[test]
    fn test_template_durations_total_thirty_seconds() {
        let total: f64 = TEMPLATE_SCENES.iter().map(|s| s.duration).sum();
        assert!((total - 30.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_freeform_pads_short_storyboard() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"scenes": [
                {"type": "hook", "title": "Open", "duration": 2.5},
                {"type": "montage", "title": "Cut"},
                {"title": "No type", "duration": "6s"}
            ]}"#,
        ));
        let agent = DirectorAgent::with_defaults(provider);
        let state = scripted_state(TemplateMode::Freeform);

        let outcome = agent.run(&state).await;

        assert!(!outcome.is_recovered());
        let scenes = outcome.into_state().scenes;
        assert_eq!(scenes.len(), FREEFORM_SCENE_COUNT);
        let ids: Vec<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "scene-1", "scene-2", "scene-3", "scene-4", "scene-5", "scene-6", "scene-7",
                "scene-8"
            ]
        );

        assert_eq!(scenes[0].scene_type, Some(SceneType::Hook));
        assert_eq!(scenes[0].duration, 2.5);
        assert_eq!(scenes[1].scene_type, None);
        assert_eq!(scenes[1].duration, UNTYPED_SCENE_DURATION);
        assert_eq!(scenes[2].duration, 6.0);
        assert_eq!(scenes[3].scene_type, Some(SceneType::Feature));
        assert_eq!(scenes[3].narration.as_deref(), Some("Beat 4"));
        assert!(scenes.iter().all(Scene::has_positive_duration));
    }

    #[tokio::test]
    async fn test_freeform_truncates_long_storyboard() {
        let scenes: Vec<Value> = (0..11)
            .map(|i| {
                serde_json::json!({"type": "feature", "title": format!("F{}", i), "duration": 3})
            })
            .collect();
        let provider = Arc::new(ScriptedProvider::always(Value::Array(scenes).to_string()));
        let agent = DirectorAgent::with_defaults(provider);

        let next = agent.run(&scripted_state(TemplateMode::Freeform)).await.into_state();

        assert_eq!(next.scenes.len(), FREEFORM_SCENE_COUNT);
        assert_eq!(next.scenes[7].title, "F7");
        assert!(next.template_data.is_none());
    }

    #[tokio::test]
    async fn test_freeform_parses_visual_and_camera() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"scenes": [{"type": "demo", "visual": {"layout": "full-bleed", "subtext": "  "},
                "camera": {"movement": "zoom in", "intensity": 4}}]}"#,
        ));
        let agent = DirectorAgent::with_defaults(provider);

        let scenes = agent.run(&scripted_state(TemplateMode::Freeform)).await.into_state().scenes;

        let visual = scenes[0].visual.as_ref().expect("visual kept");
        assert_eq!(visual.layout, SceneLayout::FullBleed);
        assert_eq!(visual.headline, "Product Demo");
        assert_eq!(visual.subtext, None);
        let camera = scenes[0].camera.expect("camera kept");
        assert_eq!(camera.movement, CameraMovement::PushIn);
        assert_eq!(camera.intensity, 1.0);
    }

    #[tokio::test]
    async fn test_malformed_scene_fields_use_defaults() {
        let mut scenes: Vec<Value> = SceneType::CANONICAL_SEQUENCE
            .iter()
            .enumerate()
            .map(|(i, t)| {
                serde_json::json!({"type": t, "title": format!("S{}", i), "duration": 4})
            })
            .collect();
        scenes[5]["camera"] = serde_json::json!({"movement": "pan", "intensity": "high"});
        scenes[6]["title"] = serde_json::json!(2024);
        scenes[7]["duration"] = serde_json::json!("6s");
        scenes[7]["visual"] = serde_json::json!({"headline": null, "layout": 3});
        let provider = Arc::new(ScriptedProvider::always(Value::Array(scenes).to_string()));
        let agent = DirectorAgent::with_defaults(provider);

        let outcome = agent.run(&scripted_state(TemplateMode::Freeform)).await;

        assert!(!outcome.is_recovered());
        let scenes = outcome.into_state().scenes;
        assert_eq!(scenes.len(), FREEFORM_SCENE_COUNT);
        let camera = scenes[5].camera.expect("camera kept");
        assert_eq!(camera.movement, CameraMovement::Pan);
        assert_eq!(camera.intensity, CameraMove::default_intensity());
        assert_eq!(scenes[6].title, "2024");
        assert_eq!(scenes[7].duration, 6.0);
        let visual = scenes[7].visual.as_ref().expect("visual kept");
        assert_eq!(visual.headline, "S7");
        assert_eq!(visual.layout, SceneLayout::default());
    }

    #[tokio::test]
    async fn test_freeform_failure_uses_beat_storyboard() {
        let provider = Arc::new(ScriptedProvider::always("I'd suggest opening on a sunrise."));
        let agent = DirectorAgent::with_defaults(provider);
        let state = scripted_state(TemplateMode::Freeform);

        let next = agent.run(&state).await.into_state();

        assert_eq!(next.scenes, fallback_storyboard(&state.beat_scripts));
        assert!(next.errors()[0].starts_with("director: storyboard fallback used"));
        let types: Vec<_> = next.scenes.iter().filter_map(|s| s.scene_type).collect();
        assert_eq!(types, SceneType::CANONICAL_SEQUENCE);
    }

    #[tokio::test]
    async fn test_empty_storyboard_is_rejected() {
        let provider = Arc::new(ScriptedProvider::always(r#"{"scenes": []}"#));
        let agent = DirectorAgent::with_defaults(provider);

        let outcome = agent.run(&scripted_state(TemplateMode::Freeform)).await;
        assert!(outcome.is_recovered());
        assert_eq!(outcome.state().scenes.len(), FREEFORM_SCENE_COUNT);
    }

    #[tokio::test]
    async fn test_template_mode_builds_fixed_schema() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"copy": {"headline": "Calm your week", "problem": "Tasks everywhere",
                "solution": "One daily plan", "features": ["Smart inbox", " ", "Focus mode"],
                "cta": ""}, "trustLogos": ["Acme", "Globex"]}"#,
        ));
        let agent = DirectorAgent::with_defaults(provider);
        let state = scripted_state(TemplateMode::Viable);

        let next = agent.run(&state).await.into_state();

        let data = next.template_data.as_ref().expect("template data");
        let copy = data.copy.as_ref().expect("copy block");
        assert_eq!(copy.features, vec!["Smart inbox", "Focus mode"]);
        assert_eq!(copy.cta, "Start your free trial at lumen.app");
        assert_eq!(data.trust_logos.len(), 2);

        assert_eq!(next.scenes.len(), 6);
        let durations: Vec<f64> = next.scenes.iter().map(|s| s.duration).collect();
        assert_eq!(durations, vec![4.0, 5.0, 5.0, 7.0, 4.0, 5.0]);
        assert!((next.total_duration() - 30.0).abs() < f64::EPSILON);
        assert_eq!(next.scenes[5].narration.as_deref(), Some("Beat 6"));
    }

    #[tokio::test]
    async fn test_template_mode_keeps_missing_copy_missing() {
        let provider = Arc::new(ScriptedProvider::always(r#"{"trustLogos": []}"#));
        let agent = DirectorAgent::with_defaults(provider);

        let outcome = agent.run(&scripted_state(TemplateMode::Viable)).await;

        assert!(!outcome.is_recovered());
        let next = outcome.into_state();
        assert_eq!(next.template_data.as_ref().and_then(|d| d.copy.as_ref()), None);
        assert_eq!(next.scenes.len(), 6);
    }

    #[tokio::test]
    async fn test_null_copy_fields_use_defaults() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"copy": {"headline": "Calm", "features": null, "solution": 7},
                "trustLogos": null}"#,
        ));
        let agent = DirectorAgent::with_defaults(provider);

        let outcome = agent.run(&scripted_state(TemplateMode::Viable)).await;

        assert!(!outcome.is_recovered());
        let next = outcome.into_state();
        let data = next.template_data.as_ref().expect("template data");
        let copy = data.copy.as_ref().expect("copy block");
        assert_eq!(copy.headline, "Calm");
        assert!(copy.features.is_empty());
        assert_eq!(copy.solution.as_deref(), Some("7"));
        assert!(data.trust_logos.is_empty());
    }

    #[tokio::test]
    async fn test_null_headline_falls_back_to_product_name() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"copy": {"headline": null, "cta": ["Buy"], "features": "Focus mode"}}"#,
        ));
        let agent = DirectorAgent::with_defaults(provider);
        let state = scripted_state(TemplateMode::Viable);

        let outcome = agent.run(&state).await;

        assert!(!outcome.is_recovered());
        let next = outcome.into_state();
        let copy = next
            .template_data
            .as_ref()
            .and_then(|d| d.copy.as_ref())
            .expect("copy block");
        assert_eq!(copy.headline, "Lumen");
        assert_eq!(copy.cta, state.brief().call_to_action_or_default());
        assert_eq!(copy.features, vec!["Focus mode"]);
    }

    #[tokio::test]
    async fn test_template_failure_uses_brief_copy() {
        let provider = Arc::new(ScriptedProvider::failing("timeout"));
        let agent = DirectorAgent::with_defaults(provider);
        let state = scripted_state(TemplateMode::Viable);

        let next = agent.run(&state).await.into_state();

        assert_eq!(next.template_data, Some(fallback_template_data(state.brief())));
        let copy = next
            .template_data
            .as_ref()
            .and_then(|d| d.copy.as_ref())
            .expect("fallback copy");
        assert_eq!(copy.headline, "Lumen");
        assert!(copy.problem.is_some());
        assert_eq!(next.scenes.len(), 6);
        assert_eq!(next.errors().len(), 1);
    }
}
