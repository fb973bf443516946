//! Critic: table-driven quality scoring.
//!
//! Each [`TemplateMode`] has its own rule table and the two tables share no
//! rule ids. A score starts at 100, each failed rule subtracts its penalty,
//! and the result is clamped to `[0, 100]` and normalized to `[0, 1]`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{PipelineState, TemplateMode};

/// Score every critique starts from.
pub const MAX_SCORE: f64 = 100.0;

/// Named scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    // Template rules
    CopyMissing,
    ProblemMissing,
    FeaturesMissing,
    TrustLogosMissing,
    TemplateScenesEmpty,
    // Freeform rules
    ScriptMissing,
    ScenesEmpty,
    SceneTypeMissing,
    SceneDurationInvalid,
    PaletteMissing,
    AudioMissing,
}

impl RuleId {
    pub fn default_penalty(self) -> f64 {
        match self {
            RuleId::CopyMissing => 30.0,
            RuleId::ProblemMissing => 10.0,
            RuleId::FeaturesMissing => 10.0,
            RuleId::TrustLogosMissing => 10.0,
            RuleId::TemplateScenesEmpty => 40.0,
            RuleId::ScriptMissing => 20.0,
            RuleId::ScenesEmpty => 30.0,
            RuleId::SceneTypeMissing => 10.0,
            RuleId::SceneDurationInvalid => 10.0,
            RuleId::PaletteMissing => 10.0,
            RuleId::AudioMissing => 10.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::CopyMissing => "copy_missing",
            RuleId::ProblemMissing => "problem_missing",
            RuleId::FeaturesMissing => "features_missing",
            RuleId::TrustLogosMissing => "trust_logos_missing",
            RuleId::TemplateScenesEmpty => "template_scenes_empty",
            RuleId::ScriptMissing => "script_missing",
            RuleId::ScenesEmpty => "scenes_empty",
            RuleId::SceneTypeMissing => "scene_type_missing",
            RuleId::SceneDurationInvalid => "scene_duration_invalid",
            RuleId::PaletteMissing => "palette_missing",
            RuleId::AudioMissing => "audio_missing",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule: returns an issue message when the state fails it.
struct Rule {
    id: RuleId,
    check: fn(&PipelineState) -> Option<String>,
}

const TEMPLATE_RULES: &[Rule] = &[
    Rule { id: RuleId::CopyMissing, check: check_copy },
    Rule { id: RuleId::ProblemMissing, check: check_problem },
    Rule { id: RuleId::FeaturesMissing, check: check_features },
    Rule { id: RuleId::TrustLogosMissing, check: check_trust_logos },
    Rule { id: RuleId::TemplateScenesEmpty, check: check_scenes_empty },
];

const FREEFORM_RULES: &[Rule] = &[
    Rule { id: RuleId::ScriptMissing, check: check_script },
    Rule { id: RuleId::ScenesEmpty, check: check_scenes_empty },
    Rule { id: RuleId::SceneTypeMissing, check: check_scene_types },
    Rule { id: RuleId::SceneDurationInvalid, check: check_scene_durations },
    Rule { id: RuleId::PaletteMissing, check: check_palette },
    Rule { id: RuleId::AudioMissing, check: check_audio },
];

fn rules_for(mode: TemplateMode) -> &'static [Rule] {
    match mode {
        TemplateMode::Viable => TEMPLATE_RULES,
        TemplateMode::Freeform => FREEFORM_RULES,
    }
}

/// Rule ids applied in `mode`, in evaluation order.
pub fn rule_ids(mode: TemplateMode) -> Vec<RuleId> {
    rules_for(mode).iter().map(|r| r.id).collect()
}

fn check_copy(state: &PipelineState) -> Option<String> {
    let has_copy = state
        .template_data
        .as_ref()
        .is_some_and(|d| d.copy.is_some());
    (!has_copy).then(|| "copy block missing".to_string())
}

fn check_problem(state: &PipelineState) -> Option<String> {
    let copy = state.template_data.as_ref()?.copy.as_ref()?;
    let missing = copy
        .problem
        .as_deref()
        .map_or(true, |p| p.trim().is_empty());
    missing.then(|| "copy problem text missing".to_string())
}

fn check_features(state: &PipelineState) -> Option<String> {
    let copy = state.template_data.as_ref()?.copy.as_ref()?;
    copy.features
        .is_empty()
        .then(|| "copy features list missing".to_string())
}

fn check_trust_logos(state: &PipelineState) -> Option<String> {
    let missing = state
        .template_data
        .as_ref()
        .map_or(true, |d| d.trust_logos.is_empty());
    missing.then(|| "trust logos missing".to_string())
}

fn check_scenes_empty(state: &PipelineState) -> Option<String> {
    state
        .scenes
        .is_empty()
        .then(|| "scenes array is empty".to_string())
}

fn check_script(state: &PipelineState) -> Option<String> {
    (!state.has_script()).then(|| "script missing".to_string())
}

fn check_scene_types(state: &PipelineState) -> Option<String> {
    let missing = state
        .scenes
        .iter()
        .filter(|s| s.scene_type.is_none())
        .count();
    (missing > 0).then(|| format!("{} scenes missing type", missing))
}

fn check_scene_durations(state: &PipelineState) -> Option<String> {
    let invalid = state
        .scenes
        .iter()
        .filter(|s| !s.has_positive_duration())
        .count();
    (invalid > 0).then(|| format!("{} scenes missing positive duration", invalid))
}

fn check_palette(state: &PipelineState) -> Option<String> {
    state
        .visual_assets
        .is_none()
        .then(|| "color palette missing".to_string())
}

fn check_audio(state: &PipelineState) -> Option<String> {
    state
        .audio_events
        .is_empty()
        .then(|| "audio events missing".to_string())
}

/// Thresholds and penalty overrides for the Critic.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticConfig {
    /// Freeform runs below this normalized score need refinement.
    pub freeform_threshold: f64,
    /// Template runs below this normalized score need refinement.
    pub template_threshold: f64,
    penalties: HashMap<RuleId, f64>,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            freeform_threshold: 0.7,
            template_threshold: 0.8,
            penalties: HashMap::new(),
        }
    }
}

impl CriticConfig {
    pub fn with_freeform_threshold(mut self, threshold: f64) -> Self {
        self.freeform_threshold = threshold;
        self
    }

    pub fn with_template_threshold(mut self, threshold: f64) -> Self {
        self.template_threshold = threshold;
        self
    }

    /// Overrides the penalty of one rule.
    pub fn with_penalty(mut self, rule: RuleId, penalty: f64) -> Self {
        self.penalties.insert(rule, penalty);
        self
    }

    pub fn penalty(&self, rule: RuleId) -> f64 {
        self.penalties
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.default_penalty())
    }

    pub fn threshold(&self, mode: TemplateMode) -> f64 {
        match mode {
            TemplateMode::Freeform => self.freeform_threshold,
            TemplateMode::Viable => self.template_threshold,
        }
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueIssue {
    pub rule: RuleId,
    pub message: String,
    pub penalty: f64,
}

/// Result of scoring one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueReport {
    pub mode: TemplateMode,
    /// `100 - penalties`, unclamped.
    pub raw_score: f64,
    /// Normalized score in `[0, 1]`.
    pub score: f64,
    pub threshold: f64,
    pub needs_refinement: bool,
    pub issues: Vec<CritiqueIssue>,
}

impl CritiqueReport {
    pub fn passed(&self) -> bool {
        !self.needs_refinement
    }
}

/// Stateless scorer.
#[derive(Debug, Clone, Default)]
pub struct Critic {
    config: CriticConfig,
}

impl Critic {
    pub const AGENT_NAME: &'static str = "critic";

    pub fn new(config: CriticConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CriticConfig {
        &self.config
    }

    /// Scores `state` without touching it.
    pub fn evaluate(&self, state: &PipelineState) -> CritiqueReport {
        let mode = state.template_mode();

        let issues: Vec<CritiqueIssue> = rules_for(mode)
            .iter()
            .filter_map(|rule| {
                (rule.check)(state).map(|message| CritiqueIssue {
                    rule: rule.id,
                    message,
                    penalty: self.config.penalty(rule.id),
                })
            })
            .collect();

        let raw_score = MAX_SCORE - issues.iter().map(|i| i.penalty).sum::<f64>();
        let score = raw_score.clamp(0.0, MAX_SCORE) / MAX_SCORE;
        let threshold = self.config.threshold(mode);

        CritiqueReport {
            mode,
            raw_score,
            score,
            threshold,
            needs_refinement: score < threshold,
            issues,
        }
    }

    /// Scores `state` and returns a new state carrying the verdict.
    ///
    /// Every issue is appended to the state's errors as `critic: <message>`.
    pub fn critique(&self, state: &PipelineState) -> (PipelineState, CritiqueReport) {
        let report = self.evaluate(state);

        let mut next = state.clone();
        next.quality_score = report.score;
        next.needs_refinement = report.needs_refinement;
        for issue in &report.issues {
            next.record_error(format!("{}: {}", Self::AGENT_NAME, issue.message));
        }

        tracing::info!(
            mode = %report.mode,
            score = report.score,
            issues = report.issues.len(),
            needs_refinement = report.needs_refinement,
            "Critique complete"
        );

        (next, report)
    }
}
