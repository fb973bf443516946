//! Plan Assembler: maps a finished [`PipelineState`] to the [`VideoPlan`]
//! consumed by the renderer.
//!
//! Assembly never fails and never validates; scoring is the Critic's job.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::art_director::fallback_visual_assets;
use super::types::{
    Archetype, AudioEvent, NarrativeFramework, PipelineState, Scene, TemplateData,
};

/// Mode-specific part of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanBody {
    /// Fixed-schema template data plus the scenes built from it.
    Template {
        #[serde(rename = "templateData")]
        template_data: TemplateData,
        scenes: Vec<Scene>,
    },
    /// Director-chosen storyboard.
    Freeform { scenes: Vec<Scene> },
}

impl PlanBody {
    pub fn scenes(&self) -> &[Scene] {
        match self {
            PlanBody::Template { scenes, .. } => scenes,
            PlanBody::Freeform { scenes } => scenes,
        }
    }

    pub fn template_data(&self) -> Option<&TemplateData> {
        match self {
            PlanBody::Template { template_data, .. } => Some(template_data),
            PlanBody::Freeform { .. } => None,
        }
    }
}

/// The output document of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPlan {
    pub run_id: Uuid,
    pub brand_name: String,
    pub brand_color: String,
    pub accent_color: String,
    pub font: String,
    pub archetype: Archetype,
    pub narrative_framework: NarrativeFramework,
    /// `"freeform"` or `"viable"`.
    pub template: String,
    #[serde(flatten)]
    pub body: PlanBody,
    pub audio_events: Vec<AudioEvent>,
    /// Sum of positive scene durations, in seconds.
    pub total_duration: f64,
    pub quality_score: f64,
    /// Diagnostics collected during the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl VideoPlan {
    pub fn scenes(&self) -> &[Scene] {
        self.body.scenes()
    }
}

/// Builds the plan for `state`.
///
/// A state that never reached the Art Director gets the rule-derived palette
/// for its brief; a template run without template data gets an empty block.
pub fn assemble(state: &PipelineState) -> VideoPlan {
    let brief = state.brief();
    let mode = state.template_mode();
    let assets = state
        .visual_assets
        .clone()
        .unwrap_or_else(|| fallback_visual_assets(brief));

    let body = if mode.is_template() {
        PlanBody::Template {
            template_data: state.template_data.clone().unwrap_or_default(),
            scenes: state.scenes.clone(),
        }
    } else {
        PlanBody::Freeform {
            scenes: state.scenes.clone(),
        }
    };

    VideoPlan {
        run_id: state.run_id(),
        brand_name: brief.product_name.clone(),
        brand_color: assets.brand_color().to_string(),
        accent_color: assets.accent_color().to_string(),
        font: assets.font.clone(),
        archetype: assets.archetype,
        narrative_framework: state.narrative_framework.unwrap_or_default(),
        template: mode.template_id().to_string(),
        body,
        audio_events: state.audio_events.clone(),
        total_duration: state.total_duration(),
        quality_score: state.quality_score,
        diagnostics: state.errors().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::sample_state;
    use crate::agents::types::{
        ColorPalette, NarrativeFramework, SceneType, TemplateCopy, TemplateMode, VisualAssets,
    };

    #[test]
    fn test_freeform_plan_fields() {
        let mut state = sample_state(TemplateMode::Freeform);
        state.set_script(vec!["Hi.".into()], NarrativeFramework::Story);
        state.visual_assets = Some(VisualAssets {
            palette: ColorPalette::with_brand_colors("#101010", "#FAFAFA"),
            font: "Sora".into(),
            archetype: Archetype::Bold,
        });
        state.scenes = vec![
            Scene::new("scene-1", Some(SceneType::Hook), "Hook", 3.0),
            Scene::new("scene-2", Some(SceneType::CallToAction), "CTA", 4.0),
        ];
        state.quality_score = 0.9;

        let plan = assemble(&state);

        assert_eq!(plan.brand_name, "Lumen");
        assert_eq!(plan.brand_color, "#101010");
        assert_eq!(plan.accent_color, "#FAFAFA");
        assert_eq!(plan.font, "Sora");
        assert_eq!(plan.archetype, Archetype::Bold);
        assert_eq!(plan.narrative_framework, NarrativeFramework::Story);
        assert_eq!(plan.template, "freeform");
        assert_eq!(plan.scenes().len(), 2);
        assert!(plan.body.template_data().is_none());
        assert!((plan.total_duration - 7.0).abs() < f64::EPSILON);
        assert_eq!(plan.run_id, state.run_id());
    }

    #[test]
    fn test_empty_state_still_assembles() {
        let state = sample_state(TemplateMode::Freeform);
        let plan = assemble(&state);

        assert!(plan.scenes().is_empty());
        assert_eq!(plan.brand_color, fallback_visual_assets(state.brief()).palette.primary);
        assert_eq!(plan.narrative_framework, NarrativeFramework::Aida);
        assert_eq!(plan.total_duration, 0.0);
    }

    #[test]
    fn test_template_plan_serializes_template_block() {
        let mut state = sample_state(TemplateMode::Viable);
        state.template_data = Some(TemplateData {
            copy: Some(TemplateCopy {
                headline: "Calm".into(),
                ..TemplateCopy::default()
            }),
            trust_logos: vec!["Acme".into()],
        });

        let plan = assemble(&state);
        assert_eq!(plan.template, "viable");

        let json = serde_json::to_value(&plan).expect("serialize plan");
        assert_eq!(json["template"], "viable");
        assert_eq!(json["brandName"], "Lumen");
        assert_eq!(json["templateData"]["copy"]["headline"], "Calm");
        assert_eq!(json["templateData"]["trustLogos"][0], "Acme");
        assert!(json["scenes"].is_array());

        let back: VideoPlan = serde_json::from_value(json).expect("deserialize plan");
        assert_eq!(back.body.template_data(), plan.body.template_data());
    }

    #[test]
    fn test_freeform_json_has_no_template_block() {
        let plan = assemble(&sample_state(TemplateMode::Freeform));
        let json = serde_json::to_value(&plan).expect("serialize plan");
        assert!(json.get("templateData").is_none());
        assert!(json["scenes"].is_array());
    }
}
