//! Sound Designer: places audio cues on the storyboard timeline.
//!
//! Purely local. Every scene after the first opens with a transition cue,
//! and every typed scene gets the cue mapped from its type.

use async_trait::async_trait;

use super::step::{PipelineStep, StepOutcome};
use super::types::{AudioEvent, CueType, PipelineState, Scene, SceneType};

/// Cue played at the start of each scene of a given type.
pub fn cue_for(scene_type: SceneType) -> CueType {
    match scene_type {
        SceneType::Hook => CueType::Impact,
        SceneType::Problem => CueType::Tension,
        SceneType::Solution => CueType::Reveal,
        SceneType::Feature | SceneType::Demo => CueType::Click,
        SceneType::Stats => CueType::Pop,
        SceneType::Testimonial => CueType::Chime,
        SceneType::CallToAction => CueType::Success,
    }
}

/// Builds the ordered cue list for `scenes`.
///
/// Scene offsets accumulate positive durations only, so a scene with a
/// broken duration shares its start time with the next one.
pub fn design_audio(scenes: &[Scene]) -> Vec<AudioEvent> {
    let mut events = Vec::with_capacity(scenes.len() * 2);
    let mut offset = 0.0;

    for (i, scene) in scenes.iter().enumerate() {
        if i > 0 {
            events.push(AudioEvent::new(offset, CueType::Transition));
        }
        if let Some(scene_type) = scene.scene_type {
            events.push(AudioEvent::new(offset, cue_for(scene_type)));
        }
        if scene.has_positive_duration() {
            offset += scene.duration;
        }
    }

    events
}

/// Sound Designer step producing `audio_events`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoundDesigner;

impl SoundDesigner {
    pub const AGENT_NAME: &'static str = "sound_designer";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineStep for SoundDesigner {
    fn name(&self) -> &'static str {
        Self::AGENT_NAME
    }

    async fn run(&self, state: &PipelineState) -> StepOutcome {
        let events = design_audio(&state.scenes);
        tracing::info!(
            cues = events.len(),
            scenes = state.scenes.len(),
            "Audio cues placed"
        );

        let mut next = state.clone();
        next.audio_events = events;
        StepOutcome::Completed(next)
    }

    fn recover(&self, state: &PipelineState, reason: &str) -> StepOutcome {
        let mut next = state.clone();
        next.audio_events = Vec::new();
        StepOutcome::recovered(
            next,
            Self::AGENT_NAME,
            format!("audio cues dropped ({})", reason),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::sample_state;
    use crate::agents::types::TemplateMode;

    fn scene(id: &str, scene_type: Option<SceneType>, duration: f64) -> Scene {
        Scene::new(id, scene_type, id, duration)
    }

    #[test]
    fn test_transition_before_every_scene_but_first() {
        let scenes = vec![
            scene("a", Some(SceneType::Hook), 3.0),
            scene("b", Some(SceneType::Problem), 4.0),
            scene("c", Some(SceneType::CallToAction), 4.0),
        ];

        let events = design_audio(&scenes);
        let cues: Vec<(f64, CueType)> = events.iter().map(|e| (e.offset, e.cue)).collect();

        assert_eq!(
            cues,
            vec![
                (0.0, CueType::Impact),
                (3.0, CueType::Transition),
                (3.0, CueType::Tension),
                (7.0, CueType::Transition),
                (7.0, CueType::Success),
            ]
        );
        assert_eq!(events[1].file, "sfx/whoosh.mp3");
    }

    #[test]
    fn test_untyped_scene_gets_transition_only() {
        let scenes = vec![
            scene("a", Some(SceneType::Hook), 3.0),
            scene("b", None, 4.0),
        ];
        let cues: Vec<CueType> = design_audio(&scenes).iter().map(|e| e.cue).collect();
        assert_eq!(cues, vec![CueType::Impact, CueType::Transition]);
    }

    #[test]
    fn test_invalid_duration_does_not_move_timeline() {
        let scenes = vec![
            scene("a", Some(SceneType::Hook), -2.0),
            scene("b", Some(SceneType::Demo), 5.0),
        ];
        let events = design_audio(&scenes);
        assert!(events.iter().all(|e| e.offset == 0.0));
    }

    #[test]
    fn test_no_scenes_no_cues() {
        assert!(design_audio(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_run_never_records_errors() {
        let mut state = sample_state(TemplateMode::Freeform);
        state.scenes = vec![scene("a", Some(SceneType::Stats), 3.5)];

        let outcome = SoundDesigner::new().run(&state).await;

        assert!(!outcome.is_recovered());
        let next = outcome.into_state();
        assert_eq!(next.audio_events.len(), 1);
        assert_eq!(next.audio_events[0].cue, CueType::Pop);
        assert!(next.errors().is_empty());
    }
}
