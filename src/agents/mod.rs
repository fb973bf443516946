//! Agents that turn a product brief into a video plan.
//!
//! Generators (Scriptwriter, Art Director, Director, Sound Designer) each
//! implement [`PipelineStep`]; the [`Critic`] scores their output and the
//! [`Orchestrator`] drives the refinement loop before [`assemble`] builds
//! the final [`VideoPlan`].

pub mod art_director;
pub mod assembler;
pub mod critic;
pub mod director;
pub mod error;
pub mod orchestrator;
pub mod scriptwriter;
pub mod sound_designer;
pub mod step;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use art_director::{ArtDirectorAgent, ArtDirectorConfig, Industry};
pub use assembler::{assemble, PlanBody, VideoPlan};
pub use critic::{Critic, CriticConfig, CritiqueIssue, CritiqueReport, RuleId};
pub use director::{DirectorAgent, DirectorConfig, TemplateSlot, TEMPLATE_SCENES};
pub use error::{AgentError, AgentResult};
pub use orchestrator::{
    Orchestrator, PipelineEvent, PipelinePhase, PipelineRun, PipelineSteps, StageRecord,
};
pub use scriptwriter::{ScriptwriterAgent, ScriptwriterConfig};
pub use sound_designer::SoundDesigner;
pub use step::{PipelineStage, PipelineStep, StepOutcome};
pub use types::{
    Archetype, AudioEvent, Brief, CameraMove, CameraMovement, ColorPalette, CueType,
    NarrativeFramework, PipelineState, ReferenceMedia, Scene, SceneLayout, SceneType,
    SceneVisual, TemplateCopy, TemplateData, TemplateMode, VisualAssets,
};
