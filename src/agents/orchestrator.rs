//! Orchestrator for the video-plan pipeline.
//!
//! Runs the generator steps in order, critiques the result and re-runs the
//! refinement subset while the Critic asks for it, up to
//! `PipelineConfig::max_refinements` passes. Each step call is bounded by
//! `PipelineConfig::step_timeout` and isolated from panics; both end in the
//! step's own fallback outcome, so a run always produces a plan.
//!
//! ```text
//! Init -> RunningGenerators -> Critiquing -> Refining -> Critiquing -> ... -> Done
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::llm::LlmProvider;
use crate::pipeline::PipelineConfig;

use super::art_director::{ArtDirectorAgent, ArtDirectorConfig};
use super::assembler::{assemble, VideoPlan};
use super::critic::{Critic, CritiqueReport};
use super::director::{DirectorAgent, DirectorConfig};
use super::error::AgentError;
use super::scriptwriter::{ScriptwriterAgent, ScriptwriterConfig};
use super::sound_designer::SoundDesigner;
use super::step::{PipelineStage, PipelineStep, StepOutcome};
use super::types::{Brief, PipelineState, TemplateMode};

// ============================================================================
// Phases and events
// ============================================================================

/// Orchestrator state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Init,
    RunningGenerators,
    Critiquing,
    Refining,
    Done,
}

/// Progress events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// The state machine moved to a new phase.
    PhaseChanged {
        phase: PipelinePhase,
        timestamp: DateTime<Utc>,
    },
    /// A generator step started. `pass` is 0 for the initial sequence.
    StageStarted {
        stage: PipelineStage,
        pass: u32,
        timestamp: DateTime<Utc>,
    },
    /// A generator step produced its fields normally.
    StageCompleted {
        stage: PipelineStage,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A generator step fell back to its defaults.
    StageRecovered {
        stage: PipelineStage,
        diagnostic: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// The Critic scored the current state.
    CritiqueComplete {
        score: f64,
        needs_refinement: bool,
        issues: usize,
        timestamp: DateTime<Utc>,
    },
    /// A refinement pass started.
    RefinementStarted {
        pass: u32,
        max_refinements: u32,
        timestamp: DateTime<Utc>,
    },
    /// The plan was assembled.
    PipelineComplete {
        run_id: Uuid,
        quality_score: f64,
        refinements: u32,
        total_duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn phase_changed(phase: PipelinePhase) -> Self {
        Self::PhaseChanged {
            phase,
            timestamp: Utc::now(),
        }
    }

    pub fn stage_started(stage: PipelineStage, pass: u32) -> Self {
        Self::StageStarted {
            stage,
            pass,
            timestamp: Utc::now(),
        }
    }

    pub fn stage_completed(stage: PipelineStage, duration_ms: u64) -> Self {
        Self::StageCompleted {
            stage,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn stage_recovered(
        stage: PipelineStage,
        diagnostic: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self::StageRecovered {
            stage,
            diagnostic: diagnostic.into(),
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn critique_complete(report: &CritiqueReport) -> Self {
        Self::CritiqueComplete {
            score: report.score,
            needs_refinement: report.needs_refinement,
            issues: report.issues.len(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Run record
// ============================================================================

/// One generator step invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: PipelineStage,
    /// 0 for the initial sequence, then the refinement pass number.
    pub pass: u32,
    pub recovered: bool,
    pub duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// The assembled output document.
    pub plan: VideoPlan,
    /// Final pipeline state.
    pub state: PipelineState,
    /// Every critique, oldest first. Always non-empty.
    pub critiques: Vec<CritiqueReport>,
    /// Every generator step invocation, in order.
    pub stages: Vec<StageRecord>,
    /// Wall time of the whole run in milliseconds.
    pub total_duration_ms: u64,
}

impl PipelineRun {
    pub fn final_critique(&self) -> Option<&CritiqueReport> {
        self.critiques.last()
    }

    /// Number of step invocations that ended in a fallback.
    pub fn recovered_count(&self) -> usize {
        self.stages.iter().filter(|s| s.recovered).count()
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// The four generator steps, injectable for tests.
#[derive(Clone)]
pub struct PipelineSteps {
    pub scriptwriter: Arc<dyn PipelineStep>,
    pub art_director: Arc<dyn PipelineStep>,
    pub director: Arc<dyn PipelineStep>,
    pub sound_designer: Arc<dyn PipelineStep>,
}

impl PipelineSteps {
    /// The standard agents sharing one provider.
    pub fn from_llm(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            scriptwriter: Arc::new(ScriptwriterAgent::new(
                Arc::clone(&llm),
                ScriptwriterConfig::default().with_temperature(config.script_temperature),
            )),
            art_director: Arc::new(ArtDirectorAgent::new(
                Arc::clone(&llm),
                ArtDirectorConfig::default().with_temperature(config.art_temperature),
            )),
            director: Arc::new(DirectorAgent::new(
                llm,
                DirectorConfig::default().with_temperature(config.director_temperature),
            )),
            sound_designer: Arc::new(SoundDesigner::new()),
        }
    }

    pub fn get(&self, stage: PipelineStage) -> &Arc<dyn PipelineStep> {
        match stage {
            PipelineStage::Scriptwriter => &self.scriptwriter,
            PipelineStage::ArtDirector => &self.art_director,
            PipelineStage::Director => &self.director,
            PipelineStage::SoundDesigner => &self.sound_designer,
        }
    }
}

impl std::fmt::Debug for PipelineSteps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSteps")
            .field("scriptwriter", &self.scriptwriter.name())
            .field("art_director", &self.art_director.name())
            .field("director", &self.director.name())
            .field("sound_designer", &self.sound_designer.name())
            .finish()
    }
}

/// Sequential runner for the video-plan pipeline.
///
/// Holds no per-run state, so one orchestrator can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    steps: PipelineSteps,
    critic: Critic,
    config: PipelineConfig,
}

impl Orchestrator {
    pub const AGENT_NAME: &'static str = "orchestrator";

    /// Creates an orchestrator using the standard agents.
    pub fn new(llm: Arc<dyn LlmProvider>, config: PipelineConfig) -> Self {
        let steps = PipelineSteps::from_llm(llm, &config);
        Self::from_steps(steps, config)
    }

    /// Creates an orchestrator over custom steps.
    pub fn from_steps(steps: PipelineSteps, config: PipelineConfig) -> Self {
        Self {
            critic: Critic::new(config.critic_config()),
            steps,
            config,
        }
    }

    /// Replaces the Critic.
    pub fn with_critic(mut self, critic: Critic) -> Self {
        self.critic = critic;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline for `brief`.
    pub async fn run(&self, brief: Brief, mode: TemplateMode) -> PipelineRun {
        self.execute(brief, mode, None).await
    }

    /// Runs the pipeline, reporting progress on `event_tx`.
    ///
    /// Sends wait for channel capacity, so the receiver must be drained.
    pub async fn run_with_events(
        &self,
        brief: Brief,
        mode: TemplateMode,
        event_tx: mpsc::Sender<PipelineEvent>,
    ) -> PipelineRun {
        self.execute(brief, mode, Some(&event_tx)).await
    }

    async fn execute(
        &self,
        brief: Brief,
        mode: TemplateMode,
        events: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> PipelineRun {
        let start_time = Instant::now();
        let mut stages = Vec::new();
        let mut critiques = Vec::new();

        emit(events, PipelineEvent::phase_changed(PipelinePhase::Init)).await;
        let state = PipelineState::new(brief, mode);
        tracing::info!(
            run_id = %state.run_id(),
            product = %state.brief().product_name,
            mode = %mode,
            "Starting video plan pipeline"
        );

        emit(events, PipelineEvent::phase_changed(PipelinePhase::RunningGenerators)).await;
        let state = self
            .run_stages(&PipelineStage::all_stages(), state, 0, &mut stages, events)
            .await;

        let (mut state, report) = self.critique(&state, events).await;
        critiques.push(report);

        while state.needs_refinement && state.refinement_count < self.config.max_refinements {
            state.refinement_count += 1;
            let pass = state.refinement_count;

            emit(events, PipelineEvent::phase_changed(PipelinePhase::Refining)).await;
            emit(
                events,
                PipelineEvent::RefinementStarted {
                    pass,
                    max_refinements: self.config.max_refinements,
                    timestamp: Utc::now(),
                },
            )
            .await;
            tracing::info!(
                pass,
                max = self.config.max_refinements,
                score = state.quality_score,
                "Refining plan"
            );

            let refined = self
                .run_stages(&PipelineStage::refinement_stages(), state, pass, &mut stages, events)
                .await;
            let (critiqued, report) = self.critique(&refined, events).await;
            state = critiqued;
            critiques.push(report);
        }

        if state.needs_refinement {
            tracing::warn!(
                score = state.quality_score,
                refinements = state.refinement_count,
                "Refinement budget exhausted, using last plan"
            );
        }

        emit(events, PipelineEvent::phase_changed(PipelinePhase::Done)).await;
        let plan = assemble(&state);
        let total_duration_ms = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            run_id = %state.run_id(),
            score = state.quality_score,
            refinements = state.refinement_count,
            diagnostics = state.errors().len(),
            duration_ms = total_duration_ms,
            "Video plan assembled"
        );
        emit(
            events,
            PipelineEvent::PipelineComplete {
                run_id: state.run_id(),
                quality_score: state.quality_score,
                refinements: state.refinement_count,
                total_duration_ms,
                timestamp: Utc::now(),
            },
        )
        .await;

        PipelineRun {
            plan,
            state,
            critiques,
            stages,
            total_duration_ms,
        }
    }

    async fn run_stages(
        &self,
        order: &[PipelineStage],
        mut state: PipelineState,
        pass: u32,
        stages: &mut Vec<StageRecord>,
        events: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> PipelineState {
        for &stage in order {
            emit(events, PipelineEvent::stage_started(stage, pass)).await;
            let stage_start = Instant::now();

            let outcome = self.run_step(stage, &state).await;
            let duration_ms = stage_start.elapsed().as_millis() as u64;

            match &outcome {
                StepOutcome::Completed(_) => {
                    tracing::info!(stage = %stage, pass, duration_ms, "Stage completed");
                    emit(events, PipelineEvent::stage_completed(stage, duration_ms)).await;
                }
                StepOutcome::Recovered { diagnostic, .. } => {
                    tracing::warn!(
                        stage = %stage,
                        pass,
                        diagnostic = %diagnostic,
                        "Stage recovered with fallback"
                    );
                    emit(
                        events,
                        PipelineEvent::stage_recovered(stage, diagnostic.clone(), duration_ms),
                    )
                    .await;
                }
            }

            stages.push(StageRecord {
                stage,
                pass,
                recovered: outcome.is_recovered(),
                duration_ms,
            });
            state = outcome.into_state();
        }
        state
    }

    /// Runs one step under the timeout, converting panics and timeouts into
    /// the step's recovered outcome.
    async fn run_step(&self, stage: PipelineStage, state: &PipelineState) -> StepOutcome {
        let step = self.steps.get(stage);
        let guarded = AssertUnwindSafe(step.run(state)).catch_unwind();

        match tokio::time::timeout(self.config.step_timeout, guarded).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(payload)) => {
                let reason = AgentError::Panicked(panic_message(payload.as_ref()));
                tracing::error!(stage = %stage, error = %reason, "Stage panicked");
                step.recover(state, &reason.to_string())
            }
            Err(_) => {
                let reason = AgentError::Timeout {
                    seconds: self.config.step_timeout.as_secs(),
                };
                step.recover(state, &reason.to_string())
            }
        }
    }

    async fn critique(
        &self,
        state: &PipelineState,
        events: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> (PipelineState, CritiqueReport) {
        emit(events, PipelineEvent::phase_changed(PipelinePhase::Critiquing)).await;
        let (next, report) = self.critic.critique(state);
        emit(events, PipelineEvent::critique_complete(&report)).await;
        (next, report)
    }
}

async fn emit(events: Option<&mpsc::Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
