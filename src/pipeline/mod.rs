//! Pipeline entry points.
//!
//! [`PipelineConfig`] carries the run-level knobs (model override, step
//! timeout, refinement bound, critic thresholds). The orchestration itself
//! lives in [`crate::agents::orchestrator`] and is re-exported here so
//! callers only need this module:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reel_forge::llm::LiteLlmClient;
//! use reel_forge::pipeline::{Orchestrator, PipelineConfig};
//! use reel_forge::agents::{Brief, TemplateMode};
//!
//! let config = PipelineConfig::from_env()?;
//! let llm = Arc::new(LiteLlmClient::from_env()?);
//! let run = Orchestrator::new(llm, config)
//!     .run(Brief::new("Lumen", "Calm project planning"), TemplateMode::Viable)
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&run.plan)?);
//! ```

pub mod config;

pub use config::{ConfigError, PipelineConfig};

pub use crate::agents::orchestrator::{
    Orchestrator, PipelineEvent, PipelinePhase, PipelineRun, PipelineSteps, StageRecord,
};
