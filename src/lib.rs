//! reel-forge: marketing-video plan generation.
//!
//! A product brief goes through a fixed cast of LLM-backed agents, gets
//! scored by a rule-based critic, is refined a bounded number of times and
//! is finally assembled into a [`agents::VideoPlan`] for a renderer.

pub mod agents;
pub mod cli;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod utils;

pub use error::LlmError;
