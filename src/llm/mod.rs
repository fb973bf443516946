//! LLM integration.
//!
//! Agents talk to models only through [`LlmProvider`], injected as an
//! `Arc<dyn LlmProvider>`. [`LiteLlmClient`] implements it for any
//! OpenAI-compatible endpoint:
//!
//! ```ignore
//! use std::sync::Arc;
//! use reel_forge::llm::{LiteLlmClient, LlmProvider};
//!
//! let client: Arc<dyn LlmProvider> = Arc::new(LiteLlmClient::from_env()?);
//! ```

pub mod litellm;

pub use litellm::{
    Choice, GenerationRequest, GenerationResponse, LiteLlmClient, LlmProvider, Message, Usage,
    DEFAULT_MODEL, OPENROUTER_API_BASE,
};
