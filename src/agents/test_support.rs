//! Scripted LLM provider shared by the agent unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};

use super::types::{Brief, PipelineState, TemplateMode};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Text(String),
    Fail(String),
}

/// Replays queued replies in order, then `fallback` forever.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(text: impl Into<String>) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = Some(Reply::Text(text.into()));
        provider
    }

    pub(crate) fn failing(message: impl Into<String>) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = Some(Reply::Fail(message.into()));
        provider
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received so far.
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock not poisoned").clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(user) = request.messages.iter().rev().find(|m| m.role == "user") {
            self.prompts
                .lock()
                .expect("lock not poisoned")
                .push(user.content.clone());
        }

        let reply = self
            .replies
            .lock()
            .expect("lock not poisoned")
            .pop_front()
            .or_else(|| self.fallback.clone());

        match reply {
            Some(Reply::Text(content)) => Ok(GenerationResponse {
                id: "mock-id".to_string(),
                model: "mock-model".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(content),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage::default(),
            }),
            Some(Reply::Fail(message)) => Err(LlmError::RequestFailed(message)),
            None => Err(LlmError::RequestFailed(
                "no scripted response left".to_string(),
            )),
        }
    }
}

pub(crate) fn sample_brief() -> Brief {
    Brief::new(
        "Lumen",
        "A project management app that turns scattered tasks into a calm daily plan.",
    )
    .with_target_audience("busy startup teams")
    .with_tone("friendly and upbeat")
    .with_call_to_action("Start your free trial at lumen.app")
}

pub(crate) fn sample_state(mode: TemplateMode) -> PipelineState {
    PipelineState::new(sample_brief(), mode)
}
