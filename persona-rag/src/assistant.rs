//! Answering questions about the record owner with retrieved context.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::assembler::AssembledContext;
use crate::error::{RagError, Result};
use crate::record::Identity;
use crate::service::PersonaService;

/// Characters of context kept in [`Answer::context_preview`].
const CONTEXT_PREVIEW_CHARS: usize = 200;

/// A chat completion service.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Complete a single-turn conversation and return the assistant's reply.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;

    /// Identifier used in logs, usually the model name.
    fn name(&self) -> &str;
}

/// Render the system prompt grounding the assistant in `context`.
pub fn build_system_prompt(identity: &Identity, context: &str) -> String {
    let name = &identity.name;
    format!(
        "You are {name}'s AI assistant. Answer questions about {name} based on the following \
         relevant information retrieved from the knowledge base:\n\n\
         RELEVANT CONTEXT:\n{context}\n\n\
         INSTRUCTIONS:\n\
         - Answer questions based on the relevant context above\n\
         - If the context doesn't contain enough information, acknowledge the limitation\n\
         - Keep responses conversational, helpful, and professional\n\
         - Provide specific details from the context when relevant\n\
         - If asked about something not covered in the context, offer related information you do have\n\
         - Always respond in the same language as the user's question"
    )
}

/// A reply together with the context it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub reply: String,
    /// The first 200 characters of the context, with `...` if cut.
    pub context_preview: String,
    /// Whether any chunks were retrieved for the question.
    pub grounded: bool,
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(CONTEXT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Question answering over a [`PersonaService`].
pub struct Assistant {
    service: Arc<PersonaService>,
    completion: Arc<dyn ChatCompletion>,
}

impl Assistant {
    pub fn new(service: Arc<PersonaService>, completion: Arc<dyn ChatCompletion>) -> Self {
        Self { service, completion }
    }

    /// Answer `message` using the top-k chunks of the index as context.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] for a blank message,
    /// [`RagError::Closed`] after the service was closed, and
    /// [`RagError::Completion`] when the completion service fails. Retrieval
    /// failures do not error; the prompt then carries the no-context sentinel.
    pub async fn answer(&self, message: &str) -> Result<Answer> {
        let message = message.trim();
        if message.is_empty() {
            return Err(RagError::InvalidInput("message must not be empty".to_string()));
        }

        let context = self.service.assemble(message, self.service.config().top_k).await?;
        let grounded = matches!(context, AssembledContext::Retrieved { .. });
        let identity = self.service.summary_identity().await;
        let system_prompt = build_system_prompt(&identity, context.as_text());
        debug!(model = self.completion.name(), grounded, "sending question to completion service");

        let reply = self.completion.complete(&system_prompt, message).await.map_err(|e| {
            error!(model = self.completion.name(), error = %e, "completion failed");
            match e {
                RagError::Completion { .. } => e,
                other => RagError::Completion {
                    provider: self.completion.name().to_string(),
                    message: other.to_string(),
                },
            }
        })?;
        info!(grounded, reply_chars = reply.chars().count(), "answered question");

        Ok(Answer { reply, context_preview: preview(context.as_text()), grounded })
    }
}
