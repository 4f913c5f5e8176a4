use async_trait::async_trait;

use crate::error::TaskError;
use crate::prompt::PromptSpec;

pub mod openrouter;

pub use openrouter::OpenRouterProvider;

/// Text returned by a provider for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Token usage reported by the provider, when it reports any.
    pub total_tokens: Option<usize>,
}

/// Trait representing a chat-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Send one prompt and return the first choice's text.
    async fn send(&self, api_key: &str, spec: &PromptSpec) -> Result<Completion, TaskError>;
}
