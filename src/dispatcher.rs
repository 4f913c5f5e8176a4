use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};
use uuid::Uuid;

use crate::error::TaskError;
use crate::event_bus::{Event, EventBus};
use crate::prompt::{PromptSpec, build_prompt};
use crate::providers::{Completion, CompletionProvider};
use crate::task::{Fields, TaskKind};

/// Outcome of one submission, as shown in the result panel.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    Success(String),
    Failure(String),
}

impl CompletionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CompletionResult::Success(_))
    }

    /// The completion text or the error message.
    pub fn message(&self) -> &str {
        match self {
            CompletionResult::Success(text) | CompletionResult::Failure(text) => text,
        }
    }
}

impl From<Result<String, TaskError>> for CompletionResult {
    fn from(result: Result<String, TaskError>) -> Self {
        match result {
            Ok(text) => CompletionResult::Success(text),
            Err(err) => CompletionResult::Failure(err.to_string()),
        }
    }
}

impl fmt::Display for CompletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionResult::Success(text) => f.write_str(text),
            CompletionResult::Failure(message) => write!(f, "Error: {}", message),
        }
    }
}

/// Turns a task and its fields into a prompt and runs it against the provider.
///
/// Each call is independent: no retries, caching or shared state besides the
/// optional event bus.
pub struct Dispatcher {
    provider: Arc<dyn CompletionProvider>,
    event_bus: Option<Arc<EventBus>>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Run `kind` with `fields`. Never fails; errors come back as `Failure`.
    pub async fn execute(
        &self,
        api_key: Option<&str>,
        kind: TaskKind,
        fields: &Fields,
    ) -> CompletionResult {
        let submission_id = Uuid::new_v4().to_string();
        let task = kind.slug().to_string();
        self.emit(Event::TaskStarted {
            submission_id: submission_id.clone(),
            task: task.clone(),
        })
        .await;

        let result = self
            .try_execute(api_key, kind, fields)
            .await
            .map(|completion| completion.text);

        match &result {
            Ok(_) => {
                info!("Task {} ({}) completed", task, submission_id);
                self.emit(Event::TaskCompleted {
                    submission_id,
                    task,
                })
                .await;
            }
            Err(err) => {
                if err.is_local() {
                    warn!("Task {} ({}) not sent: {}", task, submission_id, err);
                } else {
                    error!("Task {} ({}) failed: {}", task, submission_id, err);
                }
                self.emit(Event::TaskFailed {
                    submission_id,
                    task,
                    error: err.to_string(),
                })
                .await;
            }
        }

        result.into()
    }

    /// Like [`Dispatcher::execute`], but the task is named by user text.
    pub async fn execute_named(
        &self,
        api_key: Option<&str>,
        task_name: &str,
        fields: &Fields,
    ) -> CompletionResult {
        match task_name.parse::<TaskKind>() {
            Ok(kind) => self.execute(api_key, kind, fields).await,
            Err(err) => {
                error!("{}", err);
                CompletionResult::Failure(err.to_string())
            }
        }
    }

    async fn try_execute(
        &self,
        api_key: Option<&str>,
        kind: TaskKind,
        fields: &Fields,
    ) -> Result<Completion, TaskError> {
        let spec: PromptSpec = build_prompt(kind, fields)?;
        if spec.prompt_text.trim().is_empty() {
            return Err(TaskError::EmptyPrompt);
        }

        let api_key = match api_key.map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(TaskError::MissingApiKey),
        };

        self.emit(Event::APICallStarted {
            provider: self.provider.name().to_string(),
            model: spec.model.to_string(),
        })
        .await;

        let result = self.provider.send(api_key, &spec).await;

        match &result {
            Ok(completion) => {
                // Rough estimate (1 token ≈ 4 characters) when usage is not reported
                let tokens = completion
                    .total_tokens
                    .unwrap_or((spec.prompt_text.len() + completion.text.len()) / 4);
                self.emit(Event::APICallCompleted {
                    provider: self.provider.name().to_string(),
                    tokens,
                })
                .await;
            }
            Err(err) => {
                self.emit(Event::APIError {
                    provider: self.provider.name().to_string(),
                    error: err.to_string(),
                })
                .await;
            }
        }

        result
    }

    async fn emit(&self, event: Event) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::OpenRouterProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the prompt it was given and counts calls.
    #[derive(Default)]
    struct EchoProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn send(&self, _api_key: &str, spec: &PromptSpec) -> Result<Completion, TaskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Completion {
                text: spec.prompt_text.clone(),
                total_tokens: None,
            })
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn openrouter_dispatcher(status: usize, body: &str) -> (mockito::ServerGuard, Dispatcher) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;
        let provider = OpenRouterProvider::new(server.url()).unwrap();
        (server, Dispatcher::new(Arc::new(provider)))
    }

    #[tokio::test]
    async fn test_translate_prompt_reaches_provider() {
        let provider = Arc::new(EchoProvider::default());
        let dispatcher = Dispatcher::new(provider.clone());

        let result = dispatcher
            .execute(
                Some("key"),
                TaskKind::Translate,
                &fields(&[("text", "Hola"), ("targetLanguage", "French")]),
            )
            .await;

        assert!(result.is_success());
        assert!(result.message().contains("French"));
        assert!(result.message().contains("Hola"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_task_never_calls_provider() {
        let provider = Arc::new(EchoProvider::default());
        let dispatcher = Dispatcher::new(provider.clone());

        let result = dispatcher
            .execute_named(Some("key"), "compose-haiku", &fields(&[("text", "x")]))
            .await;

        assert_eq!(
            result,
            CompletionResult::Failure("unrecognized task type: compose-haiku".to_string())
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_api_key_never_calls_provider() {
        let provider = Arc::new(EchoProvider::default());
        let dispatcher = Dispatcher::new(provider.clone());
        let input = fields(&[("topic", "gardening")]);

        for key in [None, Some(""), Some("   ")] {
            let result = dispatcher.execute(key, TaskKind::Brainstorm, &input).await;
            assert_eq!(
                result,
                CompletionResult::Failure("API key not configured".to_string())
            );
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_error_never_calls_provider() {
        let provider = Arc::new(EchoProvider::default());
        let dispatcher = Dispatcher::new(provider.clone());

        let result = dispatcher
            .execute(Some("key"), TaskKind::Explain, &fields(&[("audience", "an expert")]))
            .await;

        assert_eq!(
            result,
            CompletionResult::Failure("required field 'concept' is empty".to_string())
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_is_trimmed() {
        let (_server, dispatcher) = openrouter_dispatcher(
            200,
            r#"{"choices":[{"message":{"content":"  hi  "}}]}"#,
        )
        .await;

        let result = dispatcher
            .execute(Some("key"), TaskKind::Summarize, &fields(&[("text", "hello there")]))
            .await;

        assert_eq!(result, CompletionResult::Success("hi".to_string()));
    }

    #[tokio::test]
    async fn test_http_error_reports_status_and_body() {
        let (_server, dispatcher) = openrouter_dispatcher(401, "unauthorized").await;

        let result = dispatcher
            .execute(Some("key"), TaskKind::ProofreadGrammar, &fields(&[("text", "teh cat")]))
            .await;

        assert!(!result.is_success());
        assert!(result.message().contains("401"));
        assert!(result.message().contains("unauthorized"));
    }

    #[tokio::test]
    async fn test_provider_error_message_is_surfaced() {
        let (_server, dispatcher) =
            openrouter_dispatcher(200, r#"{"error":{"message":"rate limited"}}"#).await;

        let result = dispatcher
            .execute(Some("key"), TaskKind::Brainstorm, &fields(&[("topic", "podcasts")]))
            .await;

        assert!(!result.is_success());
        assert!(result.message().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_events_and_metrics() {
        let bus = Arc::new(EventBus::new(16));
        let mut receiver = bus.subscribe();
        let dispatcher =
            Dispatcher::new(Arc::new(EchoProvider::default())).with_event_bus(bus.clone());

        dispatcher
            .execute(Some("key"), TaskKind::Summarize, &fields(&[("text", "abc")]))
            .await;
        dispatcher
            .execute(None, TaskKind::Summarize, &fields(&[("text", "abc")]))
            .await;

        assert!(matches!(
            receiver.recv().await.unwrap(),
            Event::TaskStarted { .. }
        ));
        assert!(matches!(
            receiver.recv().await.unwrap(),
            Event::APICallStarted { .. }
        ));

        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.total_api_calls, 1);
        assert_eq!(metrics.tasks_completed, 1);
        assert_eq!(metrics.tasks_failed, 1);
        assert!(metrics.total_tokens > 0);
    }

    #[test]
    fn test_completion_result_display() {
        assert_eq!(CompletionResult::Success("done".into()).to_string(), "done");
        assert_eq!(
            CompletionResult::Failure("HTTP 500: oops".into()).to_string(),
            "Error: HTTP 500: oops"
        );
    }
}
